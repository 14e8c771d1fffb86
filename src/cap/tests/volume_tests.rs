//! Tests for the volume directory, imagery descriptor and trailer

extern crate std;

use std::fs::{self, File};

use tempfile::TempDir;

use super::test_utils::sample_product;
use crate::cap::constants::files;
use crate::cap::records::{check_image_agreement, CapDecoder};
use crate::cap::region::LeaderLayout;
use crate::cap::writer::write_container;
use crate::errors::SpotError;
use crate::io::byte_order::ByteOrder;

#[test]
fn test_five_files_with_advertised_sizes() {
    let dir = TempDir::new().unwrap();
    write_container(dir.path(), &sample_product()).unwrap();

    for name in [files::VOLUME, files::NULL_VOLUME, files::LEADER, files::IMAGERY, files::TRAILER] {
        std::assert!(dir.path().join(name).is_file(), "{} missing", name);
    }

    let decoder = CapDecoder::default();
    let volume = decoder
        .decode_volume_directory(&mut File::open(dir.path().join(files::VOLUME)).unwrap())
        .unwrap();
    std::assert_eq!(volume.volume_id, "SPOT1-92133");
    std::assert_eq!(volume.product_description, "SPOT SCENE LEVEL 1B");
    std::assert_eq!(volume.pointers.len(), 3);
    for pointer in &volume.pointers {
        let actual = fs::metadata(dir.path().join(&pointer.file_name)).unwrap().len();
        std::assert_eq!(pointer.file_size, actual, "{}", pointer.file_name);
    }

    let leader = volume.pointer_for("lead_01.dat").unwrap();
    std::assert_eq!(leader.record_count, 10);
    std::assert_eq!(leader.file_size, LeaderLayout::legacy(3).file_length());

    let imagery = volume.pointer_for(files::IMAGERY).unwrap();
    std::assert_eq!(imagery.record_count, 1 + 30);
    std::assert_eq!(imagery.record_length, 32 + 20 + 8);

    decoder
        .check_null_volume(&mut File::open(dir.path().join(files::NULL_VOLUME)).unwrap())
        .unwrap();
}

#[test]
fn test_imagery_descriptor_and_trailer() {
    let dir = TempDir::new().unwrap();
    let mut product = sample_product();
    product.byte_order = ByteOrder::LittleEndian;
    product.sample_bytes = 2;
    write_container(dir.path(), &product).unwrap();

    let decoder = CapDecoder::default();
    let desc = decoder
        .decode_imagery_descriptor(&mut File::open(dir.path().join(files::IMAGERY)).unwrap())
        .unwrap();
    std::assert_eq!((desc.line_count, desc.column_count, desc.band_count), (10, 20, 3));
    std::assert_eq!(desc.sample_bytes, 2);
    std::assert_eq!(desc.byte_order, ByteOrder::LittleEndian);
    std::assert_eq!(desc.records_written, Some(0));
    let layout = desc.record_layout().unwrap();
    std::assert_eq!(layout.record_length(), 32 + 40 + 8);
    check_image_agreement(&product.scene, &desc).unwrap();

    let trailer = decoder
        .decode_trailer(&mut File::open(dir.path().join(files::TRAILER)).unwrap())
        .unwrap();
    std::assert_eq!(trailer.bands.len(), 3);
    std::assert!(trailer.bands.iter().all(|b| b.lost_lines == 0 && b.degraded_lines == 0));
}

#[test]
fn test_truncated_volume_directory_is_inconsistent() {
    let dir = TempDir::new().unwrap();
    write_container(dir.path(), &sample_product()).unwrap();
    let path = dir.path().join(files::VOLUME);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 360]).unwrap();

    let result = CapDecoder::default().decode_volume_directory(&mut File::open(&path).unwrap());
    std::assert!(result.is_err());
}

#[test]
fn test_negative_advertised_size_is_inconsistent() {
    let dir = TempDir::new().unwrap();
    write_container(dir.path(), &sample_product()).unwrap();
    let path = dir.path().join(files::VOLUME);
    let mut bytes = fs::read(&path).unwrap();
    // file_size of the first pointer record, second 360-byte record
    bytes[360 + 48..360 + 60].copy_from_slice(b"         -12");
    fs::write(&path, &bytes).unwrap();

    let err = CapDecoder::default()
        .decode_volume_directory(&mut File::open(&path).unwrap())
        .unwrap_err();
    std::assert!(matches!(err, SpotError::InconsistentLayout(_)));
}
