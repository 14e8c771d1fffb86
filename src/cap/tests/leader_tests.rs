//! Tests for leader encoding and decoding

extern crate std;

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use super::test_utils::sample_product;
use crate::cap::constants::files;
use crate::cap::records::CapDecoder;
use crate::cap::region::LeaderLayout;
use crate::cap::writer::write_container;
use crate::codec::FieldPolicy;
use crate::errors::SpotError;

fn written_product() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_container(dir.path(), &sample_product()).unwrap();
    dir
}

#[test]
fn test_leader_round_trip() {
    let dir = written_product();
    let mut leader = File::open(dir.path().join(files::LEADER)).unwrap();
    let decoded = CapDecoder::new(FieldPolicy::Strict).decode_leader(&mut leader).unwrap();
    let expected = sample_product();

    std::assert_eq!(decoded.layout(), LeaderLayout::legacy(3));
    let scene = &decoded.scene;
    std::assert_eq!(scene.scene_id, expected.scene.scene_id);
    std::assert_eq!(scene.spectral_mode, "XS");
    std::assert_eq!((scene.band_count, scene.line_count, scene.column_count), (3, 10, 20));
    std::assert_eq!(scene.grid_k, Some(47));
    std::assert_eq!(scene.center.row, Some(5));
    assert_abs_diff_eq!(scene.center.latitude.unwrap(), 43.6, epsilon = 1e-6);
    assert_abs_diff_eq!(scene.corners[3].longitude.unwrap(), 1.6, epsilon = 1e-6);
    std::assert_eq!(scene.sun_elevation, Some(55.5));

    let eph = &decoded.ephemeris;
    std::assert_eq!(eph.points.len(), 3);
    std::assert_eq!(eph.coarse_attitude.len(), 2);
    std::assert_eq!(eph.fine_attitude.len(), 1);
    std::assert_eq!(eph.points[2].position_km[0], 4502.125);
    assert_abs_diff_eq!(eph.coarse_attitude[1].roll, 0.00075, epsilon = 1e-9);

    std::assert_eq!(decoded.calibrations.len(), 3);
    std::assert_eq!(decoded.calibrations[2].absolute_gain, Some(1.125));
    assert_abs_diff_eq!(decoded.calibrations[0].gains[0][1], 1.0125, epsilon = 1e-9);
    std::assert_eq!(decoded.modelization.look_angles.len(), 3);
    std::assert_eq!(decoded.modelization.mirror_step, Some(48));
    std::assert!(decoded.histograms.iter().all(|h| h.bins.iter().all(|b| *b == 0)));
}

#[test]
fn test_blank_optional_fields_under_both_policies() {
    let dir = TempDir::new().unwrap();
    let mut product = sample_product();
    product.scene.sun_azimuth = None;
    product.ephemeris.center_day = None;
    write_container(dir.path(), &product).unwrap();

    let path = dir.path().join(files::LEADER);
    let strict = CapDecoder::new(FieldPolicy::Strict).decode_leader(&mut File::open(&path).unwrap()).unwrap();
    std::assert_eq!(strict.scene.sun_azimuth, None);
    std::assert_eq!(strict.ephemeris.center_day, None);

    let legacy = CapDecoder::new(FieldPolicy::Legacy).decode_leader(&mut File::open(&path).unwrap()).unwrap();
    std::assert_eq!(legacy.scene.sun_azimuth, Some(0.0));
    std::assert_eq!(legacy.ephemeris.center_day, Some(0));
}

#[test]
fn test_blank_table_entry_is_strict_error() {
    let dir = written_product();
    let path = dir.path().join(files::LEADER);
    // Blank the x coordinate of the first ephemeris point (record 3, offset 62)
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(2 * 3960 + 62)).unwrap();
    file.write_all(&[b' '; 16]).unwrap();
    drop(file);

    let err = CapDecoder::new(FieldPolicy::Strict)
        .decode_leader(&mut File::open(&path).unwrap())
        .unwrap_err();
    std::assert!(matches!(err, SpotError::FieldAbsent { field: "x", .. }));

    let legacy = CapDecoder::new(FieldPolicy::Legacy).decode_leader(&mut File::open(&path).unwrap()).unwrap();
    std::assert_eq!(legacy.ephemeris.points[0].position_km[0], 0.0);
}

#[test]
fn test_record_length_mismatch_is_fatal() {
    let dir = written_product();
    let path = dir.path().join(files::LEADER);
    // Corrupt the length field of the scene header record
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(3960 + 8)).unwrap();
    file.write_all(&[0, 0, 0x0F, 0xA1]).unwrap();
    drop(file);

    let err = CapDecoder::default().decode_leader(&mut File::open(&path).unwrap()).unwrap_err();
    std::assert!(matches!(err, SpotError::RecordLengthMismatch { record: 2, expected: 3960, found: 4001, .. }));
}

#[test]
fn test_descriptor_band_count_disagreement() {
    let dir = written_product();
    let path = dir.path().join(files::LEADER);
    // Calibration count field of the descriptor (offset 52, 6 bytes)
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(52)).unwrap();
    file.write_all(b"     4").unwrap();
    drop(file);

    let err = CapDecoder::default().decode_leader(&mut File::open(&path).unwrap()).unwrap_err();
    std::assert!(matches!(err, SpotError::InconsistentLayout(_)));
}
