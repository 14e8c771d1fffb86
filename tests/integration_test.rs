//! Integration tests for container lifecycle and translation

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use approx::assert_relative_eq;

use spotkit::cap::constants::imagery;
use spotkit::cap::region::{RecordLayout, Window};
use spotkit::cap::writer::CapProduct;
use spotkit::io::byte_order::{machine_byte_order, ByteOrder};
use spotkit::{ContainerKind, ContainerManager, ImageSpec, SpotError, SpotKit};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn foreign_order() -> ByteOrder {
    match machine_byte_order() {
        ByteOrder::LittleEndian => ByteOrder::BigEndian,
        ByteOrder::BigEndian => ByteOrder::LittleEndian,
    }
}

/// A blank product with enough scene content to name the dataset
fn product(spec: &ImageSpec) -> CapProduct {
    let mut product = CapProduct::blank(spec);
    product.volume_id = "SPOT2-93201".to_string();
    product.product_description = "SPOT SCENE LEVEL 1A".to_string();
    product.scene.scene_id = "S2H1930720093012".to_string();
    product.scene.mission_index = Some(2);
    product.scene.instrument = "HRV".to_string();
    product.scene.instrument_index = Some(2);
    product.scene.spectral_mode = "XS".to_string();
    product.scene.processing_level = "1A".to_string();
    product.scene.acquisition_date = "19930720".to_string();
    product.scene.acquisition_time = "09:30:12".to_string();
    product.scene.grid_k = Some(51);
    product.scene.grid_j = Some(258);
    product
}

fn create_cap(manager: &ContainerManager, dir: &Path, spec: &ImageSpec) {
    let handle = manager.create_cap(dir, &product(spec)).unwrap();
    manager.close(handle).unwrap();
}

/// Line `line` of band `band` filled with `line * 10 + band + column`
fn pattern_line(line: u32, band: u32, columns: u32) -> Vec<u8> {
    (0..columns).map(|c| ((line * 10 + band + c) % 256) as u8).collect()
}

#[test]
fn test_create_cap_writes_five_files() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let manager = ContainerManager::default();
    let spec = ImageSpec::new(100, 200, 3, 1);
    create_cap(&manager, &dir, &spec);

    let mut names: Vec<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["IMAG_01.DAT", "LEAD_01.DAT", "NULL_01.DAT", "TRAI_01.DAT", "VOLD_01.DAT"]);

    let imagery_size = fs::metadata(dir.join("IMAG_01.DAT")).unwrap().len();
    assert_eq!(imagery_size, 360 + 300 * (32 + 200 + 8));

    let handle = manager.open_read(&dir, Some(ContainerKind::Cap)).unwrap();
    assert_eq!((handle.lines(), handle.columns(), handle.bands()), (100, 200, 3));
    assert_eq!(handle.sample_bytes(), 1);
    assert_eq!(handle.channels().len(), 3);
    assert_eq!(handle.channels()[1].prefix_length, 32);
    assert_eq!(handle.channels()[1].line_stride, 3 * 240);
    manager.close(handle).unwrap();
}

#[test]
fn test_status_byte_reports_one_bad_line() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let manager = ContainerManager::default();
    let spec = ImageSpec::new(100, 200, 3, 1);
    create_cap(&manager, &dir, &spec);

    let layout = RecordLayout::new(100, 200, 3, 1);
    let mut file = OpenOptions::new().write(true).open(dir.join("IMAG_01.DAT")).unwrap();
    file.seek(SeekFrom::Start(layout.record_offset(5, 2) + imagery::STATUS_OFFSET as u64)).unwrap();
    file.write_all(&[1]).unwrap();
    drop(file);

    let mut handle = manager.open_read(&dir, None).unwrap();
    let scene = handle.scene().unwrap();
    assert_eq!(scene.bad_lines.lost_count(2), 1);
    assert_eq!(scene.bad_lines.bad_lines(2)[0].line, 5);
    assert!(!scene.bad_lines.has_bad_lines(1));
    assert!(!scene.bad_lines.has_bad_lines(3));
    manager.close(handle).unwrap();

    let output = root.path().join("METADATA.DIM");
    let meta = manager.translate(&dir, &output).unwrap();
    assert_eq!(meta.bands[1].bad_lines.len(), 1);
    assert!(meta.bands[0].bad_lines.is_empty());

    let document = fs::read_to_string(&output).unwrap();
    assert_eq!(document.matches("<Bad_Lines>").count(), 1);
    assert!(document.contains("<BL_TYPE>LOST</BL_TYPE>"));
}

#[test]
fn test_family_mismatch_before_any_open() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let manager = ContainerManager::default();
    create_cap(&manager, &dir, &ImageSpec::new(4, 5, 1, 1));

    // Without its imagery file the container cannot be opened at all
    fs::remove_file(dir.join("IMAG_01.DAT")).unwrap();
    match manager.open_read(&dir, Some(ContainerKind::Dimap)) {
        Err(SpotError::FamilyMismatch { declared, discovered }) => {
            assert_eq!(declared, ContainerKind::Dimap.name());
            assert_eq!(discovered, ContainerKind::Cap.name());
        }
        other => panic!("expected a family mismatch, got {:?}", other.err()),
    }
    assert!(matches!(manager.delete(&dir, Some(ContainerKind::Dimap)), Err(SpotError::FamilyMismatch { .. })));
    assert!(dir.exists());
}

#[test]
fn test_translate_is_deterministic() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let kit = SpotKit::default();
    create_cap(kit.manager(), &dir, &ImageSpec::new(6, 8, 3, 1));

    let first = root.path().join("first.dim");
    let second = root.path().join("second.dim");
    kit.translate(&dir, &first).unwrap();
    kit.translate(&dir, &second).unwrap();
    let bytes = fs::read(&first).unwrap();
    assert_eq!(bytes, fs::read(&second).unwrap());
    assert!(bytes.starts_with(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));

    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("<DATASET_NAME>SCENE 2 051-258 93/07/20 09:30:12 2 X</DATASET_NAME>"));
}

#[test]
fn test_translation_names_imagery_file_as_found() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let kit = SpotKit::default();
    let spec = ImageSpec::new(4, 5, 1, 1);
    create_cap(kit.manager(), &dir, &spec);
    for entry in fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        let lower = path.file_name().unwrap().to_string_lossy().to_lowercase();
        fs::rename(&path, dir.join(lower)).unwrap();
    }

    let output = root.path().join("lower.dim");
    kit.translate(&dir, &output).unwrap();
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("href=\"imag_01.dat\""));
    assert!(!text.contains("IMAG_01.DAT"));

    let handle = kit.manager().open_read(&dir, None).unwrap();
    assert_eq!(handle.spec(), spec);
    kit.manager().close(handle).unwrap();
}

#[test]
fn test_dimap_skeleton_reopens_with_same_dimensions() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let manager = ContainerManager::default();
    let spec = ImageSpec::new(7, 9, 2, 2);
    let handle = manager.create(&dir, ContainerKind::Dimap, &spec).unwrap();
    assert_eq!(handle.kind(), ContainerKind::Dimap);
    manager.close(handle).unwrap();

    assert!(dir.join("METADATA.DIM").is_file());
    assert_eq!(fs::metadata(dir.join("IMAGERY.BIL")).unwrap().len(), 7 * 9 * 2 * 2);

    let handle = manager.open_read(&dir, None).unwrap();
    assert_eq!(handle.spec(), spec);
    manager.close(handle).unwrap();

    let found = manager.list_images(root.path()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, ContainerKind::Dimap);
}

#[test]
fn test_reads_do_not_depend_on_previous_reads() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let manager = ContainerManager::default();
    let mut handle = manager.create_cap(&dir, &product(&ImageSpec::new(12, 16, 2, 1))).unwrap();
    for band in 1..=2 {
        let samples: Vec<u8> = (1..=12).flat_map(|line| pattern_line(line, band, 16)).collect();
        handle.write(band, 1, 12, &samples).unwrap();
    }
    manager.close(handle).unwrap();

    let window = Window::new(3, 5, 4, 6).with_steps(2, 3);
    let expected: Vec<u8> = [3u32, 5]
        .iter()
        .flat_map(|line| pattern_line(*line, 2, 16).into_iter().skip(4).take(6).step_by(3))
        .collect();

    let mut cold = manager.open_read(&dir, None).unwrap();
    let first = cold.read(2, &window).unwrap();
    manager.close(cold).unwrap();

    let mut warm = manager.open_read(&dir, None).unwrap();
    warm.read(1, &Window::full(12, 16)).unwrap();
    warm.read(2, &Window::new(10, 1, 3, 16)).unwrap();
    let second = warm.read(2, &window).unwrap();
    manager.close(warm).unwrap();

    assert_eq!(first, expected);
    assert_eq!(second, expected);
}

#[test]
fn test_two_byte_samples_in_foreign_order() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let manager = ContainerManager::default();
    let spec = ImageSpec::new(2, 3, 1, 2).with_byte_order(foreign_order());
    let values = [0x0102u16, 0x0304, 0x0506, 0x0708, 0x090A, 0x0B0C];
    let samples: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let stored: Vec<u8> = values
        .iter()
        .flat_map(|v| match foreign_order() {
            ByteOrder::BigEndian => v.to_be_bytes(),
            ByteOrder::LittleEndian => v.to_le_bytes(),
        })
        .collect();

    for kind in [ContainerKind::Cap, ContainerKind::Dimap] {
        let dir = root.path().join(kind.name());
        let mut handle = manager.create(&dir, kind, &spec).unwrap();
        assert!(handle.swaps_samples());
        handle.write(1, 1, 2, &samples).unwrap();
        manager.close(handle).unwrap();

        let mut handle = manager.open_read(&dir, Some(kind)).unwrap();
        assert_eq!(handle.read(1, &Window::full(2, 3)).unwrap(), samples);
        manager.close(handle).unwrap();

        let raw = match kind {
            ContainerKind::Cap => {
                let bytes = fs::read(dir.join("IMAG_01.DAT")).unwrap();
                let layout = RecordLayout::new(2, 3, 1, 2);
                [1u32, 2]
                    .iter()
                    .flat_map(|line| {
                        let start = layout.pixel_offset(*line, 1) as usize;
                        bytes[start..start + 6].to_vec()
                    })
                    .collect::<Vec<u8>>()
            }
            ContainerKind::Dimap => fs::read(dir.join("IMAGERY.BIL")).unwrap(),
        };
        assert_eq!(raw, stored);
    }
}

#[test]
fn test_read_only_cap_rejects_writes() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let manager = ContainerManager::default();
    create_cap(&manager, &dir, &ImageSpec::new(4, 5, 1, 1));
    let before = fs::read(dir.join("IMAG_01.DAT")).unwrap();

    let mut handle = manager.open_read(&dir, None).unwrap();
    assert!(matches!(handle.write(1, 1, 1, &[9; 5]), Err(SpotError::InvalidState(_))));
    manager.close(handle).unwrap();
    assert_eq!(fs::read(dir.join("IMAG_01.DAT")).unwrap(), before);
}

#[test]
fn test_close_patches_histograms_and_record_count() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let manager = ContainerManager::default();
    create_cap(&manager, &dir, &ImageSpec::new(4, 5, 2, 1));

    let mut handle = manager.open_modify(&dir, Some(ContainerKind::Cap)).unwrap();
    handle.write(1, 1, 2, &[7; 10]).unwrap();
    handle.write(1, 3, 2, &[9; 10]).unwrap();
    manager.close(handle).unwrap();

    let mut handle = manager.open_read(&dir, None).unwrap();
    let scene = handle.scene().unwrap();
    assert_eq!(scene.imagery.records_written, Some(4));
    let histogram = &scene.leader.histograms[0];
    assert_eq!(histogram.bins[7], 10);
    assert_eq!(histogram.bins[9], 10);
    assert_relative_eq!(histogram.mean.unwrap(), 8.0, epsilon = 1e-3);
    assert_relative_eq!(histogram.std_dev.unwrap(), 1.0, epsilon = 1e-3);
    assert!(scene.leader.histograms[1].bins.iter().all(|c| *c == 0));
    manager.close(handle).unwrap();

    // A second session writing fewer records keeps the larger count
    let mut handle = manager.open_modify(&dir, None).unwrap();
    handle.write(2, 1, 1, &[1; 5]).unwrap();
    manager.close(handle).unwrap();
    let mut handle = manager.open_read(&dir, None).unwrap();
    assert_eq!(handle.scene().unwrap().imagery.records_written, Some(4));
    manager.close(handle).unwrap();
}

#[test]
fn test_quicklook_uses_display_channels() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("scene");
    let kit = SpotKit::default();
    let mut handle = kit.create(&dir, ContainerKind::Dimap, &ImageSpec::new(4, 6, 1, 1)).unwrap();
    handle.write(1, 1, 4, &[200; 24]).unwrap();
    kit.manager().close(handle).unwrap();

    let image = kit.quicklook(&dir, None, 2).unwrap();
    assert_eq!((image.width(), image.height()), (3, 2));
    assert_eq!(image.get_pixel(0, 0).0, [200, 200, 200]);

    let png = root.path().join("quicklook.png");
    kit.extract(&dir, &png, Some(Window::new(1, 1, 2, 2)), 1).unwrap();
    assert!(png.is_file());
}
