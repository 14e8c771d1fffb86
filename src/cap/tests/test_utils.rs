use crate::cap::calibration::{CalibrationRecord, SpectralSensitivity};
use crate::cap::records::{
    AttitudeSample, EphemerisPoint, EphemerisRecord, LookAngles, Modelization, SceneVertex,
};
use crate::cap::writer::CapProduct;
use crate::container::types::ImageSpec;
use crate::io::byte_order::ByteOrder;

fn vertex(lat: f64, lon: f64, row: i64, column: i64) -> SceneVertex {
    SceneVertex { latitude: Some(lat), longitude: Some(lon), row: Some(row), column: Some(column) }
}

/// A 10 x 20 three-band product with every leader group populated
pub fn sample_product() -> CapProduct {
    let spec = ImageSpec { lines: 10, columns: 20, bands: 3, sample_bytes: 1, byte_order: ByteOrder::BigEndian };
    let mut product = CapProduct::blank(&spec);
    product.volume_id = "SPOT1-92133".to_string();
    product.product_description = "SPOT SCENE LEVEL 1B".to_string();

    let scene = &mut product.scene;
    scene.scene_id = "S1H1920512104123".to_string();
    scene.mission_index = Some(1);
    scene.instrument = "HRV".to_string();
    scene.instrument_index = Some(1);
    scene.spectral_mode = "XS".to_string();
    scene.processing_level = "1B".to_string();
    scene.acquisition_date = "19920512".to_string();
    scene.acquisition_time = "10:41:23".to_string();
    scene.center = vertex(43.6, 1.45, 5, 10);
    scene.corners = [
        vertex(43.75, 1.25, 1, 1),
        vertex(43.7, 1.65, 1, 20),
        vertex(43.5, 1.2, 10, 1),
        vertex(43.45, 1.6, 10, 20),
    ];
    scene.orientation = Some(12.5);
    scene.grid_k = Some(47);
    scene.grid_j = Some(262);
    scene.shift_value = Some(0);
    scene.revolution = Some(23456);
    scene.compression_flag = Some(0);
    scene.playback_flag = Some(0);
    scene.sun_azimuth = Some(150.25);
    scene.sun_elevation = Some(55.5);
    scene.incidence_angle = Some(10.25);
    scene.viewing_angle = Some(8.75);
    scene.production_date = "1992-05-20".to_string();
    scene.producer = "CNES".to_string();
    scene.job_id = "JOB0001".to_string();

    product.ephemeris = EphemerisRecord {
        center_day: Some(15_482),
        center_seconds: Some(38_483.0),
        line_period_ms: Some(1.504),
        center_line: Some(5),
        points: (0..3)
            .map(|i| EphemerisPoint {
                position_km: [4500.125 + i as f64, -1200.5, 5400.25],
                velocity_km_s: [1.25, -7.125, 0.5],
                day: 15_482,
                seconds: 38_423.0 + 60.0 * i as f64,
            })
            .collect(),
        coarse_attitude: vec![
            AttitudeSample { line: 1, yaw: 0.001, pitch: -0.002, roll: 0.0005 },
            AttitudeSample { line: 10, yaw: 0.0015, pitch: -0.0025, roll: 0.00075 },
        ],
        fine_attitude: vec![AttitudeSample { line: 5, yaw: 0.00125, pitch: -0.00225, roll: 0.000625 }],
    };

    product.calibrations = (1..=3)
        .map(|band| CalibrationRecord {
            band_index: band,
            absolute_gain: Some(0.75 + 0.125 * f64::from(band)),
            absolute_bias: Some(0.0),
            solar_irradiance: Some(1800.0 - 200.0 * f64::from(band)),
            spectral: SpectralSensitivity {
                first_wavelength: Some(0.45 + 0.1 * f64::from(band)),
                step: Some(0.005),
                values: vec![0.0, 0.5, 1.0, 0.5, 0.0],
            },
            gains: vec![vec![1.0, 1.0125, 0.9875]],
            dark_currents: vec![vec![2.5, 2.6, 2.4]],
        })
        .collect();

    product.modelization = Modelization {
        look_angles: (0..3)
            .map(|i| LookAngles {
                psi_x_first: -0.0523 + 0.001 * i as f64,
                psi_x_last: 0.0523,
                psi_y_first: 0.0012,
                psi_y_last: 0.0015,
            })
            .collect(),
        pixel_size: Some(20.0),
        mirror_step: Some(48),
        satellite_altitude_km: Some(822.0),
        detector_count: Some(3000),
    };
    product
}
