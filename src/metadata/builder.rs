//! Metadata model builder
//!
//! Assembles a [`SceneMetadata`] from the decoded records of an
//! early-family container in a single pass. No I/O happens here: angles
//! are converted to decimal degrees or radians, ephemeris to meters and
//! Julian dates to calendar timestamps.

use log::debug;

use crate::cap::records::{AttitudeSample, CapScene, EphemerisRecord, SceneHeader, SceneVertex};
use crate::codec::{degrees_to_radians, julian_to_calendar, offset_timestamp};
use crate::errors::SpotResult;
use crate::metadata::codes;
use crate::metadata::model::*;

fn frame_vertex(v: &SceneVertex) -> FrameVertex {
    FrameVertex { longitude: v.longitude, latitude: v.latitude, row: v.row, column: v.column }
}

/// `YYYYMMDD` split into its parts, when well formed
fn date_parts(date: &str) -> Option<(&str, &str, &str)> {
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        Some((&date[0..4], &date[4..6], &date[6..8]))
    } else {
        None
    }
}

fn grid_reference(scene: &SceneHeader) -> String {
    match (scene.grid_k, scene.grid_j) {
        (Some(k), Some(j)) => format!("{:03}-{:03}", k, j),
        _ => String::new(),
    }
}

/// Builds the dataset name of a scene
///
/// Parts that are unknown are left out.
pub fn dataset_name(scene: &SceneHeader) -> String {
    let short_date = date_parts(&scene.acquisition_date)
        .map(|(y, m, d)| format!("{}/{}/{}", &y[2..4], m, d))
        .unwrap_or_default();
    let parts = [
        "SCENE".to_string(),
        scene.mission_index.map(|i| i.to_string()).unwrap_or_default(),
        grid_reference(scene),
        short_date,
        scene.acquisition_time.clone(),
        scene.instrument_index.map(|i| i.to_string()).unwrap_or_default(),
        codes::sensor_code(&scene.spectral_mode),
    ];
    parts.iter().filter(|p| !p.is_empty()).cloned().collect::<Vec<_>>().join(" ")
}

fn identification(scene: &SceneHeader) -> Identification {
    Identification {
        scene_id: scene.scene_id.clone(),
        dataset_name: dataset_name(scene),
        mission: codes::mission_name(scene.mission_index),
        mission_index: scene.mission_index,
        instrument: codes::instrument_name(&scene.instrument),
        instrument_index: scene.instrument_index,
        sensor_code: codes::sensor_code(&scene.spectral_mode),
        spectral_mode: scene.spectral_mode.clone(),
        processing_level: scene.processing_level.clone(),
        imaging_date: date_parts(&scene.acquisition_date)
            .map(|(y, m, d)| format!("{}-{}-{}", y, m, d))
            .unwrap_or_default(),
        imaging_time: scene.acquisition_time.clone(),
    }
}

fn frame(scene: &SceneHeader) -> SceneFrame {
    let [ul, ur, ll, lr] = &scene.corners;
    SceneFrame {
        vertices: [ul, ur, lr, ll].into_iter().map(frame_vertex).collect(),
        center: frame_vertex(&scene.center),
        orientation: scene.orientation,
    }
}

fn source_parameters(scene: &SceneHeader) -> SourceParameters {
    SourceParameters {
        grid_reference: grid_reference(scene),
        shift_value: scene.shift_value,
        revolution: scene.revolution,
        compression_flag: scene.compression_flag,
        playback_flag: scene.playback_flag,
        sun_azimuth: scene.sun_azimuth,
        sun_elevation: scene.sun_elevation,
        incidence_angle: scene.incidence_angle,
        viewing_angle: scene.viewing_angle,
    }
}

fn center_time(eph: &EphemerisRecord) -> SpotResult<Option<String>> {
    match (eph.center_day, eph.center_seconds) {
        (Some(day), Some(seconds)) => Ok(Some(julian_to_calendar(day, seconds)?)),
        _ => Ok(None),
    }
}

fn attitude_angles(
    samples: &[AttitudeSample],
    center: Option<&str>,
    center_line: Option<i64>,
    line_period: Option<f64>,
) -> SpotResult<Vec<AttitudeAngles>> {
    samples
        .iter()
        .map(|s| {
            let time = match (center, center_line, line_period) {
                (Some(c), Some(cl), Some(period)) => {
                    Some(offset_timestamp(c, (s.line - cl) as f64 * period)?)
                }
                _ => None,
            };
            Ok(AttitudeAngles {
                line: s.line,
                time,
                yaw: degrees_to_radians(s.yaw),
                pitch: degrees_to_radians(s.pitch),
                roll: degrees_to_radians(s.roll),
            })
        })
        .collect()
}

/// Builds the scene metadata of an early-family container
///
/// # Arguments
/// * `scene` - Every record decoded from the container
///
/// # Returns
/// The complete model; a date out of range fails the whole build
pub fn build_scene_metadata(scene: &CapScene) -> SpotResult<SceneMetadata> {
    let leader = &scene.leader;
    let header = &leader.scene;
    let eph = &leader.ephemeris;
    let model = &leader.modelization;

    let center = center_time(eph)?;
    let line_period = eph.line_period_ms.map(|ms| ms / 1000.0);

    let sensor = SensorConfiguration {
        line_period,
        scene_center_time: center.clone(),
        scene_center_line: eph.center_line,
        look_angles: model
            .look_angles
            .iter()
            .enumerate()
            .map(|(i, a)| BandLookAngles {
                band_index: i as u32 + 1,
                psi_x_first: a.psi_x_first,
                psi_x_last: a.psi_x_last,
                psi_y_first: a.psi_y_first,
                psi_y_last: a.psi_y_last,
            })
            .collect(),
        pixel_size: model.pixel_size,
        mirror_step: model.mirror_step,
        detector_count: model.detector_count,
    };

    let ephemeris = Ephemeris {
        satellite_altitude: model.satellite_altitude_km.map(|km| km * 1000.0),
        points: eph
            .points
            .iter()
            .map(|p| {
                Ok(EphemerisSample {
                    position: p.position_km.map(|km| km * 1000.0),
                    velocity: p.velocity_km_s.map(|v| v * 1000.0),
                    time: julian_to_calendar(p.day, p.seconds)?,
                })
            })
            .collect::<SpotResult<Vec<_>>>()?,
    };

    let attitude = Attitude {
        coarse: attitude_angles(&eph.coarse_attitude, center.as_deref(), eph.center_line, line_period)?,
        fine: attitude_angles(&eph.fine_attitude, center.as_deref(), eph.center_line, line_period)?,
    };

    let descriptions = codes::band_descriptions(header.band_count as usize);
    let bands = (1..=header.band_count)
        .map(|band| {
            let i = band as usize - 1;
            let calibration = leader
                .calibrations
                .get(i)
                .map(|c| BandCalibration {
                    gain: c.absolute_gain,
                    bias: c.absolute_bias,
                    solar_irradiance: c.solar_irradiance,
                    spectral: c.spectral.clone(),
                    gain_tables: c.gains.clone(),
                    dark_current_tables: c.dark_currents.clone(),
                })
                .unwrap_or_default();
            let quality = scene.trailer.bands.get(i).copied().unwrap_or_default();
            BandMetadata {
                index: band,
                description: descriptions.get(i).cloned().unwrap_or_default(),
                calibration,
                histogram: leader.histograms.get(i).map(|h| Histogram {
                    mean: h.mean,
                    std_dev: h.std_dev,
                    bins: h.bins.clone(),
                }),
                bad_lines: scene.bad_lines.bad_lines(band).to_vec(),
                lost_lines: quality.lost_lines,
                degraded_lines: quality.degraded_lines,
            }
        })
        .collect::<Vec<_>>();

    let [red, green, blue] = codes::display_channels(&header.spectral_mode, header.band_count);
    let raster = RasterDescription {
        rows: header.line_count,
        columns: header.column_count,
        bands: header.band_count,
        nbits: scene.imagery.sample_bytes * 8,
        byte_order: scene.imagery.byte_order,
        skip_bytes: 0,
        data_file: scene.imagery_file.clone(),
        data_format: "CAP".to_string(),
    };

    debug!(
        "Built metadata for {}: {} bands, {} ephemeris points",
        header.scene_id,
        bands.len(),
        ephemeris.points.len()
    );

    Ok(SceneMetadata {
        identification: identification(header),
        frame: frame(header),
        source: source_parameters(header),
        production: Production {
            producer: header.producer.clone(),
            production_date: header.production_date.clone(),
            job_id: header.job_id.clone(),
            volume_id: scene.volume.volume_id.clone(),
            volume_creation_date: scene.volume.creation_date.clone(),
            product_description: scene.volume.product_description.clone(),
        },
        raster,
        sensor,
        ephemeris,
        attitude,
        bands,
        display: DisplayChannels { red, green, blue },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap::bad_lines::{BadLine, BadLineScan, LineStatus};
    use crate::cap::records::*;
    use crate::cap::CalibrationRecord;
    use crate::io::byte_order::ByteOrder;
    use approx::assert_abs_diff_eq;

    fn scene_header() -> SceneHeader {
        SceneHeader {
            scene_id: "S1H1".to_string(),
            mission_index: Some(1),
            instrument_index: Some(1),
            spectral_mode: "XS".to_string(),
            acquisition_date: "19920512".to_string(),
            acquisition_time: "10:41:23".to_string(),
            grid_k: Some(47),
            grid_j: Some(262),
            band_count: 3,
            line_count: 10,
            column_count: 20,
            ..Default::default()
        }
    }

    fn cap_scene(bad_lines: BadLineScan) -> CapScene {
        let header = scene_header();
        CapScene {
            volume: VolumeDirectory {
                volume_id: "V1".to_string(),
                creation_date: "19920520".to_string(),
                product_description: String::new(),
                pointers: Vec::new(),
            },
            leader: Leader {
                descriptor: LeaderDescriptor {
                    record_count: 10,
                    record_length: 3960,
                    calibration_count: 3,
                    calibration_length: 48_798,
                    histogram_count: 3,
                    histogram_length: 1072,
                },
                scene: header,
                ephemeris: EphemerisRecord {
                    center_day: Some(15_472),
                    center_seconds: Some(38_483.0),
                    line_period_ms: Some(1.5),
                    center_line: Some(5),
                    points: vec![EphemerisPoint {
                        position_km: [7000.0, 0.5, -1.0],
                        velocity_km_s: [7.5, 0.0, 0.0],
                        day: 15_472,
                        seconds: 38_483.0,
                    }],
                    coarse_attitude: vec![AttitudeSample { line: 1, yaw: 180.0, pitch: 0.0, roll: -90.0 }],
                    fine_attitude: Vec::new(),
                },
                calibrations: (1..=3).map(CalibrationRecord::empty).collect(),
                modelization: Modelization { satellite_altitude_km: Some(822.0), ..Default::default() },
                histograms: (1..=3).map(BandHistogram::empty).collect(),
            },
            imagery: ImageryDescriptor {
                line_count: 10,
                column_count: 20,
                band_count: 3,
                sample_bytes: 1,
                byte_order: ByteOrder::BigEndian,
                record_length: 60,
                prefix_length: 32,
                suffix_length: 8,
                records_written: Some(0),
                interleaving: "BIL".to_string(),
            },
            trailer: TrailerSummary { bands: vec![BandQuality { lost_lines: 1, degraded_lines: 0 }; 3] },
            bad_lines,
            imagery_file: "imag_01.dat".to_string(),
        }
    }

    #[test]
    fn test_dataset_name() {
        assert_eq!(dataset_name(&scene_header()), "SCENE 1 047-262 92/05/12 10:41:23 1 X");
        let blank = SceneHeader { spectral_mode: "PAN".to_string(), ..Default::default() };
        assert_eq!(dataset_name(&blank), "SCENE P");
    }

    #[test]
    fn test_unit_conversions_and_dates() {
        let meta = build_scene_metadata(&cap_scene(BadLineScan::clean(3))).unwrap();
        assert_eq!(meta.identification.imaging_date, "1992-05-12");
        assert_eq!(meta.ephemeris.points[0].position[0], 7_000_000.0);
        assert_eq!(meta.ephemeris.points[0].velocity[0], 7500.0);
        assert_eq!(meta.ephemeris.points[0].time, "1992-05-12T10:41:23.000000");
        assert_eq!(meta.ephemeris.satellite_altitude, Some(822_000.0));
        assert_eq!(meta.raster.data_file, "imag_01.dat");
        assert_eq!(meta.raster.data_format, "CAP");
        assert_eq!(meta.sensor.scene_center_time.as_deref(), Some("1992-05-12T10:41:23.000000"));

        let sample = &meta.attitude.coarse[0];
        assert_abs_diff_eq!(sample.yaw, std::f64::consts::PI, epsilon = 1e-12);
        assert_abs_diff_eq!(sample.roll, -std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        // line 1 is 4 lines before the center line at 1.5 ms per line
        assert_eq!(sample.time.as_deref(), Some("1992-05-12T10:41:22.994000"));
    }

    #[test]
    fn test_bands_display_and_bad_lines() {
        let scan = BadLineScan::from_bands(vec![
            Vec::new(),
            vec![BadLine { line: 5, status: LineStatus::Lost }],
            Vec::new(),
        ]);
        let meta = build_scene_metadata(&cap_scene(scan)).unwrap();
        assert_eq!(meta.bands.len(), 3);
        assert_eq!(meta.bands[0].description, "XS1");
        assert_eq!(meta.bands[2].lost_lines, 1);
        assert!(meta.bands[1].has_bad_lines());
        assert!(!meta.bands[0].has_bad_lines());
        assert_eq!(meta.display, DisplayChannels { red: 3, green: 2, blue: 1 });
        assert_eq!(meta.frame.vertices.len(), 4);
        assert!(meta.bands.iter().all(|b| b.histogram.is_some()));
    }
}
