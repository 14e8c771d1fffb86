//! DIMAP document builder
//!
//! Builds the `Dimap_Document` tree of a scene. Top-level groups are
//! emitted in the order of [`SCHEMA_ORDER`], each produced by its own
//! builder function.

use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::{debug, info};

use crate::dimap::markup::{render_document, Node};
use crate::errors::SpotResult;
use crate::metadata::codes;
use crate::metadata::model::*;

/// Root element name
pub const ROOT: &str = "Dimap_Document";
/// Document file name inside a later-family container
pub const DOCUMENT_FILE: &str = "METADATA.DIM";

type GroupBuilder = fn(&SceneMetadata) -> Vec<Node>;

/// Top-level groups in document order
pub static SCHEMA_ORDER: &[(&str, GroupBuilder)] = &[
    ("Metadata_Id", metadata_id),
    ("Dataset_Id", dataset_id),
    ("Dataset_Frame", dataset_frame),
    ("Dataset_Sources", dataset_sources),
    ("Coordinate_Reference_System", coordinate_reference_system),
    ("Raster_CS", raster_cs),
    ("Geoposition", geoposition),
    ("Production", production),
    ("Raster_Dimensions", raster_dimensions),
    ("Raster_Encoding", raster_encoding),
    ("Data_Processing", data_processing),
    ("Data_Access", data_access),
    ("Image_Display", image_display),
    ("Image_Interpretation", image_interpretation),
    ("Data_Strip", data_strip),
];

fn opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn joined<T: Display>(values: &[T]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

fn frame_point(name: &str, vertex: &FrameVertex) -> Node {
    Node::group(
        name,
        vec![
            Node::value("FRAME_LON", opt(vertex.longitude)),
            Node::value("FRAME_LAT", opt(vertex.latitude)),
            Node::value("FRAME_ROW", opt(vertex.row)),
            Node::value("FRAME_COL", opt(vertex.column)),
        ],
    )
}

fn metadata_id(_: &SceneMetadata) -> Vec<Node> {
    vec![
        Node::value_with("METADATA_FORMAT", "DIMAP", "version", "2.0"),
        Node::value("METADATA_PROFILE", "SPOTSCENE_1A"),
    ]
}

fn dataset_id(meta: &SceneMetadata) -> Vec<Node> {
    vec![Node::value("DATASET_NAME", &meta.identification.dataset_name)]
}

fn dataset_frame(meta: &SceneMetadata) -> Vec<Node> {
    let mut nodes: Vec<Node> = meta.frame.vertices.iter().map(|v| frame_point("Vertex", v)).collect();
    nodes.push(frame_point("Scene_Center", &meta.frame.center));
    nodes.push(Node::value_with("SCENE_ORIENTATION", opt(meta.frame.orientation), "unit", "deg"));
    nodes
}

fn dataset_sources(meta: &SceneMetadata) -> Vec<Node> {
    let id = &meta.identification;
    let src = &meta.source;
    let scene_source = Node::group(
        "Scene_Source",
        vec![
            Node::value("IMAGING_DATE", &id.imaging_date),
            Node::value("IMAGING_TIME", &id.imaging_time),
            Node::value("MISSION", &id.mission),
            Node::value("MISSION_INDEX", opt(id.mission_index)),
            Node::value("INSTRUMENT", &id.instrument),
            Node::value("INSTRUMENT_INDEX", opt(id.instrument_index)),
            Node::value("SENSOR_CODE", &id.sensor_code),
            Node::value("SCENE_PROCESSING_LEVEL", &id.processing_level),
            Node::value("GRID_REFERENCE", &src.grid_reference),
            Node::value("SHIFT_VALUE", opt(src.shift_value)),
            Node::value("REVOLUTION_NUMBER", opt(src.revolution)),
            Node::value("COMPRESSION_FLAG", opt(src.compression_flag)),
            Node::value("PLAYBACK_FLAG", opt(src.playback_flag)),
            Node::value_with("INCIDENCE_ANGLE", opt(src.incidence_angle), "unit", "deg"),
            Node::value_with("VIEWING_ANGLE", opt(src.viewing_angle), "unit", "deg"),
            Node::value_with("SUN_AZIMUTH", opt(src.sun_azimuth), "unit", "deg"),
            Node::value_with("SUN_ELEVATION", opt(src.sun_elevation), "unit", "deg"),
        ],
    );
    vec![Node::group(
        "Source_Information",
        vec![
            Node::value("SOURCE_ID", &id.scene_id),
            Node::value("SOURCE_TYPE", "SCENE"),
            Node::value("SOURCE_DESCRIPTION", &id.dataset_name),
            scene_source,
        ],
    )]
}

fn coordinate_reference_system(_: &SceneMetadata) -> Vec<Node> {
    vec![
        Node::value_with("GEO_TABLES", "EPSG", "version", "5.0"),
        Node::group(
            "Horizontal_CS",
            vec![
                Node::value("HORIZONTAL_CS_TYPE", "GEOGRAPHIC"),
                Node::value("HORIZONTAL_CS_CODE", "epsg:4326"),
                Node::value("HORIZONTAL_CS_NAME", "WGS 84"),
            ],
        ),
    ]
}

fn raster_cs(_: &SceneMetadata) -> Vec<Node> {
    vec![Node::value("RASTER_CS_TYPE", "CELL"), Node::value("PIXEL_ORIGIN", 1)]
}

fn geoposition(meta: &SceneMetadata) -> Vec<Node> {
    let points = meta
        .frame
        .vertices
        .iter()
        .chain(std::iter::once(&meta.frame.center))
        .map(|v| {
            Node::group(
                "Tie_Point",
                vec![
                    Node::value("TIE_POINT_CRS_X", opt(v.longitude)),
                    Node::value("TIE_POINT_CRS_Y", opt(v.latitude)),
                    Node::value("TIE_POINT_DATA_X", opt(v.column)),
                    Node::value("TIE_POINT_DATA_Y", opt(v.row)),
                ],
            )
        })
        .collect();
    vec![Node::group("Geoposition_Points", points)]
}

fn production(meta: &SceneMetadata) -> Vec<Node> {
    let p = &meta.production;
    vec![
        Node::value("DATASET_PRODUCER_NAME", &p.producer),
        Node::value("DATASET_PRODUCTION_DATE", &p.production_date),
        Node::value("JOB_ID", &p.job_id),
        Node::value("PRODUCT_INFO", &p.product_description),
        Node::group(
            "Production_Facility",
            vec![
                Node::value("VOLUME_ID", &p.volume_id),
                Node::value("VOLUME_CREATION_DATE", &p.volume_creation_date),
            ],
        ),
    ]
}

fn raster_dimensions(meta: &SceneMetadata) -> Vec<Node> {
    vec![
        Node::value("NCOLS", meta.raster.columns),
        Node::value("NROWS", meta.raster.rows),
        Node::value("NBANDS", meta.raster.bands),
    ]
}

fn raster_encoding(meta: &SceneMetadata) -> Vec<Node> {
    vec![
        Node::value("NBITS", meta.raster.nbits),
        Node::value("DATA_TYPE", "UNSIGNED"),
        Node::value("BYTEORDER", meta.raster.byte_order.dimap_code()),
        Node::value("BANDS_LAYOUT", "BIL"),
        Node::value("SKIPBYTES", meta.raster.skip_bytes),
    ]
}

fn data_processing(meta: &SceneMetadata) -> Vec<Node> {
    vec![
        Node::value("PROCESSING_LEVEL", &meta.identification.processing_level),
        Node::value("GEOMETRIC_PROCESSING", "RAW"),
        Node::value("RADIOMETRIC_PROCESSING", "NONE"),
    ]
}

fn data_access(meta: &SceneMetadata) -> Vec<Node> {
    vec![
        Node::value("DATA_FILE_ORGANISATION", "BAND_COMPOSITE"),
        Node::value("DATA_FILE_FORMAT", &meta.raster.data_format),
        Node::group(
            "Data_File",
            vec![Node::value_with("DATA_FILE_PATH", "", "href", &meta.raster.data_file)],
        ),
    ]
}

fn image_display(meta: &SceneMetadata) -> Vec<Node> {
    vec![Node::group(
        "Band_Display_Order",
        vec![
            Node::value("RED_CHANNEL", meta.display.red),
            Node::value("GREEN_CHANNEL", meta.display.green),
            Node::value("BLUE_CHANNEL", meta.display.blue),
        ],
    )]
}

fn image_interpretation(meta: &SceneMetadata) -> Vec<Node> {
    meta.bands
        .iter()
        .map(|band| {
            let cal = &band.calibration;
            Node::group(
                "Spectral_Band_Info",
                vec![
                    Node::value("BAND_INDEX", band.index),
                    Node::value("BAND_DESCRIPTION", &band.description),
                    Node::value("PHYSICAL_GAIN", opt(cal.gain)),
                    Node::value("PHYSICAL_BIAS", opt(cal.bias)),
                    Node::value("PHYSICAL_UNIT", codes::unit("gain")),
                    Node::value_with("SOLAR_IRRADIANCE", opt(cal.solar_irradiance), "unit", &codes::unit("irradiance")),
                ],
            )
        })
        .collect()
}

fn attitude_angles(name: &str, samples: &[AttitudeAngles]) -> Node {
    let angles = samples
        .iter()
        .map(|a| {
            Node::group(
                "Angles",
                vec![
                    Node::value("LINE", a.line),
                    Node::value("TIME", opt(a.time.as_deref())),
                    Node::value_with("YAW", a.yaw, "unit", "rad"),
                    Node::value_with("PITCH", a.pitch, "unit", "rad"),
                    Node::value_with("ROLL", a.roll, "unit", "rad"),
                ],
            )
        })
        .collect();
    Node::group(name, vec![Node::group("Angles_List", angles)])
}

fn xyz(name: &str, v: &[f64; 3]) -> Node {
    Node::group(name, vec![Node::value("X", v[0]), Node::value("Y", v[1]), Node::value("Z", v[2])])
}

fn ephemeris(eph: &Ephemeris) -> Node {
    let points = eph
        .points
        .iter()
        .map(|p| {
            Node::group(
                "Point",
                vec![xyz("Location", &p.position), xyz("Velocity", &p.velocity), Node::value("TIME", &p.time)],
            )
        })
        .collect();
    Node::group(
        "Ephemeris",
        vec![
            Node::value_with("SATELLITE_ALTITUDE", opt(eph.satellite_altitude), "unit", "m"),
            Node::group("Points", points),
        ],
    )
}

fn sensor_configuration(sensor: &SensorConfiguration) -> Node {
    let look_angles = sensor
        .look_angles
        .iter()
        .map(|l| {
            Node::group(
                "Instrument_Look_Angles",
                vec![
                    Node::value("BAND_INDEX", l.band_index),
                    Node::value("PSI_X_FIRST", l.psi_x_first),
                    Node::value("PSI_X_LAST", l.psi_x_last),
                    Node::value("PSI_Y_FIRST", l.psi_y_first),
                    Node::value("PSI_Y_LAST", l.psi_y_last),
                ],
            )
        })
        .collect();
    Node::group(
        "Sensor_Configuration",
        vec![
            Node::group(
                "Time_Stamp",
                vec![
                    Node::value_with("LINE_PERIOD", opt(sensor.line_period), "unit", "s"),
                    Node::value("SCENE_CENTER_TIME", opt(sensor.scene_center_time.as_deref())),
                    Node::value("SCENE_CENTER_LINE", opt(sensor.scene_center_line)),
                ],
            ),
            Node::group("Instrument_Look_Angles_List", look_angles),
            Node::value("PIXEL_SIZE", opt(sensor.pixel_size)),
            Node::value("MIRROR_STEP", opt(sensor.mirror_step)),
            Node::value("DETECTOR_COUNT", opt(sensor.detector_count)),
        ],
    )
}

fn band_calibration(band: &BandMetadata) -> Node {
    let cal = &band.calibration;
    let mut children = vec![Node::value("BAND_INDEX", band.index)];
    for (i, table) in cal.gain_tables.iter().enumerate() {
        children.push(Node::group(
            "Gain_Section",
            vec![Node::value("GAIN_NUMBER", i + 1), Node::value("GAIN_VALUES", joined(table))],
        ));
    }
    for (i, table) in cal.dark_current_tables.iter().enumerate() {
        children.push(Node::group(
            "Dark_Current_Section",
            vec![Node::value("DARK_CURRENT_NUMBER", i + 1), Node::value("DARK_CURRENT_VALUES", joined(table))],
        ));
    }
    children.push(Node::group(
        "Spectral_Sensitivities",
        vec![
            Node::value_with(
                "FIRST_WAVELENGTH_VALUE",
                opt(cal.spectral.first_wavelength),
                "unit",
                &codes::unit("wavelength"),
            ),
            Node::value("WAVELENGTH_STEP", opt(cal.spectral.step)),
            Node::value("SPECTRAL_SENSITIVITY_VALUES", joined(&cal.spectral.values)),
        ],
    ));
    Node::group("Band_Parameters", children)
}

fn band_histograms(bands: &[BandMetadata]) -> Node {
    let histograms = bands
        .iter()
        .filter_map(|band| {
            band.histogram.as_ref().map(|h| {
                Node::group(
                    "Band_Histogram",
                    vec![
                        Node::value("BAND_INDEX", band.index),
                        Node::value("MEAN", opt(h.mean)),
                        Node::value("STDV", opt(h.std_dev)),
                        Node::value("BIN_VALUES", joined(&h.bins)),
                    ],
                )
            })
        })
        .collect();
    Node::group("Histograms", histograms)
}

/// One group per band that has bad lines; clean bands get none
fn bad_lines(bands: &[BandMetadata]) -> Vec<Node> {
    bands
        .iter()
        .filter(|band| band.has_bad_lines())
        .map(|band| {
            let mut children = vec![
                Node::value("BAND_INDEX", band.index),
                Node::value("LOST_LINES", band.lost_lines),
                Node::value("DEGRADED_LINES", band.degraded_lines),
            ];
            children.extend(band.bad_lines.iter().map(|b| {
                Node::group(
                    "Bad_Line",
                    vec![Node::value("LINE_INDEX", b.line), Node::value("BL_TYPE", b.status.name())],
                )
            }));
            Node::group("Bad_Lines", children)
        })
        .collect()
}

fn data_strip(meta: &SceneMetadata) -> Vec<Node> {
    let mut nodes = vec![
        Node::group(
            "Data_Strip_Identification",
            vec![Node::value("DATA_STRIP_ID", &meta.identification.scene_id)],
        ),
        ephemeris(&meta.ephemeris),
        Node::group(
            "Satellite_Attitudes",
            vec![
                attitude_angles("Raw_Attitudes", &meta.attitude.coarse),
                attitude_angles("Corrected_Attitudes", &meta.attitude.fine),
            ],
        ),
        sensor_configuration(&meta.sensor),
        Node::group("Sensor_Calibration", meta.bands.iter().map(band_calibration).collect()),
        band_histograms(&meta.bands),
    ];
    nodes.extend(bad_lines(&meta.bands));
    nodes
}

/// Builds the document tree of a scene
pub fn build_document(meta: &SceneMetadata) -> Node {
    let groups = SCHEMA_ORDER
        .iter()
        .map(|(name, builder)| Node::group(name, builder(meta)))
        .collect();
    Node::group(ROOT, groups)
}

/// Document tree of a newly created image
pub fn skeleton_document(raster: &RasterDescription) -> Node {
    build_document(&SceneMetadata::skeleton(raster.clone()))
}

/// Renders a document tree and writes it to `path`
///
/// A failing write leaves whatever was written on disk.
pub fn write_document(path: &Path, root: &Node) -> SpotResult<()> {
    let bytes = render_document(root)?;
    debug!("Writing {} bytes of markup to {}", bytes.len(), path.display());
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    file.flush()?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap::bad_lines::{BadLine, LineStatus};
    use crate::container::types::ImageSpec;
    use crate::io::byte_order::ByteOrder;

    fn skeleton() -> SceneMetadata {
        let spec = ImageSpec::new(100, 200, 3, 1).with_byte_order(ByteOrder::BigEndian);
        SceneMetadata::skeleton(RasterDescription::from_spec(&spec, "IMAGERY.BIL"))
    }

    #[test]
    fn test_groups_follow_schema_order() {
        let root = build_document(&skeleton());
        let names: Vec<&str> = root.children().iter().map(|n| n.name()).collect();
        let expected: Vec<&str> = SCHEMA_ORDER.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, expected);
        assert_eq!(names.len(), 15);
    }

    #[test]
    fn test_skeleton_raster_keys() {
        let root = build_document(&skeleton());
        let dims = root.child("Raster_Dimensions").unwrap();
        assert_eq!(dims.child("NCOLS").and_then(Node::text), Some("200"));
        assert_eq!(dims.child("NROWS").and_then(Node::text), Some("100"));
        assert_eq!(dims.child("NBANDS").and_then(Node::text), Some("3"));
        let encoding = root.child("Raster_Encoding").unwrap();
        assert_eq!(encoding.child("BYTEORDER").and_then(Node::text), Some("M"));
        // empty values stay present
        let center = root.child("Dataset_Frame").and_then(|f| f.child("Scene_Center")).unwrap();
        assert_eq!(center.child("FRAME_LAT").and_then(Node::text), Some(""));
    }

    #[test]
    fn test_bad_lines_only_for_affected_bands() {
        let mut meta = skeleton();
        meta.bands[1].bad_lines = vec![BadLine { line: 5, status: LineStatus::Lost }];
        let root = build_document(&meta);
        let strip = root.child("Data_Strip").unwrap();
        let groups: Vec<&Node> = strip.children().iter().filter(|n| n.name() == "Bad_Lines").collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].child("BAND_INDEX").and_then(Node::text), Some("2"));
        let line = groups[0].child("Bad_Line").unwrap();
        assert_eq!(line.child("LINE_INDEX").and_then(Node::text), Some("5"));
        assert_eq!(line.child("BL_TYPE").and_then(Node::text), Some("LOST"));
    }

    #[test]
    fn test_write_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DOCUMENT_FILE);
        write_document(&path, &build_document(&skeleton())).unwrap();
        let text: String = std::fs::read(&path).unwrap().into_iter().map(char::from).collect();
        assert!(text.contains("<DATA_FILE_PATH href=\"IMAGERY.BIL\"/>"));
        assert!(text.contains("<NBANDS>3</NBANDS>"));
    }
}
