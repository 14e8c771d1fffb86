//! Scene metadata model
//!
//! Fully derived values ready for serialization: degrees, meters,
//! radians and calendar timestamps. Optional scalars stay `None` when the
//! source field was blank.

use crate::cap::bad_lines::BadLine;
use crate::cap::calibration::SpectralSensitivity;
use crate::container::types::ImageSpec;
use crate::io::byte_order::ByteOrder;

/// Identification of the scene and its acquisition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identification {
    pub scene_id: String,
    /// `SCENE <mission> <K>-<J> <YY/MM/DD> <HH:MM:SS> <instrument> <sensor>`
    pub dataset_name: String,
    pub mission: String,
    pub mission_index: Option<i64>,
    pub instrument: String,
    pub instrument_index: Option<i64>,
    pub sensor_code: String,
    pub spectral_mode: String,
    pub processing_level: String,
    /// `YYYY-MM-DD`, empty when unknown
    pub imaging_date: String,
    /// `HH:MM:SS`, empty when unknown
    pub imaging_time: String,
}

/// A geolocated pixel of the scene frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameVertex {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub row: Option<i64>,
    pub column: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneFrame {
    /// Upper left, upper right, lower right, lower left
    pub vertices: Vec<FrameVertex>,
    pub center: FrameVertex,
    /// Scene orientation in degrees
    pub orientation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceParameters {
    /// `KKK-JJJ`, empty when the grid location is unknown
    pub grid_reference: String,
    pub shift_value: Option<i64>,
    pub revolution: Option<i64>,
    pub compression_flag: Option<i64>,
    pub playback_flag: Option<i64>,
    pub sun_azimuth: Option<f64>,
    pub sun_elevation: Option<f64>,
    pub incidence_angle: Option<f64>,
    pub viewing_angle: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Production {
    pub producer: String,
    pub production_date: String,
    pub job_id: String,
    pub volume_id: String,
    pub volume_creation_date: String,
    pub product_description: String,
}

/// Raster dimensions and encoding
#[derive(Debug, Clone, PartialEq)]
pub struct RasterDescription {
    pub rows: u32,
    pub columns: u32,
    pub bands: u32,
    pub nbits: u32,
    pub byte_order: ByteOrder,
    pub skip_bytes: u64,
    /// Data file referenced from the document
    pub data_file: String,
    /// Data file format, e.g. `BIL` or `RAW`
    pub data_format: String,
}

impl RasterDescription {
    /// Description of a raw BIL raster for an image spec
    pub fn from_spec(spec: &ImageSpec, data_file: &str) -> Self {
        RasterDescription {
            rows: spec.lines,
            columns: spec.columns,
            bands: spec.bands,
            nbits: spec.nbits(),
            byte_order: spec.byte_order,
            skip_bytes: 0,
            data_file: data_file.to_string(),
            data_format: "BIL".to_string(),
        }
    }
}

/// Look angles of one band's detector array, in radians
#[derive(Debug, Clone, PartialEq)]
pub struct BandLookAngles {
    pub band_index: u32,
    pub psi_x_first: f64,
    pub psi_x_last: f64,
    pub psi_y_first: f64,
    pub psi_y_last: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorConfiguration {
    /// Line sampling period in seconds
    pub line_period: Option<f64>,
    pub scene_center_time: Option<String>,
    pub scene_center_line: Option<i64>,
    pub look_angles: Vec<BandLookAngles>,
    pub pixel_size: Option<f64>,
    pub mirror_step: Option<i64>,
    pub detector_count: Option<i64>,
}

/// Satellite state vector, meters and meters per second
#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisSample {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ephemeris {
    /// Nominal satellite altitude in meters
    pub satellite_altitude: Option<f64>,
    pub points: Vec<EphemerisSample>,
}

/// Yaw, pitch and roll in radians at an image line
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeAngles {
    pub line: i64,
    /// Dated from the scene center time when both are known
    pub time: Option<String>,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attitude {
    pub coarse: Vec<AttitudeAngles>,
    pub fine: Vec<AttitudeAngles>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandCalibration {
    pub gain: Option<f64>,
    pub bias: Option<f64>,
    pub solar_irradiance: Option<f64>,
    pub spectral: SpectralSensitivity,
    /// One table per detector group
    pub gain_tables: Vec<Vec<f64>>,
    /// Dark current tables matching `gain_tables` by position
    pub dark_current_tables: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub bins: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandMetadata {
    /// Band number, 1-based
    pub index: u32,
    pub description: String,
    pub calibration: BandCalibration,
    pub histogram: Option<Histogram>,
    pub bad_lines: Vec<BadLine>,
    pub lost_lines: u32,
    pub degraded_lines: u32,
}

impl BandMetadata {
    pub fn has_bad_lines(&self) -> bool {
        !self.bad_lines.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayChannels {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

/// Everything known about one scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMetadata {
    pub identification: Identification,
    pub frame: SceneFrame,
    pub source: SourceParameters,
    pub production: Production,
    pub raster: RasterDescription,
    pub sensor: SensorConfiguration,
    pub ephemeris: Ephemeris,
    pub attitude: Attitude,
    pub bands: Vec<BandMetadata>,
    pub display: DisplayChannels,
}

impl SceneMetadata {
    /// Metadata of a newly created image: every group present, only the
    /// raster description and band numbering known
    pub fn skeleton(raster: RasterDescription) -> Self {
        let [red, green, blue] = crate::metadata::codes::display_channels("", raster.bands);
        let bands = (1..=raster.bands)
            .map(|index| BandMetadata { index, ..Default::default() })
            .collect();
        SceneMetadata {
            identification: Identification::default(),
            frame: SceneFrame { vertices: vec![FrameVertex::default(); 4], ..Default::default() },
            source: SourceParameters::default(),
            production: Production::default(),
            raster,
            sensor: SensorConfiguration::default(),
            ephemeris: Ephemeris::default(),
            attitude: Attitude::default(),
            bands,
            display: DisplayChannels { red, green, blue },
        }
    }
}
