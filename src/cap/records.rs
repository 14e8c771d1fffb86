//! Record decoding for the CAP container
//!
//! Reads the framed records of the volume directory, leader, imagery
//! descriptor and trailer files and turns them into typed values through
//! the schemas of [`crate::cap::layout`]. Every read seeks to an absolute
//! offset; the record header is checked before the body is decoded.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, warn};

use crate::cap::bad_lines::BadLineScan;
use crate::cap::calibration::{decode_calibration, CalibrationRecord};
use crate::cap::constants::{framing, lengths, limits};
use crate::cap::layout::*;
use crate::cap::region::{LeaderLayout, RecordLayout};
use crate::codec::FieldPolicy;
use crate::errors::{SpotError, SpotResult};
use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;

/// Gets the size of a stream, restoring its position
pub fn stream_length(reader: &mut dyn SeekableReader) -> SpotResult<u64> {
    let position = reader.stream_position()?;
    let size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(position))?;
    Ok(size)
}

/// Checks the 12-byte header of the record at `offset`
///
/// The reader is left positioned right after the header.
pub(crate) fn check_record_header(
    reader: &mut dyn SeekableReader,
    file: &str,
    number: u32,
    offset: u64,
    length: u64,
    sync: [u8; 4],
) -> SpotResult<()> {
    reader.seek(SeekFrom::Start(offset))?;
    let sequence = reader.read_u32::<BigEndian>()?;
    let mut found_sync = [0u8; 4];
    reader.read_exact(&mut found_sync)?;
    let found_length = u64::from(reader.read_u32::<BigEndian>()?);

    if found_sync != sync {
        return Err(SpotError::SyncMismatch { file: file.to_string(), record: number });
    }
    if found_length != length {
        return Err(SpotError::RecordLengthMismatch {
            file: file.to_string(),
            record: number,
            expected: length,
            found: found_length,
        });
    }
    if sequence != number {
        return Err(SpotError::InconsistentLayout(format!(
            "{} record at offset {} carries sequence number {}, expected {}",
            file, offset, sequence, number
        )));
    }
    Ok(())
}

/// Reads a whole framed record, header included
pub(crate) fn read_record(
    reader: &mut dyn SeekableReader,
    file: &str,
    number: u32,
    offset: u64,
    length: u64,
) -> SpotResult<Vec<u8>> {
    check_record_header(reader, file, number, offset, length, framing::RECORD_SYNC)?;
    let mut record = vec![0u8; length as usize];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut record)?;
    Ok(record)
}

fn to_u32(value: i64, record: &str, field: &str) -> SpotResult<u32> {
    u32::try_from(value).map_err(|_| {
        SpotError::InconsistentLayout(format!("{}.{} out of range: {}", record, field, value))
    })
}

/// Entry of the volume directory naming one file of the container
#[derive(Debug, Clone, PartialEq)]
pub struct FilePointer {
    pub file_number: u32,
    pub file_name: String,
    pub record_count: u64,
    pub record_length: u64,
    pub file_size: u64,
}

/// Decoded volume directory file
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDirectory {
    pub volume_id: String,
    pub creation_date: String,
    pub product_description: String,
    pub pointers: Vec<FilePointer>,
}

impl VolumeDirectory {
    /// Pointer to the file whose name matches `name` (case-insensitive)
    pub fn pointer_for(&self, name: &str) -> Option<&FilePointer> {
        self.pointers.iter().find(|p| p.file_name.eq_ignore_ascii_case(name))
    }
}

/// Leader file descriptor record
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderDescriptor {
    pub record_count: u32,
    pub record_length: u64,
    pub calibration_count: u32,
    pub calibration_length: u64,
    pub histogram_count: u32,
    pub histogram_length: u64,
}

/// One scene vertex; all members are optional scalars
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneVertex {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub row: Option<i64>,
    pub column: Option<i64>,
}

/// Scene header record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneHeader {
    pub scene_id: String,
    pub mission_index: Option<i64>,
    pub instrument: String,
    pub instrument_index: Option<i64>,
    pub spectral_mode: String,
    pub processing_level: String,
    /// `YYYYMMDD`
    pub acquisition_date: String,
    /// `HH:MM:SS`
    pub acquisition_time: String,
    pub center: SceneVertex,
    /// Upper left, upper right, lower left, lower right
    pub corners: [SceneVertex; 4],
    pub orientation: Option<f64>,
    pub grid_k: Option<i64>,
    pub grid_j: Option<i64>,
    pub shift_value: Option<i64>,
    pub revolution: Option<i64>,
    pub compression_flag: Option<i64>,
    pub playback_flag: Option<i64>,
    pub band_count: u32,
    pub line_count: u32,
    pub column_count: u32,
    pub sun_azimuth: Option<f64>,
    pub sun_elevation: Option<f64>,
    pub incidence_angle: Option<f64>,
    pub viewing_angle: Option<f64>,
    pub production_date: String,
    pub producer: String,
    pub job_id: String,
}

/// Satellite position and velocity sample (kilometers, km/s)
#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisPoint {
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
    pub day: i64,
    pub seconds: f64,
}

/// Attitude sample in degrees at an image line
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeSample {
    pub line: i64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Ephemeris and attitude record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EphemerisRecord {
    pub center_day: Option<i64>,
    pub center_seconds: Option<f64>,
    /// Line sampling period in milliseconds
    pub line_period_ms: Option<f64>,
    pub center_line: Option<i64>,
    pub points: Vec<EphemerisPoint>,
    pub coarse_attitude: Vec<AttitudeSample>,
    pub fine_attitude: Vec<AttitudeSample>,
}

/// Detector look angles of one band (radians)
#[derive(Debug, Clone, PartialEq)]
pub struct LookAngles {
    pub psi_x_first: f64,
    pub psi_x_last: f64,
    pub psi_y_first: f64,
    pub psi_y_last: f64,
}

/// Geometric modelization record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modelization {
    pub look_angles: Vec<LookAngles>,
    pub pixel_size: Option<f64>,
    pub mirror_step: Option<i64>,
    pub satellite_altitude_km: Option<f64>,
    pub detector_count: Option<i64>,
}

/// Histogram record of one band
#[derive(Debug, Clone, PartialEq)]
pub struct BandHistogram {
    pub band_index: u32,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub bins: Vec<u32>,
}

impl BandHistogram {
    /// Histogram of a band with every bin at zero
    pub fn empty(band_index: u32) -> Self {
        BandHistogram { band_index, mean: None, std_dev: None, bins: vec![0; limits::HISTOGRAM_BINS] }
    }

    /// Builds a histogram record from accumulated counts
    pub fn from_counts(band_index: u32, counts: &[u64]) -> Self {
        let total: u64 = counts.iter().sum();
        let (mean, std_dev) = if total == 0 {
            (None, None)
        } else {
            let n = total as f64;
            let mean = counts.iter().enumerate().map(|(v, c)| v as f64 * *c as f64).sum::<f64>() / n;
            let var = counts
                .iter()
                .enumerate()
                .map(|(v, c)| (v as f64 - mean).powi(2) * *c as f64)
                .sum::<f64>()
                / n;
            (Some(mean), Some(var.sqrt()))
        };
        let bins = counts.iter().map(|c| u32::try_from(*c).unwrap_or(u32::MAX)).collect();
        BandHistogram { band_index, mean, std_dev, bins }
    }
}

/// Every record of the leader file
#[derive(Debug, Clone, PartialEq)]
pub struct Leader {
    pub descriptor: LeaderDescriptor,
    pub scene: SceneHeader,
    pub ephemeris: EphemerisRecord,
    pub calibrations: Vec<CalibrationRecord>,
    pub modelization: Modelization,
    pub histograms: Vec<BandHistogram>,
}

impl Leader {
    /// Absolute layout of the records of this leader
    pub fn layout(&self) -> LeaderLayout {
        LeaderLayout { bands: self.scene.band_count, calibration_length: self.descriptor.calibration_length }
    }
}

/// Imagery file descriptor record
#[derive(Debug, Clone, PartialEq)]
pub struct ImageryDescriptor {
    pub line_count: u32,
    pub column_count: u32,
    pub band_count: u32,
    pub sample_bytes: u32,
    pub byte_order: ByteOrder,
    pub record_length: u64,
    pub prefix_length: u64,
    pub suffix_length: u64,
    pub records_written: Option<i64>,
    pub interleaving: String,
}

impl ImageryDescriptor {
    /// Record layout of the imagery file, checked against the advertised length
    pub fn record_layout(&self) -> SpotResult<RecordLayout> {
        let layout = RecordLayout {
            header_length: lengths::DIRECTORY_RECORD,
            prefix_length: self.prefix_length,
            suffix_length: self.suffix_length,
            lines: self.line_count,
            columns: self.column_count,
            channels: self.band_count,
            sample_bytes: self.sample_bytes,
        };
        layout.validate_record_length(self.record_length)?;
        Ok(layout)
    }
}

/// Lost and degraded line counts of one band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandQuality {
    pub lost_lines: u32,
    pub degraded_lines: u32,
}

/// Trailer record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailerSummary {
    pub bands: Vec<BandQuality>,
}

/// Everything decoded from an early-family container
#[derive(Debug, Clone)]
pub struct CapScene {
    pub volume: VolumeDirectory,
    pub leader: Leader,
    pub imagery: ImageryDescriptor,
    pub trailer: TrailerSummary,
    pub bad_lines: BadLineScan,
    /// File name of the imagery file as found in the container
    pub imagery_file: String,
}

/// Decodes CAP records under a field policy
#[derive(Debug, Clone, Copy, Default)]
pub struct CapDecoder {
    policy: FieldPolicy,
}

impl CapDecoder {
    /// Create a decoder
    ///
    /// # Arguments
    /// * `policy` - How blank required fields are resolved
    pub fn new(policy: FieldPolicy) -> Self {
        CapDecoder { policy }
    }

    pub fn policy(&self) -> FieldPolicy {
        self.policy
    }

    /// Decodes the volume directory file
    pub fn decode_volume_directory(&self, reader: &mut dyn SeekableReader) -> SpotResult<VolumeDirectory> {
        let file = "volume directory";
        let len = lengths::DIRECTORY_RECORD;
        let record = read_record(reader, file, 1, 0, len)?;
        let desc = VOLUME_DESCRIPTOR.decode(&record)?;
        let pointer_count = desc.count("pointer_count")?;
        let text_count = desc.count("text_record_count")?;

        let expected_size = u64::from(1 + pointer_count + text_count) * len;
        let actual_size = stream_length(reader)?;
        if actual_size != expected_size {
            return Err(SpotError::InconsistentLayout(format!(
                "volume directory announces {} records ({} bytes) but is {} bytes long",
                1 + pointer_count + text_count,
                expected_size,
                actual_size
            )));
        }

        let mut pointers = Vec::with_capacity(pointer_count as usize);
        for i in 0..pointer_count {
            let number = 2 + i;
            let record = read_record(reader, file, number, u64::from(number - 1) * len, len)?;
            let f = FILE_POINTER.decode(&record)?;
            let advertised = f.int("file_size", FieldPolicy::Strict)?;
            let file_size = u64::try_from(advertised).map_err(|_| {
                SpotError::InconsistentLayout(format!(
                    "file pointer {} advertises a size of {} bytes",
                    number, advertised
                ))
            })?;
            pointers.push(FilePointer {
                file_number: f.count("file_number")?,
                file_name: f.text("file_name"),
                record_count: u64::from(f.count("record_count")?),
                record_length: u64::from(f.count("record_length")?),
                file_size,
            });
        }

        let mut product_description = String::new();
        if text_count > 0 {
            let number = 2 + pointer_count;
            let record = read_record(reader, file, number, u64::from(number - 1) * len, len)?;
            product_description = TEXT_RECORD.decode(&record)?.text("product_description");
        }

        debug!("Volume directory lists {} files", pointers.len());
        Ok(VolumeDirectory {
            volume_id: desc.text("volume_id"),
            creation_date: desc.text("creation_date"),
            product_description,
            pointers,
        })
    }

    /// Checks the null volume descriptor
    pub fn check_null_volume(&self, reader: &mut dyn SeekableReader) -> SpotResult<()> {
        read_record(reader, "null volume", 1, 0, lengths::DIRECTORY_RECORD)?;
        Ok(())
    }

    /// Decodes the leader descriptor record
    pub fn decode_leader_descriptor(&self, record: &[u8]) -> SpotResult<LeaderDescriptor> {
        let f = LEADER_DESCRIPTOR.decode(record)?;
        let descriptor = LeaderDescriptor {
            record_count: f.count("record_count")?,
            record_length: u64::from(f.count("record_length")?),
            calibration_count: f.count("calibration_count")?,
            calibration_length: u64::from(f.count("calibration_length")?),
            histogram_count: f.count("histogram_count")?,
            histogram_length: u64::from(f.count("histogram_length")?),
        };
        if descriptor.record_length != lengths::LEADER_RECORD
            || descriptor.histogram_length != lengths::HISTOGRAM_RECORD
        {
            return Err(SpotError::InconsistentLayout(format!(
                "leader record lengths {}/{} differ from {}/{}",
                descriptor.record_length,
                descriptor.histogram_length,
                lengths::LEADER_RECORD,
                lengths::HISTOGRAM_RECORD
            )));
        }
        Ok(descriptor)
    }

    fn decode_vertex(&self, f: &RecordFields) -> SceneVertex {
        SceneVertex {
            latitude: self.policy.optional(f.opt_float("latitude")),
            longitude: self.policy.optional(f.opt_float("longitude")),
            row: self.policy.optional(f.opt_int("row")),
            column: self.policy.optional(f.opt_int("column")),
        }
    }

    /// Decodes the scene header record
    pub fn decode_scene_header(&self, record: &[u8]) -> SpotResult<SceneHeader> {
        let f = SCENE_HEADER.decode(record)?;
        let vertices = SCENE_VERTEX.decode_repeated(record, SCENE_VERTEX_BASE, SCENE_VERTEX_STRIDE, 5)?;
        let p = self.policy;

        let band_count = f.count("band_count")?;
        if band_count == 0 || band_count > limits::MAX_BANDS {
            return Err(SpotError::InconsistentLayout(format!("scene header declares {} bands", band_count)));
        }

        Ok(SceneHeader {
            scene_id: f.text("scene_id"),
            mission_index: p.optional(f.opt_int("mission_index")),
            instrument: f.text("instrument"),
            instrument_index: p.optional(f.opt_int("instrument_index")),
            spectral_mode: f.text("spectral_mode"),
            processing_level: f.text("processing_level"),
            acquisition_date: f.text("acquisition_date"),
            acquisition_time: f.text("acquisition_time"),
            center: self.decode_vertex(&vertices[0]),
            corners: [
                self.decode_vertex(&vertices[1]),
                self.decode_vertex(&vertices[2]),
                self.decode_vertex(&vertices[3]),
                self.decode_vertex(&vertices[4]),
            ],
            orientation: p.optional(f.opt_float("orientation")),
            grid_k: p.optional(f.opt_int("grid_k")),
            grid_j: p.optional(f.opt_int("grid_j")),
            shift_value: p.optional(f.opt_int("shift_value")),
            revolution: p.optional(f.opt_int("revolution")),
            compression_flag: p.optional(f.opt_int("compression_flag")),
            playback_flag: p.optional(f.opt_int("playback_flag")),
            band_count,
            line_count: f.count("line_count")?,
            column_count: f.count("column_count")?,
            sun_azimuth: p.optional(f.opt_float("sun_azimuth")),
            sun_elevation: p.optional(f.opt_float("sun_elevation")),
            incidence_angle: p.optional(f.opt_float("incidence_angle")),
            viewing_angle: p.optional(f.opt_float("viewing_angle")),
            production_date: f.text("production_date"),
            producer: f.text("producer"),
            job_id: f.text("job_id"),
        })
    }

    fn decode_attitude(&self, record: &[u8], base: usize, count: usize) -> SpotResult<Vec<AttitudeSample>> {
        ATTITUDE_SAMPLE
            .decode_repeated(record, base, ATTITUDE_STRIDE, count)?
            .iter()
            .map(|s| {
                Ok(AttitudeSample {
                    line: s.int("line", self.policy)?,
                    yaw: s.float("yaw", self.policy)?,
                    pitch: s.float("pitch", self.policy)?,
                    roll: s.float("roll", self.policy)?,
                })
            })
            .collect()
    }

    /// Decodes the ephemeris and attitude record
    ///
    /// Table sizes come from the counts stored in the record; a count above
    /// the capacity of the record is an inconsistent layout.
    pub fn decode_ephemeris_attitude(&self, record: &[u8]) -> SpotResult<EphemerisRecord> {
        let f = EPHEMERIS_HEADER.decode(record)?;
        let point_count = f.count("ephemeris_count")? as usize;
        let coarse_count = f.count("coarse_attitude_count")? as usize;
        let fine_count = f.count("fine_attitude_count")? as usize;
        if point_count > limits::MAX_EPHEMERIS_POINTS
            || coarse_count > limits::MAX_COARSE_ATTITUDE
            || fine_count > limits::MAX_FINE_ATTITUDE
        {
            return Err(SpotError::InconsistentLayout(format!(
                "ephemeris record announces {} points, {} coarse and {} fine attitude samples",
                point_count, coarse_count, fine_count
            )));
        }

        let points = EPHEMERIS_POINT
            .decode_repeated(record, EPHEMERIS_POINT_BASE, EPHEMERIS_POINT_STRIDE, point_count)?
            .iter()
            .map(|e| {
                let p = self.policy;
                Ok(EphemerisPoint {
                    position_km: [e.float("x", p)?, e.float("y", p)?, e.float("z", p)?],
                    velocity_km_s: [e.float("vx", p)?, e.float("vy", p)?, e.float("vz", p)?],
                    day: e.int("day", p)?,
                    seconds: e.float("seconds", p)?,
                })
            })
            .collect::<SpotResult<Vec<_>>>()?;

        Ok(EphemerisRecord {
            center_day: self.policy.optional(f.opt_int("center_day")),
            center_seconds: self.policy.optional(f.opt_float("center_seconds")),
            line_period_ms: self.policy.optional(f.opt_float("line_period")),
            center_line: self.policy.optional(f.opt_int("center_line")),
            points,
            coarse_attitude: self.decode_attitude(record, COARSE_ATTITUDE_BASE, coarse_count)?,
            fine_attitude: self.decode_attitude(record, FINE_ATTITUDE_BASE, fine_count)?,
        })
    }

    /// Decodes the modelization record
    pub fn decode_modelization(&self, record: &[u8]) -> SpotResult<Modelization> {
        let f = MODELIZATION.decode(record)?;
        let band_count = f.count("look_band_count")? as usize;
        if band_count > limits::MAX_LOOK_ANGLE_BANDS {
            return Err(SpotError::InconsistentLayout(format!(
                "modelization record announces look angles for {} bands",
                band_count
            )));
        }
        let p = self.policy;
        let look_angles = LOOK_ANGLES
            .decode_repeated(record, LOOK_ANGLES_BASE, LOOK_ANGLES_STRIDE, band_count)?
            .iter()
            .map(|a| {
                Ok(LookAngles {
                    psi_x_first: a.float("psi_x_first", p)?,
                    psi_x_last: a.float("psi_x_last", p)?,
                    psi_y_first: a.float("psi_y_first", p)?,
                    psi_y_last: a.float("psi_y_last", p)?,
                })
            })
            .collect::<SpotResult<Vec<_>>>()?;

        Ok(Modelization {
            look_angles,
            pixel_size: p.optional(f.opt_float("pixel_size")),
            mirror_step: p.optional(f.opt_int("mirror_step")),
            satellite_altitude_km: p.optional(f.opt_float("satellite_altitude")),
            detector_count: p.optional(f.opt_int("detector_count")),
        })
    }

    /// Decodes one histogram record
    pub fn decode_histogram(&self, record: &[u8]) -> SpotResult<BandHistogram> {
        let f = HISTOGRAM_HEADER.decode(record)?;
        let bins = HISTOGRAM_BIN
            .decode_repeated(record, HISTOGRAM_BIN_BASE, HISTOGRAM_BIN_STRIDE, limits::HISTOGRAM_BINS)?
            .iter()
            .map(|b| b.count("count"))
            .collect::<SpotResult<Vec<_>>>()?;
        Ok(BandHistogram {
            band_index: f.count("band_index")?,
            mean: self.policy.optional(f.opt_float("mean")),
            std_dev: self.policy.optional(f.opt_float("std_dev")),
            bins,
        })
    }

    /// Decodes the histogram record of every band
    pub fn decode_histograms(
        &self,
        reader: &mut dyn SeekableReader,
        layout: &LeaderLayout,
    ) -> SpotResult<Vec<BandHistogram>> {
        (1..=layout.bands)
            .map(|band| {
                let record = read_record(
                    reader,
                    "leader",
                    layout.histogram_record_number(band),
                    layout.histogram_offset(band),
                    lengths::HISTOGRAM_RECORD,
                )?;
                self.decode_histogram(&record)
            })
            .collect()
    }

    /// Decodes the whole leader file
    ///
    /// The band count of the scene header drives the number of calibration
    /// and histogram records; the descriptor must agree with it.
    pub fn decode_leader(&self, reader: &mut dyn SeekableReader) -> SpotResult<Leader> {
        let file = "leader";
        let len = lengths::LEADER_RECORD;
        let descriptor = self.decode_leader_descriptor(&read_record(reader, file, 1, 0, len)?)?;
        let scene = self.decode_scene_header(&read_record(reader, file, 2, len, len)?)?;

        let bands = scene.band_count;
        let layout = LeaderLayout { bands, calibration_length: descriptor.calibration_length };
        if descriptor.calibration_count != bands
            || descriptor.histogram_count != bands
            || descriptor.record_count != layout.record_count()
        {
            return Err(SpotError::InconsistentLayout(format!(
                "leader descriptor announces {} records, {} calibration and {} histogram records for {} bands",
                descriptor.record_count, descriptor.calibration_count, descriptor.histogram_count, bands
            )));
        }
        let actual = stream_length(reader)?;
        if actual != layout.file_length() {
            return Err(SpotError::InconsistentLayout(format!(
                "leader file is {} bytes, layout requires {}",
                actual,
                layout.file_length()
            )));
        }

        let ephemeris = self.decode_ephemeris_attitude(&read_record(reader, file, 3, layout.ephemeris_offset(), len)?)?;

        let mut calibrations = Vec::with_capacity(bands as usize);
        for band in 1..=bands {
            calibrations.push(decode_calibration(reader, &layout, band, self.policy)?);
        }

        let modelization = self.decode_modelization(&read_record(
            reader,
            file,
            layout.modelization_record_number(),
            layout.modelization_offset(),
            len,
        )?)?;

        let histograms = self.decode_histograms(reader, &layout)?;

        debug!(
            "Decoded leader: {} bands, {} ephemeris points, {} coarse attitude samples",
            bands,
            ephemeris.points.len(),
            ephemeris.coarse_attitude.len()
        );
        Ok(Leader { descriptor, scene, ephemeris, calibrations, modelization, histograms })
    }

    /// Decodes the imagery file descriptor
    pub fn decode_imagery_descriptor(&self, reader: &mut dyn SeekableReader) -> SpotResult<ImageryDescriptor> {
        let record = read_record(reader, "imagery", 1, 0, lengths::DIRECTORY_RECORD)?;
        let f = IMAGERY_DESCRIPTOR.decode(&record)?;

        let order_code = f.text("byte_order");
        let byte_order = ByteOrder::from_cap_code(&order_code).ok_or_else(|| {
            SpotError::InconsistentLayout(format!("unknown imagery byte order '{}'", order_code))
        })?;
        let sample_bytes = f.count("sample_bytes")?;
        if sample_bytes != 1 && sample_bytes != 2 {
            return Err(SpotError::Unsupported(format!("{}-byte samples", sample_bytes)));
        }
        let interleaving = f.text("interleaving");
        if !interleaving.is_empty() && interleaving != crate::cap::constants::imagery::INTERLEAVING {
            warn!("Imagery interleaving '{}' read as line-interleaved", interleaving);
        }

        Ok(ImageryDescriptor {
            line_count: f.count("line_count")?,
            column_count: f.count("column_count")?,
            band_count: f.count("band_count")?,
            sample_bytes,
            byte_order,
            record_length: u64::from(f.count("record_length")?),
            prefix_length: u64::from(f.count("prefix_length")?),
            suffix_length: u64::from(f.count("suffix_length")?),
            records_written: f.opt_int("records_written"),
            interleaving,
        })
    }

    /// Decodes the trailer record
    pub fn decode_trailer(&self, reader: &mut dyn SeekableReader) -> SpotResult<TrailerSummary> {
        let record = read_record(reader, "trailer", 1, 0, lengths::TRAILER_RECORD)?;
        let f = TRAILER.decode(&record)?;
        let band_count = f.count("band_count")? as usize;
        if band_count > limits::MAX_TRAILER_BANDS {
            return Err(SpotError::InconsistentLayout(format!("trailer lists {} bands", band_count)));
        }
        let bands = TRAILER_BAND
            .decode_repeated(&record, TRAILER_BAND_BASE, TRAILER_BAND_STRIDE, band_count)?
            .iter()
            .map(|b| {
                Ok(BandQuality {
                    lost_lines: to_u32(b.int("lost_lines", self.policy)?, "trailer", "lost_lines")?,
                    degraded_lines: to_u32(b.int("degraded_lines", self.policy)?, "trailer", "degraded_lines")?,
                })
            })
            .collect::<SpotResult<Vec<_>>>()?;
        Ok(TrailerSummary { bands })
    }
}

/// Checks that the leader and the imagery descriptor agree on the image
pub fn check_image_agreement(scene: &SceneHeader, imagery: &ImageryDescriptor) -> SpotResult<()> {
    if scene.band_count != imagery.band_count
        || scene.line_count != imagery.line_count
        || scene.column_count != imagery.column_count
    {
        return Err(SpotError::InconsistentLayout(format!(
            "leader describes {}x{}x{}, imagery descriptor {}x{}x{}",
            scene.line_count,
            scene.column_count,
            scene.band_count,
            imagery.line_count,
            imagery.column_count,
            imagery.band_count
        )));
    }
    Ok(())
}
