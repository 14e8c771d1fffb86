//! CAP container encoder
//!
//! Writes the five files of an early-family container from typed records.
//! Every record is encoded through the same schemas the decoder uses.
//! The imagery file is written with framed, zero-filled data records so
//! that a freshly created container is readable before any pixel write.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder as _, WriteBytesExt};
use chrono::Utc;
use log::{debug, info};

use crate::cap::calibration::{encode_calibration, CalibrationRecord};
use crate::cap::constants::{files, framing, imagery, lengths, limits};
use crate::cap::layout::*;
use crate::cap::records::{
    BandHistogram, BandQuality, EphemerisRecord, ImageryDescriptor, Modelization, SceneHeader,
    SceneVertex, TrailerSummary,
};
use crate::cap::region::{LeaderLayout, RecordLayout};
use crate::codec::decimal_degrees_to_dms;
use crate::container::types::ImageSpec;
use crate::errors::{SpotError, SpotResult};
use crate::io::byte_order::ByteOrder;

/// Allocates a zeroed record with its 12-byte header filled in
pub(crate) fn new_record(number: u32, length: u64, sync: [u8; 4]) -> SpotResult<Vec<u8>> {
    if length < framing::HEADER_LENGTH as u64 {
        return Err(SpotError::GenericError(format!("record length {} shorter than its header", length)));
    }
    let length32 = u32::try_from(length)
        .map_err(|_| SpotError::GenericError(format!("record length {} too large", length)))?;
    let mut out = Vec::with_capacity(length as usize);
    out.write_u32::<BigEndian>(number)?;
    out.extend_from_slice(&sync);
    out.write_u32::<BigEndian>(length32)?;
    out.resize(length as usize, 0);
    Ok(out)
}

/// Encodes one imagery data record
///
/// # Arguments
/// * `layout` - Imagery record layout
/// * `line` - Line number, 1-based
/// * `channel` - Channel number, 1-based
/// * `status` - Line status byte (0 ok, 1 lost, other values degraded)
/// * `payload` - Pixel bytes, already in stored byte order
pub fn encode_imagery_record(
    layout: &RecordLayout,
    line: u32,
    channel: u32,
    status: u8,
    payload: &[u8],
) -> SpotResult<Vec<u8>> {
    if payload.len() as u64 != layout.payload_length() {
        return Err(SpotError::GenericError(format!(
            "imagery payload of {} bytes, record holds {}",
            payload.len(),
            layout.payload_length()
        )));
    }
    let number = u32::try_from(layout.record_index(line, channel) + 2)
        .map_err(|_| SpotError::GenericError("too many imagery records".to_string()))?;
    let mut out = new_record(number, layout.record_length(), framing::IMAGERY_SYNC)?;

    BigEndian::write_u32(&mut out[imagery::LINE_NUMBER_OFFSET..], line);
    BigEndian::write_u32(&mut out[imagery::CHANNEL_OFFSET..], channel);
    out[imagery::STATUS_OFFSET] = status;

    let start = layout.prefix_length as usize;
    out[start..start + payload.len()].copy_from_slice(payload);

    BigEndian::write_u32(&mut out[start + payload.len()..], layout.columns);
    Ok(out)
}

fn vertex_values(v: &SceneVertex) -> Vec<(&'static str, FieldValue)> {
    let angle = |value: Option<f64>, pos: char, neg: char| match value {
        Some(d) => FieldValue::Text(decimal_degrees_to_dms(d, pos, neg)),
        None => FieldValue::Absent,
    };
    vec![
        ("latitude", angle(v.latitude, 'N', 'S')),
        ("longitude", angle(v.longitude, 'E', 'W')),
        ("row", int_value(v.row)),
        ("column", int_value(v.column)),
    ]
}

/// Encodes the scene header record
pub fn encode_scene_header(scene: &SceneHeader) -> SpotResult<Vec<u8>> {
    let mut out = new_record(2, lengths::LEADER_RECORD, framing::RECORD_SYNC)?;
    SCENE_HEADER.blank_at(&mut out, 0)?;
    SCENE_HEADER.encode_at(
        &mut out,
        0,
        &[
            ("scene_id", text_value(&scene.scene_id)),
            ("mission_index", int_value(scene.mission_index)),
            ("instrument", text_value(&scene.instrument)),
            ("instrument_index", int_value(scene.instrument_index)),
            ("spectral_mode", text_value(&scene.spectral_mode)),
            ("processing_level", text_value(&scene.processing_level)),
            ("acquisition_date", text_value(&scene.acquisition_date)),
            ("acquisition_time", text_value(&scene.acquisition_time)),
            ("orientation", float_value(scene.orientation)),
            ("grid_k", int_value(scene.grid_k)),
            ("grid_j", int_value(scene.grid_j)),
            ("shift_value", int_value(scene.shift_value)),
            ("revolution", int_value(scene.revolution)),
            ("compression_flag", int_value(scene.compression_flag)),
            ("playback_flag", int_value(scene.playback_flag)),
            ("band_count", FieldValue::Int(i64::from(scene.band_count))),
            ("line_count", FieldValue::Int(i64::from(scene.line_count))),
            ("column_count", FieldValue::Int(i64::from(scene.column_count))),
            ("sun_azimuth", float_value(scene.sun_azimuth)),
            ("sun_elevation", float_value(scene.sun_elevation)),
            ("incidence_angle", float_value(scene.incidence_angle)),
            ("viewing_angle", float_value(scene.viewing_angle)),
            ("production_date", text_value(&scene.production_date)),
            ("producer", text_value(&scene.producer)),
            ("job_id", text_value(&scene.job_id)),
        ],
    )?;
    let vertices = std::iter::once(&scene.center).chain(scene.corners.iter());
    for (i, vertex) in vertices.enumerate() {
        let base = SCENE_VERTEX_BASE + i * SCENE_VERTEX_STRIDE;
        SCENE_VERTEX.blank_at(&mut out, base)?;
        SCENE_VERTEX.encode_at(&mut out, base, &vertex_values(vertex))?;
    }
    Ok(out)
}

/// Encodes the ephemeris and attitude record
pub fn encode_ephemeris(eph: &EphemerisRecord) -> SpotResult<Vec<u8>> {
    if eph.points.len() > limits::MAX_EPHEMERIS_POINTS
        || eph.coarse_attitude.len() > limits::MAX_COARSE_ATTITUDE
        || eph.fine_attitude.len() > limits::MAX_FINE_ATTITUDE
    {
        return Err(SpotError::GenericError("ephemeris tables exceed record capacity".to_string()));
    }
    let mut out = new_record(3, lengths::LEADER_RECORD, framing::RECORD_SYNC)?;
    EPHEMERIS_HEADER.blank_at(&mut out, 0)?;
    EPHEMERIS_HEADER.encode_at(
        &mut out,
        0,
        &[
            ("center_day", int_value(eph.center_day)),
            ("center_seconds", float_value(eph.center_seconds)),
            ("line_period", float_value(eph.line_period_ms)),
            ("center_line", int_value(eph.center_line)),
            ("ephemeris_count", FieldValue::Int(eph.points.len() as i64)),
            ("coarse_attitude_count", FieldValue::Int(eph.coarse_attitude.len() as i64)),
            ("fine_attitude_count", FieldValue::Int(eph.fine_attitude.len() as i64)),
        ],
    )?;
    for i in 0..limits::MAX_EPHEMERIS_POINTS {
        let base = EPHEMERIS_POINT_BASE + i * EPHEMERIS_POINT_STRIDE;
        EPHEMERIS_POINT.blank_at(&mut out, base)?;
        if let Some(p) = eph.points.get(i) {
            EPHEMERIS_POINT.encode_at(
                &mut out,
                base,
                &[
                    ("x", FieldValue::Float(p.position_km[0])),
                    ("y", FieldValue::Float(p.position_km[1])),
                    ("z", FieldValue::Float(p.position_km[2])),
                    ("vx", FieldValue::Float(p.velocity_km_s[0])),
                    ("vy", FieldValue::Float(p.velocity_km_s[1])),
                    ("vz", FieldValue::Float(p.velocity_km_s[2])),
                    ("day", FieldValue::Int(p.day)),
                    ("seconds", FieldValue::Float(p.seconds)),
                ],
            )?;
        }
    }
    let tables = [
        (COARSE_ATTITUDE_BASE, limits::MAX_COARSE_ATTITUDE, &eph.coarse_attitude),
        (FINE_ATTITUDE_BASE, limits::MAX_FINE_ATTITUDE, &eph.fine_attitude),
    ];
    for (first, capacity, samples) in tables {
        for i in 0..capacity {
            let base = first + i * ATTITUDE_STRIDE;
            ATTITUDE_SAMPLE.blank_at(&mut out, base)?;
            if let Some(s) = samples.get(i) {
                ATTITUDE_SAMPLE.encode_at(
                    &mut out,
                    base,
                    &[
                        ("line", FieldValue::Int(s.line)),
                        ("yaw", FieldValue::Float(s.yaw)),
                        ("pitch", FieldValue::Float(s.pitch)),
                        ("roll", FieldValue::Float(s.roll)),
                    ],
                )?;
            }
        }
    }
    Ok(out)
}

/// Encodes the modelization record
pub fn encode_modelization(model: &Modelization, layout: &LeaderLayout) -> SpotResult<Vec<u8>> {
    if model.look_angles.len() > limits::MAX_LOOK_ANGLE_BANDS {
        return Err(SpotError::GenericError("too many look angle bands".to_string()));
    }
    let mut out = new_record(layout.modelization_record_number(), lengths::LEADER_RECORD, framing::RECORD_SYNC)?;
    MODELIZATION.blank_at(&mut out, 0)?;
    MODELIZATION.encode_at(
        &mut out,
        0,
        &[
            ("look_band_count", FieldValue::Int(model.look_angles.len() as i64)),
            ("pixel_size", float_value(model.pixel_size)),
            ("mirror_step", int_value(model.mirror_step)),
            ("satellite_altitude", float_value(model.satellite_altitude_km)),
            ("detector_count", int_value(model.detector_count)),
        ],
    )?;
    for i in 0..limits::MAX_LOOK_ANGLE_BANDS {
        let base = LOOK_ANGLES_BASE + i * LOOK_ANGLES_STRIDE;
        LOOK_ANGLES.blank_at(&mut out, base)?;
        if let Some(a) = model.look_angles.get(i) {
            LOOK_ANGLES.encode_at(
                &mut out,
                base,
                &[
                    ("psi_x_first", FieldValue::Float(a.psi_x_first)),
                    ("psi_x_last", FieldValue::Float(a.psi_x_last)),
                    ("psi_y_first", FieldValue::Float(a.psi_y_first)),
                    ("psi_y_last", FieldValue::Float(a.psi_y_last)),
                ],
            )?;
        }
    }
    Ok(out)
}

/// Encodes the histogram record of one band
pub fn encode_histogram(histogram: &BandHistogram, layout: &LeaderLayout) -> SpotResult<Vec<u8>> {
    let number = layout.histogram_record_number(histogram.band_index);
    let mut out = new_record(number, lengths::HISTOGRAM_RECORD, framing::RECORD_SYNC)?;
    HISTOGRAM_HEADER.blank_at(&mut out, 0)?;
    HISTOGRAM_HEADER.encode_at(
        &mut out,
        0,
        &[
            ("band_index", FieldValue::Int(i64::from(histogram.band_index))),
            ("mean", float_value(histogram.mean)),
            ("std_dev", float_value(histogram.std_dev)),
        ],
    )?;
    for (i, count) in histogram.bins.iter().take(limits::HISTOGRAM_BINS).enumerate() {
        let base = HISTOGRAM_BIN_BASE + i * HISTOGRAM_BIN_STRIDE;
        HISTOGRAM_BIN.encode_at(&mut out, base, &[("count", FieldValue::Int(i64::from(*count)))])?;
    }
    Ok(out)
}

/// Encodes the leader descriptor record
pub fn encode_leader_descriptor(layout: &LeaderLayout) -> SpotResult<Vec<u8>> {
    let mut out = new_record(1, lengths::LEADER_RECORD, framing::RECORD_SYNC)?;
    LEADER_DESCRIPTOR.blank_at(&mut out, 0)?;
    LEADER_DESCRIPTOR.encode_at(
        &mut out,
        0,
        &[
            ("document_id", text_value(framing::DOCUMENT_ID)),
            ("file_name", text_value(files::LEADER)),
            ("record_count", FieldValue::Int(i64::from(layout.record_count()))),
            ("record_length", FieldValue::Int(lengths::LEADER_RECORD as i64)),
            ("calibration_count", FieldValue::Int(i64::from(layout.bands))),
            ("calibration_length", FieldValue::Int(layout.calibration_length as i64)),
            ("histogram_count", FieldValue::Int(i64::from(layout.bands))),
            ("histogram_length", FieldValue::Int(lengths::HISTOGRAM_RECORD as i64)),
        ],
    )?;
    Ok(out)
}

/// Encodes the imagery descriptor record
pub fn encode_imagery_descriptor(desc: &ImageryDescriptor) -> SpotResult<Vec<u8>> {
    let mut out = new_record(1, lengths::DIRECTORY_RECORD, framing::RECORD_SYNC)?;
    IMAGERY_DESCRIPTOR.blank_at(&mut out, 0)?;
    IMAGERY_DESCRIPTOR.encode_at(
        &mut out,
        0,
        &[
            ("document_id", text_value(framing::DOCUMENT_ID)),
            ("line_count", FieldValue::Int(i64::from(desc.line_count))),
            ("column_count", FieldValue::Int(i64::from(desc.column_count))),
            ("band_count", FieldValue::Int(i64::from(desc.band_count))),
            ("sample_bytes", FieldValue::Int(i64::from(desc.sample_bytes))),
            ("byte_order", text_value(desc.byte_order.cap_code())),
            ("record_length", FieldValue::Int(desc.record_length as i64)),
            ("prefix_length", FieldValue::Int(desc.prefix_length as i64)),
            ("suffix_length", FieldValue::Int(desc.suffix_length as i64)),
            ("records_written", int_value(desc.records_written)),
            ("interleaving", text_value(&desc.interleaving)),
        ],
    )?;
    Ok(out)
}

/// Encodes the trailer record
pub fn encode_trailer(trailer: &TrailerSummary) -> SpotResult<Vec<u8>> {
    if trailer.bands.len() > limits::MAX_TRAILER_BANDS {
        return Err(SpotError::GenericError("too many trailer bands".to_string()));
    }
    let mut out = new_record(1, lengths::TRAILER_RECORD, framing::RECORD_SYNC)?;
    TRAILER.blank_at(&mut out, 0)?;
    TRAILER.encode_at(
        &mut out,
        0,
        &[
            ("document_id", text_value(framing::DOCUMENT_ID)),
            ("band_count", FieldValue::Int(trailer.bands.len() as i64)),
        ],
    )?;
    for (i, band) in trailer.bands.iter().enumerate() {
        TRAILER_BAND.encode_at(
            &mut out,
            TRAILER_BAND_BASE + i * TRAILER_BAND_STRIDE,
            &[
                ("lost_lines", FieldValue::Int(i64::from(band.lost_lines))),
                ("degraded_lines", FieldValue::Int(i64::from(band.degraded_lines))),
            ],
        )?;
    }
    Ok(out)
}

/// Content of an early-family product to be written
#[derive(Debug, Clone)]
pub struct CapProduct {
    pub volume_id: String,
    pub product_description: String,
    pub scene: SceneHeader,
    pub ephemeris: EphemerisRecord,
    pub calibrations: Vec<CalibrationRecord>,
    pub modelization: Modelization,
    pub histograms: Vec<BandHistogram>,
    pub trailer: TrailerSummary,
    pub sample_bytes: u32,
    pub byte_order: ByteOrder,
}

impl CapProduct {
    /// A product carrying only the image dimensions
    pub fn blank(spec: &ImageSpec) -> Self {
        let scene = SceneHeader {
            band_count: spec.bands,
            line_count: spec.lines,
            column_count: spec.columns,
            ..Default::default()
        };
        CapProduct {
            volume_id: String::new(),
            product_description: String::new(),
            scene,
            ephemeris: EphemerisRecord::default(),
            calibrations: (1..=spec.bands).map(CalibrationRecord::empty).collect(),
            modelization: Modelization::default(),
            histograms: (1..=spec.bands).map(BandHistogram::empty).collect(),
            trailer: TrailerSummary { bands: vec![BandQuality::default(); spec.bands as usize] },
            sample_bytes: spec.sample_bytes,
            byte_order: spec.byte_order,
        }
    }

    pub fn leader_layout(&self) -> LeaderLayout {
        LeaderLayout::legacy(self.scene.band_count)
    }

    pub fn record_layout(&self) -> RecordLayout {
        RecordLayout::new(self.scene.line_count, self.scene.column_count, self.scene.band_count, self.sample_bytes)
    }

    fn imagery_descriptor(&self) -> ImageryDescriptor {
        let layout = self.record_layout();
        ImageryDescriptor {
            line_count: layout.lines,
            column_count: layout.columns,
            band_count: layout.channels,
            sample_bytes: layout.sample_bytes,
            byte_order: self.byte_order,
            record_length: layout.record_length(),
            prefix_length: layout.prefix_length,
            suffix_length: layout.suffix_length,
            records_written: Some(0),
            interleaving: imagery::INTERLEAVING.to_string(),
        }
    }

    fn validate(&self) -> SpotResult<()> {
        let bands = self.scene.band_count;
        if bands == 0 || bands > limits::MAX_BANDS || self.scene.line_count == 0 || self.scene.column_count == 0 {
            return Err(SpotError::GenericError(format!(
                "cannot write a {}x{}x{} image",
                self.scene.line_count, self.scene.column_count, bands
            )));
        }
        if self.sample_bytes != 1 && self.sample_bytes != 2 {
            return Err(SpotError::Unsupported(format!("{}-byte samples", self.sample_bytes)));
        }
        if self.calibrations.len() != bands as usize || self.histograms.len() != bands as usize {
            return Err(SpotError::InconsistentLayout(format!(
                "{} bands with {} calibration and {} histogram records",
                bands,
                self.calibrations.len(),
                self.histograms.len()
            )));
        }
        Ok(())
    }
}

fn write_file(path: &Path, records: &[Vec<u8>]) -> SpotResult<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut size = 0u64;
    for record in records {
        out.write_all(record)?;
        size += record.len() as u64;
    }
    out.flush()?;
    Ok(size)
}

fn encode_leader(product: &CapProduct) -> SpotResult<Vec<Vec<u8>>> {
    let layout = product.leader_layout();
    let mut records = vec![
        encode_leader_descriptor(&layout)?,
        encode_scene_header(&product.scene)?,
        encode_ephemeris(&product.ephemeris)?,
    ];
    for calibration in &product.calibrations {
        records.push(encode_calibration(calibration, &layout)?);
    }
    records.push(encode_modelization(&product.modelization, &layout)?);
    for histogram in &product.histograms {
        records.push(encode_histogram(histogram, &layout)?);
    }
    Ok(records)
}

fn encode_volume_directory(product: &CapProduct, sizes: &[(u64, u64, u64)]) -> SpotResult<Vec<Vec<u8>>> {
    let len = lengths::DIRECTORY_RECORD;
    let names = [files::LEADER, files::IMAGERY, files::TRAILER];

    let mut descriptor = new_record(1, len, framing::RECORD_SYNC)?;
    VOLUME_DESCRIPTOR.blank_at(&mut descriptor, 0)?;
    VOLUME_DESCRIPTOR.encode_at(
        &mut descriptor,
        0,
        &[
            ("superstructure_id", text_value(framing::DOCUMENT_ID)),
            ("volume_id", text_value(&product.volume_id)),
            ("creation_date", FieldValue::Text(Utc::now().format("%Y%m%d").to_string())),
            ("pointer_count", FieldValue::Int(names.len() as i64)),
            ("text_record_count", FieldValue::Int(1)),
        ],
    )?;

    let mut records = vec![descriptor];
    for (i, (name, (count, length, size))) in names.iter().zip(sizes).enumerate() {
        let mut pointer = new_record(2 + i as u32, len, framing::RECORD_SYNC)?;
        FILE_POINTER.blank_at(&mut pointer, 0)?;
        FILE_POINTER.encode_at(
            &mut pointer,
            0,
            &[
                ("file_number", FieldValue::Int(i as i64 + 1)),
                ("file_name", text_value(name)),
                ("record_count", FieldValue::Int(*count as i64)),
                ("record_length", FieldValue::Int(*length as i64)),
                ("file_size", FieldValue::Int(*size as i64)),
            ],
        )?;
        records.push(pointer);
    }

    let mut text = new_record(2 + names.len() as u32, len, framing::RECORD_SYNC)?;
    TEXT_RECORD.blank_at(&mut text, 0)?;
    TEXT_RECORD.encode_at(&mut text, 0, &[("product_description", text_value(&product.product_description))])?;
    records.push(text);
    Ok(records)
}

fn encode_null_volume() -> SpotResult<Vec<u8>> {
    let mut out = new_record(1, lengths::DIRECTORY_RECORD, framing::RECORD_SYNC)?;
    VOLUME_DESCRIPTOR.blank_at(&mut out, 0)?;
    VOLUME_DESCRIPTOR.encode_at(
        &mut out,
        0,
        &[
            ("superstructure_id", text_value(framing::DOCUMENT_ID)),
            ("volume_id", text_value("NULL VOLUME")),
            ("pointer_count", FieldValue::Int(0)),
            ("text_record_count", FieldValue::Int(0)),
        ],
    )?;
    Ok(out)
}

fn write_imagery(path: &Path, product: &CapProduct) -> SpotResult<u64> {
    let layout = product.record_layout();
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&encode_imagery_descriptor(&product.imagery_descriptor())?)?;
    let zeros = vec![0u8; layout.payload_length() as usize];
    for line in 1..=layout.lines {
        for channel in 1..=layout.channels {
            out.write_all(&encode_imagery_record(&layout, line, channel, 0, &zeros)?)?;
        }
    }
    out.flush()?;
    Ok(layout.file_length())
}

/// Writes the five files of an early-family container into `dir`
///
/// The directory must exist. The pixel area is zero-filled.
pub fn write_container(dir: &Path, product: &CapProduct) -> SpotResult<()> {
    product.validate()?;
    let leader_layout = product.leader_layout();
    let record_layout = product.record_layout();

    let leader_size = write_file(&dir.join(files::LEADER), &encode_leader(product)?)?;
    let imagery_size = write_imagery(&dir.join(files::IMAGERY), product)?;
    let trailer_size = write_file(&dir.join(files::TRAILER), &[encode_trailer(&product.trailer)?])?;
    write_file(&dir.join(files::NULL_VOLUME), &[encode_null_volume()?])?;

    let sizes = [
        (u64::from(leader_layout.record_count()), lengths::LEADER_RECORD, leader_size),
        (1 + record_layout.record_count(), record_layout.record_length(), imagery_size),
        (1, lengths::TRAILER_RECORD, trailer_size),
    ];
    write_file(&dir.join(files::VOLUME), &encode_volume_directory(product, &sizes)?)?;

    debug!("Leader {} bytes, imagery {} bytes", leader_size, imagery_size);
    info!(
        "Wrote CAP container in {}: {} lines, {} columns, {} bands",
        dir.display(),
        record_layout.lines,
        record_layout.columns,
        record_layout.channels
    );
    Ok(())
}
