//! Declarative record schemas
//!
//! Every fixed-format record of the CAP container is described once as a
//! table of `FixedField`s (name, byte offset, byte length, decode rule).
//! The same table drives decoding in the reader and encoding in the writer,
//! so field offsets are never duplicated between the two directions.
//!
//! Offsets are absolute within the record, the 12-byte record header
//! included. Repeated groups are described relative to their first entry
//! and decoded with a base offset and a stride.

use std::collections::HashMap;
use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::codec::{
    decimal_degrees_to_dms, decode_ascii_float, decode_ascii_int, decode_ascii_text,
    dms_to_decimal_degrees, FieldPolicy,
};
use crate::codec::ascii::{encode_ascii_float, encode_ascii_int, encode_ascii_text};
use crate::errors::{SpotError, SpotResult};

/// How the bytes of a field are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRule {
    /// Right-justified ASCII integer
    Int,
    /// ASCII real
    Float,
    /// Space padded ASCII text
    Text,
    /// Degrees-minutes-seconds angle with a hemisphere marker
    Angle,
    /// Big-endian unsigned 32-bit binary integer
    Binary32,
}

/// One field of a fixed-format record
#[derive(Debug, Clone, Copy)]
pub struct FixedField {
    pub name: &'static str,
    pub offset: usize,
    pub length: usize,
    pub rule: DecodeRule,
}

const fn field(name: &'static str, offset: usize, length: usize, rule: DecodeRule) -> FixedField {
    FixedField { name, offset, length, rule }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    /// Blank or unparsable numeric field
    Absent,
}

/// A named table of fields making up one record (or one repeated group)
#[derive(Debug)]
pub struct Schema {
    pub record: &'static str,
    pub fields: &'static [FixedField],
}

/// Values decoded from one record through a `Schema`
#[derive(Debug, Clone)]
pub struct RecordFields {
    record: &'static str,
    values: HashMap<&'static str, FieldValue>,
}

impl RecordFields {
    fn get(&self, name: &str) -> &FieldValue {
        self.values.get(name).unwrap_or(&FieldValue::Absent)
    }

    /// Name of the record these fields came from
    pub fn record(&self) -> &'static str {
        self.record
    }

    /// Text value; empty for absent or numeric fields
    pub fn text(&self, name: &str) -> String {
        match self.get(name) {
            FieldValue::Text(s) => s.clone(),
            _ => String::new(),
        }
    }

    pub fn opt_int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn opt_float(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Integer resolved under the given policy
    pub fn int(&self, name: &'static str, policy: FieldPolicy) -> SpotResult<i64> {
        policy.resolve(self.opt_int(name), self.record, name)
    }

    /// Real resolved under the given policy
    pub fn float(&self, name: &'static str, policy: FieldPolicy) -> SpotResult<f64> {
        policy.resolve(self.opt_float(name), self.record, name)
    }

    /// Structural integer: blank is always an error, negative values too
    pub fn count(&self, name: &'static str) -> SpotResult<u32> {
        let value = FieldPolicy::Strict.resolve(self.opt_int(name), self.record, name)?;
        u32::try_from(value).map_err(|_| {
            SpotError::InconsistentLayout(format!("{}.{} is negative: {}", self.record, name, value))
        })
    }
}

fn decode_field(f: &FixedField, bytes: &[u8]) -> SpotResult<FieldValue> {
    let value = match f.rule {
        DecodeRule::Int => decode_ascii_int(bytes).map(FieldValue::Int),
        DecodeRule::Float => decode_ascii_float(bytes).map(FieldValue::Float),
        DecodeRule::Text => Some(FieldValue::Text(decode_ascii_text(bytes))),
        DecodeRule::Angle => {
            let text = decode_ascii_text(bytes);
            if text.is_empty() {
                None
            } else {
                dms_to_decimal_degrees(&text).map(FieldValue::Float)
            }
        }
        DecodeRule::Binary32 => {
            let mut cursor = Cursor::new(bytes);
            Some(FieldValue::Int(i64::from(cursor.read_u32::<BigEndian>()?)))
        }
    };
    Ok(value.unwrap_or(FieldValue::Absent))
}

fn encode_field(f: &FixedField, value: &FieldValue) -> SpotResult<Vec<u8>> {
    let mismatch = || {
        SpotError::GenericError(format!("Cannot encode {:?} into field {} ({:?})", value, f.name, f.rule))
    };
    match (f.rule, value) {
        (_, FieldValue::Absent) if f.rule != DecodeRule::Binary32 => Ok(vec![b' '; f.length]),
        (DecodeRule::Int, FieldValue::Int(v)) => encode_ascii_int(*v, f.length),
        (DecodeRule::Float, FieldValue::Float(v)) => encode_ascii_float(*v, f.length),
        (DecodeRule::Float, FieldValue::Int(v)) => encode_ascii_float(*v as f64, f.length),
        (DecodeRule::Text, FieldValue::Text(s)) => encode_ascii_text(s, f.length),
        (DecodeRule::Angle, FieldValue::Text(s)) => encode_ascii_text(s, f.length),
        (DecodeRule::Angle, FieldValue::Float(v)) => {
            encode_ascii_text(&decimal_degrees_to_dms(*v, '+', '-'), f.length)
        }
        (DecodeRule::Binary32, FieldValue::Int(v)) => {
            let v = u32::try_from(*v).map_err(|_| mismatch())?;
            let mut out = Vec::with_capacity(4);
            out.write_u32::<BigEndian>(v)?;
            Ok(out)
        }
        _ => Err(mismatch()),
    }
}

impl Schema {
    /// Number of bytes spanned by the schema, from offset zero
    pub fn span(&self) -> usize {
        self.fields.iter().map(|f| f.offset + f.length).max().unwrap_or(0)
    }

    fn lookup(&self, name: &str) -> SpotResult<&FixedField> {
        self.fields.iter().find(|f| f.name == name).ok_or_else(|| {
            SpotError::GenericError(format!("No field {} in {} schema", name, self.record))
        })
    }

    /// Decodes every field of the schema, offsets shifted by `base`
    pub fn decode_at(&self, record: &[u8], base: usize) -> SpotResult<RecordFields> {
        let mut values = HashMap::with_capacity(self.fields.len());
        for f in self.fields {
            let start = base + f.offset;
            let bytes = record.get(start..start + f.length).ok_or_else(|| {
                SpotError::InconsistentLayout(format!(
                    "{} record too short for field {} ({} bytes)",
                    self.record,
                    f.name,
                    record.len()
                ))
            })?;
            values.insert(f.name, decode_field(f, bytes)?);
        }
        Ok(RecordFields { record: self.record, values })
    }

    /// Decodes a whole record
    pub fn decode(&self, record: &[u8]) -> SpotResult<RecordFields> {
        self.decode_at(record, 0)
    }

    /// Decodes `count` consecutive entries of a repeated group
    pub fn decode_repeated(
        &self,
        record: &[u8],
        base: usize,
        stride: usize,
        count: usize,
    ) -> SpotResult<Vec<RecordFields>> {
        (0..count)
            .map(|i| self.decode_at(record, base + i * stride))
            .collect()
    }

    /// Fills every ASCII field with spaces and every binary field with zeros
    pub fn blank_at(&self, record: &mut [u8], base: usize) -> SpotResult<()> {
        for f in self.fields {
            let fill = if f.rule == DecodeRule::Binary32 { 0u8 } else { b' ' };
            let start = base + f.offset;
            let target = record.get_mut(start..start + f.length).ok_or_else(|| {
                SpotError::InconsistentLayout(format!("{} record too short for {}", self.record, f.name))
            })?;
            target.fill(fill);
        }
        Ok(())
    }

    /// Encodes the named values into the record, offsets shifted by `base`
    pub fn encode_at(
        &self,
        record: &mut [u8],
        base: usize,
        values: &[(&str, FieldValue)],
    ) -> SpotResult<()> {
        for (name, value) in values {
            let f = self.lookup(name)?;
            let bytes = encode_field(f, value)?;
            let start = base + f.offset;
            let target = record.get_mut(start..start + f.length).ok_or_else(|| {
                SpotError::InconsistentLayout(format!("{} record too short for {}", self.record, f.name))
            })?;
            target.copy_from_slice(&bytes);
        }
        Ok(())
    }
}

/// Helpers turning optional scalars into encodable values
pub fn int_value(v: Option<i64>) -> FieldValue {
    v.map(FieldValue::Int).unwrap_or(FieldValue::Absent)
}

pub fn float_value(v: Option<f64>) -> FieldValue {
    v.map(FieldValue::Float).unwrap_or(FieldValue::Absent)
}

pub fn text_value(v: &str) -> FieldValue {
    FieldValue::Text(v.to_string())
}

use DecodeRule::{Angle, Binary32, Float, Int, Text};

/// Volume directory descriptor (also used by the null volume)
pub static VOLUME_DESCRIPTOR: Schema = Schema {
    record: "volume descriptor",
    fields: &[
        field("superstructure_id", 12, 12, Text),
        field("volume_id", 24, 16, Text),
        field("creation_date", 40, 8, Text),
        field("pointer_count", 48, 4, Int),
        field("text_record_count", 52, 4, Int),
    ],
};

/// File pointer record of the volume directory
pub static FILE_POINTER: Schema = Schema {
    record: "file pointer",
    fields: &[
        field("file_number", 12, 4, Int),
        field("file_name", 16, 16, Text),
        field("record_count", 32, 8, Int),
        field("record_length", 40, 8, Int),
        field("file_size", 48, 12, Int),
    ],
};

/// Text record closing the volume directory
pub static TEXT_RECORD: Schema = Schema {
    record: "text",
    fields: &[field("product_description", 12, 60, Text)],
};

pub static LEADER_DESCRIPTOR: Schema = Schema {
    record: "leader descriptor",
    fields: &[
        field("document_id", 12, 12, Text),
        field("file_name", 24, 16, Text),
        field("record_count", 40, 6, Int),
        field("record_length", 46, 6, Int),
        field("calibration_count", 52, 6, Int),
        field("calibration_length", 58, 8, Int),
        field("histogram_count", 66, 6, Int),
        field("histogram_length", 72, 6, Int),
    ],
};

pub static SCENE_HEADER: Schema = Schema {
    record: "scene header",
    fields: &[
        field("scene_id", 12, 40, Text),
        field("mission_index", 52, 2, Int),
        field("instrument", 54, 8, Text),
        field("instrument_index", 62, 1, Int),
        field("spectral_mode", 63, 4, Text),
        field("processing_level", 67, 4, Text),
        field("acquisition_date", 71, 8, Text),
        field("acquisition_time", 79, 8, Text),
        field("orientation", 307, 16, Float),
        field("grid_k", 323, 4, Int),
        field("grid_j", 327, 4, Int),
        field("shift_value", 331, 4, Int),
        field("revolution", 335, 8, Int),
        field("compression_flag", 343, 1, Int),
        field("playback_flag", 344, 1, Int),
        field("band_count", 345, 2, Int),
        field("line_count", 347, 6, Int),
        field("column_count", 353, 6, Int),
        field("sun_azimuth", 359, 8, Float),
        field("sun_elevation", 367, 8, Float),
        field("incidence_angle", 375, 8, Float),
        field("viewing_angle", 383, 8, Float),
        field("production_date", 391, 20, Text),
        field("producer", 411, 32, Text),
        field("job_id", 443, 16, Text),
    ],
};

/// Scene vertex: center first, then the four corners UL, UR, LL, LR
pub static SCENE_VERTEX: Schema = Schema {
    record: "scene vertex",
    fields: &[
        field("latitude", 0, 16, Angle),
        field("longitude", 16, 16, Angle),
        field("row", 32, 6, Int),
        field("column", 38, 6, Int),
    ],
};
pub const SCENE_VERTEX_BASE: usize = 87;
pub const SCENE_VERTEX_STRIDE: usize = 44;

pub static EPHEMERIS_HEADER: Schema = Schema {
    record: "ephemeris",
    fields: &[
        field("center_day", 12, 8, Int),
        field("center_seconds", 20, 16, Float),
        field("line_period", 36, 16, Float),
        field("center_line", 52, 8, Int),
        field("ephemeris_count", 60, 2, Int),
        field("coarse_attitude_count", 1070, 3, Int),
        field("fine_attitude_count", 3701, 1, Int),
    ],
};

pub static EPHEMERIS_POINT: Schema = Schema {
    record: "ephemeris point",
    fields: &[
        field("x", 0, 16, Float),
        field("y", 16, 16, Float),
        field("z", 32, 16, Float),
        field("vx", 48, 12, Float),
        field("vy", 60, 12, Float),
        field("vz", 72, 12, Float),
        field("day", 84, 8, Int),
        field("seconds", 92, 16, Float),
    ],
};
pub const EPHEMERIS_POINT_BASE: usize = 62;
pub const EPHEMERIS_POINT_STRIDE: usize = 112;

pub static ATTITUDE_SAMPLE: Schema = Schema {
    record: "attitude sample",
    fields: &[
        field("line", 0, 6, Int),
        field("yaw", 6, 10, Float),
        field("pitch", 16, 10, Float),
        field("roll", 26, 10, Float),
    ],
};
pub const COARSE_ATTITUDE_BASE: usize = 1073;
pub const FINE_ATTITUDE_BASE: usize = 3702;
pub const ATTITUDE_STRIDE: usize = 36;

/// Fixed part of a calibration record; table slots follow at 734
pub static CALIBRATION_HEADER: Schema = Schema {
    record: "calibration",
    fields: &[
        field("band_index", 12, 2, Int),
        field("slot_count", 14, 2, Int),
        field("table_length", 16, 6, Int),
        field("absolute_gain", 22, 16, Float),
        field("absolute_bias", 38, 16, Float),
        field("solar_irradiance", 54, 16, Float),
        field("first_wavelength", 70, 10, Float),
        field("wavelength_step", 80, 10, Float),
        field("spectral_count", 90, 4, Int),
    ],
};

pub static SPECTRAL_POINT: Schema = Schema {
    record: "spectral sensitivity",
    fields: &[field("value", 0, 10, Float)],
};
pub const SPECTRAL_BASE: usize = 94;
pub const SPECTRAL_STRIDE: usize = 10;

pub static MODELIZATION: Schema = Schema {
    record: "modelization",
    fields: &[
        field("look_band_count", 12, 2, Int),
        field("pixel_size", 270, 16, Float),
        field("mirror_step", 286, 8, Int),
        field("satellite_altitude", 294, 16, Float),
        field("detector_count", 310, 8, Int),
    ],
};

pub static LOOK_ANGLES: Schema = Schema {
    record: "look angles",
    fields: &[
        field("psi_x_first", 0, 16, Float),
        field("psi_x_last", 16, 16, Float),
        field("psi_y_first", 32, 16, Float),
        field("psi_y_last", 48, 16, Float),
    ],
};
pub const LOOK_ANGLES_BASE: usize = 14;
pub const LOOK_ANGLES_STRIDE: usize = 64;

pub static HISTOGRAM_HEADER: Schema = Schema {
    record: "histogram",
    fields: &[
        field("band_index", 12, 2, Int),
        field("mean", 14, 16, Float),
        field("std_dev", 30, 16, Float),
    ],
};

pub static HISTOGRAM_BIN: Schema = Schema {
    record: "histogram bin",
    fields: &[field("count", 0, 4, Binary32)],
};
pub const HISTOGRAM_BIN_BASE: usize = 46;
pub const HISTOGRAM_BIN_STRIDE: usize = 4;

pub static IMAGERY_DESCRIPTOR: Schema = Schema {
    record: "imagery descriptor",
    fields: &[
        field("document_id", 12, 12, Text),
        field("line_count", 24, 6, Int),
        field("column_count", 30, 6, Int),
        field("band_count", 36, 2, Int),
        field("sample_bytes", 38, 2, Int),
        field("byte_order", 40, 2, Text),
        field("record_length", 42, 8, Int),
        field("prefix_length", 50, 8, Int),
        field("suffix_length", 58, 8, Int),
        field("records_written", 66, 8, Int),
        field("interleaving", 74, 4, Text),
    ],
};

pub static TRAILER: Schema = Schema {
    record: "trailer",
    fields: &[
        field("document_id", 12, 12, Text),
        field("band_count", 24, 6, Int),
    ],
};

pub static TRAILER_BAND: Schema = Schema {
    record: "trailer band",
    fields: &[
        field("lost_lines", 0, 6, Int),
        field("degraded_lines", 6, 6, Int),
    ],
};
pub const TRAILER_BAND_BASE: usize = 30;
pub const TRAILER_BAND_STRIDE: usize = 12;
