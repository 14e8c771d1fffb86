//! Radiometric calibration records
//!
//! One record per band: absolute calibration coefficients, the spectral
//! sensitivity curve, then a fixed number of table slots. Each slot starts
//! with a 4-byte big-endian kind flag followed by a table of 2-byte
//! integers. Gain tables are scaled by 1/10000 and dark current tables by
//! 1/10; slots of any other kind are skipped.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};

use crate::cap::constants::{calibration, framing, lengths};
use crate::cap::layout::{
    float_value, int_value, FieldValue, CALIBRATION_HEADER, SPECTRAL_BASE, SPECTRAL_POINT,
    SPECTRAL_STRIDE,
};
use crate::cap::records::check_record_header;
use crate::cap::region::{calibration_record_length, LeaderLayout};
use crate::cap::writer::new_record;
use crate::codec::FieldPolicy;
use crate::errors::{SpotError, SpotResult};
use crate::io::byte_order::{decode_i16_table, encode_i16_table, ByteOrder};
use crate::io::seekable::SeekableReader;

/// Spectral sensitivity curve of a band
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralSensitivity {
    /// Wavelength of the first value, in micrometers
    pub first_wavelength: Option<f64>,
    /// Wavelength step between values, in micrometers
    pub step: Option<f64>,
    pub values: Vec<f64>,
}

/// Calibration record of one band
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationRecord {
    pub band_index: u32,
    pub absolute_gain: Option<f64>,
    pub absolute_bias: Option<f64>,
    pub solar_irradiance: Option<f64>,
    pub spectral: SpectralSensitivity,
    /// Scaled gain tables, in slot order
    pub gains: Vec<Vec<f64>>,
    /// Scaled dark current tables, in slot order
    pub dark_currents: Vec<Vec<f64>>,
}

impl CalibrationRecord {
    /// A record with no coefficients and no tables
    pub fn empty(band_index: u32) -> Self {
        CalibrationRecord { band_index, ..Default::default() }
    }
}

fn slot_offset(record_offset: u64, slot: u32, table_length: u32) -> u64 {
    record_offset
        + lengths::CALIBRATION_FIXED_PART
        + u64::from(slot) * (4 + 2 * u64::from(table_length))
}

/// Decodes the calibration record of `band`
///
/// # Arguments
/// * `reader` - Reader over the leader file
/// * `layout` - Absolute layout of the leader
/// * `band` - Band number, 1-based
/// * `policy` - How blank table entries are resolved
pub fn decode_calibration(
    reader: &mut dyn SeekableReader,
    layout: &LeaderLayout,
    band: u32,
    policy: FieldPolicy,
) -> SpotResult<CalibrationRecord> {
    let offset = layout.calibration_offset(band);
    let number = layout.calibration_record_number(band);
    check_record_header(reader, "leader", number, offset, layout.calibration_length, framing::RECORD_SYNC)?;

    let mut fixed = vec![0u8; lengths::CALIBRATION_FIXED_PART as usize];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut fixed)?;
    let f = CALIBRATION_HEADER.decode(&fixed)?;

    let slot_count = f.count("slot_count")?;
    let table_length = f.count("table_length")?;
    if calibration_record_length(slot_count, table_length) != layout.calibration_length {
        return Err(SpotError::InconsistentLayout(format!(
            "calibration record of band {} holds {} slots of {} entries, record length is {}",
            band, slot_count, table_length, layout.calibration_length
        )));
    }
    let band_index = f.count("band_index")?;
    if band_index != band {
        warn!("Calibration record {} is labelled for band {}", band, band_index);
    }

    let spectral_count = f.count("spectral_count")? as usize;
    if spectral_count > calibration::SPECTRAL_POINTS {
        return Err(SpotError::InconsistentLayout(format!(
            "calibration record of band {} announces {} spectral points",
            band, spectral_count
        )));
    }
    let values = SPECTRAL_POINT
        .decode_repeated(&fixed, SPECTRAL_BASE, SPECTRAL_STRIDE, spectral_count)?
        .iter()
        .map(|p| p.float("value", policy))
        .collect::<SpotResult<Vec<_>>>()?;

    let mut gains = Vec::new();
    let mut dark_currents = Vec::new();
    let mut raw = vec![0u8; 2 * table_length as usize];
    for slot in 0..slot_count {
        reader.seek(SeekFrom::Start(slot_offset(offset, slot, table_length)))?;
        let kind = reader.read_u32::<BigEndian>()?;
        let scale = match kind {
            calibration::KIND_GAIN => calibration::GAIN_SCALE,
            calibration::KIND_DARK => calibration::DARK_SCALE,
            _ => continue,
        };
        reader.read_exact(&mut raw)?;
        let table: Vec<f64> = decode_i16_table(&mut raw, ByteOrder::BigEndian)
            .into_iter()
            .map(|v| f64::from(v) * scale)
            .collect();
        if kind == calibration::KIND_GAIN {
            gains.push(table);
        } else {
            dark_currents.push(table);
        }
    }
    debug!(
        "Band {} calibration: {} gain and {} dark current tables",
        band,
        gains.len(),
        dark_currents.len()
    );

    Ok(CalibrationRecord {
        band_index,
        absolute_gain: policy.optional(f.opt_float("absolute_gain")),
        absolute_bias: policy.optional(f.opt_float("absolute_bias")),
        solar_irradiance: policy.optional(f.opt_float("solar_irradiance")),
        spectral: SpectralSensitivity {
            first_wavelength: policy.optional(f.opt_float("first_wavelength")),
            step: policy.optional(f.opt_float("wavelength_step")),
            values,
        },
        gains,
        dark_currents,
    })
}

fn quantize(table: &[f64], scale: f64, table_length: u32) -> SpotResult<Vec<i16>> {
    if table.len() > table_length as usize {
        return Err(SpotError::GenericError(format!(
            "calibration table of {} entries exceeds slot capacity {}",
            table.len(),
            table_length
        )));
    }
    let mut out: Vec<i16> = table
        .iter()
        .map(|v| (v / scale).round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16)
        .collect();
    out.resize(table_length as usize, 0);
    Ok(out)
}

/// Encodes the calibration record of a band with the legacy slot geometry
///
/// Gain tables fill the first slots, dark current tables the next ones;
/// the remaining slots are written with kind 0.
pub fn encode_calibration(record: &CalibrationRecord, layout: &LeaderLayout) -> SpotResult<Vec<u8>> {
    let slot_count = calibration::SLOT_COUNT;
    let table_length = calibration::TABLE_LENGTH;
    if calibration_record_length(slot_count, table_length) != layout.calibration_length {
        return Err(SpotError::InconsistentLayout(
            "calibration records are only written with the legacy slot geometry".to_string(),
        ));
    }
    if record.gains.len() + record.dark_currents.len() > slot_count as usize {
        return Err(SpotError::GenericError(format!(
            "band {} has {} calibration tables for {} slots",
            record.band_index,
            record.gains.len() + record.dark_currents.len(),
            slot_count
        )));
    }
    if record.spectral.values.len() > calibration::SPECTRAL_POINTS {
        return Err(SpotError::GenericError(format!(
            "band {} has {} spectral points",
            record.band_index,
            record.spectral.values.len()
        )));
    }

    let number = layout.calibration_record_number(record.band_index);
    let mut out = new_record(number, layout.calibration_length, framing::RECORD_SYNC)?;
    CALIBRATION_HEADER.blank_at(&mut out, 0)?;
    CALIBRATION_HEADER.encode_at(
        &mut out,
        0,
        &[
            ("band_index", FieldValue::Int(i64::from(record.band_index))),
            ("slot_count", FieldValue::Int(i64::from(slot_count))),
            ("table_length", FieldValue::Int(i64::from(table_length))),
            ("absolute_gain", float_value(record.absolute_gain)),
            ("absolute_bias", float_value(record.absolute_bias)),
            ("solar_irradiance", float_value(record.solar_irradiance)),
            ("first_wavelength", float_value(record.spectral.first_wavelength)),
            ("wavelength_step", float_value(record.spectral.step)),
            ("spectral_count", int_value(Some(record.spectral.values.len() as i64))),
        ],
    )?;
    for i in 0..calibration::SPECTRAL_POINTS {
        let base = SPECTRAL_BASE + i * SPECTRAL_STRIDE;
        SPECTRAL_POINT.blank_at(&mut out, base)?;
        if let Some(v) = record.spectral.values.get(i) {
            SPECTRAL_POINT.encode_at(&mut out, base, &[("value", FieldValue::Float(*v))])?;
        }
    }

    let tables = record
        .gains
        .iter()
        .map(|t| (calibration::KIND_GAIN, calibration::GAIN_SCALE, t))
        .chain(record.dark_currents.iter().map(|t| (calibration::KIND_DARK, calibration::DARK_SCALE, t)));
    let mut slot = 0u32;
    for (kind, scale, table) in tables {
        let start = (slot_offset(0, slot, table_length)) as usize;
        let mut head = Vec::with_capacity(4);
        head.write_u32::<BigEndian>(kind)?;
        out[start..start + 4].copy_from_slice(&head);
        let body = encode_i16_table(&quantize(table, scale, table_length)?, ByteOrder::BigEndian);
        out[start + 4..start + 4 + body.len()].copy_from_slice(&body);
        slot += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    fn leader_with(record: &[u8], layout: &LeaderLayout) -> Cursor<Vec<u8>> {
        let mut data = vec![0u8; layout.calibration_offset(1) as usize];
        data.extend_from_slice(record);
        Cursor::new(data)
    }

    #[test]
    fn test_tables_are_scaled_and_unused_slots_skipped() {
        let layout = LeaderLayout::legacy(1);
        let record = CalibrationRecord {
            band_index: 1,
            absolute_gain: Some(0.8532),
            absolute_bias: None,
            solar_irradiance: Some(1858.0),
            spectral: SpectralSensitivity {
                first_wavelength: Some(0.5),
                step: Some(0.005),
                values: vec![0.0, 0.25, 1.0],
            },
            gains: vec![vec![1.0123, 0.9876]],
            dark_currents: vec![vec![12.3], vec![4.5]],
        };
        let bytes = encode_calibration(&record, &layout).unwrap();
        assert_eq!(bytes.len() as u64, layout.calibration_length);

        let mut reader = leader_with(&bytes, &layout);
        let decoded = decode_calibration(&mut reader, &layout, 1, FieldPolicy::Strict).unwrap();
        assert_eq!(decoded.gains.len(), 1);
        assert_eq!(decoded.dark_currents.len(), 2);
        assert_eq!(decoded.gains[0].len(), calibration::TABLE_LENGTH as usize);
        assert_abs_diff_eq!(decoded.gains[0][0], 1.0123, epsilon = 1e-9);
        assert_abs_diff_eq!(decoded.dark_currents[1][0], 4.5, epsilon = 1e-9);
        assert_eq!(decoded.absolute_bias, None);
        assert_eq!(decoded.spectral.values, vec![0.0, 0.25, 1.0]);
    }

    #[test]
    fn test_raw_entries_are_big_endian() {
        let layout = LeaderLayout::legacy(1);
        let record = CalibrationRecord { band_index: 1, gains: vec![vec![0.0001]], ..Default::default() };
        let bytes = encode_calibration(&record, &layout).unwrap();
        let start = lengths::CALIBRATION_FIXED_PART as usize;
        assert_eq!(&bytes[start..start + 4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[start + 4..start + 6], &[0, 1]);
    }

    #[test]
    fn test_wrong_record_length_is_rejected() {
        let layout = LeaderLayout::legacy(1);
        let bytes = encode_calibration(&CalibrationRecord::empty(1), &layout).unwrap();
        let mut reader = leader_with(&bytes, &layout);
        let shorter = LeaderLayout { bands: 1, calibration_length: layout.calibration_length - 2 };
        assert!(decode_calibration(&mut reader, &shorter, 1, FieldPolicy::Strict).is_err());
    }
}
