//! SPOT code tables
//!
//! Mission names, sensor codes, display channel mappings and band
//! descriptions, loaded from the embedded `spot_codes.toml`.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::warn;

use crate::errors::{SpotError, SpotResult};

lazy_static! {
    static ref SPOT_CODES: SpotCodes = {
        let content = include_str!("../../spot_codes.toml");
        SpotCodes::from_str(content).unwrap_or_else(|e| {
            warn!("Failed to parse SPOT code tables: {}", e);
            SpotCodes::default()
        })
    };
}

/// Parsed code tables
#[derive(Debug, Default)]
pub struct SpotCodes {
    // Mission index to mission name
    pub missions: HashMap<i64, String>,
    // Scene header instrument code to instrument name
    pub instruments: HashMap<String, String>,
    // Spectral mode to one-letter sensor code
    pub sensor_codes: HashMap<String, String>,
    // Spectral mode to (red, green, blue) band numbers
    pub display_channels: HashMap<String, [u32; 3]>,
    // Band count to band descriptions
    pub band_descriptions: HashMap<usize, Vec<String>>,
    // Quantity to physical unit
    pub units: HashMap<String, String>,
}

fn string_table(value: &toml::Value, name: &str) -> HashMap<String, String> {
    value
        .get(name)
        .and_then(|v| v.as_table())
        .map(|table| {
            table
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.to_string(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

impl SpotCodes {
    /// Parse code tables from a TOML string
    pub fn from_str(content: &str) -> SpotResult<Self> {
        let value: toml::Value = content
            .parse()
            .map_err(|e| SpotError::GenericError(format!("Failed to parse TOML: {}", e)))?;

        let mut codes = SpotCodes {
            instruments: string_table(&value, "instruments"),
            sensor_codes: string_table(&value, "sensor_codes"),
            units: string_table(&value, "units"),
            ..Default::default()
        };

        for (k, v) in string_table(&value, "missions") {
            if let Ok(index) = k.parse::<i64>() {
                codes.missions.insert(index, v);
            }
        }

        if let Some(table) = value.get("display_channels").and_then(|v| v.as_table()) {
            for (mode, channels) in table {
                let rgb: Vec<u32> = channels
                    .as_array()
                    .map(|a| a.iter().filter_map(|c| c.as_integer()).filter_map(|c| u32::try_from(c).ok()).collect())
                    .unwrap_or_default();
                if let &[r, g, b] = rgb.as_slice() {
                    codes.display_channels.insert(mode.to_string(), [r, g, b]);
                }
            }
        }

        if let Some(table) = value.get("band_descriptions").and_then(|v| v.as_table()) {
            for (count, names) in table {
                if let (Ok(count), Some(names)) = (count.parse::<usize>(), names.as_array()) {
                    let names = names.iter().filter_map(|n| n.as_str()).map(str::to_string).collect();
                    codes.band_descriptions.insert(count, names);
                }
            }
        }

        Ok(codes)
    }
}

fn mode_key(spectral_mode: &str) -> String {
    spectral_mode.trim().to_ascii_uppercase()
}

/// Mission name for a mission index
pub fn mission_name(index: Option<i64>) -> String {
    index
        .and_then(|i| SPOT_CODES.missions.get(&i).cloned())
        .unwrap_or_else(|| "SPOT".to_string())
}

/// Instrument name for the instrument code of the scene header
pub fn instrument_name(code: &str) -> String {
    let code = code.trim();
    SPOT_CODES
        .instruments
        .get(&code.to_ascii_uppercase())
        .cloned()
        .unwrap_or_else(|| code.to_string())
}

/// One-letter sensor code of a spectral mode
///
/// Unknown modes fall back to their first letter.
pub fn sensor_code(spectral_mode: &str) -> String {
    let key = mode_key(spectral_mode);
    SPOT_CODES
        .sensor_codes
        .get(&key)
        .cloned()
        .unwrap_or_else(|| key.chars().next().map(String::from).unwrap_or_default())
}

/// Red, green and blue band numbers for a spectral mode
///
/// Band numbers are clamped to the band count.
pub fn display_channels(spectral_mode: &str, band_count: u32) -> [u32; 3] {
    let fallback = [3, 2, 1];
    let rgb = SPOT_CODES.display_channels.get(&mode_key(spectral_mode)).copied().unwrap_or(fallback);
    rgb.map(|b| b.clamp(1, band_count.max(1)))
}

/// Description of every band for a band count
pub fn band_descriptions(band_count: usize) -> Vec<String> {
    SPOT_CODES
        .band_descriptions
        .get(&band_count)
        .cloned()
        .unwrap_or_else(|| (1..=band_count).map(|i| format!("B{}", i)).collect())
}

/// Physical unit of a quantity, empty when unknown
pub fn unit(quantity: &str) -> String {
    SPOT_CODES.units.get(quantity).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_tables_parse() {
        assert_eq!(mission_name(Some(4)), "SPOT");
        assert_eq!(sensor_code("XS"), "X");
        assert_eq!(sensor_code("pan"), "P");
        assert_eq!(sensor_code("Q"), "Q");
        assert_eq!(instrument_name("HRVIR "), "HRVIR");
    }

    #[test]
    fn test_display_channels_by_mode() {
        assert_eq!(display_channels("XS", 3), [3, 2, 1]);
        assert_eq!(display_channels("PAN", 1), [1, 1, 1]);
        // unknown mode on a single band image stays inside the image
        assert_eq!(display_channels("", 1), [1, 1, 1]);
    }

    #[test]
    fn test_band_descriptions_by_count() {
        assert_eq!(band_descriptions(3), vec!["XS1", "XS2", "XS3"]);
        assert_eq!(band_descriptions(1), vec!["PAN"]);
        assert_eq!(band_descriptions(2), vec!["B1", "B2"]);
    }

    #[test]
    fn test_negative_display_channel_is_dropped() {
        let codes = SpotCodes::from_str("[display_channels]\nXS = [3, -2, 1]\nPAN = [1, 1, 1]\n").unwrap();
        assert!(!codes.display_channels.contains_key("XS"));
        assert_eq!(codes.display_channels.get("PAN"), Some(&[1, 1, 1]));
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(SpotCodes::from_str("[missions").is_err());
    }
}
