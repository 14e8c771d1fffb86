//! Fixed-width ASCII field codec
//!
//! Leader and directory records store numbers as space-padded ASCII in
//! fixed-width fields. Some producers set the top bit of each byte, so every
//! byte is masked to 7 bits before parsing.

use log::warn;

use crate::errors::{SpotError, SpotResult};

/// How blank or unparsable required fields are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldPolicy {
    /// A blank or unparsable required field is an error
    #[default]
    Strict,
    /// Blank or unparsable fields decode to zero, as legacy readers did
    Legacy,
}

impl FieldPolicy {
    /// Resolves a decoded numeric field under this policy
    pub fn resolve<T: Default>(
        &self,
        value: Option<T>,
        record: &'static str,
        field: &'static str,
    ) -> SpotResult<T> {
        match (value, self) {
            (Some(v), _) => Ok(v),
            (None, FieldPolicy::Legacy) => {
                warn!("{}.{} blank or unparsable, using zero", record, field);
                Ok(T::default())
            }
            (None, FieldPolicy::Strict) => Err(SpotError::FieldAbsent { record, field }),
        }
    }

    /// Resolves an optional scalar; only the legacy policy substitutes zero
    pub fn optional<T: Default>(&self, value: Option<T>) -> Option<T> {
        match (value, self) {
            (Some(v), _) => Some(v),
            (None, FieldPolicy::Legacy) => Some(T::default()),
            (None, FieldPolicy::Strict) => None,
        }
    }
}

/// Masks the parity bit of each byte and returns the trimmed text
pub fn decode_ascii_text(bytes: &[u8]) -> String {
    let masked: String = bytes.iter().map(|b| (b & 0x7F) as char).collect();
    masked.trim_matches(|c: char| c == ' ' || c == '\0').to_string()
}

/// Decodes a fixed-width ASCII integer; `None` when blank or not a number
pub fn decode_ascii_int(bytes: &[u8]) -> Option<i64> {
    let text = decode_ascii_text(bytes);
    if text.is_empty() {
        return None;
    }
    text.parse::<i64>().ok()
}

/// Decodes a fixed-width ASCII real; `None` when blank or not a finite number
pub fn decode_ascii_float(bytes: &[u8]) -> Option<f64> {
    let text = decode_ascii_text(bytes);
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Encodes text left-justified and space padded
pub fn encode_ascii_text(text: &str, len: usize) -> SpotResult<Vec<u8>> {
    if !text.is_ascii() || text.len() > len {
        return Err(SpotError::GenericError(format!(
            "Text '{}' does not fit a {}-byte ASCII field",
            text, len
        )));
    }
    let mut out = text.as_bytes().to_vec();
    out.resize(len, b' ');
    Ok(out)
}

/// Encodes an integer right-justified and space padded
pub fn encode_ascii_int(value: i64, len: usize) -> SpotResult<Vec<u8>> {
    let text = format!("{:>width$}", value, width = len);
    if text.len() > len {
        return Err(SpotError::GenericError(format!(
            "Integer {} does not fit a {}-byte field",
            value, len
        )));
    }
    Ok(text.into_bytes())
}

/// Encodes a real right-justified with as many decimals as the field allows
pub fn encode_ascii_float(value: f64, len: usize) -> SpotResult<Vec<u8>> {
    for decimals in (0..=9).rev() {
        let text = format!("{:>width$.prec$}", value, width = len, prec = decimals);
        if text.len() <= len {
            return Ok(text.into_bytes());
        }
    }
    Err(SpotError::GenericError(format!(
        "Real {} does not fit a {}-byte field",
        value, len
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_bit_is_masked() {
        let field = [b'1' | 0x80, b'2' | 0x80, b' ', b' '];
        assert_eq!(decode_ascii_int(&field), Some(12));
    }

    #[test]
    fn test_blank_and_garbage_are_absent() {
        assert_eq!(decode_ascii_int(b"      "), None);
        assert_eq!(decode_ascii_int(b"12ab  "), None);
        assert_eq!(decode_ascii_float(b"  nan "), None);
        assert_eq!(decode_ascii_float(b" -1.25"), Some(-1.25));
    }

    #[test]
    fn test_policy() {
        let strict = FieldPolicy::Strict;
        let legacy = FieldPolicy::Legacy;
        assert!(strict.resolve::<i64>(None, "scene", "lines").is_err());
        assert_eq!(legacy.resolve::<i64>(None, "scene", "lines").unwrap(), 0);
        assert_eq!(strict.optional::<f64>(None), None);
        assert_eq!(legacy.optional::<f64>(None), Some(0.0));
    }

    #[test]
    fn test_encoders_pad_to_width() {
        assert_eq!(encode_ascii_int(42, 6).unwrap(), b"    42".to_vec());
        assert_eq!(encode_ascii_text("HRV", 5).unwrap(), b"HRV  ".to_vec());
        let real = encode_ascii_float(3.5, 8).unwrap();
        assert_eq!(real.len(), 8);
        assert_eq!(decode_ascii_float(&real), Some(3.5));
        assert!(encode_ascii_int(1_000_000, 4).is_err());
    }
}
