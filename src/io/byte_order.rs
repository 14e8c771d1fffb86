//! Byte order handling for SPOT containers
//!
//! Binary integers of the record framing are always big-endian. Pixel
//! samples and calibration tables are stored in the order recorded by the
//! container and are swapped in place when that order differs from the
//! machine order, which is detected once per process.

use lazy_static::lazy_static;
use log::debug;

/// Represents a byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (Intel)
    LittleEndian,
    /// Big-endian byte order (Motorola)
    BigEndian,
}

lazy_static! {
    static ref MACHINE_ORDER: ByteOrder = {
        let order = if 1u16.to_ne_bytes()[0] == 1 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        debug!("Detected machine byte order: {}", order.name());
        order
    };
}

/// Returns the byte order of the running machine
///
/// Detection runs once; later calls return the memoized value.
pub fn machine_byte_order() -> ByteOrder {
    *MACHINE_ORDER
}

impl ByteOrder {
    /// Returns a string representation of this byte order
    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (LE)",
            ByteOrder::BigEndian => "Big Endian (BE)",
        }
    }

    /// Two-letter code stored in the imagery descriptor record
    pub fn cap_code(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "LE",
            ByteOrder::BigEndian => "BE",
        }
    }

    /// Parses the imagery descriptor code; blank means big-endian
    pub fn from_cap_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "LE" => Some(ByteOrder::LittleEndian),
            "BE" | "" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Single-letter `BYTEORDER` value of a DIMAP document
    pub fn dimap_code(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "I",
            ByteOrder::BigEndian => "M",
        }
    }

    /// Parses a DIMAP `BYTEORDER` value
    pub fn from_dimap_code(code: &str) -> Option<Self> {
        match code.trim() {
            "I" | "i" => Some(ByteOrder::LittleEndian),
            "M" | "m" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Whether data stored in this order must be swapped on this machine
    pub fn differs_from_machine(&self) -> bool {
        *self != machine_byte_order()
    }
}

/// Swaps every 16-bit word of the buffer in place
///
/// A trailing odd byte is left untouched.
pub fn swap16(buf: &mut [u8]) {
    for word in buf.chunks_exact_mut(2) {
        word.swap(0, 1);
    }
}

/// Swaps every 32-bit word of the buffer in place
pub fn swap32(buf: &mut [u8]) {
    for word in buf.chunks_exact_mut(4) {
        word.reverse();
    }
}

/// Decodes a table of 2-byte signed integers stored in `stored` order
pub fn decode_i16_table(raw: &mut [u8], stored: ByteOrder) -> Vec<i16> {
    if stored.differs_from_machine() {
        swap16(raw);
    }
    raw.chunks_exact(2)
        .map(|w| i16::from_ne_bytes([w[0], w[1]]))
        .collect()
}

/// Encodes a table of 2-byte signed integers in `stored` order
pub fn encode_i16_table(values: &[i16], stored: ByteOrder) -> Vec<u8> {
    let mut raw: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    if stored.differs_from_machine() {
        swap16(&mut raw);
    }
    raw
}
