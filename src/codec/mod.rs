//! Primitive field codecs
//!
//! ASCII numeric fields, degrees-minutes-seconds angles and Julian dates.

pub mod ascii;
pub mod angle_time;

pub use ascii::{decode_ascii_float, decode_ascii_int, decode_ascii_text, FieldPolicy};
pub use angle_time::{
    calendar_to_julian, decimal_degrees_to_dms, degrees_to_radians, dms_to_decimal_degrees,
    julian_to_calendar, offset_timestamp,
};
