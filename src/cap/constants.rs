//! CAP container constants
//!
//! Record framing, record lengths and file names of the SPOT 1-4 CAP
//! layout, replacing magic numbers in the decoder and the writer.

/// Record framing shared by every file of the container
pub mod framing {
    /// Length of the record header (sequence number, sync, length)
    pub const HEADER_LENGTH: usize = 12;

    /// Sync bytes of directory, leader and trailer records
    pub const RECORD_SYNC: [u8; 4] = [0x1F, 0xC0, 0x12, 0x12];

    /// Sync bytes of imagery data records
    pub const IMAGERY_SYNC: [u8; 4] = [0xED, 0xED, 0x12, 0x12];

    /// Superstructure identifier written in every descriptor record
    pub const DOCUMENT_ID: &str = "CCB-CCT-0002";
}

/// Record lengths in bytes
pub mod lengths {
    /// Volume directory, null volume and imagery descriptor records
    pub const DIRECTORY_RECORD: u64 = 360;

    /// Leader descriptor, scene header, ephemeris and modelization records
    pub const LEADER_RECORD: u64 = 3960;

    /// One histogram record per band
    pub const HISTOGRAM_RECORD: u64 = 1072;

    /// Trailer record
    pub const TRAILER_RECORD: u64 = 360;

    /// Fixed ASCII part of a calibration record, before the table slots
    pub const CALIBRATION_FIXED_PART: u64 = 734;

    /// Bytes before the pixel payload of an imagery record
    pub const IMAGERY_PREFIX: u64 = 32;

    /// Bytes after the pixel payload (sample count and padding)
    pub const IMAGERY_SUFFIX: u64 = 8;
}

/// Radiometric calibration tables
pub mod calibration {
    /// Table slots per band in the legacy layout
    pub const SLOT_COUNT: u32 = 16;

    /// Entries per table in the legacy layout
    pub const TABLE_LENGTH: u32 = 1500;

    /// Slot kind flag for a gain table
    pub const KIND_GAIN: u32 = 1;

    /// Slot kind flag for a dark current table
    pub const KIND_DARK: u32 = 2;

    /// Fixed-point scale of gain entries
    pub const GAIN_SCALE: f64 = 1.0 / 10_000.0;

    /// Fixed-point scale of dark current entries
    pub const DARK_SCALE: f64 = 1.0 / 10.0;

    /// Spectral sensitivity points reserved per band
    pub const SPECTRAL_POINTS: usize = 64;
}

/// Capacities of the repeated groups of the leader
pub mod limits {
    pub const MAX_EPHEMERIS_POINTS: usize = 9;
    pub const MAX_COARSE_ATTITUDE: usize = 73;
    pub const MAX_FINE_ATTITUDE: usize = 2;
    pub const MAX_LOOK_ANGLE_BANDS: usize = 4;
    pub const MAX_TRAILER_BANDS: usize = 16;
    pub const MAX_BANDS: u32 = 16;
    pub const HISTOGRAM_BINS: usize = 256;
}

/// Byte offsets inside an imagery record prefix
pub mod imagery {
    pub const LINE_NUMBER_OFFSET: usize = 12;
    pub const CHANNEL_OFFSET: usize = 16;
    pub const STATUS_OFFSET: usize = 20;
    pub const INTERLEAVING: &str = "BIL";
}

/// File names written by the encoder
pub mod files {
    pub const VOLUME: &str = "VOLD_01.DAT";
    pub const NULL_VOLUME: &str = "NULL_01.DAT";
    pub const LEADER: &str = "LEAD_01.DAT";
    pub const IMAGERY: &str = "IMAG_01.DAT";
    pub const TRAILER: &str = "TRAI_01.DAT";
}
