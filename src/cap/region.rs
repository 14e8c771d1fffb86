//! Record addressing
//!
//! Every record of the leader and every imagery data record is addressed
//! absolutely from values decoded once at open time. Nothing depends on
//! the current stream position.

use crate::cap::constants::{calibration, lengths};
use crate::errors::{SpotError, SpotResult};

/// Length of a calibration record for the given slot count and table length
pub fn calibration_record_length(slots: u32, table_length: u32) -> u64 {
    lengths::CALIBRATION_FIXED_PART + u64::from(slots) * (4 + 2 * u64::from(table_length))
}

/// Position of every record of the leader file
///
/// Record order: descriptor, scene header, ephemeris/attitude, one
/// calibration record per band, modelization, one histogram per band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderLayout {
    pub bands: u32,
    pub calibration_length: u64,
}

impl LeaderLayout {
    /// Layout of a leader written with the legacy table geometry
    pub fn legacy(bands: u32) -> Self {
        LeaderLayout {
            bands,
            calibration_length: calibration_record_length(
                calibration::SLOT_COUNT,
                calibration::TABLE_LENGTH,
            ),
        }
    }

    pub fn scene_header_offset(&self) -> u64 {
        lengths::LEADER_RECORD
    }

    pub fn ephemeris_offset(&self) -> u64 {
        2 * lengths::LEADER_RECORD
    }

    /// Offset of the calibration record of band `band` (1-based)
    pub fn calibration_offset(&self, band: u32) -> u64 {
        3 * lengths::LEADER_RECORD + u64::from(band - 1) * self.calibration_length
    }

    pub fn modelization_offset(&self) -> u64 {
        3 * lengths::LEADER_RECORD + u64::from(self.bands) * self.calibration_length
    }

    /// Offset of the histogram record of band `band` (1-based)
    pub fn histogram_offset(&self, band: u32) -> u64 {
        self.modelization_offset()
            + lengths::LEADER_RECORD
            + u64::from(band - 1) * lengths::HISTOGRAM_RECORD
    }

    /// Sequence number of the calibration record of band `band`
    pub fn calibration_record_number(&self, band: u32) -> u32 {
        3 + band
    }

    pub fn modelization_record_number(&self) -> u32 {
        4 + self.bands
    }

    pub fn histogram_record_number(&self, band: u32) -> u32 {
        4 + self.bands + band
    }

    pub fn record_count(&self) -> u32 {
        4 + 2 * self.bands
    }

    /// Total size of the leader file in bytes
    pub fn file_length(&self) -> u64 {
        self.histogram_offset(self.bands + 1)
    }
}

/// Geometry of the imagery file
///
/// One physical record per (line, channel) pair, lines major. Each record
/// carries a fixed prefix, `columns * sample_bytes` pixel bytes and a
/// fixed suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub header_length: u64,
    pub prefix_length: u64,
    pub suffix_length: u64,
    pub lines: u32,
    pub columns: u32,
    pub channels: u32,
    pub sample_bytes: u32,
}

impl RecordLayout {
    /// Creates the layout written by this crate
    pub fn new(lines: u32, columns: u32, channels: u32, sample_bytes: u32) -> Self {
        RecordLayout {
            header_length: lengths::DIRECTORY_RECORD,
            prefix_length: lengths::IMAGERY_PREFIX,
            suffix_length: lengths::IMAGERY_SUFFIX,
            lines,
            columns,
            channels,
            sample_bytes,
        }
    }

    /// Checks the record length advertised by the imagery descriptor
    pub fn validate_record_length(&self, advertised: u64) -> SpotResult<()> {
        if advertised != self.record_length() {
            return Err(SpotError::InconsistentLayout(format!(
                "imagery record length {} does not match prefix {} + {} samples of {} bytes + suffix {}",
                advertised, self.prefix_length, self.columns, self.sample_bytes, self.suffix_length
            )));
        }
        Ok(())
    }

    /// Bytes of pixel data in one record
    pub fn payload_length(&self) -> u64 {
        u64::from(self.columns) * u64::from(self.sample_bytes)
    }

    /// Length of one physical record
    pub fn record_length(&self) -> u64 {
        self.prefix_length + self.payload_length() + self.suffix_length
    }

    /// Zero-based index of the record holding `line` of `channel` (both 1-based)
    pub fn record_index(&self, line: u32, channel: u32) -> u64 {
        u64::from(line - 1) * u64::from(self.channels) + u64::from(channel - 1)
    }

    /// Absolute offset of the record holding `line` of `channel`
    pub fn record_offset(&self, line: u32, channel: u32) -> u64 {
        self.header_length + self.record_index(line, channel) * self.record_length()
    }

    /// Absolute offset of the first pixel of `line` of `channel`
    pub fn pixel_offset(&self, line: u32, channel: u32) -> u64 {
        self.record_offset(line, channel) + self.prefix_length
    }

    pub fn record_count(&self) -> u64 {
        u64::from(self.lines) * u64::from(self.channels)
    }

    /// Total size of the imagery file in bytes
    pub fn file_length(&self) -> u64 {
        self.header_length + self.record_count() * self.record_length()
    }

    /// One descriptor per channel, in channel order
    pub fn channel_descriptors(&self) -> Vec<ChannelDescriptor> {
        (1..=self.channels)
            .map(|channel| ChannelDescriptor {
                channel,
                start_offset: self.record_offset(1, channel),
                prefix_length: self.prefix_length,
                line_stride: self.record_length() * u64::from(self.channels),
            })
            .collect()
    }
}

/// Where the records of one channel live in the imagery file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Channel number, 1-based
    pub channel: u32,
    /// Offset of the record holding line 1
    pub start_offset: u64,
    /// Bytes to skip inside a record before the pixels
    pub prefix_length: u64,
    /// Distance between two consecutive lines of this channel
    pub line_stride: u64,
}

impl ChannelDescriptor {
    /// Absolute offset of the first pixel of `line` (1-based)
    pub fn pixel_offset(&self, line: u32) -> u64 {
        self.start_offset + u64::from(line - 1) * self.line_stride + self.prefix_length
    }
}

/// A rectangular pixel window with optional subsampling
///
/// Lines and columns are 1-based. A step of 1 reads every pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First line to read (1-based)
    pub first_line: u32,
    /// First column to read (1-based)
    pub first_column: u32,
    /// Number of lines covered by the window
    pub lines: u32,
    /// Number of columns covered by the window
    pub columns: u32,
    /// Line subsampling step
    pub line_step: u32,
    /// Column subsampling step
    pub column_step: u32,
}

impl Window {
    /// Create a window without subsampling
    ///
    /// # Arguments
    /// * `first_line` - First line, 1-based
    /// * `first_column` - First column, 1-based
    /// * `lines` - Number of lines
    /// * `columns` - Number of columns
    pub fn new(first_line: u32, first_column: u32, lines: u32, columns: u32) -> Self {
        Window { first_line, first_column, lines, columns, line_step: 1, column_step: 1 }
    }

    /// Whole image window
    pub fn full(lines: u32, columns: u32) -> Self {
        Window::new(1, 1, lines, columns)
    }

    /// Returns the same window with subsampling steps
    pub fn with_steps(mut self, line_step: u32, column_step: u32) -> Self {
        self.line_step = line_step;
        self.column_step = column_step;
        self
    }

    /// Last line covered by the window (inclusive)
    pub fn end_line(&self) -> u32 {
        self.first_line + self.lines - 1
    }

    /// Last column covered by the window (inclusive)
    pub fn end_column(&self) -> u32 {
        self.first_column + self.columns - 1
    }

    /// Number of lines actually returned after subsampling
    pub fn output_lines(&self) -> u32 {
        (self.lines + self.line_step - 1) / self.line_step
    }

    /// Number of columns actually returned after subsampling
    pub fn output_columns(&self) -> u32 {
        (self.columns + self.column_step - 1) / self.column_step
    }

    /// Iterates the 1-based line numbers read by the window
    pub fn line_numbers(&self) -> impl Iterator<Item = u32> {
        (self.first_line..=self.end_line()).step_by(self.line_step as usize)
    }

    /// Checks the window against the image dimensions
    pub fn validate(&self, image_lines: u32, image_columns: u32) -> SpotResult<()> {
        if self.first_line == 0 || self.first_column == 0 {
            return Err(SpotError::InvalidWindow(format!(
                "window origin ({}, {}) is not 1-based",
                self.first_line, self.first_column
            )));
        }
        if self.lines == 0 || self.columns == 0 {
            return Err(SpotError::InvalidWindow("window is empty".to_string()));
        }
        if self.line_step == 0 || self.column_step == 0 {
            return Err(SpotError::InvalidWindow("subsampling step of zero".to_string()));
        }
        if u64::from(self.first_line) + u64::from(self.lines) - 1 > u64::from(image_lines)
            || u64::from(self.first_column) + u64::from(self.columns) - 1 > u64::from(image_columns)
        {
            return Err(SpotError::InvalidWindow(format!(
                "window {}x{} at ({}, {}) exceeds image {}x{}",
                self.lines, self.columns, self.first_line, self.first_column, image_lines, image_columns
            )));
        }
        Ok(())
    }
}
