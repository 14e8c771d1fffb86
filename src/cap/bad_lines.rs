//! Bad line scan
//!
//! Each imagery data record carries a status byte in its prefix. Lines
//! whose status is not zero are reported per band as lost (status 1) or
//! degraded (any other value).

use std::io::{Read, SeekFrom};

use byteorder::{BigEndian, ByteOrder};
use log::{debug, info};

use crate::cap::constants::{framing, imagery};
use crate::cap::records::check_record_header;
use crate::cap::region::RecordLayout;
use crate::errors::{SpotError, SpotResult};
use crate::io::seekable::SeekableReader;
use crate::utils::progress::ProgressTracker;

/// Quality of one image line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Ok,
    Lost,
    Degraded,
}

impl LineStatus {
    pub fn from_byte(status: u8) -> Self {
        match status {
            0 => LineStatus::Ok,
            1 => LineStatus::Lost,
            _ => LineStatus::Degraded,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            LineStatus::Ok => 0,
            LineStatus::Lost => 1,
            LineStatus::Degraded => 2,
        }
    }

    /// Name used in metadata documents
    pub fn name(&self) -> &'static str {
        match self {
            LineStatus::Ok => "OK",
            LineStatus::Lost => "LOST",
            LineStatus::Degraded => "DEGRADED",
        }
    }
}

/// A line of a band whose status is not ok
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadLine {
    /// Line number, 1-based
    pub line: u32,
    pub status: LineStatus,
}

/// Bad lines of every band
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BadLineScan {
    bands: Vec<Vec<BadLine>>,
}

impl BadLineScan {
    /// Scan result with no bad line in any of `bands` bands
    pub fn clean(bands: u32) -> Self {
        BadLineScan { bands: vec![Vec::new(); bands as usize] }
    }

    /// Scan result from the bad lines of every band, in band order
    pub fn from_bands(bands: Vec<Vec<BadLine>>) -> Self {
        BadLineScan { bands }
    }

    /// Bad lines of `band` (1-based); empty for unknown bands
    pub fn bad_lines(&self, band: u32) -> &[BadLine] {
        band.checked_sub(1)
            .and_then(|i| self.bands.get(i as usize))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_bad_lines(&self, band: u32) -> bool {
        !self.bad_lines(band).is_empty()
    }

    pub fn band_count(&self) -> u32 {
        self.bands.len() as u32
    }

    fn count(&self, band: u32, status: LineStatus) -> u32 {
        self.bad_lines(band).iter().filter(|b| b.status == status).count() as u32
    }

    pub fn lost_count(&self, band: u32) -> u32 {
        self.count(band, LineStatus::Lost)
    }

    pub fn degraded_count(&self, band: u32) -> u32 {
        self.count(band, LineStatus::Degraded)
    }
}

/// Reads the status byte of every imagery record
///
/// # Arguments
/// * `reader` - Reader over the imagery file
/// * `layout` - Record layout decoded from the imagery descriptor
/// * `progress` - Advanced once per record
///
/// # Returns
/// The bad lines of every band, in line order
pub fn scan_bad_lines(
    reader: &mut dyn SeekableReader,
    layout: &RecordLayout,
    progress: &ProgressTracker,
) -> SpotResult<BadLineScan> {
    let mut scan = BadLineScan::clean(layout.channels);
    let mut prefix = [0u8; imagery::STATUS_OFFSET + 1];

    for line in 1..=layout.lines {
        for channel in 1..=layout.channels {
            let offset = layout.record_offset(line, channel);
            let number = u32::try_from(layout.record_index(line, channel) + 2)
                .map_err(|_| SpotError::InconsistentLayout("too many imagery records".to_string()))?;
            check_record_header(reader, "imagery", number, offset, layout.record_length(), framing::IMAGERY_SYNC)?;
            reader.seek(SeekFrom::Start(offset))?;
            reader.read_exact(&mut prefix)?;

            let stored_line = BigEndian::read_u32(&prefix[imagery::LINE_NUMBER_OFFSET..]);
            let stored_channel = BigEndian::read_u32(&prefix[imagery::CHANNEL_OFFSET..]);
            if stored_line != line || stored_channel != channel {
                return Err(SpotError::InconsistentLayout(format!(
                    "imagery record {} holds line {} channel {}, expected line {} channel {}",
                    number, stored_line, stored_channel, line, channel
                )));
            }

            let status = LineStatus::from_byte(prefix[imagery::STATUS_OFFSET]);
            if status != LineStatus::Ok {
                debug!("Band {} line {} is {}", channel, line, status.name());
                scan.bands[channel as usize - 1].push(BadLine { line, status });
            }
            progress.increment(1);
        }
    }
    progress.finish();

    let total: usize = scan.bands.iter().map(|b| b.len()).sum();
    if total > 0 {
        info!("Found {} bad lines", total);
    }
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap::writer::encode_imagery_record;
    use std::io::Cursor;

    fn imagery(layout: &RecordLayout, bad: &[(u32, u32, u8)]) -> Cursor<Vec<u8>> {
        let mut data = vec![0u8; layout.header_length as usize];
        let payload = vec![0u8; layout.payload_length() as usize];
        for line in 1..=layout.lines {
            for channel in 1..=layout.channels {
                let status = bad
                    .iter()
                    .find(|(l, c, _)| *l == line && *c == channel)
                    .map(|(_, _, s)| *s)
                    .unwrap_or(0);
                data.extend(encode_imagery_record(layout, line, channel, status, &payload).unwrap());
            }
        }
        Cursor::new(data)
    }

    #[test]
    fn test_statuses_are_reported_per_band() {
        let layout = RecordLayout::new(10, 20, 3, 1);
        let mut reader = imagery(&layout, &[(5, 2, 1), (7, 2, 9), (1, 3, 2)]);
        let progress = ProgressTracker::hidden(layout.record_count());
        let scan = scan_bad_lines(&mut reader, &layout, &progress).unwrap();
        assert_eq!(progress.position(), 30);

        assert!(!scan.has_bad_lines(1));
        assert_eq!(
            scan.bad_lines(2),
            &[
                BadLine { line: 5, status: LineStatus::Lost },
                BadLine { line: 7, status: LineStatus::Degraded },
            ]
        );
        assert_eq!(scan.lost_count(2), 1);
        assert_eq!(scan.degraded_count(3), 1);
        assert!(scan.bad_lines(9).is_empty());
    }

    #[test]
    fn test_corrupted_sync_is_fatal() {
        let layout = RecordLayout::new(2, 4, 1, 1);
        let mut reader = imagery(&layout, &[]);
        let offset = layout.record_offset(2, 1) as usize;
        reader.get_mut()[offset + 4] = 0x00;
        let err = scan_bad_lines(&mut reader, &layout, &ProgressTracker::hidden(2)).unwrap_err();
        assert!(matches!(err, SpotError::SyncMismatch { record: 3, .. }));
    }
}
