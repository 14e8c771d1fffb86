//! Pixel access over CAP imagery records
//!
//! Reads and writes whole lines of one channel at absolute offsets derived
//! from the record layout. Two-byte samples are swapped when the stored
//! order differs from the machine order. Every write feeds a 256-bin
//! histogram per channel that is patched into the leader at close.

use std::io::{Read, Seek, SeekFrom, Write};

use log::trace;

use crate::cap::bad_lines::{scan_bad_lines, BadLineScan};
use crate::cap::constants::{imagery, limits};
use crate::cap::region::{ChannelDescriptor, RecordLayout, Window};
use crate::cap::writer::encode_imagery_record;
use crate::errors::{SpotError, SpotResult};
use crate::io::byte_order::{swap16, ByteOrder};
use crate::io::seekable::SeekableStream;
use crate::utils::progress::ProgressTracker;

/// Adds the samples of a line to a 256-bin histogram
///
/// Samples are in machine order. Two-byte samples are binned by their
/// high byte.
pub fn accumulate_histogram(bins: &mut [u64], samples: &[u8], sample_bytes: u32) {
    if sample_bytes == 2 {
        for pair in samples.chunks_exact(2) {
            let value = u16::from_ne_bytes([pair[0], pair[1]]);
            bins[usize::from(value >> 8)] += 1;
        }
    } else {
        for value in samples {
            bins[usize::from(*value)] += 1;
        }
    }
}

/// Line-oriented access to the records of an imagery file
pub struct RecordStore<S: SeekableStream> {
    stream: S,
    layout: RecordLayout,
    channels: Vec<ChannelDescriptor>,
    stored_order: ByteOrder,
    swap: bool,
    /// Stream position after the last access, to skip redundant seeks
    cursor: Option<u64>,
    histograms: Vec<Vec<u64>>,
    written: Vec<bool>,
}

impl<S: SeekableStream> RecordStore<S> {
    /// Wraps an imagery stream
    ///
    /// # Arguments
    /// * `stream` - Stream over the imagery file
    /// * `layout` - Record layout decoded from the imagery descriptor
    /// * `stored_order` - Byte order of the samples in the file
    pub fn new(stream: S, layout: RecordLayout, stored_order: ByteOrder) -> Self {
        RecordStore {
            stream,
            channels: layout.channel_descriptors(),
            layout,
            stored_order,
            swap: layout.sample_bytes == 2 && stored_order.differs_from_machine(),
            cursor: None,
            histograms: vec![vec![0; limits::HISTOGRAM_BINS]; layout.channels as usize],
            written: vec![false; layout.record_count() as usize],
        }
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    pub fn stored_order(&self) -> ByteOrder {
        self.stored_order
    }

    /// Whether samples are swapped between the file and the caller
    pub fn swaps_samples(&self) -> bool {
        self.swap
    }

    /// Histograms accumulated by the writes of this session
    pub fn histograms(&self) -> &[Vec<u64>] {
        &self.histograms
    }

    /// Number of distinct records written in this session
    pub fn records_written(&self) -> u64 {
        self.written.iter().filter(|w| **w).count() as u64
    }

    fn channel(&self, channel: u32) -> SpotResult<ChannelDescriptor> {
        channel
            .checked_sub(1)
            .and_then(|i| self.channels.get(i as usize))
            .copied()
            .ok_or_else(|| {
                SpotError::InvalidWindow(format!(
                    "channel {} outside 1..={}",
                    channel, self.layout.channels
                ))
            })
    }

    fn seek_to(&mut self, position: u64) -> SpotResult<()> {
        if self.cursor.take() != Some(position) {
            self.stream.seek(SeekFrom::Start(position))?;
        }
        Ok(())
    }

    /// Reads a window of one channel
    ///
    /// # Returns
    /// `output_lines * output_columns` samples in machine order, lines
    /// major
    pub fn read(&mut self, channel: u32, window: &Window) -> SpotResult<Vec<u8>> {
        window.validate(self.layout.lines, self.layout.columns)?;
        let descriptor = self.channel(channel)?;
        let nbytes = self.layout.sample_bytes as usize;
        let mut line_buf = vec![0u8; window.columns as usize * nbytes];
        let mut out = Vec::with_capacity(
            window.output_lines() as usize * window.output_columns() as usize * nbytes,
        );

        for line in window.line_numbers() {
            let position = descriptor.pixel_offset(line) + u64::from(window.first_column - 1) * nbytes as u64;
            self.seek_to(position)?;
            self.stream.read_exact(&mut line_buf)?;
            self.cursor = Some(position + line_buf.len() as u64);

            if window.column_step == 1 {
                out.extend_from_slice(&line_buf);
            } else {
                for sample in line_buf.chunks_exact(nbytes).step_by(window.column_step as usize) {
                    out.extend_from_slice(sample);
                }
            }
        }
        if self.swap {
            swap16(&mut out);
        }
        trace!("Read {} bytes from channel {}", out.len(), channel);
        Ok(out)
    }

    /// Status byte of the record starting at `position`
    fn stored_status(&mut self, position: u64) -> SpotResult<u8> {
        let mut status = [0u8; 1];
        let at = position + imagery::STATUS_OFFSET as u64;
        self.seek_to(at)?;
        self.stream.read_exact(&mut status)?;
        self.cursor = Some(at + 1);
        Ok(status[0])
    }

    /// Writes whole lines of one channel
    ///
    /// The status byte of each rewritten record is kept.
    ///
    /// # Arguments
    /// * `channel` - Channel number, 1-based
    /// * `first_line` - First line written, 1-based
    /// * `lines` - Number of lines
    /// * `samples` - `lines * columns` samples in machine order
    pub fn write(&mut self, channel: u32, first_line: u32, lines: u32, samples: &[u8]) -> SpotResult<()> {
        Window::new(first_line, 1, lines, self.layout.columns).validate(self.layout.lines, self.layout.columns)?;
        self.channel(channel)?;
        let line_bytes = self.layout.payload_length() as usize;
        if samples.len() != line_bytes * lines as usize {
            return Err(SpotError::InvalidWindow(format!(
                "{} bytes supplied for {} lines of {} bytes",
                samples.len(),
                lines,
                line_bytes
            )));
        }

        for (i, line_samples) in samples.chunks_exact(line_bytes).enumerate() {
            let line = first_line + i as u32;
            accumulate_histogram(&mut self.histograms[channel as usize - 1], line_samples, self.layout.sample_bytes);

            let mut payload = line_samples.to_vec();
            if self.swap {
                swap16(&mut payload);
            }
            let position = self.layout.record_offset(line, channel);
            let status = self.stored_status(position)?;
            let record = encode_imagery_record(&self.layout, line, channel, status, &payload)?;
            self.seek_to(position)?;
            self.stream.write_all(&record)?;
            self.cursor = Some(position + record.len() as u64);
            self.written[self.layout.record_index(line, channel) as usize] = true;
        }
        Ok(())
    }

    /// Scans the status byte of every record
    pub fn scan_bad_lines(&mut self, progress: &ProgressTracker) -> SpotResult<BadLineScan> {
        self.cursor = None;
        scan_bad_lines(&mut self.stream, &self.layout, progress)
    }

    /// Direct access to the underlying stream for descriptor patches
    pub fn stream_mut(&mut self) -> &mut S {
        self.cursor = None;
        &mut self.stream
    }

    pub fn flush(&mut self) -> SpotResult<()> {
        self.stream.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::byte_order::machine_byte_order;
    use std::io::Cursor;

    fn store(lines: u32, columns: u32, channels: u32, nbytes: u32, order: ByteOrder) -> RecordStore<Cursor<Vec<u8>>> {
        let layout = RecordLayout::new(lines, columns, channels, nbytes);
        let mut data = vec![0u8; layout.header_length as usize];
        let zeros = vec![0u8; layout.payload_length() as usize];
        for line in 1..=lines {
            for channel in 1..=channels {
                data.extend(encode_imagery_record(&layout, line, channel, 0, &zeros).unwrap());
            }
        }
        RecordStore::new(Cursor::new(data), layout, order)
    }

    #[test]
    fn test_write_then_read_window() {
        let mut store = store(10, 20, 3, 1, ByteOrder::BigEndian);
        let line: Vec<u8> = (0..20).collect();
        store.write(2, 5, 1, &line).unwrap();

        let got = store.read(2, &Window::new(5, 3, 1, 4)).unwrap();
        assert_eq!(got, vec![2, 3, 4, 5]);
        // other channels of the same line are untouched
        assert_eq!(store.read(1, &Window::new(5, 1, 1, 20)).unwrap(), vec![0; 20]);
        assert_eq!(store.records_written(), 1);
        assert_eq!(store.histograms()[1][7], 1);
        assert_eq!(store.histograms()[0].iter().sum::<u64>(), 0);
    }

    #[test]
    fn test_rewrite_keeps_line_status() {
        let mut store = store(3, 4, 2, 1, ByteOrder::BigEndian);
        let status_at = (store.layout().record_offset(2, 2) as usize) + imagery::STATUS_OFFSET;
        store.stream_mut().get_mut()[status_at] = 1;

        store.write(2, 1, 3, &[5; 12]).unwrap();
        let scan = store.scan_bad_lines(&ProgressTracker::hidden(6)).unwrap();
        assert_eq!(scan.lost_count(2), 1);
        assert_eq!(scan.bad_lines(2)[0].line, 2);
        assert_eq!(store.read(2, &Window::new(2, 1, 1, 4)).unwrap(), vec![5; 4]);
    }

    #[test]
    fn test_subsampled_read() {
        let mut store = store(4, 6, 1, 1, ByteOrder::BigEndian);
        let image: Vec<u8> = (0..24).collect();
        store.write(1, 1, 4, &image).unwrap();
        let got = store.read(1, &Window::new(1, 1, 4, 6).with_steps(2, 3)).unwrap();
        assert_eq!(got, vec![0, 3, 12, 15]);
    }

    #[test]
    fn test_two_byte_samples_are_swapped_when_orders_differ() {
        let foreign = match machine_byte_order() {
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
        };
        let mut store = store(1, 2, 1, 2, foreign);
        assert!(store.swaps_samples());
        let samples: Vec<u8> = [0x0102u16, 0xA0B0].iter().flat_map(|v| v.to_ne_bytes()).collect();
        store.write(1, 1, 1, &samples).unwrap();

        assert_eq!(store.read(1, &Window::new(1, 1, 1, 2)).unwrap(), samples);
        let raw = store.into_inner().into_inner();
        let pixel = 360 + 32;
        let stored: Vec<u8> = [0x0102u16, 0xA0B0].iter().flat_map(|v| match foreign {
            ByteOrder::LittleEndian => v.to_le_bytes(),
            ByteOrder::BigEndian => v.to_be_bytes(),
        }).collect();
        assert_eq!(&raw[pixel..pixel + 4], stored.as_slice());
    }

    #[test]
    fn test_invalid_accesses() {
        let mut store = store(3, 4, 2, 1, ByteOrder::BigEndian);
        assert!(store.read(3, &Window::new(1, 1, 1, 1)).is_err());
        assert!(store.read(1, &Window::new(3, 1, 2, 1)).is_err());
        assert!(store.write(1, 3, 2, &[0; 8]).is_err());
        assert!(store.write(1, 1, 1, &[0; 3]).is_err());
    }

    #[test]
    fn test_histogram_uses_high_byte() {
        let mut bins = vec![0u64; 256];
        let samples: Vec<u8> = [0x1234u16, 0x12FF, 0x0001].iter().flat_map(|v| v.to_ne_bytes()).collect();
        accumulate_histogram(&mut bins, &samples, 2);
        assert_eq!(bins[0x12], 2);
        assert_eq!(bins[0], 1);
    }
}
