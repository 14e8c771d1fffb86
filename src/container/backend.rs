//! Raster backends of the later family
//!
//! A later-family container stores its pixels in `IMAGERY.<ext>`; the
//! format of that file is delegated to a [`RasterBackend`] selected by
//! extension. The supplied [`BilBackend`] handles raw band-interleaved-by-line
//! rasters.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace};

use crate::cap::region::Window;
use crate::errors::{SpotError, SpotResult};
use crate::io::byte_order::swap16;
use crate::metadata::model::RasterDescription;

/// Open raster of a later-family container
pub trait RasterStore: Send {
    /// Reads a window of one band, samples in machine order
    fn read(&mut self, band: u32, window: &Window) -> SpotResult<Vec<u8>>;

    /// Writes whole lines of one band, samples in machine order
    fn write(&mut self, band: u32, first_line: u32, lines: u32, samples: &[u8]) -> SpotResult<()>;

    fn flush(&mut self) -> SpotResult<()>;

    /// Whether samples are swapped between the file and the caller
    fn swaps_samples(&self) -> bool;
}

/// Creates and opens rasters of one file format
pub trait RasterBackend: Send + Sync {
    /// Upper-case extension of the raster files handled, e.g. `BIL`
    fn extension(&self) -> &str;

    /// Creates a zero-filled raster at `path`
    fn create(&self, path: &Path, raster: &RasterDescription) -> SpotResult<Box<dyn RasterStore>>;

    /// Opens an existing raster
    fn open(&self, path: &Path, raster: &RasterDescription, writable: bool) -> SpotResult<Box<dyn RasterStore>>;
}

/// Raw band-interleaved-by-line rasters
#[derive(Debug, Clone, Copy, Default)]
pub struct BilBackend;

impl BilBackend {
    pub const EXTENSION: &'static str = "BIL";
}

/// Byte length of a raw BIL raster, skipped header included
pub fn bil_length(raster: &RasterDescription) -> u64 {
    raster.skip_bytes
        + u64::from(raster.rows) * u64::from(raster.bands) * u64::from(raster.columns) * u64::from(raster.nbits / 8)
}

fn sample_bytes(raster: &RasterDescription) -> SpotResult<u32> {
    match raster.nbits {
        8 => Ok(1),
        16 => Ok(2),
        other => Err(SpotError::Unsupported(format!("{} bits per sample", other))),
    }
}

impl RasterBackend for BilBackend {
    fn extension(&self) -> &str {
        Self::EXTENSION
    }

    fn create(&self, path: &Path, raster: &RasterDescription) -> SpotResult<Box<dyn RasterStore>> {
        sample_bytes(raster)?;
        {
            let mut out = BufWriter::new(File::create(path)?);
            let line = vec![0u8; raster.columns as usize * (raster.nbits / 8) as usize];
            out.write_all(&vec![0u8; raster.skip_bytes as usize])?;
            for _ in 0..u64::from(raster.rows) * u64::from(raster.bands) {
                out.write_all(&line)?;
            }
            out.flush()?;
        }
        debug!("Created {} ({} bytes)", path.display(), bil_length(raster));
        self.open(path, raster, true)
    }

    fn open(&self, path: &Path, raster: &RasterDescription, writable: bool) -> SpotResult<Box<dyn RasterStore>> {
        let nbytes = sample_bytes(raster)?;
        let file = OpenOptions::new().read(true).write(writable).open(path)?;
        let actual = file.metadata()?.len();
        if actual < bil_length(raster) {
            return Err(SpotError::InconsistentLayout(format!(
                "{} is {} bytes, {} required",
                path.display(),
                actual,
                bil_length(raster)
            )));
        }
        Ok(Box::new(BilStore {
            file,
            swap: nbytes == 2 && raster.byte_order.differs_from_machine(),
            nbytes,
            raster: raster.clone(),
        }))
    }
}

struct BilStore {
    file: File,
    raster: RasterDescription,
    nbytes: u32,
    swap: bool,
}

impl BilStore {
    fn check_band(&self, band: u32) -> SpotResult<()> {
        if band == 0 || band > self.raster.bands {
            return Err(SpotError::InvalidWindow(format!("band {} outside 1..={}", band, self.raster.bands)));
        }
        Ok(())
    }

    /// Byte offset of the first sample of `line` in `band`
    fn line_offset(&self, band: u32, line: u32) -> u64 {
        let line_bytes = u64::from(self.raster.columns) * u64::from(self.nbytes);
        let index = u64::from(line - 1) * u64::from(self.raster.bands) + u64::from(band - 1);
        self.raster.skip_bytes + index * line_bytes
    }
}

impl RasterStore for BilStore {
    fn read(&mut self, band: u32, window: &Window) -> SpotResult<Vec<u8>> {
        window.validate(self.raster.rows, self.raster.columns)?;
        self.check_band(band)?;
        let nbytes = self.nbytes as usize;
        let mut line_buf = vec![0u8; window.columns as usize * nbytes];
        let mut out = Vec::with_capacity(window.output_lines() as usize * window.output_columns() as usize * nbytes);

        for line in window.line_numbers() {
            let position = self.line_offset(band, line) + u64::from(window.first_column - 1) * nbytes as u64;
            self.file.seek(SeekFrom::Start(position))?;
            self.file.read_exact(&mut line_buf)?;
            for sample in line_buf.chunks_exact(nbytes).step_by(window.column_step as usize) {
                out.extend_from_slice(sample);
            }
        }
        if self.swap {
            swap16(&mut out);
        }
        trace!("Read {} bytes from band {}", out.len(), band);
        Ok(out)
    }

    fn write(&mut self, band: u32, first_line: u32, lines: u32, samples: &[u8]) -> SpotResult<()> {
        Window::new(first_line, 1, lines, self.raster.columns).validate(self.raster.rows, self.raster.columns)?;
        self.check_band(band)?;
        let line_bytes = self.raster.columns as usize * self.nbytes as usize;
        if samples.len() != line_bytes * lines as usize {
            return Err(SpotError::InvalidWindow(format!(
                "{} bytes supplied for {} lines of {} bytes",
                samples.len(),
                lines,
                line_bytes
            )));
        }
        for (i, line_samples) in samples.chunks_exact(line_bytes).enumerate() {
            let mut payload = line_samples.to_vec();
            if self.swap {
                swap16(&mut payload);
            }
            self.file.seek(SeekFrom::Start(self.line_offset(band, first_line + i as u32)))?;
            self.file.write_all(&payload)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> SpotResult<()> {
        self.file.flush()?;
        Ok(())
    }

    fn swaps_samples(&self) -> bool {
        self.swap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::types::ImageSpec;
    use crate::io::byte_order::{machine_byte_order, ByteOrder};

    fn foreign_order() -> ByteOrder {
        match machine_byte_order() {
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
        }
    }

    #[test]
    fn test_bil_create_write_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMAGERY.BIL");
        let raster = RasterDescription::from_spec(&ImageSpec::new(4, 5, 2, 1), "IMAGERY.BIL");
        let mut store = BilBackend.create(&path, &raster).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 40);

        store.write(2, 3, 1, &[1, 2, 3, 4, 5]).unwrap();
        store.flush().unwrap();
        assert_eq!(store.read(2, &Window::new(3, 2, 1, 3)).unwrap(), vec![2, 3, 4]);
        assert_eq!(store.read(1, &Window::new(3, 1, 1, 5)).unwrap(), vec![0; 5]);

        // line 3 of band 2 starts after 2 lines of 2 bands and one line of band 1
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[25..30], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_bil_swaps_foreign_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMAGERY.BIL");
        let spec = ImageSpec::new(1, 2, 1, 2).with_byte_order(foreign_order());
        let raster = RasterDescription::from_spec(&spec, "IMAGERY.BIL");
        let mut store = BilBackend.create(&path, &raster).unwrap();
        assert!(store.swaps_samples());

        let samples: Vec<u8> = [0x0102u16, 0x0304].iter().flat_map(|v| v.to_ne_bytes()).collect();
        store.write(1, 1, 1, &samples).unwrap();
        assert_eq!(store.read(1, &Window::full(1, 2)).unwrap(), samples);

        let stored = std::fs::read(&path).unwrap();
        let expected: Vec<u8> = match foreign_order() {
            ByteOrder::BigEndian => vec![1, 2, 3, 4],
            ByteOrder::LittleEndian => vec![2, 1, 4, 3],
        };
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_bil_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMAGERY.BIL");
        std::fs::write(&path, [0u8; 10]).unwrap();
        let raster = RasterDescription::from_spec(&ImageSpec::new(4, 5, 2, 1), "IMAGERY.BIL");
        assert!(BilBackend.open(&path, &raster, false).is_err());
    }
}
