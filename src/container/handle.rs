//! Image handle
//!
//! Uniform pixel access over an open container of either family. The
//! handle exclusively owns the data files of its container; they are
//! released together when the handle is closed.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::cap::pixels::{accumulate_histogram, RecordStore};
use crate::cap::records::{
    check_image_agreement, stream_length, BandHistogram, BandQuality, CapDecoder, CapScene, ImageryDescriptor,
    Leader, TrailerSummary, VolumeDirectory,
};
use crate::cap::region::{ChannelDescriptor, RecordLayout, Window};
use crate::cap::writer::{encode_histogram, encode_imagery_descriptor, encode_trailer};
use crate::cap::constants::limits;
use crate::codec::FieldPolicy;
use crate::container::backend::{RasterBackend, RasterStore};
use crate::container::family::{check_imagery_reference, resolve_cap_files, resolve_dimap_files, CapFiles};
use crate::container::types::{ContainerKind, HandleState, ImageSpec};
use crate::dimap::keys;
use crate::errors::{SpotError, SpotResult};
use crate::metadata::builder::build_scene_metadata;
use crate::metadata::model::{RasterDescription, SceneMetadata};
use crate::utils::progress::ProgressTracker;

/// Decoded records and pixel store of an early-family container
struct CapStorage {
    files: CapFiles,
    volume: VolumeDirectory,
    leader: Leader,
    imagery: ImageryDescriptor,
    trailer: TrailerSummary,
    store: RecordStore<File>,
}

enum Storage {
    Cap(Box<CapStorage>),
    Raster { raster: RasterDescription, store: Box<dyn RasterStore> },
}

/// An open image of either container family
pub struct ImageHandle {
    kind: ContainerKind,
    state: HandleState,
    dir: PathBuf,
    spec: ImageSpec,
    channels: Vec<ChannelDescriptor>,
    swap: bool,
    /// Whether long scans draw a progress bar
    progress: bool,
    storage: Storage,
}

fn open_file(path: &Path, writable: bool) -> SpotResult<File> {
    Ok(OpenOptions::new().read(true).write(writable).open(path)?)
}

/// Checks the file sizes advertised by the volume directory
fn check_advertised_sizes(volume: &VolumeDirectory, files: &CapFiles) -> SpotResult<()> {
    for pointer in &volume.pointers {
        let name = pointer.file_name.to_ascii_uppercase();
        let path = [("LEAD", &files.leader), ("IMAG", &files.imagery), ("TRAI", &files.trailer)]
            .into_iter()
            .find(|(prefix, _)| name.starts_with(*prefix))
            .map(|(_, path)| path);
        let Some(path) = path else {
            warn!("Volume directory lists unknown file '{}'", pointer.file_name);
            continue;
        };
        let actual = fs::metadata(path)?.len();
        if actual != pointer.file_size {
            return Err(SpotError::FileSizeMismatch {
                file: pointer.file_name.clone(),
                advertised: pointer.file_size,
                actual,
            });
        }
    }
    Ok(())
}

impl ImageHandle {
    /// Opens an early-family container
    ///
    /// Every record is decoded and checked before pixel access is granted.
    pub(crate) fn open_cap(dir: &Path, policy: FieldPolicy, state: HandleState) -> SpotResult<Self> {
        let files = resolve_cap_files(dir)?;
        let decoder = CapDecoder::new(policy);

        let volume = decoder.decode_volume_directory(&mut File::open(&files.volume)?)?;
        decoder.check_null_volume(&mut File::open(&files.null_volume)?)?;
        check_advertised_sizes(&volume, &files)?;
        let leader = decoder.decode_leader(&mut File::open(&files.leader)?)?;
        let trailer = decoder.decode_trailer(&mut File::open(&files.trailer)?)?;

        let mut imagery_file = open_file(&files.imagery, state.is_writable())?;
        let imagery = decoder.decode_imagery_descriptor(&mut imagery_file)?;
        check_image_agreement(&leader.scene, &imagery)?;
        let layout = imagery.record_layout()?;
        let actual = stream_length(&mut imagery_file)?;
        if actual != layout.file_length() {
            return Err(SpotError::InconsistentLayout(format!(
                "imagery file is {} bytes, layout requires {}",
                actual,
                layout.file_length()
            )));
        }
        if trailer.bands.len() != imagery.band_count as usize {
            warn!("Trailer lists {} bands for a {}-band image", trailer.bands.len(), imagery.band_count);
        }

        let store = RecordStore::new(imagery_file, layout, imagery.byte_order);
        let spec = ImageSpec {
            lines: layout.lines,
            columns: layout.columns,
            bands: layout.channels,
            sample_bytes: layout.sample_bytes,
            byte_order: imagery.byte_order,
        };
        info!(
            "Opened {} container {}: {}x{}x{}",
            ContainerKind::Cap,
            dir.display(),
            spec.lines,
            spec.columns,
            spec.bands
        );
        Ok(ImageHandle {
            kind: ContainerKind::Cap,
            state,
            dir: dir.to_path_buf(),
            spec,
            channels: store.channels().to_vec(),
            swap: store.swaps_samples(),
            progress: false,
            storage: Storage::Cap(Box::new(CapStorage { files, volume, leader, imagery, trailer, store })),
        })
    }

    /// Opens a later-family container through the backend of its raster
    pub(crate) fn open_dimap(
        dir: &Path,
        backends: &[Box<dyn RasterBackend>],
        state: HandleState,
    ) -> SpotResult<Self> {
        let files = resolve_dimap_files(dir)?;
        let raster = keys::read_document(&files.document)?;
        let path = match (&files.imagery, raster.data_file.is_empty()) {
            (_, false) => {
                check_imagery_reference(&raster.data_file)?;
                dir.join(&raster.data_file)
            }
            (Some(path), true) => path.clone(),
            (None, true) => return Err(SpotError::MissingFile(format!("IMAGERY.* in {}", dir.display()))),
        };
        if !path.is_file() {
            return Err(SpotError::MissingFile(path.display().to_string()));
        }
        let backend = backend_for(backends, &path)?;
        let store = backend.open(&path, &raster, state.is_writable())?;
        info!("Opened {} container {}: {}x{}x{}", ContainerKind::Dimap, dir.display(), raster.rows, raster.columns, raster.bands);
        Ok(Self::from_raster(dir, raster, store, state))
    }

    pub(crate) fn from_raster(
        dir: &Path,
        raster: RasterDescription,
        store: Box<dyn RasterStore>,
        state: HandleState,
    ) -> Self {
        let spec = ImageSpec {
            lines: raster.rows,
            columns: raster.columns,
            bands: raster.bands,
            sample_bytes: raster.nbits / 8,
            byte_order: raster.byte_order,
        };
        let line_bytes = u64::from(raster.columns) * u64::from(spec.sample_bytes);
        let channels = (1..=raster.bands)
            .map(|band| ChannelDescriptor {
                channel: band,
                start_offset: raster.skip_bytes + u64::from(band - 1) * line_bytes,
                prefix_length: 0,
                line_stride: line_bytes * u64::from(raster.bands),
            })
            .collect();
        ImageHandle {
            kind: ContainerKind::Dimap,
            state,
            dir: dir.to_path_buf(),
            spec,
            channels,
            swap: store.swaps_samples(),
            progress: false,
            storage: Storage::Raster { raster, store },
        }
    }

    /// Returns the handle drawing a progress bar during bad-line scans
    pub fn with_progress(mut self, visible: bool) -> Self {
        self.progress = visible;
        self
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Dimensions and sample encoding of the image
    pub fn spec(&self) -> ImageSpec {
        self.spec
    }

    pub fn lines(&self) -> u32 {
        self.spec.lines
    }

    pub fn columns(&self) -> u32 {
        self.spec.columns
    }

    pub fn bands(&self) -> u32 {
        self.spec.bands
    }

    pub fn sample_bytes(&self) -> u32 {
        self.spec.sample_bytes
    }

    /// Per-band data source descriptors
    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    /// Whether stored samples differ from the machine byte order
    pub fn swaps_samples(&self) -> bool {
        self.swap
    }

    /// Reads a window of one band
    ///
    /// # Arguments
    /// * `band` - Band number, 1-based
    /// * `window` - 1-based window with optional subsampling
    ///
    /// # Returns
    /// Samples in machine order, lines major
    pub fn read(&mut self, band: u32, window: &Window) -> SpotResult<Vec<u8>> {
        match &mut self.storage {
            Storage::Cap(cap) => cap.store.read(band, window),
            Storage::Raster { store, .. } => store.read(band, window),
        }
    }

    /// Writes whole lines of one band
    ///
    /// Only handles opened for modification or freshly created accept writes.
    /// Early-family lines keep their recorded status.
    pub fn write(&mut self, band: u32, first_line: u32, lines: u32, samples: &[u8]) -> SpotResult<()> {
        if !self.state.is_writable() {
            return Err(SpotError::InvalidState(format!(
                "{} is open for reading only",
                self.dir.display()
            )));
        }
        match &mut self.storage {
            Storage::Cap(cap) => cap.store.write(band, first_line, lines, samples),
            Storage::Raster { store, .. } => store.write(band, first_line, lines, samples),
        }
    }

    /// Every record of an early-family container, bad lines included
    pub fn scene(&mut self) -> SpotResult<CapScene> {
        let visible = self.progress;
        match &mut self.storage {
            Storage::Cap(cap) => {
                let progress = scan_tracker(visible, cap.store.layout());
                Ok(CapScene {
                    volume: cap.volume.clone(),
                    leader: cap.leader.clone(),
                    imagery: cap.imagery.clone(),
                    trailer: cap.trailer.clone(),
                    bad_lines: cap.store.scan_bad_lines(&progress)?,
                    imagery_file: file_name(&cap.files.imagery),
                })
            }
            Storage::Raster { .. } => Err(SpotError::Unsupported(format!(
                "{} containers carry no scene records",
                self.kind
            ))),
        }
    }

    /// Scene metadata of the image
    ///
    /// Later-family images only describe their raster.
    pub fn metadata(&mut self) -> SpotResult<SceneMetadata> {
        if let Storage::Raster { raster, .. } = &self.storage {
            return Ok(SceneMetadata::skeleton(raster.clone()));
        }
        build_scene_metadata(&self.scene()?)
    }

    /// Flushes pending writes, patches close-time fields and releases the files
    pub fn close(self) -> SpotResult<()> {
        let writable = self.state.is_writable();
        let visible = self.progress;
        match self.storage {
            Storage::Cap(mut cap) => {
                if writable {
                    patch_cap(&mut cap, visible)?;
                }
                cap.store.flush()?;
            }
            Storage::Raster { mut store, .. } => store.flush()?,
        }
        info!("Closed {}", self.dir.display());
        Ok(())
    }
}

fn scan_tracker(visible: bool, layout: &RecordLayout) -> ProgressTracker {
    ProgressTracker::optional(visible, layout.record_count(), "Scanning line status")
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Backend registered for the extension of `path`
pub(crate) fn backend_for<'a>(backends: &'a [Box<dyn RasterBackend>], path: &Path) -> SpotResult<&'a dyn RasterBackend> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_uppercase())
        .unwrap_or_default();
    backends
        .iter()
        .find(|b| b.extension().eq_ignore_ascii_case(&extension))
        .map(|b| b.as_ref())
        .ok_or_else(|| SpotError::Unsupported(format!("no raster backend for .{} files", extension)))
}

/// Patches histograms, the written record count and line quality
///
/// Histograms are recomputed from the whole band for every band written
/// during the session.
fn patch_cap(cap: &mut CapStorage, visible: bool) -> SpotResult<()> {
    let written = cap.store.records_written();
    if written == 0 {
        debug!("Nothing written, no close-time patch");
        return Ok(());
    }

    let layout = cap.leader.layout();
    let record_layout = *cap.store.layout();
    let touched: Vec<u32> = cap
        .store
        .histograms()
        .iter()
        .enumerate()
        .filter(|(_, bins)| bins.iter().any(|c| *c > 0))
        .map(|(i, _)| i as u32 + 1)
        .collect();

    let mut leader_file = OpenOptions::new().write(true).open(&cap.files.leader)?;
    for band in touched {
        let mut bins = vec![0u64; limits::HISTOGRAM_BINS];
        for line in 1..=record_layout.lines {
            let samples = cap.store.read(band, &Window::new(line, 1, 1, record_layout.columns))?;
            accumulate_histogram(&mut bins, &samples, record_layout.sample_bytes);
        }
        let histogram = BandHistogram::from_counts(band, &bins);
        leader_file.seek(SeekFrom::Start(layout.histogram_offset(band)))?;
        leader_file.write_all(&encode_histogram(&histogram, &layout)?)?;
        cap.leader.histograms[band as usize - 1] = histogram;
        debug!("Patched histogram of band {}", band);
    }
    leader_file.flush()?;

    let previous = cap.imagery.records_written.unwrap_or(0).max(0) as u64;
    cap.imagery.records_written = Some(previous.max(written) as i64);
    let descriptor = encode_imagery_descriptor(&cap.imagery)?;
    let stream = cap.store.stream_mut();
    stream.seek(SeekFrom::Start(0))?;
    stream.write_all(&descriptor)?;

    let scan = cap.store.scan_bad_lines(&scan_tracker(visible, &record_layout))?;
    cap.trailer = TrailerSummary {
        bands: (1..=record_layout.channels)
            .map(|band| BandQuality { lost_lines: scan.lost_count(band), degraded_lines: scan.degraded_count(band) })
            .collect(),
    };
    let mut trailer_file = OpenOptions::new().write(true).open(&cap.files.trailer)?;
    trailer_file.write_all(&encode_trailer(&cap.trailer)?)?;
    trailer_file.flush()?;

    info!("Patched close-time fields: {} records written", written);
    Ok(())
}
