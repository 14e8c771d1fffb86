//! Container lifecycle manager
//!
//! Opens, creates, closes, deletes and translates containers of both
//! families, and lists the containers found under a directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::cap::writer::{write_container, CapProduct};
use crate::codec::FieldPolicy;
use crate::container::backend::{BilBackend, RasterBackend};
use crate::container::family::{check_family, discover_kind};
use crate::container::handle::ImageHandle;
use crate::container::types::{ContainerKind, HandleState, ImageSpec};
use crate::dimap::document::{build_document, skeleton_document, write_document, DOCUMENT_FILE};
use crate::errors::{SpotError, SpotResult};
use crate::metadata::model::{RasterDescription, SceneMetadata};

/// A container found by [`ContainerManager::list_images`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    pub path: PathBuf,
    pub kind: ContainerKind,
}

/// Entry point for every container operation
pub struct ContainerManager {
    policy: FieldPolicy,
    backends: Vec<Box<dyn RasterBackend>>,
    progress: bool,
}

impl Default for ContainerManager {
    fn default() -> Self {
        Self::new(FieldPolicy::default())
    }
}

impl ContainerManager {
    /// Create a manager with the raw BIL backend registered
    ///
    /// # Arguments
    /// * `policy` - How blank required fields of early-family records are resolved
    pub fn new(policy: FieldPolicy) -> Self {
        ContainerManager { policy, backends: vec![Box::new(BilBackend)], progress: false }
    }

    /// Makes handles draw a progress bar during bad-line scans
    pub fn with_progress(mut self, visible: bool) -> Self {
        self.progress = visible;
        self
    }

    /// Registers another later-family raster backend
    ///
    /// The first registered backend is used to create new rasters.
    pub fn with_backend(mut self, backend: Box<dyn RasterBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn policy(&self) -> FieldPolicy {
        self.policy
    }

    fn open(&self, dir: &Path, declared: Option<ContainerKind>, state: HandleState) -> SpotResult<ImageHandle> {
        let kind = check_family(dir, declared)?;
        let handle = match kind {
            ContainerKind::Cap => ImageHandle::open_cap(dir, self.policy, state)?,
            ContainerKind::Dimap => ImageHandle::open_dimap(dir, &self.backends, state)?,
        };
        Ok(handle.with_progress(self.progress))
    }

    /// Opens a container for reading
    ///
    /// # Arguments
    /// * `dir` - Container directory
    /// * `declared` - Expected family; checked before any data file is opened
    pub fn open_read(&self, dir: &Path, declared: Option<ContainerKind>) -> SpotResult<ImageHandle> {
        self.open(dir, declared, HandleState::OpenForRead)
    }

    /// Opens a container for reading and writing pixels
    pub fn open_modify(&self, dir: &Path, declared: Option<ContainerKind>) -> SpotResult<ImageHandle> {
        self.open(dir, declared, HandleState::OpenForModify)
    }

    /// Creates an empty container
    ///
    /// The directory must not exist. On failure, whatever was created is
    /// removed.
    pub fn create(&self, dir: &Path, kind: ContainerKind, spec: &ImageSpec) -> SpotResult<ImageHandle> {
        match kind {
            ContainerKind::Cap => self.create_cap(dir, &CapProduct::blank(spec)),
            ContainerKind::Dimap => self.guarded_create(dir, |dir| self.create_dimap(dir, spec)),
        }
    }

    /// Creates an early-family container carrying the records of `product`
    pub fn create_cap(&self, dir: &Path, product: &CapProduct) -> SpotResult<ImageHandle> {
        self.guarded_create(dir, |dir| {
            write_container(dir, product)?;
            Ok(ImageHandle::open_cap(dir, self.policy, HandleState::Created)?.with_progress(self.progress))
        })
    }

    fn guarded_create<F>(&self, dir: &Path, create: F) -> SpotResult<ImageHandle>
    where
        F: FnOnce(&Path) -> SpotResult<ImageHandle>,
    {
        if dir.exists() {
            return Err(SpotError::AlreadyExists(dir.to_path_buf()));
        }
        fs::create_dir_all(dir)?;
        match create(dir) {
            Ok(handle) => {
                info!("Created {} container {}", handle.kind(), dir.display());
                Ok(handle)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(dir) {
                    warn!("Failed to remove {} after a failed create: {}", dir.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    fn create_dimap(&self, dir: &Path, spec: &ImageSpec) -> SpotResult<ImageHandle> {
        let backend = self
            .backends
            .first()
            .ok_or_else(|| SpotError::Unsupported("no raster backend registered".to_string()))?;
        if spec.lines == 0 || spec.columns == 0 || spec.bands == 0 {
            return Err(SpotError::GenericError(format!(
                "cannot create a {}x{}x{} image",
                spec.lines, spec.columns, spec.bands
            )));
        }
        let file_name = format!("IMAGERY.{}", backend.extension());
        let mut raster = RasterDescription::from_spec(spec, &file_name);
        raster.data_format = backend.extension().to_string();

        let store = backend.create(&dir.join(&file_name), &raster)?;
        write_document(&dir.join(DOCUMENT_FILE), &skeleton_document(&raster))?;
        Ok(ImageHandle::from_raster(dir, raster, store, HandleState::Created).with_progress(self.progress))
    }

    /// Closes a handle, patching close-time fields when it was writable
    pub fn close(&self, handle: ImageHandle) -> SpotResult<()> {
        handle.close()
    }

    /// Removes a container directory tree
    pub fn delete(&self, dir: &Path, declared: Option<ContainerKind>) -> SpotResult<()> {
        let kind = check_family(dir, declared)?;
        fs::remove_dir_all(dir)?;
        info!("Deleted {} container {}", kind, dir.display());
        Ok(())
    }

    /// Decodes a container and writes its DIMAP document to `output`
    ///
    /// # Returns
    /// The metadata the document was built from
    pub fn translate(&self, dir: &Path, output: &Path) -> SpotResult<SceneMetadata> {
        let mut handle = self.open_read(dir, None)?;
        let metadata = handle.metadata()?;
        handle.close()?;

        write_document(output, &build_document(&metadata))?;
        info!("Translated {} into {}", dir.display(), output.display());
        Ok(metadata)
    }

    /// Lists the containers found under `root`, itself included
    ///
    /// Directories are classified by their discriminating file name and
    /// not descended into once classified.
    pub fn list_images(&self, root: &Path) -> SpotResult<Vec<ContainerEntry>> {
        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            match discover_kind(&dir) {
                Ok(kind) => {
                    found.push(ContainerEntry { path: dir, kind });
                    continue;
                }
                Err(SpotError::MissingDiscriminator(_)) => {}
                Err(e) => return Err(e),
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    pending.push(entry.path());
                }
            }
        }
        found.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Found {} containers under {}", found.len(), root.display());
        Ok(found)
    }
}
