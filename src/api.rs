use std::path::Path;

use image::RgbImage;
use log::info;

use crate::cap::region::Window;
use crate::codec::FieldPolicy;
use crate::container::{ContainerEntry, ContainerKind, ContainerManager, ImageHandle, ImageSpec};
use crate::errors::SpotResult;
use crate::metadata::model::SceneMetadata;
use crate::utils::image_utils::{compose_rgb, to_8bit};

/// Main interface to the SpotKit library
pub struct SpotKit {
    manager: ContainerManager,
}

impl Default for SpotKit {
    fn default() -> Self {
        Self::new(FieldPolicy::default())
    }
}

impl SpotKit {
    /// Create a new SpotKit instance
    ///
    /// # Arguments
    /// * `policy` - How blank required record fields are resolved
    pub fn new(policy: FieldPolicy) -> Self {
        SpotKit { manager: ContainerManager::new(policy) }
    }

    /// Returns the instance drawing progress bars during long scans
    pub fn with_progress(mut self, visible: bool) -> Self {
        self.manager = self.manager.with_progress(visible);
        self
    }

    /// The container manager behind this instance
    pub fn manager(&self) -> &ContainerManager {
        &self.manager
    }

    /// Analyze a container and return a summary of its structure
    ///
    /// # Arguments
    /// * `dir` - Container directory
    ///
    /// # Returns
    /// String containing analysis information or an error
    pub fn analyze(&self, dir: &Path) -> SpotResult<String> {
        let mut handle = self.manager.open_read(dir, None)?;
        let spec = handle.spec();

        let mut result = format!("{} container {}\n", handle.kind(), dir.display());
        result.push_str(&format!("  Dimensions: {} lines x {} columns x {} bands\n", spec.lines, spec.columns, spec.bands));
        result.push_str(&format!("  Sample width: {} bits, {}\n", spec.nbits(), spec.byte_order.name()));
        result.push_str(&format!("  Swapped on read: {}\n", handle.swaps_samples()));
        for channel in handle.channels() {
            result.push_str(&format!(
                "  Band {}: starts at byte {}, prefix {}, stride {}\n",
                channel.channel, channel.start_offset, channel.prefix_length, channel.line_stride
            ));
        }

        if handle.kind() == ContainerKind::Cap {
            let meta = handle.metadata()?;
            result.push_str(&format!("  Scene: {}\n", meta.identification.scene_id));
            result.push_str(&format!("  Dataset: {}\n", meta.identification.dataset_name));
            if let Some(time) = &meta.sensor.scene_center_time {
                result.push_str(&format!("  Scene center time: {}\n", time));
            }
            result.push_str(&format!(
                "  Ephemeris points: {}, attitude samples: {} coarse, {} fine\n",
                meta.ephemeris.points.len(),
                meta.attitude.coarse.len(),
                meta.attitude.fine.len()
            ));
            for band in &meta.bands {
                result.push_str(&format!(
                    "  Band {} ({}): {} lost, {} degraded lines",
                    band.index, band.description, band.lost_lines, band.degraded_lines
                ));
                if let Some(mean) = band.histogram.as_ref().and_then(|h| h.mean) {
                    result.push_str(&format!(", mean {:.2}", mean));
                }
                result.push('\n');
            }
        }
        handle.close()?;
        Ok(result)
    }

    /// Writes the DIMAP document of a container
    pub fn translate(&self, dir: &Path, output: &Path) -> SpotResult<SceneMetadata> {
        self.manager.translate(dir, output)
    }

    /// Builds an RGB quicklook of a window of a container
    ///
    /// # Arguments
    /// * `dir` - Container directory
    /// * `window` - Window to read, full image when `None`
    /// * `step` - Subsampling step on both axes
    pub fn quicklook(&self, dir: &Path, window: Option<Window>, step: u32) -> SpotResult<RgbImage> {
        let mut handle = self.manager.open_read(dir, None)?;
        let window = window
            .unwrap_or_else(|| Window::full(handle.lines(), handle.columns()))
            .with_steps(step, step);
        let display = handle.metadata()?.display;

        let mut planes = Vec::with_capacity(3);
        for band in [display.red, display.green, display.blue] {
            planes.push(to_8bit(&handle.read(band, &window)?, handle.sample_bytes()));
        }
        handle.close()?;
        compose_rgb(window.output_columns(), window.output_lines(), &planes[0], &planes[1], &planes[2])
    }

    /// Writes an RGB quicklook as an image file
    pub fn extract(&self, dir: &Path, output: &Path, window: Option<Window>, step: u32) -> SpotResult<()> {
        let image = self.quicklook(dir, window, step)?;
        image.save(output).map_err(|e| crate::errors::SpotError::EncodingError(e.to_string()))?;
        info!("Saved quicklook {}x{} to {}", image.width(), image.height(), output.display());
        Ok(())
    }

    /// Creates an empty container and returns its open handle
    pub fn create(&self, dir: &Path, kind: ContainerKind, spec: &ImageSpec) -> SpotResult<ImageHandle> {
        self.manager.create(dir, kind, spec)
    }

    /// Removes a container
    pub fn delete(&self, dir: &Path, declared: Option<ContainerKind>) -> SpotResult<()> {
        self.manager.delete(dir, declared)
    }

    /// Lists the containers found under a directory
    pub fn list_images(&self, root: &Path) -> SpotResult<Vec<ContainerEntry>> {
        self.manager.list_images(root)
    }
}
