//! Container lifecycle
//!
//! Family discovery, raster backends of the later family, the uniform
//! image handle and the manager tying them together.

pub mod types;
pub mod family;
pub mod backend;
pub mod handle;
pub mod manager;

pub use backend::{BilBackend, RasterBackend, RasterStore};
pub use handle::ImageHandle;
pub use manager::{ContainerEntry, ContainerManager};
pub use types::{ContainerKind, HandleState, ImageSpec};
