pub mod errors;
pub mod io;
pub mod codec;
pub mod cap;
pub mod metadata;
pub mod dimap;
pub mod container;
pub mod utils;
pub mod commands;
pub mod api;

pub use crate::api::SpotKit;

pub use errors::{SpotError, SpotResult};
pub use codec::FieldPolicy;
pub use cap::region::Window;
pub use container::{ContainerEntry, ContainerKind, ContainerManager, HandleState, ImageHandle, ImageSpec};
pub use metadata::SceneMetadata;
