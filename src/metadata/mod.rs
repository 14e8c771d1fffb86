//! Scene metadata
//!
//! The model every container family is described with, its builder from
//! decoded early-family records and the SPOT code tables.

pub mod codes;
pub mod model;
pub mod builder;

pub use builder::{build_scene_metadata, dataset_name};
pub use model::{RasterDescription, SceneMetadata};
