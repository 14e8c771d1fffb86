//! Utility modules for common functionality
//!
//! Logging, progress reporting and quicklook image helpers.

pub mod logger;
pub mod progress;
pub mod image_utils;
