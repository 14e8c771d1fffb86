//! Seekable reader and stream traits
//!
//! The record decoder only needs `Read + Seek`; the pixel layer and the
//! close-time patching also write, so they take a `SeekableStream`.

use std::io::{Read, Seek, Write};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// Trait for data sources that can read, write and seek
pub trait SeekableStream: Read + Write + Seek + Send + Sync {}

impl<T: Read + Write + Seek + Send + Sync> SeekableStream for T {}
