//! I/O utilities for file handling
//!
//! This module provides the seekable traits shared by the decoders and the
//! byte order detection and swapping helpers.

pub mod seekable;
pub mod byte_order;
