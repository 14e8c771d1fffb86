//! Core container types

use std::fmt;

use crate::io::byte_order::{machine_byte_order, ByteOrder};

/// Container family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// SPOT 1-4 fixed-record CAP directory
    Cap,
    /// SPOT 5 DIMAP directory
    Dimap,
}

impl ContainerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Cap => "SPOT1A4",
            ContainerKind::Dimap => "SPOT5",
        }
    }

    /// Parses a family name as given on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CAP" | "SPOT1A4" | "SPOT" => Some(ContainerKind::Cap),
            "DIMAP" | "SPOT5" => Some(ContainerKind::Dimap),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lifecycle state of an open image handle
///
/// Closing consumes the handle, so there is no closed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    OpenForRead,
    OpenForModify,
    Created,
}

impl HandleState {
    /// Whether pixel writes are allowed in this state
    pub fn is_writable(&self) -> bool {
        matches!(self, HandleState::OpenForModify | HandleState::Created)
    }
}

/// Dimensions and encoding of an image to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    pub lines: u32,
    pub columns: u32,
    pub bands: u32,
    /// 1 or 2
    pub sample_bytes: u32,
    pub byte_order: ByteOrder,
}

impl ImageSpec {
    /// An image stored in machine byte order
    pub fn new(lines: u32, columns: u32, bands: u32, sample_bytes: u32) -> Self {
        ImageSpec { lines, columns, bands, sample_bytes, byte_order: machine_byte_order() }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Bits per sample
    pub fn nbits(&self) -> u32 {
        self.sample_bytes * 8
    }
}
