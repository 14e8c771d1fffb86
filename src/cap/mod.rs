//! SPOT 1-4 CAP container
//!
//! Fixed-record binary layout: volume directory, null volume, leader,
//! imagery and trailer files. Records are framed by a 12-byte header
//! (sequence number, sync bytes, record length).

pub mod constants;
pub mod layout;
pub mod region;
pub mod records;
pub mod calibration;
pub mod bad_lines;
pub mod pixels;
pub mod writer;
#[cfg(test)]
mod tests;

pub use bad_lines::{BadLine, BadLineScan, LineStatus};
pub use calibration::{CalibrationRecord, SpectralSensitivity};
pub use pixels::RecordStore;
pub use records::{
    AttitudeSample, BandHistogram, BandQuality, CapDecoder, CapScene, EphemerisPoint,
    EphemerisRecord, ImageryDescriptor, Leader, LookAngles, Modelization, SceneHeader,
    SceneVertex, TrailerSummary, VolumeDirectory,
};
pub use region::{ChannelDescriptor, LeaderLayout, RecordLayout, Window};
pub use writer::{write_container, CapProduct};
