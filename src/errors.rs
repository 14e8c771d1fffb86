//! Custom error types for SPOT container processing

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised while decoding, encoding or accessing a SPOT container
#[derive(Debug)]
pub enum SpotError {
    /// I/O error (short reads and failed seeks included)
    IoError(io::Error),
    /// A constituent file of the container is missing
    MissingFile(String),
    /// Target of a create operation already exists
    AlreadyExists(PathBuf),
    /// No discriminating file name found in the container directory
    MissingDiscriminator(PathBuf),
    /// Declared container family differs from the discovered one
    FamilyMismatch { declared: String, discovered: String },
    /// Record header advertises a length different from the layout
    RecordLengthMismatch { file: String, record: u32, expected: u64, found: u64 },
    /// Record header does not carry the expected sync bytes
    SyncMismatch { file: String, record: u32 },
    /// A file size advertised by a directory record differs from the real one
    FileSizeMismatch { file: String, advertised: u64, actual: u64 },
    /// Two records of the container disagree on the image layout
    InconsistentLayout(String),
    /// A required field is blank or unparsable
    FieldAbsent { record: &'static str, field: &'static str },
    /// A required key is absent from a metadata document
    MissingKey(String),
    /// Pixel window outside the image or malformed
    InvalidWindow(String),
    /// Operation not allowed in the handle's lifecycle state
    InvalidState(String),
    /// Feature not handled by this build
    Unsupported(String),
    /// Failure while emitting markup
    EncodingError(String),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for SpotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpotError::IoError(e) => write!(f, "I/O error: {}", e),
            SpotError::MissingFile(name) => write!(f, "Missing container file: {}", name),
            SpotError::AlreadyExists(path) => write!(f, "Target already exists: {}", path.display()),
            SpotError::MissingDiscriminator(path) => {
                write!(f, "No recognizable container in {}", path.display())
            }
            SpotError::FamilyMismatch { declared, discovered } => write!(
                f,
                "Container family mismatch: declared {}, discovered {}",
                declared, discovered
            ),
            SpotError::RecordLengthMismatch { file, record, expected, found } => write!(
                f,
                "Record length mismatch in {} record {}: expected {}, found {}",
                file, record, expected, found
            ),
            SpotError::SyncMismatch { file, record } => {
                write!(f, "Bad sync bytes in {} record {}", file, record)
            }
            SpotError::FileSizeMismatch { file, advertised, actual } => write!(
                f,
                "File size mismatch for {}: advertised {}, actual {}",
                file, advertised, actual
            ),
            SpotError::InconsistentLayout(msg) => write!(f, "Inconsistent layout: {}", msg),
            SpotError::FieldAbsent { record, field } => {
                write!(f, "Field {} of {} record is blank or unparsable", field, record)
            }
            SpotError::MissingKey(key) => write!(f, "Metadata key not found: {}", key),
            SpotError::InvalidWindow(msg) => write!(f, "Invalid pixel window: {}", msg),
            SpotError::InvalidState(msg) => write!(f, "Invalid handle state: {}", msg),
            SpotError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            SpotError::EncodingError(msg) => write!(f, "Markup encoding error: {}", msg),
            SpotError::GenericError(msg) => write!(f, "SPOT error: {}", msg),
        }
    }
}

impl std::error::Error for SpotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpotError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SpotError {
    fn from(error: io::Error) -> Self {
        SpotError::IoError(error)
    }
}

impl From<String> for SpotError {
    fn from(msg: String) -> Self {
        SpotError::GenericError(msg)
    }
}

/// Result type for SPOT operations
pub type SpotResult<T> = Result<T, SpotError>;
