use bridge_traits::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The listing response did not start with the expected header line.
    #[error("Device protocol mismatch: expected listing header {expected:?}, found {found:?}")]
    ProtocolMismatch { expected: String, found: String },

    /// A device request failed to complete or returned a non-success status.
    #[error("Device request '{operation}' failed: {message}")]
    Transport {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Cannot read local file {}: {message}", .path.display())]
    LocalFile { path: PathBuf, message: String },

    #[error("Year {year} cannot be encoded as a FAT32 timestamp (1980-2107)")]
    TimestampOutOfRange { year: i32 },

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl SyncError {
    /// HTTP status of a failed device request, if the device answered
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
