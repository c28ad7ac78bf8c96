use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Download of photo {photo_id} failed with HTTP {status}")]
    Download { photo_id: String, status: u16 },

    #[error("Invalid photo id '{0}': must be a plain file name")]
    InvalidPhotoId(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Error> for BridgeError {
    fn from(err: Error) -> Self {
        match err {
            Error::Bridge(inner) => inner,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
