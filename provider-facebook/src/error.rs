use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacebookError {
    #[error("Graph API request failed (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse Graph API response: {0}")]
    ParseError(String),

    #[error("Unsupported selection: {0}")]
    Unsupported(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),

    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),
}

pub type Result<T> = std::result::Result<T, FacebookError>;

impl From<FacebookError> for BridgeError {
    fn from(error: FacebookError) -> Self {
        match error {
            FacebookError::BridgeError(e) => e,
            FacebookError::Runtime(e) => e.into(),
            FacebookError::Unsupported(msg) => BridgeError::NotAvailable(msg),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
