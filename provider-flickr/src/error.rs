//! Error types for Flickr provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Flickr provider errors
#[derive(Error, Debug)]
pub enum FlickrError {
    /// HTTP request returned a non-success status
    #[error("Flickr API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// The API answered with `stat = fail`
    #[error("Flickr API call failed (code {code}): {message}")]
    Api { code: i64, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),

    /// Download cache error
    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),
}

/// Result type for Flickr operations
pub type Result<T> = std::result::Result<T, FlickrError>;

impl From<FlickrError> for BridgeError {
    fn from(error: FlickrError) -> Self {
        match error {
            FlickrError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "Flickr API error (status {}): {}",
                status_code, message
            )),
            FlickrError::Api { code, message } => BridgeError::OperationFailed(format!(
                "Flickr API call failed (code {}): {}",
                code, message
            )),
            FlickrError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            FlickrError::BridgeError(e) => e,
            FlickrError::Runtime(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = FlickrError::Api {
            code: 100,
            message: "Invalid API Key".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Flickr API call failed (code 100): Invalid API Key"
        );
    }

    #[test]
    fn test_error_conversion() {
        let error = FlickrError::ApiError {
            status_code: 503,
            message: "unavailable".to_string(),
        };
        let bridge_error: BridgeError = error.into();
        assert!(matches!(bridge_error, BridgeError::OperationFailed(_)));

        let io = BridgeError::NotAvailable("http".to_string());
        let round_trip: BridgeError = FlickrError::from(io).into();
        assert!(matches!(round_trip, BridgeError::NotAvailable(_)));
    }
}
