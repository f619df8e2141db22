//! Remote API error types.

use thiserror::Error;

/// Errors returned by the remote API client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API answered with an error envelope.
    #[error("Stripe API error ({status}, {kind}): {message}")]
    Stripe {
        status: u16,
        kind: String,
        code: Option<String>,
        message: String,
        param: Option<String>,
    },

    /// The request never produced a response.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the expected shape.
    #[error("Failed to decode API response: {0}")]
    Decode(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// An `invalid_request_error` for a missing object, shaped like the
    /// API's own 404 response.
    pub fn not_found(object: &str, id: &str) -> Self {
        ApiError::Stripe {
            status: 404,
            kind: "invalid_request_error".to_string(),
            code: Some("resource_missing".to_string()),
            message: format!("No such {}: '{}'", object, id),
            param: Some("id".to_string()),
        }
    }

    /// Returns true if the error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Stripe { status, code, .. } => {
                *status == 404 || code.as_deref() == Some("resource_missing")
            }
            _ => false,
        }
    }

    /// HTTP status of the failed call, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Stripe { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for remote API calls.
pub type Result<T> = std::result::Result<T, ApiError>;
