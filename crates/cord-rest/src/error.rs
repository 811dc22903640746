//! REST error types

use reqwest::StatusCode;

/// Errors returned by [`RestClient`](crate::RestClient) requests
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Connection, timeout or body transfer failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A token-authenticated call was made before a token was known
    #[error("No token available; log in first")]
    MissingToken,
}

impl RestError {
    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Check if the server rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
