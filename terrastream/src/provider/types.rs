//! Provider error types

use std::fmt;

/// Errors raised while fetching a tile payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Connection, timeout, or body transfer failure
    HttpError(String),
    /// Server answered with a non-success status
    Status { code: u16, url: String },
    /// HTTP client could not be built
    ClientSetup(String),
}

impl ProviderError {
    /// HTTP status code, when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::Status { code, url } => write!(f, "HTTP {} from {}", code, url),
            ProviderError::ClientSetup(msg) => {
                write!(f, "Failed to create HTTP client: {}", msg)
            }
        }
    }
}

impl std::error::Error for ProviderError {}
