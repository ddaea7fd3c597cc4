//! Library operation error types
//!
//! Every remote call is classified into one of a few families so callers
//! can react without inspecting messages: validation problems are fixed by
//! the user, authorization problems need a fresh session, network and
//! server problems are worth a manual retry.

use thiserror::Error;

/// Local validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Library name is required")]
    EmptyName,
}

/// Main error type for library operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    /// Rejected before any request was sent
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Transport or connectivity failure
    #[error("Network error: {0}")]
    Network(String),

    /// Missing, invalid or expired session token
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Server answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Server answered but the body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LibraryError {
    /// Short classification used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LibraryError::Validation(_) => "validation",
            LibraryError::Network(_) => "network",
            LibraryError::Authorization(_) => "authorization",
            LibraryError::Server { .. } | LibraryError::InvalidResponse(_) => {
                "server"
            }
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, LibraryError::Authorization(_))
    }

    /// Whether resubmitting the same request could succeed without the
    /// user changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LibraryError::Network(_)
                | LibraryError::Server { .. }
                | LibraryError::InvalidResponse(_)
        )
    }
}

impl From<reqwest::Error> for LibraryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return LibraryError::InvalidResponse(err.to_string());
        }
        match err.status() {
            Some(status)
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN =>
            {
                LibraryError::Authorization(err.to_string())
            }
            Some(status) => LibraryError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => LibraryError::Network(err.to_string()),
        }
    }
}

/// Result type alias for library operations
pub type LibraryResult<T> = Result<T, LibraryError>;
