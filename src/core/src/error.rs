//! Error taxonomy for identity directory operations
//!
//! Callers decide between aborting and skipping based on the variant:
//! authentication and lookup failures of the target user are fatal, while
//! per-compartment failures degrade to warnings.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors raised by an [`IdentityDirectory`](crate::IdentityDirectory)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Credentials rejected or expired (HTTP 401)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Requested identifier does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks permission on the resource (HTTP 403)
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Network failure, throttling or server error that survived retries
    #[error("Transient network error: {0}")]
    Transient(String),

    /// Response body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Caller supplied malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local configuration could not be used
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DirectoryError {
    /// Create an auth error
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        DirectoryError::Auth(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        DirectoryError::NotFound(msg.into())
    }

    /// Create an access denied error
    pub fn access_denied<S: Into<String>>(msg: S) -> Self {
        DirectoryError::AccessDenied(msg.into())
    }

    /// Create a transient error
    pub fn transient<S: Into<String>>(msg: S) -> Self {
        DirectoryError::Transient(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response<S: Into<String>>(msg: S) -> Self {
        DirectoryError::InvalidResponse(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        DirectoryError::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DirectoryError::Config(msg.into())
    }

    /// Whether the transport may retry the call that produced this error
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::Transient(_))
    }

    /// Whether the error invalidates the whole run regardless of call site
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DirectoryError::Auth(_) | DirectoryError::Config(_) | DirectoryError::InvalidInput(_)
        )
    }
}
