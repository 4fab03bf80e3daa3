//! Error types for profile loading and request signing

use ocipa_core::DirectoryError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for client setup operations
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Failures that happen before any request reaches the network
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Configuration or key file could not be read
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Profile section missing from the configuration file
    #[error("Profile '{0}' not found in configuration file")]
    ProfileNotFound(String),

    /// Required key missing from the profile
    #[error("Profile '{profile}' is missing required key '{key}'")]
    MissingKey { profile: String, key: String },

    /// Malformed configuration line
    #[error("Malformed configuration at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Private key could not be used for signing
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// Signing a request failed
    #[error("Request signing failed: {0}")]
    Signing(String),

    /// Endpoint URL rejected
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<IdentityError> for DirectoryError {
    fn from(err: IdentityError) -> Self {
        DirectoryError::config(err.to_string())
    }
}
