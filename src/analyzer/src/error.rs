//! Error types for the analysis pipeline

use ocipa_core::DirectoryError;
use thiserror::Error;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Unrecoverable analysis failures
///
/// Per-compartment failures never surface here; they become
/// [`CollectionWarning`](crate::CollectionWarning)s on the report.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Identifier is not a user identifier
    #[error("Invalid user identifier '{0}': expected an identifier starting with 'ocid1.user.'")]
    InvalidUserId(String),

    /// Target user could not be fetched
    #[error("Failed to resolve user {user_id}: {source}")]
    ResolveUser {
        user_id: String,
        #[source]
        source: DirectoryError,
    },

    /// Group memberships could not be fetched
    #[error("Failed to resolve groups for user {user_id}: {source}")]
    ResolveGroups {
        user_id: String,
        #[source]
        source: DirectoryError,
    },

    /// Policy scan hit a failure that invalidates the whole run
    #[error("Policy collection aborted: {0}")]
    Collection(#[source] DirectoryError),
}

impl AnalysisError {
    /// Underlying directory error, if any
    pub fn directory_error(&self) -> Option<&DirectoryError> {
        match self {
            AnalysisError::InvalidUserId(_) => None,
            AnalysisError::ResolveUser { source, .. }
            | AnalysisError::ResolveGroups { source, .. } => Some(source),
            AnalysisError::Collection(source) => Some(source),
        }
    }
}
