//! Shared traits for the analyzer

pub mod directory;

// Re-export commonly used traits
pub use directory::IdentityDirectory;
