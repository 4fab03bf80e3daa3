//! # OCI Policy Analyzer Core
//!
//! Shared data model, error taxonomy and the identity directory seam.
//! Every other crate in the workspace depends on this one; it depends on no
//! network stack so the analyzer can be exercised against an in-memory
//! directory.

pub mod types;
pub mod traits;
pub mod error;
pub mod memory;

// Re-export commonly used types
pub use error::{DirectoryError, Result};
pub use types::{Compartment, CompartmentId, Group, GroupId, LifecycleState, Policy, User, UserId};
pub use traits::IdentityDirectory;

/// Label shown for the tenancy (root compartment) in place of its identifier
pub const ROOT_COMPARTMENT_LABEL: &str = "root";

/// Prefix every user identifier carries
pub const USER_OCID_PREFIX: &str = "ocid1.user.";
