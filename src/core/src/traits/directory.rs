//! Identity directory abstraction
//!
//! The remote identity service and the in-memory test directory both sit
//! behind this trait, so the collector and renderer never see HTTP.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Compartment, Group, Policy, User};

/// Read-only view of the provider's identity resources
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Identifier of the tenancy (root compartment)
    fn tenancy_id(&self) -> &str;

    /// Fetch a user by identifier
    ///
    /// Fails with `NotFound` for unknown identifiers and `Auth` when the
    /// local credentials are rejected.
    async fn get_user(&self, user_id: &str) -> Result<User>;

    /// Groups the user belongs to; empty when the user has no memberships
    async fn list_user_groups(&self, user_id: &str) -> Result<Vec<Group>>;

    /// Every compartment in the tenancy, root first, flattened across all
    /// nesting levels with pages concatenated in the order received
    async fn list_compartments(&self) -> Result<Vec<Compartment>>;

    /// Fetch a single compartment by identifier
    async fn get_compartment(&self, compartment_id: &str) -> Result<Compartment>;

    /// Policies attached to one compartment, in service listing order
    async fn list_policies(&self, compartment_id: &str) -> Result<Vec<Policy>>;
}
