//! In-memory identity directory
//!
//! Backs unit and integration tests. Every trait method bumps a per-method
//! call counter so callers can assert how many remote lookups a component
//! would have issued.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{DirectoryError, Result};
use crate::traits::IdentityDirectory;
use crate::types::{Compartment, Group, Policy, User};

/// Per-method call counters
#[derive(Debug, Default)]
pub struct CallCounts {
    pub get_user: AtomicUsize,
    pub list_user_groups: AtomicUsize,
    pub list_compartments: AtomicUsize,
    pub get_compartment: AtomicUsize,
    pub list_policies: AtomicUsize,
}

impl CallCounts {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get_compartment(&self) -> usize {
        self.get_compartment.load(Ordering::SeqCst)
    }

    pub fn list_policies(&self) -> usize {
        self.list_policies.load(Ordering::SeqCst)
    }

    pub fn list_compartments(&self) -> usize {
        self.list_compartments.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    memberships: HashMap<String, Vec<Group>>,
    compartments: Vec<Compartment>,
    policies: Vec<Policy>,
    denied_compartments: HashSet<String>,
    hidden_compartments: HashSet<String>,
    failures: HashMap<String, DirectoryError>,
}

/// Directory backed by in-process maps
pub struct InMemoryDirectory {
    tenancy_id: String,
    state: RwLock<State>,
    calls: CallCounts,
}

impl InMemoryDirectory {
    /// Create an empty directory for the given tenancy
    pub fn new(tenancy_id: impl Into<String>) -> Self {
        Self {
            tenancy_id: tenancy_id.into(),
            state: RwLock::new(State::default()),
            calls: CallCounts::default(),
        }
    }

    pub fn with_user(self, user: User, groups: Vec<Group>) -> Self {
        {
            let mut state = self.state.write();
            state.memberships.insert(user.id.clone(), groups);
            state.users.insert(user.id.clone(), user);
        }
        self
    }

    /// Add a non-root compartment; listing order follows insertion order
    pub fn with_compartment(self, compartment: Compartment) -> Self {
        self.state.write().compartments.push(compartment);
        self
    }

    pub fn with_policy(self, policy: Policy) -> Self {
        self.state.write().policies.push(policy);
        self
    }

    /// Make policy listing for a compartment fail with `AccessDenied`
    pub fn deny_policies(self, compartment_id: impl Into<String>) -> Self {
        self.state
            .write()
            .denied_compartments
            .insert(compartment_id.into());
        self
    }

    /// Keep a compartment out of the listing and make direct lookups of it
    /// fail with `NotFound`
    pub fn hide_compartment(self, compartment_id: impl Into<String>) -> Self {
        self.state
            .write()
            .hidden_compartments
            .insert(compartment_id.into());
        self
    }

    /// Fail every call that targets `resource_id` with `error`
    pub fn fail_with(self, resource_id: impl Into<String>, error: DirectoryError) -> Self {
        self.state.write().failures.insert(resource_id.into(), error);
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    fn injected_failure(&self, resource_id: &str) -> Option<DirectoryError> {
        self.state.read().failures.get(resource_id).cloned()
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    fn tenancy_id(&self) -> &str {
        &self.tenancy_id
    }

    async fn get_user(&self, user_id: &str) -> Result<User> {
        CallCounts::bump(&self.calls.get_user);
        if let Some(err) = self.injected_failure(user_id) {
            return Err(err);
        }
        self.state
            .read()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(format!("user {}", user_id)))
    }

    async fn list_user_groups(&self, user_id: &str) -> Result<Vec<Group>> {
        CallCounts::bump(&self.calls.list_user_groups);
        if let Some(err) = self.injected_failure(user_id) {
            return Err(err);
        }
        Ok(self
            .state
            .read()
            .memberships
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_compartments(&self) -> Result<Vec<Compartment>> {
        CallCounts::bump(&self.calls.list_compartments);
        if let Some(err) = self.injected_failure(&self.tenancy_id) {
            return Err(err);
        }
        let state = self.state.read();
        let mut compartments = Vec::with_capacity(state.compartments.len() + 1);
        compartments.push(Compartment::root(self.tenancy_id.clone()));
        compartments.extend(
            state
                .compartments
                .iter()
                .filter(|c| !state.hidden_compartments.contains(&c.id))
                .cloned(),
        );
        Ok(compartments)
    }

    async fn get_compartment(&self, compartment_id: &str) -> Result<Compartment> {
        CallCounts::bump(&self.calls.get_compartment);
        if let Some(err) = self.injected_failure(compartment_id) {
            return Err(err);
        }
        if compartment_id == self.tenancy_id {
            return Ok(Compartment::root(self.tenancy_id.clone()));
        }
        let state = self.state.read();
        if state.hidden_compartments.contains(compartment_id) {
            return Err(DirectoryError::not_found(format!(
                "compartment {}",
                compartment_id
            )));
        }
        state
            .compartments
            .iter()
            .find(|c| c.id == compartment_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(format!("compartment {}", compartment_id)))
    }

    async fn list_policies(&self, compartment_id: &str) -> Result<Vec<Policy>> {
        CallCounts::bump(&self.calls.list_policies);
        let state = self.state.read();
        if state.denied_compartments.contains(compartment_id) {
            return Err(DirectoryError::access_denied(format!(
                "policies in compartment {}",
                compartment_id
            )));
        }
        Ok(state
            .policies
            .iter()
            .filter(|p| p.compartment_id == compartment_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENANCY: &str = "ocid1.tenancy.oc1..t";

    #[tokio::test]
    async fn test_lists_root_first() {
        let dir = InMemoryDirectory::new(TENANCY)
            .with_compartment(Compartment::new("ocid1.compartment.oc1..a", "A", TENANCY));

        let compartments = dir.list_compartments().await.unwrap();
        assert_eq!(compartments.len(), 2);
        assert!(compartments[0].is_root());
        assert_eq!(compartments[1].name, "A");
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let dir = InMemoryDirectory::new(TENANCY);
        let err = dir.get_user("ocid1.user.oc1..missing").await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_user_without_groups() {
        let dir = InMemoryDirectory::new(TENANCY)
            .with_user(User::new("ocid1.user.oc1..u", "alice"), vec![]);
        let groups = dir.list_user_groups("ocid1.user.oc1..u").await.unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_denied_policies_and_call_counts() {
        let dir = InMemoryDirectory::new(TENANCY)
            .with_policy(Policy::new("p1", "P", TENANCY).with_statement("Allow group A to read all-resources in tenancy"))
            .deny_policies("ocid1.compartment.oc1..b");

        assert_eq!(dir.list_policies(TENANCY).await.unwrap().len(), 1);
        let err = dir.list_policies("ocid1.compartment.oc1..b").await.unwrap_err();
        assert!(matches!(err, DirectoryError::AccessDenied(_)));
        assert_eq!(dir.calls().list_policies(), 2);
    }
}
