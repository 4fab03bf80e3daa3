//! Name cache and collector behaviour under concurrent, out-of-order calls

use async_trait::async_trait;
use ocipa_analyzer::{NameCache, PolicyCollector};
use ocipa_core::{
    Compartment, DirectoryError, Group, IdentityDirectory, Policy, Result, User,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const TENANCY: &str = "ocid1.tenancy.oc1..t";

/// Directory whose calls take longer for compartments listed earlier, so
/// fan-out completes in reverse order
struct SlowDirectory {
    compartments: Vec<Compartment>,
    lookups: AtomicUsize,
}

impl SlowDirectory {
    fn new(count: usize) -> Self {
        let mut compartments = vec![Compartment::root(TENANCY)];
        for i in 0..count {
            compartments.push(Compartment::new(
                format!("ocid1.compartment.oc1..c{}", i),
                format!("C{}", i),
                TENANCY,
            ));
        }
        Self {
            compartments,
            lookups: AtomicUsize::new(0),
        }
    }

    fn position(&self, compartment_id: &str) -> usize {
        self.compartments
            .iter()
            .position(|c| c.id == compartment_id)
            .unwrap_or(0)
    }
}

#[async_trait]
impl IdentityDirectory for SlowDirectory {
    fn tenancy_id(&self) -> &str {
        TENANCY
    }

    async fn get_user(&self, user_id: &str) -> Result<User> {
        Ok(User::new(user_id, "slow"))
    }

    async fn list_user_groups(&self, _user_id: &str) -> Result<Vec<Group>> {
        Ok(vec![])
    }

    async fn list_compartments(&self) -> Result<Vec<Compartment>> {
        Ok(self.compartments.clone())
    }

    async fn get_compartment(&self, compartment_id: &str) -> Result<Compartment> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(20)).await;
        self.compartments
            .iter()
            .find(|c| c.id == compartment_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(compartment_id))
    }

    async fn list_policies(&self, compartment_id: &str) -> Result<Vec<Policy>> {
        let delay = (self.compartments.len() - self.position(compartment_id)) as u64 * 5;
        sleep(Duration::from_millis(delay)).await;
        Ok(vec![Policy::new(
            format!("policy-{}", compartment_id),
            format!("Policy{}", self.position(compartment_id)),
            compartment_id,
        )])
    }
}

#[tokio::test]
async fn test_concurrent_misses_share_one_lookup() {
    let directory = Arc::new(SlowDirectory::new(2));
    let cache = Arc::new(NameCache::new(directory.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.resolve("ocid1.compartment.oc1..c1").await })
        })
        .collect();
    let names = futures::future::join_all(tasks).await;

    for name in names {
        assert_eq!(name.unwrap(), "C1");
    }
    assert_eq!(directory.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().lookups, 1);
}

#[tokio::test]
async fn test_lookups_bounded_by_distinct_identifiers() {
    let directory = Arc::new(SlowDirectory::new(5));
    let cache = NameCache::new(directory.clone());

    for _ in 0..3 {
        for i in 0..5 {
            cache.resolve(&format!("ocid1.compartment.oc1..c{}", i)).await;
        }
        cache.resolve(TENANCY).await;
    }
    assert_eq!(directory.lookups.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_fan_out_restores_enumeration_order() {
    let directory = Arc::new(SlowDirectory::new(6));
    let collector = PolicyCollector::new(directory).with_concurrency(8);

    let collection = collector.collect().await.unwrap();

    let names: Vec<&str> = collection
        .policies
        .iter()
        .map(|p| p.policy.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["Policy0", "Policy1", "Policy2", "Policy3", "Policy4", "Policy5", "Policy6"]
    );
    assert!(collection.warnings.is_empty());
}
