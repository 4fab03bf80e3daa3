//! Compartment name cache with write-once-per-key memoization
//!
//! Maps compartment identifiers to display names for the lifetime of one
//! analysis run. Entries never expire.

use dashmap::DashMap;
use ocipa_core::{IdentityDirectory, ROOT_COMPARTMENT_LABEL};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Statistics about cache behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache (including the root label)
    pub hits: usize,
    /// Remote lookups issued
    pub lookups: usize,
    /// Remote lookups that failed and fell back to the identifier
    pub failures: usize,
    /// Distinct identifiers held
    pub entries: usize,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.lookups;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Resolves compartment identifiers to names
///
/// Concurrent first requests for the same identifier share one remote call:
/// each key owns a [`OnceCell`] that the first caller initialises while later
/// callers wait on it. Failed lookups are cached as the identifier itself, so
/// a missing compartment is also looked up at most once.
///
/// # Examples
///
/// ```
/// use ocipa_analyzer::NameCache;
/// use ocipa_core::memory::InMemoryDirectory;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let directory = Arc::new(InMemoryDirectory::new("ocid1.tenancy.oc1..t"));
/// let cache = NameCache::new(directory);
///
/// assert_eq!(cache.resolve("ocid1.tenancy.oc1..t").await, "root");
/// cache.prime("ocid1.compartment.oc1..a", "Finance");
/// assert_eq!(cache.resolve("ocid1.compartment.oc1..a").await, "Finance");
/// # });
/// ```
pub struct NameCache {
    directory: Arc<dyn IdentityDirectory>,
    tenancy_id: String,
    entries: DashMap<String, Arc<OnceCell<String>>>,
    stats: DashMap<&'static str, usize>,
}

impl NameCache {
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        let tenancy_id = directory.tenancy_id().to_string();
        Self {
            directory,
            tenancy_id,
            entries: DashMap::new(),
            stats: DashMap::new(),
        }
    }

    /// Record a known name without a remote call; existing entries win
    pub fn prime(&self, compartment_id: impl Into<String>, name: impl Into<String>) {
        let name = name.into();
        self.entries
            .entry(compartment_id.into())
            .or_insert_with(|| Arc::new(OnceCell::from(name)));
    }

    /// Resolve an identifier to its name, falling back to the identifier
    pub async fn resolve(&self, compartment_id: &str) -> String {
        if compartment_id == self.tenancy_id {
            self.increment_stat("hits");
            return ROOT_COMPARTMENT_LABEL.to_string();
        }

        let cell = self
            .entries
            .entry(compartment_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(name) = cell.get() {
            self.increment_stat("hits");
            return name.clone();
        }

        cell.get_or_init(|| self.lookup(compartment_id)).await.clone()
    }

    async fn lookup(&self, compartment_id: &str) -> String {
        self.increment_stat("lookups");
        match self.directory.get_compartment(compartment_id).await {
            Ok(compartment) => {
                debug!("Resolved compartment {} to '{}'", compartment_id, compartment.name);
                compartment.name
            }
            Err(e) => {
                self.increment_stat("failures");
                warn!("Could not resolve compartment {}: {}", compartment_id, e);
                compartment_id.to_string()
            }
        }
    }

    fn increment_stat(&self, key: &'static str) {
        *self.stats.entry(key).or_insert(0) += 1;
    }

    fn stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }

    /// Returns cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stat("hits"),
            lookups: self.stat("lookups"),
            failures: self.stat("failures"),
            entries: self.entries.len(),
        }
    }
}
