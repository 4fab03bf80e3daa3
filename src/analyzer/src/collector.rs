//! Policy collection across the compartment tree
//!
//! Compartments are fetched once, ordered parent-before-child with an explicit
//! worklist, and their policies fetched with bounded fan-out. Results are
//! re-sorted into enumeration order because remote calls complete out of
//! order.

use futures::stream::{self, StreamExt};
use ocipa_core::{Compartment, DirectoryError, IdentityDirectory, LifecycleState, Policy};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::report::CollectionWarning;

/// Policy together with the compartment that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedPolicy {
    pub compartment: Compartment,
    pub policy: Policy,
}

/// Everything gathered by one collection pass
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Compartments scanned, in enumeration order
    pub compartments: Vec<Compartment>,
    /// Policies in compartment enumeration order, then listing order
    pub policies: Vec<CollectedPolicy>,
    pub warnings: Vec<CollectionWarning>,
}

/// Walks every compartment and gathers its policies
pub struct PolicyCollector {
    directory: Arc<dyn IdentityDirectory>,
    concurrency: usize,
    include_deleted: bool,
}

impl PolicyCollector {
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self {
            directory,
            concurrency: 1,
            include_deleted: false,
        }
    }

    /// Number of compartments whose policies are fetched concurrently
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Also scan compartments in the `DELETED` lifecycle state
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Enumerate compartments in hierarchy order
    ///
    /// A failed listing degrades to the root compartment alone plus a warning,
    /// unless the failure is fatal for the whole run.
    pub async fn compartments(
        &self,
        warnings: &mut Vec<CollectionWarning>,
    ) -> Result<Vec<Compartment>, DirectoryError> {
        let tenancy_id = self.directory.tenancy_id().to_string();

        let listed = match self.directory.list_compartments().await {
            Ok(listed) => listed,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warnings.push(CollectionWarning::listing_failed(tenancy_id.clone(), e.to_string()));
                vec![Compartment::root(tenancy_id.clone())]
            }
        };

        let total = listed.len();
        let listed: Vec<Compartment> = listed
            .into_iter()
            .filter(|c| {
                let keep = self.include_deleted || c.lifecycle_state != LifecycleState::Deleted;
                if !keep {
                    debug!("Skipping deleted compartment {} ({})", c.name, c.id);
                }
                keep
            })
            .collect();

        info!("Found {} compartments ({} listed)", listed.len(), total);
        Ok(hierarchy_order(listed, &tenancy_id))
    }

    /// Fetch the policies of every compartment
    ///
    /// Per-compartment failures become warnings; only fatal errors abort.
    pub async fn collect(&self) -> Result<Collection, DirectoryError> {
        let mut warnings = Vec::new();
        let compartments = self.compartments(&mut warnings).await?;

        info!(
            "Scanning policies in {} compartments (concurrency {})",
            compartments.len(),
            self.concurrency
        );

        let directory = &self.directory;
        let mut results: Vec<(usize, Result<Vec<Policy>, DirectoryError>)> =
            stream::iter(compartments.iter().enumerate())
                .map(|(index, compartment)| async move {
                    (index, directory.list_policies(&compartment.id).await)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);

        let mut policies = Vec::new();
        for (index, result) in results {
            let compartment = &compartments[index];
            match result {
                Ok(found) => {
                    debug!("{} policies in compartment {}", found.len(), compartment.name);
                    policies.extend(found.into_iter().map(|policy| CollectedPolicy {
                        compartment: compartment.clone(),
                        policy,
                    }));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("Skipping compartment {}: {}", compartment.id, e);
                    warnings.push(CollectionWarning::policies_skipped(compartment, e.to_string()));
                }
            }
        }

        Ok(Collection {
            compartments,
            policies,
            warnings,
        })
    }
}

/// Order compartments parent-before-child
///
/// Preorder walk from the root with an explicit stack; siblings keep their
/// listing order. Compartments whose parent is not in the list follow in
/// listing order, each with its own visible subtree.
pub fn hierarchy_order(compartments: Vec<Compartment>, root_id: &str) -> Vec<Compartment> {
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let known: HashSet<&str> = compartments.iter().map(|c| c.id.as_str()).collect();
    for (index, compartment) in compartments.iter().enumerate() {
        if let Some(parent) = compartment.parent_id.as_deref() {
            children.entry(parent).or_default().push(index);
        }
    }

    // Roots: the tenancy first, then orphans in listing order
    let mut starts: Vec<usize> = compartments
        .iter()
        .position(|c| c.id == root_id)
        .into_iter()
        .collect();
    starts.extend(compartments.iter().enumerate().filter_map(|(index, c)| {
        let orphan = c.id != root_id
            && c.parent_id.as_deref().map_or(true, |p| !known.contains(p));
        orphan.then_some(index)
    }));

    let mut order = Vec::with_capacity(compartments.len());
    let mut visited = vec![false; compartments.len()];
    for start in starts {
        let mut worklist = vec![start];
        while let Some(index) = worklist.pop() {
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            order.push(index);
            if let Some(kids) = children.get(compartments[index].id.as_str()) {
                worklist.extend(kids.iter().rev().copied());
            }
        }
    }

    // Anything unreachable (e.g. a parent cycle in bad data) keeps listing order
    order.extend((0..compartments.len()).filter(|&i| !visited[i]));

    let mut slots: Vec<Option<Compartment>> = compartments.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}
