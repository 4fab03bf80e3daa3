//! Run orchestration
//!
//! `ResolveUser → ResolveGroups → CollectPolicies → FilterRender → Done`,
//! with `Aborted` reachable on unrecoverable errors. There is no retry loop
//! here; retries belong to the directory transport.

use ocipa_core::{Group, IdentityDirectory, USER_OCID_PREFIX};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::NameCache;
use crate::collector::{Collection, PolicyCollector};
use crate::error::{AnalysisError, Result};
use crate::filter::{MatchMode, StatementRenderer};
use crate::report::Report;

/// Stage of an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    ResolveUser,
    ResolveGroups,
    CollectPolicies,
    FilterRender,
    Done,
    Aborted,
}

/// Knobs for one analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Compartments whose policies are fetched concurrently
    pub concurrency: usize,
    pub match_mode: MatchMode,
    pub include_deleted_compartments: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            match_mode: MatchMode::Substring,
            include_deleted_compartments: false,
        }
    }
}

/// Drives a single user analysis against an identity directory
pub struct PolicyAnalyzer {
    directory: Arc<dyn IdentityDirectory>,
    options: AnalyzerOptions,
    cache: NameCache,
    state: AnalysisState,
}

impl PolicyAnalyzer {
    pub fn new(directory: Arc<dyn IdentityDirectory>, options: AnalyzerOptions) -> Self {
        let cache = NameCache::new(directory.clone());
        Self {
            directory,
            options,
            cache,
            state: AnalysisState::ResolveUser,
        }
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    pub fn cache(&self) -> &NameCache {
        &self.cache
    }

    fn transition(&mut self, next: AnalysisState) {
        debug!("Analysis state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn abort(&mut self, err: AnalysisError) -> AnalysisError {
        self.transition(AnalysisState::Aborted);
        err
    }

    /// Analyze the effective policy statements of `user_id`
    pub async fn analyze(&mut self, user_id: &str) -> Result<Report> {
        self.transition(AnalysisState::ResolveUser);
        if let Err(e) = validate_user_id(user_id) {
            return Err(self.abort(e));
        }
        let fetched = self.directory.get_user(user_id).await;
        let user = match fetched {
            Ok(user) => user,
            Err(source) => {
                return Err(self.abort(AnalysisError::ResolveUser {
                    user_id: user_id.to_string(),
                    source,
                }))
            }
        };
        info!("Analyzing user {} ({})", user.display_name(), user.id);

        self.transition(AnalysisState::ResolveGroups);
        let fetched = self.directory.list_user_groups(user_id).await;
        let groups = match fetched {
            Ok(groups) => normalize_groups(groups),
            Err(source) => {
                return Err(self.abort(AnalysisError::ResolveGroups {
                    user_id: user_id.to_string(),
                    source,
                }))
            }
        };
        info!("User belongs to {} groups", groups.len());
        for group in &groups {
            debug!("  - {} ({})", group.name, group.id);
        }

        self.transition(AnalysisState::CollectPolicies);
        let collection = if groups.is_empty() {
            info!("No group memberships; skipping policy scan");
            Collection::default()
        } else {
            let collector = PolicyCollector::new(self.directory.clone())
                .with_concurrency(self.options.concurrency)
                .include_deleted(self.options.include_deleted_compartments);
            match collector.collect().await {
                Ok(collection) => collection,
                Err(e) => return Err(self.abort(AnalysisError::Collection(e))),
            }
        };
        for compartment in &collection.compartments {
            self.cache.prime(compartment.id.clone(), compartment.name.clone());
        }

        self.transition(AnalysisState::FilterRender);
        let renderer = StatementRenderer::new(&self.cache, self.options.match_mode);
        let sections = renderer.render(&groups, &collection.policies).await;

        let report = Report {
            user,
            groups,
            compartments_scanned: collection.compartments.len(),
            sections,
            warnings: collection.warnings,
        };
        info!(
            "Analysis complete: {} statements in {} policies, {} warnings",
            report.statement_count(),
            report.sections.len(),
            report.warnings.len()
        );
        let stats = self.cache.stats();
        debug!(
            "Name cache: {} entries, {} hits, {} lookups, {} failures",
            stats.entries, stats.hits, stats.lookups, stats.failures
        );

        self.transition(AnalysisState::Done);
        Ok(report)
    }
}

/// Deduplicate by identifier and sort by name
fn normalize_groups(groups: Vec<Group>) -> Vec<Group> {
    let mut seen = HashSet::new();
    let mut groups: Vec<Group> = groups
        .into_iter()
        .filter(|g| seen.insert(g.id.clone()))
        .collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    groups
}

/// Reject identifiers that are not user OCIDs before any remote call
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.starts_with(USER_OCID_PREFIX) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidUserId(user_id.to_string()))
    }
}
