//! # OCI Policy Analyzer
//!
//! Collects the policy statements that reference a user's groups across every
//! compartment of a tenancy and renders them with compartment identifiers
//! replaced by names.
//!
//! ## Pipeline
//!
//! 1. Resolve the user and their group memberships
//! 2. Enumerate compartments and fetch each one's policies ([`PolicyCollector`])
//! 3. Keep statements that mention a group ([`StatementFilter`])
//! 4. Substitute compartment identifiers through the [`NameCache`]
//!
//! ## Example
//!
//! ```rust
//! use ocipa_analyzer::{AnalyzerOptions, PolicyAnalyzer};
//! use ocipa_core::memory::InMemoryDirectory;
//! use ocipa_core::{Compartment, Group, Policy, User};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let tenancy = "ocid1.tenancy.oc1..t";
//! let directory = InMemoryDirectory::new(tenancy)
//!     .with_user(
//!         User::new("ocid1.user.oc1..u", "alice"),
//!         vec![Group::new("ocid1.group.oc1..g", "Admins")],
//!     )
//!     .with_compartment(Compartment::new("ocid1.compartment.oc1..aaa", "Finance", tenancy))
//!     .with_policy(
//!         Policy::new("ocid1.policy.oc1..p", "P", "ocid1.compartment.oc1..aaa")
//!             .with_statement("Allow group Admins to manage all-resources in compartment ocid1.compartment.oc1..aaa"),
//!     );
//!
//! let mut analyzer = PolicyAnalyzer::new(Arc::new(directory), AnalyzerOptions::default());
//! let report = analyzer.analyze("ocid1.user.oc1..u").await.unwrap();
//!
//! assert_eq!(
//!     report.sections[0].statements[0],
//!     "Allow group Admins to manage all-resources in compartment Finance"
//! );
//! # });
//! ```

pub mod error;
pub mod cache;
pub mod collector;
pub mod filter;
pub mod report;
pub mod orchestrator;

// Re-export commonly used types
pub use cache::{CacheStats, NameCache};
pub use collector::{hierarchy_order, CollectedPolicy, Collection, PolicyCollector};
pub use error::{AnalysisError, Result};
pub use filter::{substitute_compartment_ids, MatchMode, StatementFilter, StatementRenderer};
pub use orchestrator::{validate_user_id, AnalysisState, AnalyzerOptions, PolicyAnalyzer};
pub use report::{CollectionWarning, PolicySection, Report, WarningKind};
