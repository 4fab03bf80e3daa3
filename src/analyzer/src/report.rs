//! Analysis report and its text rendering

use ocipa_core::{Compartment, Group, User};
use serde::Serialize;
use std::fmt;

/// Policy header plus the statements that matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySection {
    pub policy_name: String,
    pub compartment_name: String,
    /// Rendered statements in their original order
    pub statements: Vec<String>,
}

/// What part of the collection pass went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Compartment enumeration failed; only the root compartment was scanned
    ListingFailed,
    /// The compartment's policies could not be read
    PoliciesSkipped,
}

/// Recoverable problem met during collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionWarning {
    pub kind: WarningKind,
    pub compartment_id: String,
    pub compartment_name: String,
    pub message: String,
}

impl CollectionWarning {
    pub fn listing_failed(tenancy_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ListingFailed,
            compartment_id: tenancy_id.into(),
            compartment_name: ocipa_core::ROOT_COMPARTMENT_LABEL.to_string(),
            message: message.into(),
        }
    }

    pub fn policies_skipped(compartment: &Compartment, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::PoliciesSkipped,
            compartment_id: compartment.id.clone(),
            compartment_name: compartment.name.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CollectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::ListingFailed => write!(
                f,
                "Could not list compartments in tenancy {}, only the root compartment was scanned: {}",
                self.compartment_id, self.message
            ),
            WarningKind::PoliciesSkipped => write!(
                f,
                "Could not fetch policies in compartment {} ({}): {}",
                self.compartment_name, self.compartment_id, self.message
            ),
        }
    }
}

/// Outcome of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub user: User,
    /// Sorted by name
    pub groups: Vec<Group>,
    pub compartments_scanned: usize,
    /// Policies in collection order
    pub sections: Vec<PolicySection>,
    pub warnings: Vec<CollectionWarning>,
}

impl Report {
    /// Total number of rendered statements
    pub fn statement_count(&self) -> usize {
        self.sections.iter().map(|s| s.statements.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User: {} ({})", self.user.display_name(), self.user.id)?;
        if self.groups.is_empty() {
            writeln!(f, "Groups: (none)")?;
        } else {
            let names: Vec<&str> = self.groups.iter().map(|g| g.name.as_str()).collect();
            writeln!(f, "Groups: {}", names.join(", "))?;
        }

        if self.sections.is_empty() {
            writeln!(f)?;
            return writeln!(f, "No policy statements found that apply to this user's groups.");
        }

        for section in &self.sections {
            writeln!(f)?;
            writeln!(
                f,
                "=== Policy: {} (Compartment: {}) ===",
                section.policy_name, section.compartment_name
            )?;
            for statement in &section.statements {
                writeln!(f, "{}", statement)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Total statements: {}", self.statement_count())
    }
}
