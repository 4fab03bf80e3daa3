//! User, group, compartment and policy records
//!
//! These are held in memory for a single run and never mutated after fetch.

use serde::{Deserialize, Serialize};

use crate::ROOT_COMPARTMENT_LABEL;

/// Provider-assigned user identifier
pub type UserId = String;

/// Provider-assigned group identifier
pub type GroupId = String;

/// Provider-assigned compartment identifier (the tenancy id for the root)
pub type CompartmentId = String;

/// User whose effective access is audited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Login name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name shown in the report header, falling back to the email address
    pub fn display_name(&self) -> &str {
        match &self.email {
            Some(email) if self.name.is_empty() => email,
            _ => &self.name,
        }
    }
}

/// Named collection of users; statements grant to groups by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Compartment lifecycle as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Creating,
    #[default]
    Active,
    Inactive,
    Deleting,
    Deleted,
    #[serde(other)]
    Unknown,
}

/// Node of the compartment tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: CompartmentId,
    pub name: String,

    /// Parent compartment; `None` only for the tenancy root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CompartmentId>,

    #[serde(default)]
    pub lifecycle_state: LifecycleState,
}

impl Compartment {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: Some(parent_id.into()),
            lifecycle_state: LifecycleState::Active,
        }
    }

    /// The tenancy itself, labelled with the fixed root name
    pub fn root(tenancy_id: impl Into<String>) -> Self {
        Self {
            id: tenancy_id.into(),
            name: ROOT_COMPARTMENT_LABEL.to_string(),
            parent_id: None,
            lifecycle_state: LifecycleState::Active,
        }
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.lifecycle_state = state;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Named, ordered list of statements attached to exactly one compartment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    pub compartment_id: CompartmentId,

    /// Free-text statements; order is significant
    pub statements: Vec<String>,
}

impl Policy {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        compartment_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            compartment_id: compartment_id.into(),
            statements: Vec::new(),
        }
    }

    /// Append a statement
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statements.push(statement.into());
        self
    }
}
