//! Wire models for the identity REST API
//!
//! Only the fields the analyzer reads are modelled; unknown fields are ignored.

use ocipa_core::{Compartment, Group, LifecycleState, Policy, User};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        let user = User::new(model.id, model.name);
        match model.email.filter(|e| !e.is_empty()) {
            Some(email) => user.with_email(email),
            None => user,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupMembershipModel {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupModel {
    pub id: String,
    pub name: String,
}

impl From<GroupModel> for Group {
    fn from(model: GroupModel) -> Self {
        Group::new(model.id, model.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentModel {
    pub id: String,
    pub name: String,
    /// Parent compartment
    pub compartment_id: String,
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
}

impl From<CompartmentModel> for Compartment {
    fn from(model: CompartmentModel) -> Self {
        Compartment::new(model.id, model.name, model.compartment_id)
            .with_state(model.lifecycle_state)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyModel {
    pub id: String,
    pub name: String,
    pub compartment_id: String,
    #[serde(default)]
    pub statements: Vec<String>,
}

impl From<PolicyModel> for Policy {
    fn from(model: PolicyModel) -> Self {
        Policy {
            id: model.id,
            name: model.name,
            compartment_id: model.compartment_id,
            statements: model.statements,
        }
    }
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceErrorModel {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
