//! Identity entities fetched from the provider

pub mod identity;

// Re-export commonly used types
pub use identity::{
    Compartment, CompartmentId, Group, GroupId, LifecycleState, Policy, User, UserId,
};
