pub mod act;
pub mod adapter;
pub mod entity;
pub mod metrics;
pub mod policy;
pub mod resolver;
pub mod snapshot;
pub mod source;

pub use act::Action;
pub use policy::{DefaultPolicy, FallbackMatrix, PageActions};
pub use resolver::{PermissionResolver, ReloadOutcome};
pub use snapshot::{PermissionDecision, PermissionSnapshot};
