pub mod metrics;
pub mod permission;
