pub mod listener;
pub mod permission;
