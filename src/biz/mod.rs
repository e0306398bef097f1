pub mod permission;
pub mod pg_listener;
pub mod session;
