use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckPermissionQuery {
  pub page: String,
  pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckPermissionResponse {
  pub allowed: bool,
}

/// The effective flags of the session user, for gating controls while rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionSnapshotResponse {
  pub role: String,
  pub loaded: bool,
  /// Milliseconds since the permissions table was last loaded.
  pub refreshed_ms_ago: Option<u64>,
  /// `<page>|<action>` to allowed.
  pub entries: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionStatusResponse {
  pub loaded: bool,
  pub entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadPermissionResponse {
  /// Whether a new snapshot replaced the previous one.
  pub applied: bool,
  pub entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePermissionResponse {
  pub deleted: u64,
}
