use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `public.role_permissions`.
///
/// A row without `user_id` applies to every user of `role`. A row with `user_id` overrides
/// the role level row of the same page for that user only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct AFPermissionRow {
  pub id: i64,
  pub user_id: Option<i64>,
  pub role: String,
  pub page: String,
  pub can_create: bool,
  pub can_edit: bool,
  pub can_delete: bool,
  pub updated_at: Option<DateTime<Utc>>,
}
