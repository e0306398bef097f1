use app_error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPermissionParams {
  #[serde(default)]
  pub user_id: Option<i64>,
  pub role: String,
  pub page: String,
  #[serde(default)]
  pub can_create: bool,
  #[serde(default)]
  pub can_edit: bool,
  #[serde(default)]
  pub can_delete: bool,
}

impl UpsertPermissionParams {
  pub fn validate(&self) -> Result<(), AppError> {
    validate_role_and_page(&self.role, &self.page)?;
    validate_user_id(self.user_id)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePermissionParams {
  #[serde(default)]
  pub user_id: Option<i64>,
  pub role: String,
  pub page: String,
}

impl DeletePermissionParams {
  pub fn validate(&self) -> Result<(), AppError> {
    validate_role_and_page(&self.role, &self.page)?;
    validate_user_id(self.user_id)
  }
}

// The scope index maps a NULL user_id to 0, so 0 would address the role level row.
fn validate_user_id(user_id: Option<i64>) -> Result<(), AppError> {
  match user_id {
    Some(uid) if uid <= 0 => Err(AppError::InvalidRequest(format!(
      "user_id must be positive, got {}",
      uid
    ))),
    _ => Ok(()),
  }
}

fn validate_role_and_page(role: &str, page: &str) -> Result<(), AppError> {
  if role.trim().is_empty() {
    return Err(AppError::InvalidRequest("role must not be empty".to_string()));
  }
  if page.trim().is_empty() {
    return Err(AppError::InvalidRequest("page must not be empty".to_string()));
  }
  // `|` separates the segments of a flattened cache key.
  if role.contains('|') || page.contains('|') {
    return Err(AppError::InvalidRequest(format!(
      "role and page must not contain '|': role={}, page={}",
      role, page
    )));
  }
  Ok(())
}
