use actix_http::Method;
use app_error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The mutating actions a page gates behind a permission check.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
  Create,
  Edit,
  Delete,
}

impl Action {
  pub const ALL: [Action; 3] = [Action::Create, Action::Edit, Action::Delete];

  pub fn as_str(&self) -> &'static str {
    match self {
      Action::Create => "create",
      Action::Edit => "edit",
      Action::Delete => "delete",
    }
  }
}

impl Display for Action {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl AsRef<str> for Action {
  fn as_ref(&self) -> &str {
    self.as_str()
  }
}

impl FromStr for Action {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "create" => Ok(Action::Create),
      "edit" | "update" => Ok(Action::Edit),
      "delete" => Ok(Action::Delete),
      other => Err(AppError::InvalidRequest(format!(
        "unknown permission action: {}",
        other
      ))),
    }
  }
}

impl TryFrom<&Method> for Action {
  type Error = AppError;

  /// Read-only methods have no action to gate.
  fn try_from(method: &Method) -> Result<Self, Self::Error> {
    match *method {
      Method::POST => Ok(Action::Create),
      Method::PUT | Method::PATCH => Ok(Action::Edit),
      Method::DELETE => Ok(Action::Delete),
      _ => Err(AppError::InvalidRequest(format!(
        "method {} is not a mutating action",
        method
      ))),
    }
  }
}
