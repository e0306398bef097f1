use actix_http::Payload;
use actix_web::{FromRequest, HttpRequest};
use app_error::AppError;
use serde::{Deserialize, Serialize};

/// Header carrying the signed-in user blob the frontend keeps in local storage.
pub const SESSION_USER_HEADER: &str = "x-session-user";

/// The signed-in user as persisted by the frontend.
///
/// Only `role` takes part in permission checks, with `id_user` selecting user scoped
/// overrides. The remaining fields are carried for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
  #[serde(default)]
  pub id_user: Option<i64>,
  pub role: String,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
}

impl SessionUser {
  pub fn from_json(json: &str) -> Result<Self, AppError> {
    let user: SessionUser = serde_json::from_str(json)
      .map_err(|err| AppError::NotLoggedIn(format!("invalid session user: {}", err)))?;
    if user.role.trim().is_empty() {
      return Err(AppError::NotLoggedIn(
        "session user has no role".to_string(),
      ));
    }
    Ok(user)
  }

  pub fn from_actix_request(req: &HttpRequest) -> Result<Self, AppError> {
    let header = req
      .headers()
      .get(SESSION_USER_HEADER)
      .ok_or_else(|| AppError::NotLoggedIn(format!("missing {} header", SESSION_USER_HEADER)))?;
    let json = header
      .to_str()
      .map_err(|err| AppError::NotLoggedIn(format!("invalid {} header: {}", SESSION_USER_HEADER, err)))?;
    Self::from_json(json)
  }

  /// Name used in log lines and error messages.
  pub fn display_name(&self) -> String {
    match (&self.username, self.id_user) {
      (Some(username), _) => username.clone(),
      (None, Some(uid)) => format!("user_{}", uid),
      (None, None) => format!("role:{}", self.role),
    }
  }
}

impl FromRequest for SessionUser {
  type Error = AppError;

  type Future = std::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    std::future::ready(SessionUser::from_actix_request(req))
  }
}
