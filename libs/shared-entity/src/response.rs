use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;

use app_error::AppError;
pub use app_error::ErrorCode;
use std::fmt::{Debug, Display};

#[cfg(feature = "cloud")]
pub use crate::response_actix::*;

/// The JSON envelope every endpoint answers with.
///
/// `data` is only present on success. `code` is [`ErrorCode::Ok`] on success and the error's
/// code otherwise, with a human readable `message`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppResponse<T> {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,

  #[serde(deserialize_with = "default_error_code")]
  pub code: ErrorCode,

  #[serde(default)]
  pub message: Cow<'static, str>,
}

impl<T> AppResponse<T> {
  pub fn new<M: Into<Cow<'static, str>>>(code: ErrorCode, message: M) -> Self {
    Self {
      data: None,
      code,
      message: message.into(),
    }
  }

  #[allow(non_snake_case)]
  pub fn Ok() -> Self {
    Self::new(ErrorCode::Ok, AppError::Ok.to_string())
  }

  pub fn with_data(mut self, data: T) -> Self {
    self.data = Some(data);
    self
  }

  pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
    self.message = message.into();
    self
  }

  pub fn is_ok(&self) -> bool {
    matches!(self.code, ErrorCode::Ok)
  }

  pub fn into_data(self) -> Result<T, AppResponseError> {
    if !self.is_ok() {
      return Err(AppResponseError::new(self.code, self.message));
    }
    self
      .data
      .ok_or_else(|| AppResponseError::from(AppError::MissingPayload("".to_string())))
  }

  pub fn into_error(self) -> Result<(), AppResponseError> {
    if self.is_ok() {
      Ok(())
    } else {
      Err(AppResponseError::new(self.code, self.message))
    }
  }
}

impl<T> Display for AppResponse<T>
where
  T: Display,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("{:?}:{}", self.code, self.message))
  }
}

impl<T> std::error::Error for AppResponse<T> where T: Debug + Display {}

impl<T> From<AppError> for AppResponse<T> {
  fn from(err: AppError) -> Self {
    AppResponse::new(err.code(), err.to_string())
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub struct AppResponseError {
  #[serde(deserialize_with = "default_error_code")]
  pub code: ErrorCode,
  pub message: Cow<'static, str>,
}

impl AppResponseError {
  pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
    Self {
      code,
      message: message.into(),
    }
  }

  pub fn is_not_enough_permissions(&self) -> bool {
    matches!(self.code, ErrorCode::NotEnoughPermissions)
  }

  pub fn is_not_logged_in(&self) -> bool {
    matches!(self.code, ErrorCode::NotLoggedIn)
  }
}

impl From<AppError> for AppResponseError {
  fn from(err: AppError) -> Self {
    Self {
      code: err.code(),
      message: Cow::Owned(err.to_string()),
    }
  }
}

impl Display for AppResponseError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("code:{:?} msg: {}", self.code, self.message))
  }
}

#[cfg(feature = "cloud")]
impl actix_web::error::ResponseError for AppResponseError {
  fn status_code(&self) -> actix_web::http::StatusCode {
    actix_web::http::StatusCode::OK
  }

  fn error_response(&self) -> actix_web::HttpResponse {
    actix_web::HttpResponse::Ok().json(self)
  }
}

/// An unknown code, e.g. from a newer server, is read as [`ErrorCode::Internal`].
fn default_error_code<'a, D: Deserializer<'a>>(deserializer: D) -> Result<ErrorCode, D::Error> {
  match ErrorCode::deserialize(deserializer) {
    Ok(code) => Ok(code),
    Err(_) => Ok(ErrorCode::Internal),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_code_reads_as_internal() {
    let resp: AppResponse<bool> =
      serde_json::from_str(r#"{"code": 99999, "message": "from the future"}"#).unwrap();
    assert_eq!(resp.code, ErrorCode::Internal);
    assert!(resp.into_data().is_err());
  }

  #[test]
  fn error_converts_into_response() {
    let resp: AppResponse<bool> = AppError::NotEnoughPermissions {
      user: "staff".to_string(),
      action: "reload permissions".to_string(),
    }
    .into();
    let err = resp.into_error().unwrap_err();
    assert!(err.is_not_enough_permissions());
  }

  #[test]
  fn ok_response_carries_data() {
    let resp = AppResponse::Ok().with_data(true);
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["code"], 0);
    assert_eq!(json["data"], true);
    assert!(resp.into_data().unwrap());
  }
}
