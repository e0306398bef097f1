use crate::act::Action;
use database_entity::pg_row::AFPermissionRow;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::Deref;

/// A permission row as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
  pub user_id: Option<i64>,
  pub role: String,
  pub page: String,
  pub can_create: bool,
  pub can_edit: bool,
  pub can_delete: bool,
}

impl PermissionRecord {
  pub fn for_role(role: &str, page: &str, create: bool, edit: bool, delete: bool) -> Self {
    Self {
      user_id: None,
      role: role.to_string(),
      page: page.to_string(),
      can_create: create,
      can_edit: edit,
      can_delete: delete,
    }
  }

  pub fn for_user(
    user_id: i64,
    role: &str,
    page: &str,
    create: bool,
    edit: bool,
    delete: bool,
  ) -> Self {
    Self {
      user_id: Some(user_id),
      ..Self::for_role(role, page, create, edit, delete)
    }
  }

  pub fn allows(&self, action: Action) -> bool {
    match action {
      Action::Create => self.can_create,
      Action::Edit => self.can_edit,
      Action::Delete => self.can_delete,
    }
  }
}

impl From<AFPermissionRow> for PermissionRecord {
  fn from(row: AFPermissionRow) -> Self {
    Self {
      user_id: row.user_id,
      role: row.role,
      page: row.page,
      can_create: row.can_create,
      can_edit: row.can_edit,
      can_delete: row.can_delete,
    }
  }
}

/// The subject a cache entry is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionScope<'a> {
  /// Stored as `role:<role>`
  Role(&'a str),
  /// Stored as `user_<id>`
  User(i64),
}

impl Display for PermissionScope<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      PermissionScope::Role(role) => write!(f, "role:{}", role),
      PermissionScope::User(uid) => write!(f, "user_{}", uid),
    }
  }
}

/// Flattened cache key: `<scope>|<page>|<action>`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct PermissionCacheKey(String);

impl PermissionCacheKey {
  pub fn new(scope: PermissionScope<'_>, page: &str, action: Action) -> Self {
    Self(format!("{}|{}|{}", scope, page, action))
  }

  pub fn role(role: &str, page: &str, action: Action) -> Self {
    Self::new(PermissionScope::Role(role), page, action)
  }

  pub fn user(uid: i64, page: &str, action: Action) -> Self {
    Self::new(PermissionScope::User(uid), page, action)
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl Deref for PermissionCacheKey {
  type Target = str;
  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl AsRef<str> for PermissionCacheKey {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl Display for PermissionCacheKey {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}
