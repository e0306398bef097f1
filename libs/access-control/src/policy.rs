use crate::act::Action;
use anyhow::Context;
use app_error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Roles that pass every permission check regardless of the live table.
pub const ADMIN_ROLES: [&str; 2] = ["admin", "super_admin"];

/// Flags for one page of one role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageActions {
  pub create: bool,
  pub edit: bool,
  pub delete: bool,
}

impl PageActions {
  pub const fn new(create: bool, edit: bool, delete: bool) -> Self {
    Self {
      create,
      edit,
      delete,
    }
  }

  pub fn allows(&self, action: Action) -> bool {
    match action {
      Action::Create => self.create,
      Action::Edit => self.edit,
      Action::Delete => self.delete,
    }
  }
}

/// Static role/page/action table consulted when the live table is unavailable or has no
/// entry for a check.
///
/// Serialized as `{ "<role>": { "<page>": { "create": bool, "edit": bool, "delete": bool } } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackMatrix(HashMap<String, HashMap<String, PageActions>>);

impl FallbackMatrix {
  pub fn insert(&mut self, role: &str, page: &str, actions: PageActions) {
    self
      .0
      .entry(role.to_string())
      .or_default()
      .insert(page.to_string(), actions);
  }

  pub fn with(mut self, role: &str, page: &str, actions: PageActions) -> Self {
    self.insert(role, page, actions);
    self
  }

  pub fn get(&self, role: &str, page: &str) -> Option<&PageActions> {
    self.0.get(role)?.get(page)
  }

  pub fn lookup(&self, role: &str, page: &str, action: Action) -> Option<bool> {
    self.get(role, page).map(|actions| actions.allows(action))
  }

  pub fn pages_for_role(&self, role: &str) -> impl Iterator<Item = (&String, &PageActions)> {
    self.0.get(role).into_iter().flat_map(|pages| pages.iter())
  }

  pub fn is_empty(&self) -> bool {
    self.0.values().all(|pages| pages.is_empty())
  }

  pub fn from_json(json: &str) -> Result<Self, AppError> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("fail to read fallback matrix from {}", path.display()))?;
    Self::from_json(&content)
  }

  /// The matrix shipped with the application. Kept at least as restrictive as the live
  /// table for every non administrative role.
  pub fn builtin() -> Self {
    const NONE: PageActions = PageActions::new(false, false, false);
    const CREATE_EDIT: PageActions = PageActions::new(true, true, false);
    const CREATE_ONLY: PageActions = PageActions::new(true, false, false);
    const FULL: PageActions = PageActions::new(true, true, true);

    FallbackMatrix::default()
      // staff
      .with("staff", "purchase_order", CREATE_EDIT)
      .with("staff", "ready", CREATE_EDIT)
      .with("staff", "payment", NONE)
      .with("staff", "petty_cash", CREATE_ONLY)
      .with("staff", "surat_jalan", CREATE_EDIT)
      .with("staff", "transfer", CREATE_ONLY)
      // finance
      .with("finance", "purchase_order", NONE)
      .with("finance", "ready", NONE)
      .with("finance", "payment", CREATE_EDIT)
      .with("finance", "petty_cash", CREATE_EDIT)
      .with("finance", "surat_jalan", NONE)
      .with("finance", "transfer", NONE)
      // purchasing
      .with("purchasing", "purchase_order", CREATE_EDIT)
      .with("purchasing", "ready", CREATE_ONLY)
      .with("purchasing", "payment", NONE)
      .with("purchasing", "petty_cash", NONE)
      // warehouse
      .with("warehouse", "surat_jalan", CREATE_EDIT)
      .with("warehouse", "transfer", CREATE_EDIT)
      // manager
      .with("manager", "purchase_order", FULL)
      .with("manager", "ready", CREATE_EDIT)
      .with("manager", "payment", CREATE_EDIT)
      .with("manager", "petty_cash", FULL)
      .with("manager", "surat_jalan", CREATE_EDIT)
      .with("manager", "transfer", CREATE_EDIT)
  }
}

/// The policy a resolver falls back on: administrative bypass, the static matrix, and deny
/// for everything else.
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
  admin_roles: HashSet<String>,
  matrix: FallbackMatrix,
}

impl DefaultPolicy {
  pub fn new<I, S>(admin_roles: I, matrix: FallbackMatrix) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      admin_roles: admin_roles.into_iter().map(Into::into).collect(),
      matrix,
    }
  }

  pub fn builtin() -> Self {
    Self::new(ADMIN_ROLES, FallbackMatrix::builtin())
  }

  pub fn with_matrix(mut self, matrix: FallbackMatrix) -> Self {
    self.matrix = matrix;
    self
  }

  pub fn is_admin(&self, role: &str) -> bool {
    self.admin_roles.contains(role)
  }

  pub fn matrix(&self) -> &FallbackMatrix {
    &self.matrix
  }

  pub fn fallback(&self, role: &str, page: &str, action: Action) -> Option<bool> {
    self.matrix.lookup(role, page, action)
  }
}

impl Default for DefaultPolicy {
  fn default() -> Self {
    Self::builtin()
  }
}
