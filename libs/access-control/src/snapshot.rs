use crate::act::Action;
use crate::entity::{PermissionCacheKey, PermissionRecord};
use crate::policy::DefaultPolicy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

/// How a permission check was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "allowed", rename_all = "snake_case")]
pub enum PermissionDecision {
  /// Administrative role, always allowed.
  Bypass,
  /// Answered by a user or role scoped entry of the live table.
  Cached(bool),
  /// Answered by the fallback matrix.
  Fallback(bool),
  /// Nothing matched.
  Denied,
}

impl PermissionDecision {
  pub fn is_allowed(&self) -> bool {
    match self {
      PermissionDecision::Bypass => true,
      PermissionDecision::Cached(allowed) | PermissionDecision::Fallback(allowed) => *allowed,
      PermissionDecision::Denied => false,
    }
  }
}

/// An immutable view of the permissions table, flattened into cache keys.
///
/// A snapshot is never modified after it is built. Reloading replaces the whole snapshot, so
/// entries of rows that disappeared from the table are gone once a new snapshot is in place.
#[derive(Debug, Clone, Default)]
pub struct PermissionSnapshot {
  entries: HashMap<PermissionCacheKey, bool>,
  refreshed_at: Option<Instant>,
}

impl PermissionSnapshot {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Every record writes its three role scoped entries; records carrying a `user_id` also
  /// write three user scoped entries.
  ///
  /// A role level record (no `user_id`) owns the role scoped entries of its page. When a page
  /// only has user records, their role scoped projection is combined so that any `false`
  /// wins.
  pub fn from_records(records: &[PermissionRecord], refreshed_at: Instant) -> Self {
    let mut entries = HashMap::with_capacity(records.len() * Action::ALL.len() * 2);

    for record in records.iter().filter(|r| r.user_id.is_some()) {
      for action in Action::ALL {
        let allowed = record.allows(action);
        entries
          .entry(PermissionCacheKey::role(&record.role, &record.page, action))
          .and_modify(|value: &mut bool| *value &= allowed)
          .or_insert(allowed);
      }
    }

    for record in records {
      for action in Action::ALL {
        let allowed = record.allows(action);
        match record.user_id {
          Some(uid) => {
            entries.insert(PermissionCacheKey::user(uid, &record.page, action), allowed);
          },
          None => {
            entries.insert(
              PermissionCacheKey::role(&record.role, &record.page, action),
              allowed,
            );
          },
        }
      }
    }

    Self {
      entries,
      refreshed_at: Some(refreshed_at),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn refreshed_at(&self) -> Option<Instant> {
    self.refreshed_at
  }

  /// Time since the snapshot was loaded. `None` when it never was.
  pub fn age(&self) -> Option<Duration> {
    self.refreshed_at.map(|at| at.elapsed())
  }

  /// A snapshot that was never loaded is always stale.
  pub fn is_stale(&self, freshness_window: Duration) -> bool {
    match self.refreshed_at {
      None => true,
      Some(at) => at.elapsed() > freshness_window,
    }
  }

  pub fn get(&self, key: &PermissionCacheKey) -> Option<bool> {
    self.entries.get(key).copied()
  }

  /// User scoped entry first, then the role scoped entry.
  pub fn lookup(
    &self,
    role: &str,
    page: &str,
    action: Action,
    user_id: Option<i64>,
  ) -> Option<bool> {
    if let Some(uid) = user_id {
      if let Some(allowed) = self.get(&PermissionCacheKey::user(uid, page, action)) {
        return Some(allowed);
      }
    }
    self.get(&PermissionCacheKey::role(role, page, action))
  }

  /// Answers a check without touching the network: administrative bypass, user entry, role
  /// entry, fallback matrix, deny.
  pub fn resolve(
    &self,
    policy: &DefaultPolicy,
    role: &str,
    page: &str,
    action: Action,
    user_id: Option<i64>,
  ) -> PermissionDecision {
    if policy.is_admin(role) {
      return PermissionDecision::Bypass;
    }
    if let Some(allowed) = self.lookup(role, page, action, user_id) {
      return PermissionDecision::Cached(allowed);
    }
    match policy.fallback(role, page, action) {
      Some(allowed) => PermissionDecision::Fallback(allowed),
      None => PermissionDecision::Denied,
    }
  }

  /// The effective flags of every page known for `role` (and `user_id`), merged from the
  /// fallback matrix and this snapshot. Keyed by `<page>|<action>`.
  pub fn effective_for(
    &self,
    policy: &DefaultPolicy,
    role: &str,
    user_id: Option<i64>,
  ) -> BTreeMap<String, bool> {
    let role_prefix = format!("role:{}|", role);
    let user_prefix = user_id.map(|uid| format!("user_{}|", uid));

    let mut pages = policy
      .matrix()
      .pages_for_role(role)
      .map(|(page, _)| page.clone())
      .collect::<Vec<_>>();
    for key in self.entries.keys() {
      let rest = key.strip_prefix(role_prefix.as_str()).or_else(|| {
        user_prefix
          .as_deref()
          .and_then(|prefix| key.strip_prefix(prefix))
      });
      if let Some((page, _)) = rest.and_then(|rest| rest.rsplit_once('|')) {
        pages.push(page.to_string());
      }
    }
    pages.sort();
    pages.dedup();

    let mut effective = BTreeMap::new();
    for page in pages {
      for action in Action::ALL {
        let allowed = self
          .resolve(policy, role, &page, action, user_id)
          .is_allowed();
        effective.insert(format!("{}|{}", page, action), allowed);
      }
    }
    effective
  }
}
