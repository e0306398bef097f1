use access_control::PermissionResolver;
use anyhow::Error;
use database::listener::PostgresDBListener;
use database::permission::ROLE_PERMISSION_CHANNEL;
use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

pub type PermissionChangeListener = PostgresDBListener<PermissionChangeNotification>;

pub struct PgListeners {
  permission_listener: PermissionChangeListener,
}

impl PgListeners {
  pub async fn new(pg_pool: &PgPool) -> Result<Self, Error> {
    let permission_listener =
      PermissionChangeListener::new(pg_pool, ROLE_PERMISSION_CHANNEL).await?;
    Ok(Self {
      permission_listener,
    })
  }

  pub fn subscribe_permission_change(&self) -> broadcast::Receiver<PermissionChangeNotification> {
    self.permission_listener.subscribe()
  }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionChangeAction {
  INSERT,
  UPDATE,
  DELETE,
}

/// The columns of a `role_permissions` row that identify what changed.
#[derive(Deserialize, Clone, Debug)]
pub struct PermissionChangeRow {
  pub user_id: Option<i64>,
  pub role: String,
  pub page: String,
}

/// Payload published by the `role_permissions` trigger.
#[derive(Deserialize, Clone, Debug)]
pub struct PermissionChangeNotification {
  pub old: Option<PermissionChangeRow>,
  pub new: Option<PermissionChangeRow>,
  pub action_type: PermissionChangeAction,
}

impl PermissionChangeNotification {
  /// The row after the change, or the removed row for a delete.
  pub fn row(&self) -> Option<&PermissionChangeRow> {
    match self.action_type {
      PermissionChangeAction::INSERT | PermissionChangeAction::UPDATE => self.new.as_ref(),
      PermissionChangeAction::DELETE => self.old.as_ref(),
    }
  }
}

/// Refreshes the whole table on every change, so grants revoked by an administrator stop
/// being served from memory without waiting for the snapshot to go stale. Checks keep being
/// answered by the current snapshot while the refresh runs.
pub(crate) fn spawn_listen_on_permission_change(
  mut listener: broadcast::Receiver<PermissionChangeNotification>,
  resolver: PermissionResolver,
) {
  tokio::spawn(async move {
    loop {
      match listener.recv().await {
        Ok(change) => {
          if let Some(row) = change.row() {
            info!(
              "[access control]: {:?} role={} page={} user={:?}, refresh permissions",
              change.action_type, row.role, row.page, row.user_id
            );
          }
        },
        Err(RecvError::Lagged(skipped)) => {
          warn!(
            "[access control]: skipped {} permission changes, refresh permissions",
            skipped
          );
        },
        Err(RecvError::Closed) => break,
      }

      if let Err(err) = resolver.refresh_permissions().await {
        error!(
          "[access control]: fail to refresh permissions after a change: {}",
          err
        );
      }
    }
  });
}
