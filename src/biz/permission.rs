use access_control::{Action, PermissionResolver, ReloadOutcome};
use app_error::AppError;
use database::permission::{
  delete_permission, select_all_permissions, select_permissions_for_role, upsert_permission,
};
use database_entity::dto::{DeletePermissionParams, UpsertPermissionParams};
use database_entity::pg_row::AFPermissionRow;
use shared_entity::dto::permission_dto::{
  PermissionSnapshotResponse, PermissionStatusResponse, ReloadPermissionResponse,
};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::biz::session::SessionUser;

/// Only administrative roles may read or edit the permissions table.
pub fn require_admin(resolver: &PermissionResolver, user: &SessionUser) -> Result<(), AppError> {
  if resolver.is_admin_role(&user.role) {
    return Ok(());
  }
  Err(AppError::NotEnoughPermissions {
    user: user.display_name(),
    action: "manage role permissions".to_string(),
  })
}

/// Unknown actions are answered with `false` rather than an error, the same way a check for
/// a tuple nobody configured is.
pub async fn check_permission(
  resolver: &PermissionResolver,
  user: &SessionUser,
  page: &str,
  action: &str,
) -> bool {
  match action.parse::<Action>() {
    Ok(action) => {
      resolver
        .can_perform_action(&user.role, page, action, user.id_user)
        .await
    },
    Err(err) => {
      warn!(
        "[access control]: {} asked for {} on {}: {}",
        user.display_name(),
        action,
        page,
        err
      );
      false
    },
  }
}

pub fn get_permission_snapshot(
  resolver: &PermissionResolver,
  user: &SessionUser,
) -> PermissionSnapshotResponse {
  let snapshot = resolver.snapshot();
  PermissionSnapshotResponse {
    role: user.role.clone(),
    loaded: !snapshot.is_empty(),
    refreshed_ms_ago: snapshot.age().map(|age| age.as_millis() as u64),
    entries: snapshot.effective_for(resolver.policy(), &user.role, user.id_user),
  }
}

pub fn get_permission_status(resolver: &PermissionResolver) -> PermissionStatusResponse {
  let snapshot = resolver.snapshot();
  PermissionStatusResponse {
    loaded: !snapshot.is_empty(),
    entries: snapshot.len(),
  }
}

pub async fn reload(resolver: &PermissionResolver) -> Result<ReloadPermissionResponse, AppError> {
  let outcome = resolver.reload_permissions().await?;
  Ok(reload_response(resolver, outcome))
}

pub async fn list_permissions(
  pg_pool: &PgPool,
  role: Option<&str>,
) -> Result<Vec<AFPermissionRow>, AppError> {
  match role {
    Some(role) => select_permissions_for_role(pg_pool, role).await,
    None => select_all_permissions(pg_pool).await,
  }
}

/// Writes the row, then refreshes so the change is served right away.
pub async fn upsert_permission_and_reload(
  pg_pool: &PgPool,
  resolver: &PermissionResolver,
  params: &UpsertPermissionParams,
) -> Result<AFPermissionRow, AppError> {
  params.validate()?;
  let row = upsert_permission(pg_pool, params).await?;
  info!(
    "[access control]: upsert role={} page={} user={:?} create={} edit={} delete={}",
    row.role, row.page, row.user_id, row.can_create, row.can_edit, row.can_delete
  );
  refresh_after_write(resolver).await;
  Ok(row)
}

pub async fn delete_permission_and_reload(
  pg_pool: &PgPool,
  resolver: &PermissionResolver,
  params: &DeletePermissionParams,
) -> Result<u64, AppError> {
  params.validate()?;
  let deleted = delete_permission(pg_pool, params).await?;
  if deleted == 0 {
    return Err(AppError::RecordNotFound(format!(
      "no permission for role={} page={} user={:?}",
      params.role, params.page, params.user_id
    )));
  }
  info!(
    "[access control]: delete role={} page={} user={:?}",
    params.role, params.page, params.user_id
  );
  refresh_after_write(resolver).await;
  Ok(deleted)
}

// The row is already committed; a failed refresh only delays when it is served.
async fn refresh_after_write(resolver: &PermissionResolver) {
  if let Err(err) = resolver.refresh_permissions().await {
    warn!(
      "[access control]: permissions written but refresh failed: {}",
      err
    );
  }
}

fn reload_response(resolver: &PermissionResolver, outcome: ReloadOutcome) -> ReloadPermissionResponse {
  match outcome {
    ReloadOutcome::Applied { entries } => ReloadPermissionResponse {
      applied: true,
      entries,
    },
    ReloadOutcome::KeptPrevious | ReloadOutcome::InFlight => ReloadPermissionResponse {
      applied: false,
      entries: resolver.snapshot().len(),
    },
  }
}
