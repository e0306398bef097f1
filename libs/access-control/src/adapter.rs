use crate::entity::PermissionRecord;
use crate::source::PermissionSource;
use app_error::AppError;
use async_trait::async_trait;
use database::permission::select_all_permissions;
use sqlx::PgPool;
use tracing::trace;

/// Implementation of [`PermissionSource`] backed by the `role_permissions` table.
#[derive(Clone)]
pub struct PgPermissionSource {
  pg_pool: PgPool,
}

impl PgPermissionSource {
  pub fn new(pg_pool: PgPool) -> Self {
    Self { pg_pool }
  }
}

#[async_trait]
impl PermissionSource for PgPermissionSource {
  async fn load_all(&self) -> Result<Vec<PermissionRecord>, AppError> {
    let rows = select_all_permissions(&self.pg_pool).await?;
    trace!("[access control]: loaded {} permission rows", rows.len());
    Ok(rows.into_iter().map(PermissionRecord::from).collect())
  }
}
