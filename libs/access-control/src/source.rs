use crate::entity::PermissionRecord;
use app_error::AppError;
use async_trait::async_trait;

/// Where the resolver reads the authoritative permissions table from.
///
/// `load_all` returns every row of the table in a single call. An `Err` is treated as a
/// transient failure: the resolver keeps its current snapshot and degrades to its default
/// policy.
#[async_trait]
pub trait PermissionSource: Send + Sync + 'static {
  async fn load_all(&self) -> Result<Vec<PermissionRecord>, AppError>;
}
