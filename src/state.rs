use crate::config::config::Config;
use access_control::metrics::AccessControlMetrics;
use access_control::PermissionResolver;
use prometheus_client::registry::Registry;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub pg_pool: PgPool,
  pub config: Arc<Config>,
  pub permission_resolver: PermissionResolver,
  pub metrics: AppMetrics,
}

#[derive(Clone)]
pub struct AppMetrics {
  pub registry: Arc<Registry>,
  pub access_control_metrics: Arc<AccessControlMetrics>,
}

impl Default for AppMetrics {
  fn default() -> Self {
    Self::new()
  }
}

impl AppMetrics {
  pub fn new() -> Self {
    let mut registry = Registry::default();
    let access_control_metrics = Arc::new(AccessControlMetrics::register(&mut registry));
    Self {
      registry: Arc::new(registry),
      access_control_metrics,
    }
  }
}
