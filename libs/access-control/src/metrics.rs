use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::snapshot::PermissionDecision;

pub const ACCESS_CONTROL_METRICS_TICK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AccessControlMetrics {
  load_all_permissions: Gauge,
  cached_entries: Gauge,
  total_check_count: Gauge,
  check_from_cache_count: Gauge,
  check_from_fallback_count: Gauge,
  admin_bypass_count: Gauge,
  denied_count: Gauge,
  reload_count: Gauge,
  reload_failure_count: Gauge,
}

impl AccessControlMetrics {
  fn init() -> Self {
    Self {
      load_all_permissions: Gauge::default(),
      cached_entries: Gauge::default(),
      total_check_count: Gauge::default(),
      check_from_cache_count: Gauge::default(),
      check_from_fallback_count: Gauge::default(),
      admin_bypass_count: Gauge::default(),
      denied_count: Gauge::default(),
      reload_count: Gauge::default(),
      reload_failure_count: Gauge::default(),
    }
  }

  pub fn register(registry: &mut Registry) -> Self {
    let metrics = Self::init();
    let ac_registry = registry.sub_registry_with_prefix("ac");
    ac_registry.register(
      "load_all_permissions",
      "duration of the last full permissions table load in milliseconds",
      metrics.load_all_permissions.clone(),
    );
    ac_registry.register(
      "cached_entries",
      "number of entries in the current permission snapshot",
      metrics.cached_entries.clone(),
    );
    ac_registry.register(
      "total_check_count",
      "total permission checks",
      metrics.total_check_count.clone(),
    );
    ac_registry.register(
      "check_from_cache_count",
      "permission checks answered by the live table cache",
      metrics.check_from_cache_count.clone(),
    );
    ac_registry.register(
      "check_from_fallback_count",
      "permission checks answered by the fallback matrix",
      metrics.check_from_fallback_count.clone(),
    );
    ac_registry.register(
      "admin_bypass_count",
      "permission checks passed by an administrative role",
      metrics.admin_bypass_count.clone(),
    );
    ac_registry.register(
      "denied_count",
      "permission checks denied because nothing matched",
      metrics.denied_count.clone(),
    );
    ac_registry.register(
      "reload_count",
      "permissions table loads",
      metrics.reload_count.clone(),
    );
    ac_registry.register(
      "reload_failure_count",
      "permissions table loads that failed",
      metrics.reload_failure_count.clone(),
    );
    metrics
  }

  pub fn record_load_all_permissions_in_millis(&self, millis: u64) {
    self.load_all_permissions.set(millis as i64);
  }

  pub fn record_cached_entries(&self, entries: usize) {
    self.cached_entries.set(entries as i64);
  }

  fn record_state(&self, state: &MetricsCalState) {
    self
      .total_check_count
      .set(state.total_check.load(Ordering::Relaxed));
    self
      .check_from_cache_count
      .set(state.check_from_cache.load(Ordering::Relaxed));
    self
      .check_from_fallback_count
      .set(state.check_from_fallback.load(Ordering::Relaxed));
    self
      .admin_bypass_count
      .set(state.admin_bypass.load(Ordering::Relaxed));
    self.denied_count.set(state.denied.load(Ordering::Relaxed));
    self.reload_count.set(state.reload.load(Ordering::Relaxed));
    self
      .reload_failure_count
      .set(state.reload_failure.load(Ordering::Relaxed));
  }
}

#[derive(Clone, Default)]
pub(crate) struct MetricsCalState {
  pub(crate) total_check: Arc<AtomicI64>,
  pub(crate) check_from_cache: Arc<AtomicI64>,
  pub(crate) check_from_fallback: Arc<AtomicI64>,
  pub(crate) admin_bypass: Arc<AtomicI64>,
  pub(crate) denied: Arc<AtomicI64>,
  pub(crate) reload: Arc<AtomicI64>,
  pub(crate) reload_failure: Arc<AtomicI64>,
}

impl MetricsCalState {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn record_decision(&self, decision: &PermissionDecision) {
    self.total_check.fetch_add(1, Ordering::Relaxed);
    let counter = match decision {
      PermissionDecision::Bypass => &self.admin_bypass,
      PermissionDecision::Cached(_) => &self.check_from_cache,
      PermissionDecision::Fallback(_) => &self.check_from_fallback,
      PermissionDecision::Denied => &self.denied,
    };
    counter.fetch_add(1, Ordering::Relaxed);
  }
}

/// Collect and record metrics for access control
pub(crate) fn tick_metric(state: MetricsCalState, metrics: Arc<AccessControlMetrics>) {
  tokio::spawn(async move {
    let mut interval = interval(ACCESS_CONTROL_METRICS_TICK_INTERVAL);
    loop {
      interval.tick().await;
      metrics.record_state(&state);
    }
  });
}
