use crate::act::Action;
use crate::metrics::{tick_metric, AccessControlMetrics, MetricsCalState};
use crate::policy::DefaultPolicy;
use crate::snapshot::{PermissionDecision, PermissionSnapshot};
use crate::source::PermissionSource;
use app_error::AppError;
use parking_lot::RwLock;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

/// Default freshness window of a snapshot before a check forces a reload.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Result of a reload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
  /// A new snapshot with the given number of entries replaced the previous one.
  Applied { entries: usize },
  /// The source returned no rows; the previous snapshot was kept.
  KeptPrevious,
  /// Another reload was already running; nothing was fetched.
  InFlight,
}

/// Answers "may role R (optionally user U) perform action A on page P?".
///
/// Checks are served from an in-memory [`PermissionSnapshot`] of the permissions table that
/// is rebuilt wholesale on reload. When the table can't be read, or has no entry for a
/// check, the injected [`DefaultPolicy`] decides. Nothing matching means deny.
///
/// Cloning is cheap; every clone shares the same snapshot and reload guard.
#[derive(Clone)]
pub struct PermissionResolver {
  source: Arc<dyn PermissionSource>,
  policy: Arc<DefaultPolicy>,
  snapshot: Arc<RwLock<Arc<PermissionSnapshot>>>,
  /// Held for the whole duration of a fetch. Opportunistic reloads only `try_lock` it, so
  /// concurrent triggers collapse into the one already running.
  reload_guard: Arc<Mutex<()>>,
  freshness_window: Duration,
  metrics_state: MetricsCalState,
  metrics: Option<Arc<AccessControlMetrics>>,
}

impl PermissionResolver {
  pub fn new(
    source: Arc<dyn PermissionSource>,
    policy: DefaultPolicy,
    freshness_window: Duration,
  ) -> Self {
    Self {
      source,
      policy: Arc::new(policy),
      snapshot: Arc::new(RwLock::new(Arc::new(PermissionSnapshot::empty()))),
      reload_guard: Arc::new(Mutex::new(())),
      freshness_window,
      metrics_state: MetricsCalState::new(),
      metrics: None,
    }
  }

  /// Publishes the resolver's counters. Must be called inside a tokio runtime.
  pub fn with_metrics(mut self, metrics: Arc<AccessControlMetrics>) -> Self {
    tick_metric(self.metrics_state.clone(), metrics.clone());
    self.metrics = Some(metrics);
    self
  }

  /// Loads the permissions table once at startup. A failure is logged and the resolver
  /// serves from the default policy until a later reload succeeds.
  pub async fn initialize(&self) {
    match self.load_with_guard().await {
      Ok(ReloadOutcome::Applied { entries }) => {
        info!(
          "[access control]: permissions initialized with {} entries",
          entries
        );
      },
      Ok(outcome) => {
        warn!(
          "[access control]: permissions table not loaded at startup: {:?}, serving from the default policy",
          outcome
        );
      },
      Err(err) => {
        error!(
          "[access control]: fail to load permissions at startup, serving from the default policy: {}",
          err
        );
      },
    }
  }

  pub fn policy(&self) -> &DefaultPolicy {
    &self.policy
  }

  pub fn is_admin_role(&self, role: &str) -> bool {
    self.policy.is_admin(role)
  }

  pub fn freshness_window(&self) -> Duration {
    self.freshness_window
  }

  /// The last known good snapshot. Callers that must answer synchronously can keep it and
  /// call [`PermissionSnapshot::resolve`] with [`PermissionResolver::policy`].
  pub fn snapshot(&self) -> Arc<PermissionSnapshot> {
    self.snapshot.read().clone()
  }

  /// Whether the permissions table has ever been loaded into a non empty snapshot.
  pub fn are_permissions_loaded(&self) -> bool {
    !self.snapshot.read().is_empty()
  }

  /// Authoritative check, meant to be called before committing a mutating operation.
  ///
  /// 1. Administrative roles always pass.
  /// 2. A snapshot older than the freshness window is reloaded first.
  /// 3. The user scoped entry, then the role scoped entry, answers.
  /// 4. On a miss the table is reloaded once more and step 3 repeated.
  /// 5. The fallback matrix answers.
  /// 6. Otherwise deny.
  ///
  /// Never fails: an error while reloading falls through to
  /// [`PermissionResolver::can_perform_action_sync`].
  #[instrument(level = "debug", skip(self))]
  pub async fn can_perform_action(
    &self,
    role: &str,
    page: &str,
    action: Action,
    user_id: Option<i64>,
  ) -> bool {
    if self.policy.is_admin(role) {
      self.metrics_state.record_decision(&PermissionDecision::Bypass);
      return true;
    }

    match self.resolve(role, page, action, user_id).await {
      Ok(decision) => {
        trace!(
          "[access control]: {} {} {} user={:?} => {:?}",
          role,
          page,
          action,
          user_id,
          decision
        );
        self.metrics_state.record_decision(&decision);
        decision.is_allowed()
      },
      Err(err) => {
        warn!(
          "[access control]: fail to resolve {} {} {} from the permissions table: {}",
          role, page, action, err
        );
        self.can_perform_action_sync(role, page, action, user_id)
      },
    }
  }

  /// Non-blocking check for render-time gating.
  ///
  /// Same precedence as [`PermissionResolver::can_perform_action`] but never waits on the
  /// network. When nothing was loaded yet, a background reload is started (at most one at a
  /// time) and the answer comes from the fallback matrix.
  pub fn can_perform_action_sync(
    &self,
    role: &str,
    page: &str,
    action: Action,
    user_id: Option<i64>,
  ) -> bool {
    if self.policy.is_admin(role) {
      self.metrics_state.record_decision(&PermissionDecision::Bypass);
      return true;
    }

    let snapshot = self.snapshot();
    if snapshot.is_empty() {
      self.spawn_reload();
    }
    let decision = snapshot.resolve(&self.policy, role, page, action, user_id);
    self.metrics_state.record_decision(&decision);
    decision.is_allowed()
  }

  /// Drops the current snapshot and loads the table again. Call after the permissions table
  /// was edited so the change doesn't wait for the freshness window.
  ///
  /// Waits for a reload that is already running, then fetches again: a fetch that started
  /// before the edit must not be the one that answers after it.
  #[instrument(level = "debug", skip(self))]
  pub async fn reload_permissions(&self) -> Result<ReloadOutcome, AppError> {
    *self.snapshot.write() = Arc::new(PermissionSnapshot::empty());
    let guard = self.reload_guard.clone().lock_owned().await;
    let outcome = self.load(&guard).await;
    match &outcome {
      Ok(outcome) => info!("[access control]: permissions reloaded: {:?}", outcome),
      Err(err) => error!("[access control]: fail to reload permissions: {}", err),
    }
    outcome
  }

  /// Like [`PermissionResolver::reload_permissions`], but checks keep being answered from the
  /// current snapshot until the new one is in place. Used when the table is known to have
  /// changed.
  ///
  /// An empty table clears the snapshot, since the rows it held were deleted. A failed fetch
  /// keeps it.
  #[instrument(level = "debug", skip(self))]
  pub async fn refresh_permissions(&self) -> Result<ReloadOutcome, AppError> {
    let guard = self.reload_guard.clone().lock_owned().await;
    let outcome = match self.load(&guard).await {
      Ok(ReloadOutcome::KeptPrevious) => {
        *self.snapshot.write() = Arc::new(PermissionSnapshot::empty());
        Ok(ReloadOutcome::Applied { entries: 0 })
      },
      outcome => outcome,
    };
    match &outcome {
      Ok(outcome) => info!("[access control]: permissions refreshed: {:?}", outcome),
      Err(err) => warn!(
        "[access control]: fail to refresh permissions, keep the previous snapshot: {}",
        err
      ),
    }
    outcome
  }

  async fn resolve(
    &self,
    role: &str,
    page: &str,
    action: Action,
    user_id: Option<i64>,
  ) -> Result<PermissionDecision, AppError> {
    if self.snapshot().is_stale(self.freshness_window) {
      let outcome = self.load_with_guard().await?;
      trace!("[access control]: stale snapshot reload: {:?}", outcome);
    }
    if let Some(allowed) = self.snapshot().lookup(role, page, action, user_id) {
      return Ok(PermissionDecision::Cached(allowed));
    }

    // covers a cold start or a row added since the last load
    let outcome = self.load_with_guard().await?;
    trace!("[access control]: cache miss reload: {:?}", outcome);
    Ok(
      self
        .snapshot()
        .resolve(&self.policy, role, page, action, user_id),
    )
  }

  /// Reloads unless another reload is in flight, in which case the caller proceeds with the
  /// current snapshot.
  async fn load_with_guard(&self) -> Result<ReloadOutcome, AppError> {
    match self.reload_guard.clone().try_lock_owned() {
      Ok(guard) => self.load(&guard).await,
      Err(_) => Ok(ReloadOutcome::InFlight),
    }
  }

  fn spawn_reload(&self) {
    let guard = match self.reload_guard.clone().try_lock_owned() {
      Ok(guard) => guard,
      Err(_) => {
        trace!("[access control]: reload already in flight");
        return;
      },
    };
    let handle = match tokio::runtime::Handle::try_current() {
      Ok(handle) => handle,
      Err(_) => {
        debug!("[access control]: no runtime to reload permissions in the background");
        return;
      },
    };

    let resolver = self.clone();
    handle.spawn(async move {
      if let Err(err) = resolver.load(&guard).await {
        warn!(
          "[access control]: background permissions reload failed: {}",
          err
        );
      }
    });
  }

  /// Fetches the whole table and swaps in a new snapshot. An empty table or a failed fetch
  /// keeps the current snapshot.
  async fn load(&self, _guard: &OwnedMutexGuard<()>) -> Result<ReloadOutcome, AppError> {
    let start = Instant::now();
    self.metrics_state.reload.fetch_add(1, Ordering::Relaxed);
    let records = match self.source.load_all().await {
      Ok(records) => records,
      Err(err) => {
        self
          .metrics_state
          .reload_failure
          .fetch_add(1, Ordering::Relaxed);
        return Err(err);
      },
    };
    if let Some(metrics) = &self.metrics {
      metrics.record_load_all_permissions_in_millis(start.elapsed().as_millis() as u64);
    }

    if records.is_empty() {
      warn!("[access control]: permissions table is empty, keep the previous snapshot");
      return Ok(ReloadOutcome::KeptPrevious);
    }

    let snapshot = PermissionSnapshot::from_records(&records, Instant::now());
    let entries = snapshot.len();
    *self.snapshot.write() = Arc::new(snapshot);
    if let Some(metrics) = &self.metrics {
      metrics.record_cached_entries(entries);
    }
    debug!(
      "[access control]: loaded {} rows into {} entries in {:?}",
      records.len(),
      entries,
      start.elapsed()
    );
    Ok(ReloadOutcome::Applied { entries })
  }
}
