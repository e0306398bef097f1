use crate::api::metrics::metrics_scope;
use crate::api::permission::permission_scope;
use crate::biz::pg_listener::{spawn_listen_on_permission_change, PgListeners};
use crate::config::config::{Config, DatabaseSetting};
use crate::state::{AppMetrics, AppState};
use access_control::adapter::PgPermissionSource;
use access_control::{DefaultPolicy, FallbackMatrix, PermissionResolver};
use actix_web::dev::Server;
use actix_web::middleware::{Compress, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::{Context, Error};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub struct Application {
  port: u16,
  server: Server,
}

impl Application {
  pub async fn build(config: Config, state: AppState) -> Result<Self, Error> {
    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;
    let port = listener.local_addr()?.port();
    info!("Server started at {}", listener.local_addr()?);
    let server = run_actix_server(listener, state)?;
    Ok(Self { port, server })
  }

  pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
    self.server.await
  }

  pub fn port(&self) -> u16 {
    self.port
  }
}

pub fn run_actix_server(listener: TcpListener, state: AppState) -> Result<Server, Error> {
  let registry = state.metrics.registry.clone();
  let server = HttpServer::new(move || {
    App::new()
      .wrap(NormalizePath::trim())
      .wrap(Compress::default())
      .wrap(TracingLogger::default())
      .app_data(Data::new(registry.clone()))
      .app_data(Data::new(state.clone()))
      .service(permission_scope())
      .service(metrics_scope())
  })
  .listen(listener)?
  .run();
  Ok(server)
}

pub async fn init_state(config: &Config) -> Result<AppState, Error> {
  let metrics = AppMetrics::new();

  info!("Connecting to postgres database with setting: {}", config.db_settings);
  let pg_pool = get_connection_pool(&config.db_settings).await?;
  migrate(&pg_pool).await?;

  let policy = default_policy(config)?;
  let permission_resolver = PermissionResolver::new(
    Arc::new(PgPermissionSource::new(pg_pool.clone())),
    policy,
    config.permission.cache_ttl,
  )
  .with_metrics(metrics.access_control_metrics.clone());
  permission_resolver.initialize().await;

  if config.permission.listen_changes {
    let pg_listeners = PgListeners::new(&pg_pool).await?;
    spawn_listen_on_permission_change(
      pg_listeners.subscribe_permission_change(),
      permission_resolver.clone(),
    );
  }

  info!("Application state initialized");
  Ok(AppState {
    pg_pool,
    config: Arc::new(config.clone()),
    permission_resolver,
    metrics,
  })
}

fn default_policy(config: &Config) -> Result<DefaultPolicy, Error> {
  match &config.permission.fallback_path {
    None => Ok(DefaultPolicy::builtin()),
    Some(path) => {
      info!("Loading permission fallback matrix from {}", path.display());
      let matrix = FallbackMatrix::from_json_file(path)?;
      Ok(DefaultPolicy::builtin().with_matrix(matrix))
    },
  }
}

async fn get_connection_pool(setting: &DatabaseSetting) -> Result<PgPool, Error> {
  PgPoolOptions::new()
    .max_connections(setting.max_connections)
    .acquire_timeout(Duration::from_secs(10))
    .max_lifetime(Duration::from_secs(30 * 60))
    .idle_timeout(Duration::from_secs(30))
    .connect_with(setting.pg_connect_options()?)
    .await
    .context("Failed to connect to postgres database")
}

async fn migrate(pool: &PgPool) -> Result<(), Error> {
  sqlx::migrate!("./migrations")
    .set_ignore_missing(true)
    .run(pool)
    .await
    .context("Failed to run migrations")
}
