use bizadmin_cloud::application::{init_state, Application};
use bizadmin_cloud::config::config::get_configuration;
use bizadmin_cloud::telemetry::{default_filters, init_subscriber};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  // Values from the process environment take precedence over .env.
  dotenvy::dotenv().ok();

  let level = std::env::var("RUST_LOG").unwrap_or("info".to_string());
  println!("BizAdmin Cloud with RUST_LOG={}", level);
  let conf =
    get_configuration().map_err(|e| anyhow::anyhow!("Failed to read configuration: {}", e))?;
  init_subscriber(&conf.app_env, default_filters(&level))?;

  let state = init_state(&conf)
    .await
    .map_err(|e| anyhow::anyhow!("Failed to initialize application state: {}", e))?;
  let application = Application::build(conf, state).await?;
  application.run_until_stopped().await?;

  Ok(())
}
