use dotenvy::dotenv;
use relay_service::config::RelayConfig;
use relay_service::services::init_metrics;
use relay_service::startup::Application;
use service_core::observability::{init_tracing, shutdown_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = RelayConfig::load().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "relay-service",
        &config.observability.log_level,
        config.observability.otlp_endpoint.as_deref(),
    )?;

    init_metrics()?;

    let application = Application::build(config).await?;
    info!(port = application.port(), "Starting relay-service");

    let result = application.run_until_stopped().await;
    shutdown_tracing();
    result?;

    Ok(())
}
