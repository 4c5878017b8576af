use anyhow::Context;
use tracing::{error, info};

use notify_service::api::ApiServer;
use notify_service::config::ServiceConfig;
use notify_service::logging::init_logging;
use notify_service::services::ServiceContainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_env().context("Failed to load configuration")?;

    let (logging_config, _log_guard) =
        init_logging(config.log_dir.as_deref()).context("Failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting notify-service");

    let container = ServiceContainer::new(&config)?;
    let state = container.app_state().with_logging_config(logging_config);

    let server = ApiServer::with_state(config.api.clone(), state);
    let cancel_token = server.cancel_token();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        cancel_token.cancel();
    });

    let result = server.run().await;
    if let Err(e) = &result {
        error!(error = %e, "API server failed");
    }

    container.shutdown().await;
    info!("notify-service stopped");

    result.map_err(Into::into)
}
