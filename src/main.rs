//! # Chat Relay
//!
//! Entry point: initializes tracing, loads configuration, connects to the
//! database and serves HTTP and the WebSocket gateway until shutdown.

use anyhow::Result;
use tracing::info;

use chat_relay::config::Settings;
use chat_relay::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    chat_relay::telemetry::init_tracing();

    info!("Starting chat relay...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    info!("Server stopped");
    Ok(())
}
