use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gladiator_pits_server::config::ServerConfig;
use gladiator_pits_server::metrics::Metrics;
use gladiator_pits_server::net::game_session::GameSession;
use gladiator_pits_server::net::transport::GameServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Gladiator Pits Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {}:{}, tick={}ms, max_train={}, max_stat={}",
        config.bind_address,
        config.port,
        config.tick_interval.as_millis(),
        config.rules.max_train,
        config.rules.max_stat
    );

    let metrics = Arc::new(Metrics::new());

    #[cfg(feature = "metrics_http")]
    if let Some(port) = config.metrics_port {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = gladiator_pits_server::metrics::start_metrics_server(metrics_clone, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let game_session = Arc::new(GameSession::new(&config, metrics));
    let server = GameServer::bind(&config, game_session.clone()).await?;

    // Ctrl+C goes through the same path as the shutdown command
    let console = game_session.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                console.request_shutdown("the console");
            }
            Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
        }
    });

    let stopped_by = server.run().await?;
    info!("Server stopped (shutdown by {})", stopped_by);

    Ok(())
}
