use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lendwatch_monitor::config::{Config, LoggingConfig};
use lendwatch_monitor::indexer::gateway::RpcGateway;
use lendwatch_monitor::monitor::Monitor;
use lendwatch_monitor::notify::Notifier;

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;

    // Initialize structured logging (set RUST_LOG to override the level)
    init_logging(&config.logging);

    tracing::info!(
        chain = %config.chain.name,
        assets = config.assets.len(),
        "Configuration loaded from {}",
        config_path
    );

    let gateway = Arc::new(RpcGateway::new(&config.chain, config.pool_address()?)?);
    let notifier = Arc::new(Notifier::new(config.notifier.clone())?);
    let monitor = Monitor::new(config, gateway, notifier)?;

    let start_block = monitor.initialize().await?;

    // Create shutdown signal
    let shutdown = CancellationToken::new();
    let run = monitor.run(start_block, shutdown.clone());
    tokio::pin!(run);

    tracing::info!("Monitor started. Press Ctrl+C to stop.");

    let interrupted = tokio::select! {
        _ = &mut run => false,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            true
        }
    };

    if interrupted {
        tracing::info!("Shutdown signal received, stopping monitor...");
        shutdown.cancel();
        run.await;
    } else {
        tracing::warn!("Monitor loops exited unexpectedly");
    }

    tracing::info!("Monitor stopped gracefully");
    Ok(())
}
