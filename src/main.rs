//! monodb - a write-ahead log engine with a thin TCP query front-end.
//!
//! Opens the WAL directory (running recovery if segments already exist),
//! then runs the stream-oriented query server until shutdown.

use monodb_server::{Config, Server, ServerConfig};
use monodb_wal::{HandlerTable, WalConfig, WalContext, WalLocation};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            if std::env::var("MONODB_CONFIG").is_ok() {
                tracing::error!("failed to load config: {e}");
                return Err(e.into());
            }
            tracing::info!("using default configuration");
            Config::default()
        }
    };

    tracing::info!("starting monodb");
    tracing::info!("  bind address: {}", config.network.bind_addr);
    tracing::info!("  WAL directory: {}", config.storage.wal_dir.display());

    std::fs::create_dir_all(&config.storage.wal_dir)?;

    let wal_config = WalConfig::new(&config.storage.wal_dir).with_segment_size(config.storage.segment_size);
    let mut wal = WalContext::init(wal_config)?;

    let handlers: HandlerTable<()> = HandlerTable::new();
    let stats = wal.recover(WalLocation::ZERO, &handlers, &mut ())?;
    tracing::info!(
        records_processed = stats.records_processed,
        records_applied = stats.records_applied,
        "WAL recovery complete"
    );
    wal.shutdown();

    let server = Server::new(
        ServerConfig::new(config.network.bind_addr).with_max_connections(config.network.max_connections),
    );
    server.run().await?;

    Ok(())
}
