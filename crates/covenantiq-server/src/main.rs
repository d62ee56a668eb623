//! CovenantIQ server entry point.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use covenantiq_engine::{CovenantEngineBuilder, RecomputeMode};
use covenantiq_ext_file::create_memory_storage;
use covenantiq_server::{load_seed_data, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,covenantiq=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("CovenantIQ Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/covenantiq.toml".to_string());

    let server_config = if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from {}", config_path);
        ServerConfig::from_file(&config_path)?
    } else {
        info!("Using default configuration");
        ServerConfig::default()
    };

    // Build engine over in-memory stores
    let engine = CovenantEngineBuilder::new()
        .with_config(server_config.engine.clone())
        .with_storage(create_memory_storage())
        .build()?;
    let engine = Arc::new(engine);

    // Seed and evaluate
    load_seed_data(&engine, &server_config).await?;
    let report = engine.recompute(RecomputeMode::All).await?;
    if !report.is_complete() {
        warn!(failed = ?report.failed_ids(), "initial recompute incomplete");
    }

    // Start refresh loop
    let refresh = engine.start();

    // Start server
    let server = Server::new(server_config, engine.clone());
    server.start().await?;

    engine.shutdown().await?;
    if let Some(handle) = refresh {
        handle.await?;
    }

    Ok(())
}
