// src/main.rs

use clap::Parser;
use tracing::Level;

use wyoming_bridge::{BridgeConfig, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables and flags take precedence
    let _ = dotenvy::dotenv();
    let config = BridgeConfig::parse();

    let level = if config.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    config.validate()?;
    config.log_summary();

    server::run(config).await
}
