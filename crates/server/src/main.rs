//! hamclub-bot server entry point.
//!
//! Loads configuration, opens the guild store and boots the MCP server on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use hamclub_client::{FetchClient, FetchConfig};
use hamclub_core::{AppConfig, GuildDb, WebCache};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        cache_ttl_secs = config.cache_ttl_secs,
        "Starting hamclub-bot on stdio transport"
    );

    let db = GuildDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening guild storage at {}", config.db_path.display()))?;

    let client = FetchClient::new(FetchConfig::from(&config))?;
    let cache = WebCache::with_config(client, &config);

    let handler = handler::HamClubServer::new(cache, db, config);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
