//! mcp-webstash server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use webstash_client::FetchCache;
use webstash_core::{AppConfig, SearchCache};

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

    let config = AppConfig::load()?;
    tracing::info!(
        max_file_size = config.max_file_size,
        max_total_cache_size = config.max_total_cache_size,
        "Starting mcp-webstash server on stdio transport"
    );

    let search = SearchCache::new(config.search_limits());
    let fetch = FetchCache::from_config(&config)?;
    let sweepers = [search.spawn_sweeper(), fetch.spawn_sweeper()];

    let handler = handler::WebstashServer::new(search, fetch);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    for sweeper in sweepers {
        sweeper.abort();
    }

    Ok(())
}
