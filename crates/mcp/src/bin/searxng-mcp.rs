// Standalone MCP server binary speaking over stdin/stdout

use anyhow::Result;
use clap::Parser;
use searxng_core::{HtmlExtractor, SearxngClient};
use searxng_mcp::cli::{env_filter, CommonArgs};
use searxng_mcp::protocol::ServerInfo;
use searxng_mcp::server::McpServer;
use searxng_mcp::stdio;
use searxng_mcp::tools::default_registry;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "searxng-mcp")]
#[command(about = "SearXNG MCP server (stdio transport)", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.common.load_settings()?;

    // stdout carries protocol frames, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&settings.server.log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = settings.engine_config()?;
    tracing::info!(backend = %config.backend_url, "SearXNG MCP server starting (stdio)");

    let backend = Arc::new(SearxngClient::new(&config)?);
    let registry = default_registry(backend, Arc::new(HtmlExtractor), &config);
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(
        registry,
        ServerInfo {
            name: config.server_name.clone(),
            version: config.server_version.clone(),
        },
        config.request_timeout,
    );

    stdio::serve(&server, tokio::io::stdin(), tokio::io::stdout()).await
}
