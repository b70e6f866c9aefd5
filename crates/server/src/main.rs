use anyhow::Result;
use clap::Parser;
use searxng_mcp::cli::{env_filter, CommonArgs};

mod api;
mod config;
mod sessions;

use config::AppState;

#[derive(Parser, Debug)]
#[command(name = "searxng-mcp-server")]
#[command(about = "SearXNG MCP server over HTTP and Server-Sent Events", long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = args.common.load_settings()?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&settings.server.log_level))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        "Starting {} v{}",
        settings.server.name,
        settings.server.version
    );
    tracing::info!("SearXNG backend: {}", settings.backend.url);

    let state = AppState::new(&settings)?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("Starting HTTP server on {}", addr);

    api::serve(&addr, state).await?;

    Ok(())
}
