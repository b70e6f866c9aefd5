// Command-line and environment options shared by both binaries

use anyhow::Result;
use clap::Args;
use searxng_core::Settings;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "searxng-mcp.toml", env = "SEARXNG_MCP_CONFIG")]
    pub config: PathBuf,

    /// Base URL of the SearXNG instance
    #[arg(long, env = "SEARXNG_URL")]
    pub searxng_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Backend request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Number of results returned when a call does not say
    #[arg(long, env = "DEFAULT_MAX_RESULTS")]
    pub default_max_results: Option<u64>,

    /// Server name reported in the initialize handshake
    #[arg(long, env = "MCP_SERVER_NAME")]
    pub server_name: Option<String>,

    /// Server version reported in the initialize handshake
    #[arg(long, env = "MCP_SERVER_VERSION")]
    pub server_version: Option<String>,
}

impl CommonArgs {
    /// Read the configuration file and layer flags/environment on top.
    pub fn load_settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(&self.config)?;
        self.apply(&mut settings);
        Ok(settings)
    }

    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.searxng_url {
            settings.backend.url = url.clone();
        }
        if let Some(level) = &self.log_level {
            settings.server.log_level = level.clone();
        }
        if let Some(secs) = self.request_timeout {
            settings.backend.request_timeout_secs = secs;
        }
        if let Some(n) = self.default_max_results {
            settings.limits.default_max_results = n;
        }
        if let Some(name) = &self.server_name {
            settings.server.name = name.clone();
        }
        if let Some(version) = &self.server_version {
            settings.server.version = version.clone();
        }
    }
}

/// Build the tracing filter: `RUST_LOG` wins, then the configured level.
pub fn env_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
}
