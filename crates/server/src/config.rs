use crate::sessions::SessionTable;
use anyhow::{Context, Result};
use searxng_core::config::SessionSettings;
use searxng_core::{EngineConfig, HtmlExtractor, SearchBackend, SearxngClient, Settings};
use searxng_mcp::protocol::ServerInfo;
use searxng_mcp::tools::default_registry;
use searxng_mcp::McpServer;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared by every handler
pub struct AppState {
    pub server: Arc<McpServer>,
    pub backend: Arc<dyn SearchBackend>,
    pub sessions: Arc<SessionTable>,
    pub config: Arc<EngineConfig>,
    pub idle_timeout: Duration,
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(settings: &Settings) -> Result<Self> {
        let config = settings.engine_config()?;
        let backend: Arc<dyn SearchBackend> =
            Arc::new(SearxngClient::new(&config).context("Failed to create SearXNG client")?);
        Ok(Self::with_backend(backend, config, &settings.sessions))
    }

    /// Wire the dispatcher and session table around an existing backend.
    pub fn with_backend(
        backend: Arc<dyn SearchBackend>,
        config: EngineConfig,
        sessions: &SessionSettings,
    ) -> Self {
        let registry = default_registry(backend.clone(), Arc::new(HtmlExtractor), &config);
        tracing::info!("Registered {} tools", registry.len());

        let server = McpServer::new(
            registry,
            ServerInfo {
                name: config.server_name.clone(),
                version: config.server_version.clone(),
            },
            config.request_timeout,
        );

        Self {
            server: Arc::new(server),
            backend,
            sessions: Arc::new(SessionTable::new(sessions.max_sessions.max(1))),
            config: Arc::new(config),
            idle_timeout: Duration::from_secs(sessions.idle_timeout_secs.max(1)),
            keep_alive: Duration::from_secs(sessions.keep_alive_secs.max(1)),
        }
    }
}
