// Configuration model shared by the stdio and HTTP binaries

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// File-backed settings. Every field has a default so a partial (or absent)
/// TOML file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub limits: LimitSettings,

    #[serde(default)]
    pub sessions: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_searxng_url")]
    pub url: String,

    /// Per tool-call deadline, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Ceiling on simultaneous outbound calls; callers beyond it wait
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_max_results")]
    pub default_max_results: u64,

    #[serde(default = "default_max_results_ceiling")]
    pub max_results_ceiling: u64,

    #[serde(default = "default_fetch_length")]
    pub default_fetch_length: u64,

    #[serde(default = "default_fetch_length_ceiling")]
    pub fetch_length_ceiling: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_name() -> String {
    "searxng-mcp-server".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8091
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_searxng_url() -> String {
    "http://searxng:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_max_concurrent() -> usize {
    32
}

fn default_max_results() -> u64 {
    10
}

fn default_max_results_ceiling() -> u64 {
    50
}

fn default_fetch_length() -> u64 {
    5000
}

fn default_fetch_length_ceiling() -> u64 {
    100_000
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_keep_alive() -> u64 {
    30
}

fn default_max_sessions() -> usize {
    1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: default_searxng_url(),
            request_timeout_secs: default_request_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            default_max_results: default_max_results(),
            max_results_ceiling: default_max_results_ceiling(),
            default_fetch_length: default_fetch_length(),
            fetch_length_ceiling: default_fetch_length_ceiling(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            keep_alive_secs: default_keep_alive(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            backend: BackendSettings::default(),
            limits: LimitSettings::default(),
            sessions: SessionSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!(
                "Configuration file {} not found, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .context("Failed to read configuration file")?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }

    /// Freeze the settings into the values the engine consumes.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let backend_url = Url::parse(&self.backend.url)
            .with_context(|| format!("Invalid backend URL: {}", self.backend.url))?;

        if self.limits.max_results_ceiling == 0 {
            anyhow::bail!("limits.max_results_ceiling must be at least 1");
        }
        if self.backend.max_concurrent_requests == 0 {
            anyhow::bail!("backend.max_concurrent_requests must be at least 1");
        }
        if self.backend.request_timeout_secs == 0 {
            anyhow::bail!("backend.request_timeout_secs must be at least 1");
        }

        Ok(EngineConfig {
            server_name: self.server.name.clone(),
            server_version: self.server.version.clone(),
            backend_url,
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
            probe_timeout: Duration::from_secs(self.backend.probe_timeout_secs),
            max_concurrent_requests: self.backend.max_concurrent_requests,
            default_max_results: self
                .limits
                .default_max_results
                .clamp(1, self.limits.max_results_ceiling),
            max_results_ceiling: self.limits.max_results_ceiling,
            default_fetch_length: self.limits.default_fetch_length.max(1),
            fetch_length_ceiling: self.limits.fetch_length_ceiling.max(1),
        })
    }
}

/// Immutable engine configuration, injected into the backend client and tools.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_name: String,
    pub server_version: String,
    pub backend_url: Url,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub default_max_results: u64,
    pub max_results_ceiling: u64,
    pub default_fetch_length: u64,
    pub fetch_length_ceiling: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        // Defaults always produce a valid config
        Settings::default()
            .engine_config()
            .unwrap_or_else(|e| unreachable!("default settings are valid: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/searxng-mcp.toml")).unwrap();
        assert_eq!(settings.server.port, 8091);
        assert_eq!(settings.backend.url, "http://searxng:8080");
        assert_eq!(settings.limits.default_max_results, 10);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[backend]\nurl = \"http://localhost:9999\"\n\n[limits]\nmax_results_ceiling = 20"
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.backend.url, "http://localhost:9999");
        assert_eq!(settings.backend.request_timeout_secs, 30);
        assert_eq!(settings.limits.max_results_ceiling, 20);
        assert_eq!(settings.sessions.max_sessions, 1024);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[backend\nurl = ").unwrap();
        assert!(Settings::load(file.path()).is_err());
    }

    #[test]
    fn test_engine_config_clamps_default_results() {
        let mut settings = Settings::default();
        settings.limits.default_max_results = 500;
        settings.limits.max_results_ceiling = 25;

        let config = settings.engine_config().unwrap();
        assert_eq!(config.default_max_results, 25);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_engine_config_rejects_bad_url() {
        let mut settings = Settings::default();
        settings.backend.url = "not a url".to_string();
        assert!(settings.engine_config().is_err());
    }

    #[test]
    fn test_engine_config_rejects_zero_timeout() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\nrequest_timeout_secs = 0").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        let err = settings.engine_config().unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }
}
