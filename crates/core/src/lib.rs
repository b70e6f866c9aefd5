// Core types and backend access for the SearXNG MCP server

pub mod backend;
pub mod config;
pub mod extract;
pub mod types;

pub use backend::{BackendError, BackendResult, SearchBackend, SearxngClient, UnavailableKind};
pub use config::{EngineConfig, Settings};
pub use extract::{ContentExtractor, HtmlExtractor};
pub use types::*;
