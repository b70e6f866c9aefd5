// MCP (Model Context Protocol) server for SearXNG
// Exposes web, news and image search plus page fetching to agent clients.

pub mod cli;
pub mod executor;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod stdio;
pub mod tools;

pub use server::McpServer;
