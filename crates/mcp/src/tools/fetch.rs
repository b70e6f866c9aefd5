// Page fetch tool: download a URL and return its readable text

use super::registry::{Tool, ToolDescriptor};
use super::render::describe_backend_error;
use crate::protocol::{CallToolResult, ToolContent};
use crate::schema::{Arguments, InputSchema, ParamSpec};
use anyhow::Result;
use searxng_core::{ContentExtractor, EngineConfig, SearchBackend};
use serde_json::json;
use std::sync::Arc;
use url::Url;

/// Tool to fetch a page and strip it down to readable text
pub struct FetchPageTool {
    backend: Arc<dyn SearchBackend>,
    extractor: Arc<dyn ContentExtractor>,
    descriptor: ToolDescriptor,
    length_ceiling: u64,
}

impl FetchPageTool {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        extractor: Arc<dyn ContentExtractor>,
        config: &EngineConfig,
    ) -> Self {
        let schema = InputSchema::new(vec![
            ParamSpec::string("url", "URL of the page to read").required(),
            ParamSpec::integer(
                "max_length",
                format!(
                    "Maximum number of characters to return (capped at {})",
                    config.fetch_length_ceiling
                ),
            )
            .minimum(1)
            .default_value(config.default_fetch_length),
        ]);

        Self {
            backend,
            extractor,
            descriptor: ToolDescriptor::new(
                "fetch_page_content",
                "Fetch a web page and return its content as clean Markdown text. Scripts, \
                 styles, navigation and other non-content elements are removed. Useful for \
                 reading pages found through the search tools.",
                schema,
            ),
            length_ceiling: config.fetch_length_ceiling,
        }
    }
}

/// Keep at most `max` characters. Returns the original character count.
fn truncate_chars(text: &mut String, max: usize) -> usize {
    let total = text.chars().count();
    if total > max {
        if let Some((idx, _)) = text.char_indices().nth(max) {
            text.truncate(idx);
        }
    }
    total
}

#[async_trait::async_trait]
impl Tool for FetchPageTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Arguments) -> Result<CallToolResult> {
        let Some(raw_url) = arguments.non_empty_str("url") else {
            return Ok(CallToolResult::error("URL must not be empty"));
        };

        let url = match Url::parse(&raw_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url,
            Ok(url) => {
                return Ok(CallToolResult::error(format!(
                    "Only HTTP/HTTPS URLs are supported, got: {}",
                    url.scheme()
                )));
            }
            Err(e) => {
                return Ok(CallToolResult::error(format!("Invalid URL: {}", e)));
            }
        };

        let max_length = arguments
            .u64("max_length")
            .unwrap_or(self.length_ceiling)
            .clamp(1, self.length_ceiling) as usize;

        let page = match self.backend.fetch(url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Fetch failed");
                return Ok(CallToolResult::error(describe_backend_error(
                    &format!("{}", url),
                    &e,
                )));
            }
        };

        let mut text = if page.is_html() {
            self.extractor.extract(&page.body)
        } else {
            page.body.trim().to_string()
        };

        if text.is_empty() {
            return Ok(CallToolResult::success(vec![ToolContent::text(format!(
                "No readable content found at {}",
                url
            ))])
            .with_meta(json!({ "url": page.url, "truncated": false, "originalLength": 0 })));
        }

        let original_length = truncate_chars(&mut text, max_length);
        let truncated = original_length > max_length;
        if truncated {
            tracing::debug!(url = %url, original_length, max_length, "Truncated page content");
        }

        Ok(CallToolResult::success(vec![ToolContent::text(text)]).with_meta(json!({
            "url": page.url,
            "truncated": truncated,
            "originalLength": original_length,
        })))
    }
}
