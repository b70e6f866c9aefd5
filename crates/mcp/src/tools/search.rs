// Search tools backed by SearXNG: web_search, news_search, images_search

use super::registry::{Tool, ToolDescriptor};
use super::render::{describe_backend_error, render_results, SearchKind};
use crate::protocol::CallToolResult;
use crate::schema::{Arguments, InputSchema, ParamSpec};
use anyhow::Result;
use searxng_core::{EngineConfig, SearchBackend, SearchParams};
use std::sync::Arc;

const TIME_RANGES: [&str; 4] = ["day", "week", "month", "year"];

/// One search flavour. The category is pinned for news and images.
pub struct SearchTool {
    kind: SearchKind,
    backend: Arc<dyn SearchBackend>,
    descriptor: ToolDescriptor,
    max_results_ceiling: u64,
}

impl SearchTool {
    pub fn web(backend: Arc<dyn SearchBackend>, config: &EngineConfig) -> Self {
        let schema = InputSchema::new(vec![
            query_param(),
            ParamSpec::string(
                "category",
                "Comma-separated categories (e.g. general, it, science, social media)",
            )
            .default_value("general"),
            ParamSpec::string(
                "engines",
                "Comma-separated engines to query (e.g. google,bing,duckduckgo)",
            ),
            language_param(),
            time_range_param(),
            ParamSpec::integer("safesearch", "SafeSearch level: 0 (off), 1 (moderate), 2 (strict)")
                .one_of([0, 1, 2]),
            pageno_param(),
            max_results_param(config),
        ]);

        Self::new(
            SearchKind::Web,
            backend,
            config,
            ToolDescriptor::new(
                "web_search",
                "Search the web through SearXNG, a metasearch engine aggregating Google, Bing, \
                 DuckDuckGo, Brave and others. Returns title, URL and snippet for each result.",
                schema,
            ),
        )
    }

    pub fn news(backend: Arc<dyn SearchBackend>, config: &EngineConfig) -> Self {
        let schema = InputSchema::new(vec![
            query_param(),
            language_param(),
            time_range_param(),
            pageno_param(),
            max_results_param(config),
        ]);

        Self::new(
            SearchKind::News,
            backend,
            config,
            ToolDescriptor::new(
                "news_search",
                "Search recent news articles through SearXNG. Returns title, URL, snippet and \
                 publication date for each article.",
                schema,
            ),
        )
    }

    pub fn images(backend: Arc<dyn SearchBackend>, config: &EngineConfig) -> Self {
        let schema = InputSchema::new(vec![
            query_param(),
            ParamSpec::string("engines", "Comma-separated image engines (e.g. bing images)"),
            language_param(),
            ParamSpec::integer("safesearch", "SafeSearch level: 0 (off), 1 (moderate), 2 (strict)")
                .one_of([0, 1, 2])
                .default_value(1),
            pageno_param(),
            max_results_param(config),
        ]);

        Self::new(
            SearchKind::Images,
            backend,
            config,
            ToolDescriptor::new(
                "images_search",
                "Search images through SearXNG. Returns image URL, thumbnail, title and source \
                 page for each result.",
                schema,
            ),
        )
    }

    fn new(
        kind: SearchKind,
        backend: Arc<dyn SearchBackend>,
        config: &EngineConfig,
        descriptor: ToolDescriptor,
    ) -> Self {
        Self {
            kind,
            backend,
            descriptor,
            max_results_ceiling: config.max_results_ceiling,
        }
    }

    fn build_params(&self, arguments: &Arguments) -> SearchParams {
        let mut params = SearchParams::new(arguments.non_empty_str("query").unwrap_or_default());
        params.categories = match self.kind {
            SearchKind::Web => arguments
                .non_empty_str("category")
                .or_else(|| Some("general".to_string())),
            SearchKind::News => Some("news".to_string()),
            SearchKind::Images => Some("images".to_string()),
        };
        params.engines = arguments.non_empty_str("engines");
        params.language = arguments.non_empty_str("language");
        params.time_range = arguments.non_empty_str("time_range");
        params.safesearch = arguments.u64("safesearch").map(|n| n as u8);
        params.pageno = arguments
            .u64("pageno")
            .map(|n| n.min(u32::MAX as u64) as u32);
        params
    }
}

#[async_trait::async_trait]
impl Tool for SearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Arguments) -> Result<CallToolResult> {
        let params = self.build_params(&arguments);
        let limit = arguments
            .u64("max_results")
            .unwrap_or(self.max_results_ceiling)
            .clamp(1, self.max_results_ceiling);

        match self.backend.search(&params).await {
            Ok(mut set) => {
                set.truncate(limit as usize);
                tracing::debug!(
                    tool = %self.descriptor.name,
                    results = set.results.len(),
                    "Search completed"
                );
                Ok(CallToolResult::success(render_results(
                    self.kind,
                    &params.query,
                    &set,
                )))
            }
            Err(e) => {
                tracing::warn!(tool = %self.descriptor.name, error = %e, "Search failed");
                Ok(CallToolResult::error(describe_backend_error(
                    "search backend",
                    &e,
                )))
            }
        }
    }
}

fn query_param() -> ParamSpec {
    ParamSpec::string("query", "Search terms").required().min_length(1)
}

fn language_param() -> ParamSpec {
    ParamSpec::string("language", "Language code (e.g. en, pt-BR, es)")
}

fn time_range_param() -> ParamSpec {
    ParamSpec::string("time_range", "Only return results from this period").one_of(TIME_RANGES)
}

fn pageno_param() -> ParamSpec {
    ParamSpec::integer("pageno", "Result page number").minimum(1)
}

fn max_results_param(config: &EngineConfig) -> ParamSpec {
    ParamSpec::integer(
        "max_results",
        format!(
            "Maximum number of results to return (capped at {})",
            config.max_results_ceiling
        ),
    )
    .minimum(1)
    .default_value(config.default_max_results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use searxng_core::backend::mock::make_result;
    use searxng_core::backend::MockBackend;
    use searxng_core::{BackendError, ResultSet, UnavailableKind};
    use serde_json::json;

    fn validated(tool: &SearchTool, args: serde_json::Value) -> Arguments {
        tool.descriptor().input_schema.validate(&args).unwrap()
    }

    fn many_results(n: usize) -> ResultSet {
        ResultSet {
            results: (0..n)
                .map(|i| make_result(&format!("r{i}"), &format!("https://e.com/{i}"), "s"))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_web_search_defaults() {
        let backend = Arc::new(MockBackend::new());
        backend.set_search_response(Ok(many_results(30)));
        let tool = SearchTool::web(backend.clone(), &EngineConfig::default());

        let result = tool
            .execute(validated(&tool, json!({"query": "rust"})))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content.len(), 10);
        let params = backend.last_search().unwrap();
        assert_eq!(params.query, "rust");
        assert_eq!(params.categories.as_deref(), Some("general"));
    }

    #[tokio::test]
    async fn test_max_results_clamped_to_ceiling() {
        let backend = Arc::new(MockBackend::new());
        backend.set_search_response(Ok(many_results(80)));
        let config = EngineConfig {
            max_results_ceiling: 25,
            ..Default::default()
        };
        let tool = SearchTool::web(backend, &config);

        let result = tool
            .execute(validated(&tool, json!({"query": "rust", "max_results": 1000})))
            .await
            .unwrap();
        assert_eq!(result.content.len(), 25);
    }

    #[tokio::test]
    async fn test_news_and_images_force_category() {
        let backend = Arc::new(MockBackend::new());

        let news = SearchTool::news(backend.clone(), &EngineConfig::default());
        news.execute(validated(&news, json!({"query": "x", "time_range": "week"})))
            .await
            .unwrap();
        let params = backend.last_search().unwrap();
        assert_eq!(params.categories.as_deref(), Some("news"));
        assert_eq!(params.time_range.as_deref(), Some("week"));

        let images = SearchTool::images(backend.clone(), &EngineConfig::default());
        images
            .execute(validated(&images, json!({"query": "x", "category": "it"})))
            .await
            .unwrap();
        let params = backend.last_search().unwrap();
        assert_eq!(params.categories.as_deref(), Some("images"));
        assert_eq!(params.safesearch, Some(1));
    }

    #[tokio::test]
    async fn test_backend_failure_is_tool_error() {
        let backend = Arc::new(MockBackend::new());
        backend.set_search_response(Err(BackendError::Unavailable {
            kind: UnavailableKind::Connect,
        }));
        let tool = SearchTool::web(backend, &EngineConfig::default());

        let result = tool
            .execute(validated(&tool, json!({"query": "x"})))
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);
        assert_eq!(
            result.text(),
            "Error: search backend is unreachable (connection failed)"
        );
    }

    #[test]
    fn test_descriptor_schemas() {
        let backend: Arc<dyn SearchBackend> = Arc::new(MockBackend::new());
        let config = EngineConfig::default();

        let web = SearchTool::web(backend.clone(), &config).descriptor().schema();
        assert_eq!(web.name, "web_search");
        assert_eq!(web.input_schema["required"], json!(["query"]));
        assert_eq!(web.input_schema["properties"]["max_results"]["default"], 10);

        let news = SearchTool::news(backend, &config).descriptor().schema();
        assert!(news.input_schema["properties"].get("category").is_none());
    }
}
