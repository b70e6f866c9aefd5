pub mod fetch;
pub mod search;
mod registry;
mod render;

pub use fetch::FetchPageTool;
pub use registry::{Tool, ToolDescriptor, ToolRegistry};
pub use render::{describe_backend_error, render_results, SearchKind};
pub use search::SearchTool;

use searxng_core::{ContentExtractor, EngineConfig, SearchBackend};
use std::sync::Arc;

/// Registry with the four built-in tools, in advertised order.
pub fn default_registry(
    backend: Arc<dyn SearchBackend>,
    extractor: Arc<dyn ContentExtractor>,
    config: &EngineConfig,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchTool::web(backend.clone(), config)));
    registry.register(Arc::new(SearchTool::news(backend.clone(), config)));
    registry.register(Arc::new(SearchTool::images(backend.clone(), config)));
    registry.register(Arc::new(FetchPageTool::new(backend, extractor, config)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Arguments;
    use searxng_core::{HtmlExtractor, SearxngClient};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn registry_for(server: &MockServer) -> ToolRegistry {
        let config = EngineConfig {
            backend_url: url::Url::parse(&server.uri()).unwrap(),
            ..Default::default()
        };
        let backend = Arc::new(SearxngClient::new(&config).unwrap());
        default_registry(backend, Arc::new(HtmlExtractor), &config)
    }

    fn arguments(tool: &Arc<dyn Tool>, value: serde_json::Value) -> Arguments {
        tool.descriptor().input_schema.validate(&value).unwrap()
    }

    #[test]
    fn test_default_registry_order() {
        let registry = default_registry(
            Arc::new(searxng_core::backend::MockBackend::new()),
            Arc::new(HtmlExtractor),
            &EngineConfig::default(),
        );
        let names: Vec<String> = registry.list_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            ["web_search", "news_search", "images_search", "fetch_page_content"]
        );
    }

    #[tokio::test]
    async fn test_web_search_against_searxng() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rust async"))
            .and(query_param("format", "json"))
            .and(query_param("categories", "general"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "rust async",
                "results": [{
                    "title": "Tokio",
                    "url": "https://tokio.rs",
                    "content": "An asynchronous runtime",
                    "engines": ["duckduckgo", "brave"]
                }],
                "suggestions": ["rust futures"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let tool = registry.get("web_search").unwrap();
        let result = tool
            .execute(arguments(&tool, json!({"query": "rust async"})))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content.len(), 2);
        let text = result.text();
        assert!(text.contains("Title: Tokio"));
        assert!(text.contains("URL: https://tokio.rs"));
        assert!(text.contains("Related searches: rust futures"));
    }

    #[tokio::test]
    async fn test_fetch_page_against_http_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(
                        "<html><head><title>t</title></head><body>\
                         <nav>menu</nav><h1>Heading</h1><p>Body text</p></body></html>",
                    ),
            )
            .mount(&server)
            .await;

        let registry = registry_for(&server).await;
        let tool = registry.get("fetch_page_content").unwrap();
        let result = tool
            .execute(arguments(
                &tool,
                json!({"url": format!("{}/article", server.uri())}),
            ))
            .await
            .unwrap();

        assert!(!result.is_error);
        let text = result.text();
        assert!(text.contains("# Heading"));
        assert!(text.contains("Body text"));
        assert!(!text.contains("menu"));
    }
}
