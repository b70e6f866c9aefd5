// Search request and result-set types

use serde::{Deserialize, Serialize};

/// Parameters for one backend search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engines: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safesearch: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pageno: Option<u32>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Query-string pairs understood by the SearXNG `/search` endpoint.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("q", self.query.clone()), ("format", "json".to_string())];

        if let Some(categories) = &self.categories {
            pairs.push(("categories", categories.clone()));
        }
        if let Some(engines) = &self.engines {
            pairs.push(("engines", engines.clone()));
        }
        if let Some(language) = &self.language {
            pairs.push(("language", language.clone()));
        }
        if let Some(time_range) = &self.time_range {
            pairs.push(("time_range", time_range.clone()));
        }
        if let Some(safesearch) = self.safesearch {
            pairs.push(("safesearch", safesearch.to_string()));
        }
        if let Some(pageno) = self.pageno {
            pairs.push(("pageno", pageno.to_string()));
        }

        pairs
    }
}

/// One normalized search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default)]
    pub engines: Vec<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Ordered results plus the auxiliary data the backend returns alongside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Keep at most `limit` results, preserving backend ranking.
    pub fn truncate(&mut self, limit: usize) {
        self.results.truncate(limit);
    }
}

/// Raw body of a fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub content_type: String,
    pub body: String,
}

impl FetchedPage {
    pub fn is_html(&self) -> bool {
        self.content_type.contains("text/html") || self.content_type.contains("application/xhtml")
    }

    pub fn is_plain_text(&self) -> bool {
        self.content_type.contains("text/plain")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_skip_unset_fields() {
        let params = SearchParams::new("rust async");
        let pairs = params.to_query_pairs();
        assert_eq!(
            pairs,
            vec![("q", "rust async".to_string()), ("format", "json".to_string())]
        );
    }

    #[test]
    fn test_query_pairs_include_filters() {
        let params = SearchParams {
            query: "tokio".to_string(),
            categories: Some("news".to_string()),
            time_range: Some("day".to_string()),
            safesearch: Some(1),
            pageno: Some(2),
            ..Default::default()
        };
        let pairs = params.to_query_pairs();
        assert!(pairs.contains(&("categories", "news".to_string())));
        assert!(pairs.contains(&("time_range", "day".to_string())));
        assert!(pairs.contains(&("safesearch", "1".to_string())));
        assert!(pairs.contains(&("pageno", "2".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "engines"));
    }

    #[test]
    fn test_content_type_detection() {
        let page = FetchedPage {
            url: "http://example.com".to_string(),
            content_type: "text/html; charset=utf-8".to_string(),
            body: String::new(),
        };
        assert!(page.is_html());
        assert!(!page.is_plain_text());
    }
}
