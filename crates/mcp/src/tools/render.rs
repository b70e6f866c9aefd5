// Text layout for search results
//
// One content block per hit, one `Label: value` pair per line, so a model
// can pull fields out reliably.

use crate::protocol::ToolContent;
use searxng_core::{BackendError, ResultSet, SearchResult, UnavailableKind};

/// Which search flavour produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Web,
    News,
    Images,
}

impl SearchKind {
    fn noun(self) -> &'static str {
        match self {
            Self::Web => "results",
            Self::News => "news results",
            Self::Images => "images",
        }
    }
}

/// Render a (possibly empty) result set as content blocks.
pub fn render_results(kind: SearchKind, query: &str, set: &ResultSet) -> Vec<ToolContent> {
    if set.is_empty() && set.answers.is_empty() {
        let mut text = format!("No {} found for \"{}\".", kind.noun(), query);
        if !set.suggestions.is_empty() {
            text.push_str(&format!(" Related searches: {}", set.suggestions.join(", ")));
        }
        return vec![ToolContent::text(text)];
    }

    let mut blocks = Vec::with_capacity(set.results.len() + 2);

    if !set.answers.is_empty() {
        let mut text = String::from("Answers:");
        for answer in &set.answers {
            text.push_str("\n- ");
            text.push_str(answer);
        }
        blocks.push(ToolContent::text(text));
    }

    for (index, result) in set.results.iter().enumerate() {
        blocks.push(ToolContent::text(render_result(kind, index + 1, result)));
    }

    if !set.suggestions.is_empty() {
        blocks.push(ToolContent::text(format!(
            "Related searches: {}",
            set.suggestions.join(", ")
        )));
    }

    blocks
}

fn render_result(kind: SearchKind, rank: usize, result: &SearchResult) -> String {
    let mut lines = vec![
        format!("Result: {}", rank),
        format!("Title: {}", single_line(&result.title)),
        format!("URL: {}", result.url),
    ];

    if kind == SearchKind::Images {
        if let Some(image) = &result.image_url {
            lines.push(format!("Image: {}", image));
        }
        if let Some(thumbnail) = &result.thumbnail_url {
            lines.push(format!("Thumbnail: {}", thumbnail));
        }
    }

    if !result.snippet.is_empty() {
        lines.push(format!("Snippet: {}", single_line(&result.snippet)));
    }
    if !result.engines.is_empty() {
        lines.push(format!("Engines: {}", result.engines.join(", ")));
    }
    if let Some(published) = &result.published {
        lines.push(format!("Published: {}", published));
    }

    lines.join("\n")
}

/// Keep the one-field-per-line layout intact.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Client-facing description of a backend failure.
pub fn describe_backend_error(subject: &str, err: &BackendError) -> String {
    match err {
        BackendError::Unavailable {
            kind: UnavailableKind::Timeout,
        } => format!("{} timed out", subject),
        BackendError::Unavailable { kind } => format!("{} is unreachable ({})", subject, kind),
        BackendError::Status { status, .. } => {
            format!("{} returned HTTP status {}", subject, status)
        }
        BackendError::InvalidResponse(_) => format!("{} returned an invalid response", subject),
        BackendError::UnsupportedContent(content_type) => {
            format!("unsupported content type: {}", content_type)
        }
        BackendError::InvalidUrl(reason) => format!("invalid URL: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searxng_core::backend::mock::make_result;

    #[test]
    fn test_empty_set_is_single_block() {
        let blocks = render_results(SearchKind::Web, "nothing", &ResultSet::default());
        assert_eq!(
            blocks,
            vec![ToolContent::text("No results found for \"nothing\".")]
        );
    }

    #[test]
    fn test_answers_survive_without_results() {
        let set = ResultSet {
            answers: vec!["42".to_string()],
            ..Default::default()
        };

        let blocks = render_results(SearchKind::Web, "meaning of life", &set);
        assert_eq!(blocks, vec![ToolContent::text("Answers:\n- 42")]);
    }

    #[test]
    fn test_one_block_per_result() {
        let mut first = make_result("Rust", "https://rust-lang.org", "A language\nempowering everyone");
        first.engines = vec!["google".to_string(), "bing".to_string()];
        let set = ResultSet {
            results: vec![first, make_result("Tokio", "https://tokio.rs", "")],
            ..Default::default()
        };

        let blocks = render_results(SearchKind::Web, "rust", &set);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            ToolContent::text(
                "Result: 1\nTitle: Rust\nURL: https://rust-lang.org\nSnippet: A language empowering everyone\nEngines: google, bing"
            )
        );
        assert_eq!(
            blocks[1],
            ToolContent::text("Result: 2\nTitle: Tokio\nURL: https://tokio.rs")
        );
    }

    #[test]
    fn test_answers_and_suggestions_blocks() {
        let set = ResultSet {
            results: vec![make_result("a", "https://a", "")],
            answers: vec!["42".to_string()],
            suggestions: vec!["b".to_string(), "c".to_string()],
            total: None,
        };
        let blocks = render_results(SearchKind::News, "q", &set);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], ToolContent::text("Answers:\n- 42"));
        assert_eq!(blocks[2], ToolContent::text("Related searches: b, c"));
    }

    #[test]
    fn test_image_fields() {
        let mut hit = make_result("Cat", "https://example.com/cat", "");
        hit.image_url = Some("https://example.com/cat.jpg".to_string());
        let set = ResultSet {
            results: vec![hit],
            ..Default::default()
        };
        let blocks = render_results(SearchKind::Images, "cat", &set);
        let ToolContent::Text { text } = &blocks[0];
        assert!(text.contains("Image: https://example.com/cat.jpg"));
    }

    #[test]
    fn test_backend_error_descriptions() {
        let err = BackendError::Unavailable {
            kind: UnavailableKind::Connect,
        };
        assert_eq!(
            describe_backend_error("search backend", &err),
            "search backend is unreachable (connection failed)"
        );

        let err = BackendError::Status {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(
            describe_backend_error("search backend", &err),
            "search backend returned HTTP status 503"
        );
    }
}
