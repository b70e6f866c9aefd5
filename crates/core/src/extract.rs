// HTML to readable Markdown-ish text

use scraper::{ElementRef, Html, Node};

/// Elements whose whole subtree is dropped.
const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript", "form",
    "svg", "template", "button",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "blockquote", "table", "tr", "ul", "ol", "dl",
    "figure", "figcaption", "dd", "dt",
];

/// Turns an HTML document into plain text suitable for a language model.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str) -> String;
}

/// Default extractor: strips non-content markup and renders headings,
/// paragraphs, list items and links as Markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl ContentExtractor for HtmlExtractor {
    fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut out = String::new();
        render_element(document.root_element(), &mut out);
        tidy(&out)
    }
}

fn render_element(element: ElementRef<'_>, out: &mut String) {
    let tag = element.value().name();
    if SKIPPED_TAGS.contains(&tag) {
        return;
    }

    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            let text = collapse_whitespace(&element.text().collect::<String>());
            if !text.is_empty() {
                out.push_str("\n\n");
                out.push_str(&"#".repeat(level));
                out.push(' ');
                out.push_str(&text);
                out.push_str("\n\n");
            }
            return;
        }
        "a" => {
            let text = collapse_whitespace(&element.text().collect::<String>());
            match element.value().attr("href") {
                Some(href) if !text.is_empty() && !href.starts_with("javascript:") => {
                    out.push_str(&format!("[{}]({})", text, href));
                }
                _ => out.push_str(&text),
            }
            return;
        }
        "pre" => {
            let text: String = element.text().collect();
            out.push_str("\n\n```\n");
            out.push_str(text.trim_end());
            out.push_str("\n```\n\n");
            return;
        }
        "img" => {
            if let Some(alt) = element.value().attr("alt").filter(|a| !a.trim().is_empty()) {
                out.push_str(&format!("[image: {}]", alt.trim()));
            }
            return;
        }
        "br" => {
            out.push('\n');
            return;
        }
        "hr" => {
            out.push_str("\n\n---\n\n");
            return;
        }
        "li" => out.push_str("\n- "),
        "strong" | "b" => out.push_str("**"),
        "em" | "i" => out.push('*'),
        "td" | "th" => out.push_str(" | "),
        _ if BLOCK_TAGS.contains(&tag) => out.push_str("\n\n"),
        _ => {}
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let collapsed = collapse_whitespace(text);
                if collapsed.is_empty() {
                    if text.chars().any(char::is_whitespace) && !out.ends_with(&[' ', '\n'][..]) {
                        out.push(' ');
                    }
                    continue;
                }
                if text.starts_with(char::is_whitespace) && !out.ends_with(&[' ', '\n'][..]) {
                    out.push(' ');
                }
                out.push_str(&collapsed);
                if text.ends_with(char::is_whitespace) {
                    out.push(' ');
                }
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    render_element(child_element, out);
                }
            }
            _ => {}
        }
    }

    match tag {
        "strong" | "b" => out.push_str("**"),
        "em" | "i" => out.push('*'),
        _ if BLOCK_TAGS.contains(&tag) => out.push_str("\n\n"),
        _ => {}
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim every line and squeeze runs of blank lines down to one.
fn tidy(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !result.is_empty() {
            result.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        result.push_str(line);
        blank_run = 0;
    }

    result
}
