//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Anchors to follow, with their visible text
//! - Bare URLs written into the visible text
//! - The page title
//! - The visible text itself (script, style, noscript and template excluded)

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::OnceLock;
use url::Url;

/// A followable link and the text it was written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Absolute URL
    pub url: Url,

    /// Visible anchor text, whitespace-collapsed
    pub text: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All followable anchors, in document order
    pub anchors: Vec<Anchor>,

    /// Absolute URLs found in the visible text
    pub text_urls: Vec<Url>,
}

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `http(s)://` URLs written in the visible text
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use contact_harvester::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://univ-x.dz/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.anchors[0].url.as_str(), "https://univ-x.dz/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    parse_document(&document, base_url)
}

/// Same as [`parse_html`] for an already parsed document
pub fn parse_document(document: &Html, base_url: &Url) -> ParsedPage {
    let title = extract_title(document);
    let anchors = extract_anchors(document, base_url);
    let text_urls = extract_text_urls(&visible_text(document));

    ParsedPage {
        title,
        anchors,
        text_urls,
    }
}

/// Extracts the page title from the HTML document
pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Collects the visible text of the document, text nodes joined by a space
///
/// Only the `<body>` is read when one exists.
pub fn visible_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let text = text.trim();
        if !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join(" ")
}

/// Visible text of one element, whitespace-collapsed
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Replaces every whitespace run with a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_anchors(document: &Html, base_url: &Url) -> Vec<Anchor> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = resolve_link(href, base_url)?;
            Some(Anchor {
                url,
                text: element_text(&element),
            })
        })
        .collect()
}

fn text_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?i)https?://[^\s<>"']+"#).ok())
        .as_ref()
}

fn extract_text_urls(text: &str) -> Vec<Url> {
    let Some(pattern) = text_url_pattern() else {
        return Vec::new();
    };
    pattern
        .find_iter(text)
        .filter_map(|m| {
            let candidate = m.as_str().trim_end_matches(['.', ',', ';', ':', ')', ']']);
            Url::parse(candidate).ok()
        })
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    matches!(absolute_url.scheme(), "http" | "https").then_some(absolute_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://univ-x.dz/page").unwrap()
    }

    fn links(parsed: &ParsedPage) -> Vec<String> {
        parsed.anchors.iter().map(|a| a.url.to_string()).collect()
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = "<html><head><title>  Test\n   Page  </title></head><body></body></html>";
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        assert_eq!(parse_html(html, &base_url()).title, None);
    }

    #[test]
    fn test_extract_relative_links_with_text() {
        let html = r#"<html><body><a href="/staff"> Our <b>staff</b> </a><a href="other">x</a></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(
            links(&parsed),
            vec!["https://univ-x.dz/staff", "https://univ-x.dz/other"]
        );
        assert_eq!(parsed.anchors[0].text, "Our staff");
    }

    #[test]
    fn test_skip_special_schemes() {
        let html = r##"
            <html><body>
                <a href="javascript:void(0)">js</a>
                <a href="MAILTO:k.said@univ-x.dz">mail</a>
                <a href="tel:+213000000">call</a>
                <a href="data:text/html,<h1>x</h1>">data</a>
                <a href="#section">jump</a>
                <a href="/file.pdf" download>dl</a>
                <a href="/valid">ok</a>
            </body></html>
        "##;
        let parsed = parse_html(html, &base_url());
        assert_eq!(links(&parsed), vec!["https://univ-x.dz/valid"]);
    }

    #[test]
    fn test_follow_nofollow_links() {
        let html = r#"<html><body><a href="/page2" rel="nofollow">Link</a></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(links(&parsed), vec!["https://univ-x.dz/page2"]);
    }

    #[test]
    fn test_visible_text_skips_hidden_elements() {
        let html = r#"
            <html><head><title>T</title><style>.a{}</style></head>
            <body>
                <p>Hello</p>
                <script>var x = "a@b.dz";</script>
                <noscript>enable js</noscript>
                <template><p>tpl</p></template>
                <p>world</p>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(visible_text(&document), "Hello world");
    }

    #[test]
    fn test_text_urls() {
        let html = r#"<html><body><p>See https://lab.univ-x.dz/members, or http://univ-x.dz/annuaire.</p></body></html>"#;
        let parsed = parse_html(html, &base_url());
        let urls: Vec<String> = parsed.text_urls.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            urls,
            vec!["https://lab.univ-x.dz/members", "http://univ-x.dz/annuaire"]
        );
    }
}
