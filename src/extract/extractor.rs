//! Multi-channel identifier extractor
//!
//! Channels are scanned in a fixed order and the first occurrence of an
//! identifier (case-insensitive) wins:
//!
//! 1. `mailto:` hyperlinks
//! 2. `data-*` attributes
//! 3. `<meta content>`
//! 4. visible body text
//! 5. inline `<script>` payloads

use crate::config::ExtractionConfig;
use crate::crawler::{collapse_whitespace, element_text, visible_text};
use crate::extract::pattern::{identifier_pattern, split_identifier};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::fmt;

/// Where on the page an identifier was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionChannel {
    MailtoLink,
    DataAttribute,
    MetaTag,
    BodyText,
    ScriptTag,
}

impl ExtractionChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionChannel::MailtoLink => "mailto_link",
            ExtractionChannel::DataAttribute => "data_attribute",
            ExtractionChannel::MetaTag => "meta_tag",
            ExtractionChannel::BodyText => "body_text",
            ExtractionChannel::ScriptTag => "script_tag",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "mailto_link" => Some(ExtractionChannel::MailtoLink),
            "data_attribute" => Some(ExtractionChannel::DataAttribute),
            "meta_tag" => Some(ExtractionChannel::MetaTag),
            "body_text" => Some(ExtractionChannel::BodyText),
            "script_tag" => Some(ExtractionChannel::ScriptTag),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the body came straight from HTTP or from the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Static,
    Rendered,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Static => "static",
            SourceType::Rendered => "rendered",
        }
    }
}

/// One identifier occurrence on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedIdentifier {
    /// The identifier as written on the page
    pub identifier: String,
    pub local_part: String,
    pub domain_part: String,
    pub channel: ExtractionChannel,
    /// Whitespace-collapsed, length-bounded surrounding text
    pub context: String,
}

/// Scans parsed pages for identifiers ending in the configured suffix
#[derive(Debug, Clone)]
pub struct IdentifierExtractor {
    pattern: Regex,
    text_radius: usize,
    markup_radius: usize,
    max_context: usize,
    max_title: usize,
}

impl IdentifierExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: identifier_pattern(&config.suffix())?,
            text_radius: config.text_context_radius,
            markup_radius: config.markup_context_radius,
            max_context: config.max_context_length,
            max_title: config.max_title_length,
        })
    }

    /// Parses `html` and extracts from it
    pub fn extract_html(&self, html: &str) -> Vec<ExtractedIdentifier> {
        self.extract(&Html::parse_document(html))
    }

    /// Extracts every distinct identifier of a page, in channel order
    pub fn extract(&self, document: &Html) -> Vec<ExtractedIdentifier> {
        let mut found = Vec::new();
        self.scan_mailto(document, &mut found);
        self.scan_data_attributes(document, &mut found);
        self.scan_meta(document, &mut found);
        self.scan_text(
            &visible_text(document),
            ExtractionChannel::BodyText,
            self.text_radius,
            &mut found,
        );
        self.scan_scripts(document, &mut found);

        let mut seen = HashSet::new();
        found.retain(|record| seen.insert(record.identifier.to_lowercase()));
        found
    }

    /// Truncates a page title to the configured length
    pub fn bound_title(&self, title: &str) -> String {
        truncate_chars(&collapse_whitespace(title), self.max_title)
    }

    fn scan_mailto(&self, document: &Html, found: &mut Vec<ExtractedIdentifier>) {
        let Ok(selector) = Selector::parse("a[href]") else {
            return;
        };
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            let Some(prefix) = href.get(..7) else {
                continue;
            };
            if !prefix.eq_ignore_ascii_case("mailto:") {
                continue;
            }
            let address = href[7..].split('?').next().unwrap_or("").trim();
            self.scan_markup(address, &element, ExtractionChannel::MailtoLink, found);
        }
    }

    fn scan_data_attributes(&self, document: &Html, found: &mut Vec<ExtractedIdentifier>) {
        let Ok(selector) = Selector::parse("*") else {
            return;
        };
        for element in document.select(&selector) {
            for (name, value) in element.value().attrs() {
                if name.starts_with("data-") {
                    self.scan_markup(value, &element, ExtractionChannel::DataAttribute, found);
                }
            }
        }
    }

    fn scan_meta(&self, document: &Html, found: &mut Vec<ExtractedIdentifier>) {
        let Ok(selector) = Selector::parse("meta[content]") else {
            return;
        };
        for element in document.select(&selector) {
            if let Some(content) = element.value().attr("content") {
                self.scan_markup(content, &element, ExtractionChannel::MetaTag, found);
            }
        }
    }

    fn scan_scripts(&self, document: &Html, found: &mut Vec<ExtractedIdentifier>) {
        let Ok(selector) = Selector::parse("script") else {
            return;
        };
        for element in document.select(&selector) {
            let payload: String = element.text().collect();
            self.scan_text(
                &payload,
                ExtractionChannel::ScriptTag,
                self.markup_radius,
                found,
            );
        }
    }

    /// Matches inside an attribute value
    ///
    /// Context is the element's visible text, or a slice of the value when
    /// the element has none.
    fn scan_markup(
        &self,
        value: &str,
        element: &ElementRef<'_>,
        channel: ExtractionChannel,
        found: &mut Vec<ExtractedIdentifier>,
    ) {
        let text = element_text(element);
        for m in self.pattern.find_iter(value) {
            let context = if text.is_empty() {
                window(value, m.start(), m.end(), self.markup_radius)
            } else {
                &text
            };
            self.push(m.as_str(), channel, context, found);
        }
    }

    fn scan_text(
        &self,
        text: &str,
        channel: ExtractionChannel,
        radius: usize,
        found: &mut Vec<ExtractedIdentifier>,
    ) {
        for m in self.pattern.find_iter(text) {
            let context = window(text, m.start(), m.end(), radius);
            self.push(m.as_str(), channel, context, found);
        }
    }

    fn push(
        &self,
        identifier: &str,
        channel: ExtractionChannel,
        context: &str,
        found: &mut Vec<ExtractedIdentifier>,
    ) {
        let Some((local, domain)) = split_identifier(identifier) else {
            tracing::trace!("Skipping malformed identifier {:?}", identifier);
            return;
        };
        found.push(ExtractedIdentifier {
            identifier: identifier.to_string(),
            local_part: local.to_string(),
            domain_part: domain.to_lowercase(),
            channel,
            context: truncate_chars(&collapse_whitespace(context), self.max_context),
        });
    }
}

/// Slice of `text` reaching `radius` characters on each side of a match
fn window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let begin = if radius == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(radius - 1)
            .map_or(0, |(i, _)| i)
    };
    let finish = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);
    &text[begin..finish]
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::IdentifierClassifier;
    use crate::config::ClassifierConfig;

    fn extractor() -> IdentifierExtractor {
        IdentifierExtractor::new(&ExtractionConfig::default()).unwrap()
    }

    fn identifiers(found: &[ExtractedIdentifier]) -> Vec<(&str, ExtractionChannel)> {
        found
            .iter()
            .map(|r| (r.identifier.as_str(), r.channel))
            .collect()
    }

    #[test]
    fn test_all_channels() {
        let html = r#"
            <html><head>
                <meta name="author" content="Contact: m.benali@univ-x.dz">
            </head>
            <body>
                <a href="mailto:k.said@univ-x.dz?subject=Hi">Karim Said</a>
                <span data-mail="s.hamdi@univ-x.dz"></span>
                <p>Office 12, a.yahiaoui@univ-x.dz</p>
                <script>var m = "n.kaci" + "@"; var full = "r.ziani@univ-x.dz";</script>
            </body></html>
        "#;
        let found = extractor().extract_html(html);
        assert_eq!(
            identifiers(&found),
            vec![
                ("k.said@univ-x.dz", ExtractionChannel::MailtoLink),
                ("s.hamdi@univ-x.dz", ExtractionChannel::DataAttribute),
                ("m.benali@univ-x.dz", ExtractionChannel::MetaTag),
                ("a.yahiaoui@univ-x.dz", ExtractionChannel::BodyText),
                ("r.ziani@univ-x.dz", ExtractionChannel::ScriptTag),
            ]
        );
        assert_eq!(found[0].context, "Karim Said");
        assert_eq!(found[0].local_part, "k.said");
        assert_eq!(found[0].domain_part, "univ-x.dz");
    }

    #[test]
    fn test_first_occurrence_wins_case_insensitively() {
        let html = r#"
            <body>
                <a href="mailto:K.Said@Univ-X.dz">mail</a>
                <p>k.said@univ-x.dz</p>
            </body>
        "#;
        let found = extractor().extract_html(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].identifier, "K.Said@Univ-X.dz");
        assert_eq!(found[0].domain_part, "univ-x.dz");
        assert_eq!(found[0].channel, ExtractionChannel::MailtoLink);
    }

    #[test]
    fn test_mailto_and_institutional_text_yield_one_accepted() {
        let html = r#"
            <body>
                <a href="mailto:k.said@univ-x.dz">Dr. Said</a>
                <p>General enquiries: contact@univ-x.dz</p>
            </body>
        "#;
        let classifier = IdentifierClassifier::new(ClassifierConfig::default());
        let accepted: Vec<String> = extractor()
            .extract_html(html)
            .into_iter()
            .filter(|r| classifier.is_personal(&r.identifier))
            .map(|r| r.identifier)
            .collect();
        assert_eq!(accepted, vec!["k.said@univ-x.dz"]);
    }

    #[test]
    fn test_body_context_window_is_bounded() {
        let filler = "x".repeat(300);
        let html = format!("<body><p>{} a.yahiaoui@univ-x.dz {}</p></body>", filler, filler);
        let found = extractor().extract_html(&html);
        assert_eq!(found.len(), 1);
        let context = &found[0].context;
        assert!(context.chars().count() <= 200);
        assert!(context.contains("a.yahiaoui@univ-x.dz"));
    }

    #[test]
    fn test_markup_context_falls_back_to_value_slice() {
        let html = r#"<body><div data-contact="Prof. K. Said: k.said@univ-x.dz"></div></body>"#;
        let found = extractor().extract_html(html);
        assert_eq!(found[0].context, "Prof. K. Said: k.said@univ-x.dz");
    }

    #[test]
    fn test_window_counts_characters() {
        let text = "éééé k@u.dz àààà";
        let start = text.find('k').unwrap();
        let end = start + "k@u.dz".len();
        assert_eq!(window(text, start, end, 2), "é k@u.dz à");
        assert_eq!(window(text, start, end, 0), "k@u.dz");
        assert_eq!(window(text, start, end, 100), text);
    }

    #[test]
    fn test_channel_names_round_trip() {
        for channel in [
            ExtractionChannel::MailtoLink,
            ExtractionChannel::DataAttribute,
            ExtractionChannel::MetaTag,
            ExtractionChannel::BodyText,
            ExtractionChannel::ScriptTag,
        ] {
            assert_eq!(ExtractionChannel::from_db_string(channel.as_str()), Some(channel));
        }
        assert_eq!(ExtractionChannel::from_db_string("regex_html"), None);
    }

    #[test]
    fn test_bound_title() {
        let title = "t".repeat(500);
        assert_eq!(extractor().bound_title(&title).len(), 200);
    }
}
