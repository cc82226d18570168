use crate::config::ScoringConfig;
use crate::dom::NodeView;
use crate::error::{AnalysisError, Result};
use crate::parsers::PageContent;
use crate::parsers::text;
use scraper::{ElementRef, Html, Node, Selector};

/// Main content containers, tried in priority order
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".article-body",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".main-content",
    "#main-content",
    "#content",
    ".content",
];

/// Below this many words the best candidate is discarded in favour of the body
const MIN_CANDIDATE_WORDS: usize = 50;

/// Tags always stripped from a candidate
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "nav", "footer", "button",
];

/// Additional tags stripped when extracting from the whole body
const STRICT_BOILERPLATE_TAGS: &[&str] = &["header", "aside", "form", "menu", "select", "svg"];

/// Class/id tokens that mark ads and social widgets
const BOILERPLATE_TOKENS: &[&str] = &[
    "ad", "ads", "advert", "advertisement", "adsbygoogle", "sponsored", "promo", "social",
    "share", "sharing", "cookie", "cookies", "newsletter",
];

/// Additional class/id tokens stripped when extracting from the whole body
const STRICT_BOILERPLATE_TOKENS: &[&str] = &[
    "nav", "navbar", "navigation", "menu", "breadcrumb", "breadcrumbs", "sidebar", "widget",
    "header", "footer", "related", "comments", "comment", "popup", "modal", "banner",
];

/// Text and structure gathered from one subtree
#[derive(Debug, Default)]
struct Extraction {
    pieces: Vec<String>,
    heading_count: usize,
    paragraph_count: usize,
    list_count: usize,
}

impl Extraction {
    fn text(&self) -> String {
        text::normalize_whitespace(&self.pieces.join(" "))
    }

    fn into_content(self, config: &ScoringConfig) -> PageContent {
        let clean_text = self.text();
        PageContent::new(
            text::count_words(&clean_text),
            self.heading_count,
            self.paragraph_count,
            self.list_count,
            clean_text,
            config,
        )
    }
}

/// Extracts the main content of an HTML document
pub fn extract(html: &str, config: &ScoringConfig) -> Result<PageContent> {
    let doc = Html::parse_document(html);
    extract_document(&doc, config)
}

/// Extracts the main content of an already parsed document
///
/// Candidates are tried in priority order and the one with the most words
/// wins. When the best candidate has fewer than 50 words the whole body is
/// used instead, with the stricter boilerplate list.
pub fn extract_document(doc: &Html, config: &ScoringConfig) -> Result<PageContent> {
    let mut best: Option<(&'static str, Extraction, usize)> = None;

    for pattern in MAIN_CONTENT_SELECTORS.iter().copied() {
        let Ok(selector) = Selector::parse(pattern) else {
            ::log::warn!("Skipping invalid content selector: {}", pattern);
            continue;
        };
        for candidate in doc.select(&selector) {
            let extraction = extract_subtree(candidate, false);
            let words = text::count_words(&extraction.text());
            let replace = match &best {
                Some((_, _, best_words)) => words > *best_words,
                None => true,
            };
            if replace {
                best = Some((pattern, extraction, words));
            }
        }
    }

    if let Some((pattern, extraction, words)) = best {
        if words >= MIN_CANDIDATE_WORDS {
            ::log::debug!("Main content selected by '{}' with {} words", pattern, words);
            return Ok(extraction.into_content(config));
        }
        ::log::debug!(
            "Best candidate '{}' has only {} words, falling back to body",
            pattern,
            words
        );
    }

    extract_body(doc, config)
}

/// Full-body extraction with the strict boilerplate list
pub fn extract_body(doc: &Html, config: &ScoringConfig) -> Result<PageContent> {
    let body_selector = Selector::parse("body")
        .map_err(|e| AnalysisError::ExtractionFailure(format!("body selector: {e:?}")))?;

    let root = match doc.select(&body_selector).next() {
        Some(body) => body,
        None => doc.root_element(),
    };
    if root.children().next().is_none() {
        return Err(AnalysisError::ExtractionFailure(
            "document has no content tree".to_string(),
        ));
    }

    let extraction = extract_subtree(root, true);
    ::log::debug!("Body extraction produced {} text pieces", extraction.pieces.len());
    Ok(extraction.into_content(config))
}

fn extract_subtree(root: ElementRef<'_>, strict: bool) -> Extraction {
    let mut extraction = Extraction::default();
    collect(root, strict, &mut extraction);
    extraction
}

fn collect(element: ElementRef<'_>, strict: bool, acc: &mut Extraction) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    acc.pieces.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_boilerplate(&child_element, strict) {
                    continue;
                }
                match child_element.tag_name() {
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => acc.heading_count += 1,
                    "p" => acc.paragraph_count += 1,
                    "ul" | "ol" => acc.list_count += 1,
                    _ => {}
                }
                collect(child_element, strict, acc);
            }
            _ => {}
        }
    }
}

/// Whether an element is boilerplate that should be stripped
pub fn is_boilerplate<N: NodeView>(node: &N, strict: bool) -> bool {
    let tag = node.tag_name();
    if BOILERPLATE_TAGS.contains(&tag) {
        return true;
    }
    if strict && STRICT_BOILERPLATE_TAGS.contains(&tag) {
        return true;
    }

    let signature = node.signature();
    signature
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|token| !token.is_empty())
        .any(|token| {
            BOILERPLATE_TOKENS.contains(&token)
                || (strict && STRICT_BOILERPLATE_TOKENS.contains(&token))
        })
}
