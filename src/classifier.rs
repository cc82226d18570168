//! Contextual link classification.
//!
//! Internal links are split into contextual (editorial) links and template
//! links (navigation, footer, data tables). The classifier only looks at the
//! link itself and its ancestors through [`NodeView`], so it works the same
//! on parsed HTML and on hand-built fixtures.

use crate::dom::{self, NodeView};
use crate::filter::{self, LinkScope, LinkTarget};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// Ancestor levels inspected for template signals
pub const TEMPLATE_WALK_DEPTH: usize = 5;

/// Ancestor levels inspected for content signals
pub const CONTENT_WALK_DEPTH: usize = 3;

/// Where an internal link sits on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContextClass {
    Contextual,
    Navigation,
    Footer,
}

impl ContextClass {
    pub fn is_template(&self) -> bool {
        !matches!(self, ContextClass::Contextual)
    }
}

impl fmt::Display for ContextClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextClass::Contextual => f.write_str("CONTEXTUAL"),
            ContextClass::Navigation => f.write_str("NAVIGATION"),
            ContextClass::Footer => f.write_str("FOOTER"),
        }
    }
}

static TRADING_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(trade|trading|markets?|prices?|spot|futures|margin|exchange)(/|$)")
        .expect("Trading path regex should be valid")
});

static TICKER_PAIR_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|/)[a-z0-9]{2,10}[-_][a-z0-9]{2,10}(/|$)")
        .expect("Ticker path regex should be valid")
});

static TICKER_PAIR_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z0-9]{2,10})\s*[-_/]\s*([A-Z0-9]{2,10})$")
        .expect("Ticker text regex should be valid")
});

static DATA_CONTAINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"grid|list|market|ticker|price").expect("Data container regex should be valid")
});

static NAVIGATION_CONTAINER: LazyLock<Regex> = LazyLock::new(|| {
    // Whole class tokens only: `unavailable` is not a nav
    Regex::new(
        r"(?:^|[\s_-])(?:nav|navbar|navigation|menu|breadcrumbs?|header|sidebar|widget)(?:$|[\s_-])",
    )
    .expect("Navigation container regex should be valid")
});

static TEMPLATE_CONTAINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"template|global|sitewide|site-wide")
        .expect("Template container regex should be valid")
});

static CONTENT_CONTAINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"article-body|article-content|post-content|post-body|entry-content|content-body|story-body|rich-text",
    )
    .expect("Content container regex should be valid")
});

const DATA_TAGS: &[&str] = &["table", "thead", "tbody", "tr", "td", "th"];
const NAVIGATION_TAGS: &[&str] = &["nav", "menu", "header", "aside"];
const NAVIGATION_ROLES: &[&str] = &["navigation", "menu", "menubar", "banner", "tablist"];

/// Whether the href or anchor text looks like a trading interface link
///
/// Either the path mixes a trading/market segment with a ticker pair
/// (`/trade/BTC-USDT`) or the anchor text itself is a pair (`ETH/USDC`).
pub fn is_trading_interface_link(href: &str, anchor_text: &str) -> bool {
    let path = href
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if TRADING_PATH.is_match(path) && TICKER_PAIR_PATH.is_match(path) {
        return true;
    }
    // Both sides need a letter, so year ranges such as 2024-2025 are not pairs
    TICKER_PAIR_TEXT
        .captures(anchor_text.trim())
        .is_some_and(|pair| {
            pair.iter()
                .skip(1)
                .flatten()
                .all(|side| side.as_str().chars().any(|c| c.is_ascii_alphabetic()))
        })
}

/// Template class for a single ancestor, checking data containers,
/// navigation, footer and sitewide markers in that order.
fn template_signal<N: NodeView>(node: &N) -> Option<ContextClass> {
    let tag = node.tag_name();
    let signature = node.signature();

    if DATA_TAGS.contains(&tag) || DATA_CONTAINER.is_match(&signature) {
        return Some(ContextClass::Navigation);
    }
    if NAVIGATION_TAGS.contains(&tag) || NAVIGATION_CONTAINER.is_match(&signature) {
        return Some(ContextClass::Navigation);
    }
    if tag == "footer" || signature.contains("footer") {
        return Some(ContextClass::Footer);
    }
    let role = node.role().map(str::to_lowercase);
    if TEMPLATE_CONTAINER.is_match(&signature)
        || role.is_some_and(|r| NAVIGATION_ROLES.contains(&r.as_str()))
    {
        return Some(ContextClass::Navigation);
    }
    None
}

fn has_content_signal<N: NodeView>(node: &N) -> bool {
    let tag = node.tag_name();
    if tag == "p" || tag == "article" {
        return true;
    }
    CONTENT_CONTAINER.is_match(&node.signature())
}

/// Classify an internal link from its href, anchor text and ancestors
///
/// `ancestors` is ordered nearest first. Template signals are looked for in
/// the first five ancestors, content signals in the first three. Links with
/// neither are treated as navigation.
pub fn classify<N: NodeView>(href: &str, anchor_text: &str, ancestors: &[N]) -> ContextClass {
    if is_trading_interface_link(href, anchor_text) {
        return ContextClass::Navigation;
    }

    for node in ancestors.iter().take(TEMPLATE_WALK_DEPTH) {
        if let Some(class) = template_signal(node) {
            return class;
        }
    }

    if ancestors
        .iter()
        .take(CONTENT_WALK_DEPTH)
        .any(|node| has_content_signal(node))
    {
        return ContextClass::Contextual;
    }

    ContextClass::Navigation
}

/// A link found on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub anchor_text: String,
    pub is_internal: bool,
    pub context_class: ContextClass,
    pub nofollow: bool,
}

/// External link balance verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalBalance {
    Balanced,
    HighExternalRatio,
    ExternalOnly,
}

impl ExternalBalance {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalBalance::Balanced => "BALANCED",
            ExternalBalance::HighExternalRatio => "HIGH_EXTERNAL_RATIO",
            ExternalBalance::ExternalOnly => "EXTERNAL_ONLY",
        }
    }
}

impl fmt::Display for ExternalBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All links of one page, grouped by class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkSet {
    pub contextual_links: Vec<Link>,
    pub navigation_count: usize,
    pub footer_count: usize,
    pub unique_contextual: BTreeSet<String>,
    pub unique_template: BTreeSet<String>,
    pub external_count: usize,
    /// Counted for contextual links only
    pub nofollow_count: usize,
}

impl LinkSet {
    /// Record one classified link; `target_key` identifies its destination
    pub fn push(&mut self, link: Link, target_key: String) {
        if !link.is_internal {
            self.external_count += 1;
            return;
        }
        match link.context_class {
            ContextClass::Contextual => {
                if link.nofollow {
                    self.nofollow_count += 1;
                }
                self.unique_contextual.insert(target_key);
                self.contextual_links.push(link);
            }
            ContextClass::Navigation => {
                self.navigation_count += 1;
                self.unique_template.insert(target_key);
            }
            ContextClass::Footer => {
                self.footer_count += 1;
                self.unique_template.insert(target_key);
            }
        }
    }

    pub fn contextual_count(&self) -> usize {
        self.contextual_links.len()
    }

    pub fn template_count(&self) -> usize {
        self.navigation_count + self.footer_count
    }

    pub fn unique_contextual_count(&self) -> usize {
        self.unique_contextual.len()
    }

    /// Unique contextual targets over contextual links, 0 without links
    pub fn unique_ratio(&self) -> f64 {
        if self.contextual_links.is_empty() {
            return 0.0;
        }
        self.unique_contextual.len() as f64 / self.contextual_links.len() as f64
    }

    /// [`unique_ratio`](Self::unique_ratio) as a percentage
    pub fn diversity_percent(&self) -> f64 {
        self.unique_ratio() * 100.0
    }

    /// Compare external links against contextual ones
    pub fn external_balance(&self, warning_ratio: f64) -> ExternalBalance {
        let contextual = self.contextual_count();
        let ratio = self.external_count as f64 / contextual.max(1) as f64;
        if contextual > 0 && ratio > warning_ratio {
            ExternalBalance::HighExternalRatio
        } else if contextual == 0 && self.external_count > 10 {
            ExternalBalance::ExternalOnly
        } else {
            ExternalBalance::Balanced
        }
    }
}

/// Walk every `<a href>` of a parsed document and classify it
pub fn collect_links(doc: &Html, scope: &LinkScope) -> LinkSet {
    let mut link_set = LinkSet::default();
    let Ok(selector) = Selector::parse("a[href]") else {
        return link_set;
    };

    for anchor in doc.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let anchor_text = anchor
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let nofollow = anchor
            .value()
            .attr("rel")
            .is_some_and(|rel| rel.to_lowercase().split_whitespace().any(|r| r == "nofollow"));

        let (is_internal, resolved) = match scope.resolve(href) {
            LinkTarget::Internal(url) => (true, url),
            LinkTarget::External(url) => (false, url),
            LinkTarget::Ignored => continue,
        };

        let context_class = if is_internal {
            let ancestors = dom::ancestor_chain(&anchor, TEMPLATE_WALK_DEPTH);
            classify(resolved.path(), &anchor_text, &ancestors)
        } else {
            ContextClass::Navigation
        };
        ::log::trace!("Link {} classified as {}", href, context_class);

        link_set.push(
            Link {
                href: href.to_string(),
                anchor_text,
                is_internal,
                context_class,
                nofollow,
            },
            filter::normalize_target(&resolved),
        );
    }

    ::log::debug!(
        "Collected {} contextual, {} template and {} external links",
        link_set.contextual_count(),
        link_set.template_count(),
        link_set.external_count
    );
    link_set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementSnapshot;

    fn chain(nodes: &[ElementSnapshot]) -> Vec<ElementSnapshot> {
        nodes.to_vec()
    }

    #[test]
    fn test_paragraph_link_is_contextual() {
        let ancestors = chain(&[
            ElementSnapshot::new("p"),
            ElementSnapshot::new("div").with_class("entry"),
            ElementSnapshot::new("body"),
        ]);
        assert_eq!(
            classify("/learn/defi", "decentralized finance", &ancestors),
            ContextClass::Contextual
        );
    }

    #[test]
    fn test_content_class_is_contextual() {
        let ancestors = chain(&[
            ElementSnapshot::new("span"),
            ElementSnapshot::new("div").with_class("post-content"),
        ]);
        assert_eq!(classify("/blog/a", "read more about it", &ancestors), ContextClass::Contextual);
    }

    #[test]
    fn test_navigation_ancestor_wins_over_paragraph() {
        // A paragraph inside a sidebar widget is still chrome
        let ancestors = chain(&[
            ElementSnapshot::new("p"),
            ElementSnapshot::new("div").with_class("sidebar-widget"),
        ]);
        assert_eq!(classify("/fees", "fees", &ancestors), ContextClass::Navigation);
    }

    #[test]
    fn test_footer_ancestor() {
        let ancestors = chain(&[
            ElementSnapshot::new("li"),
            ElementSnapshot::new("ul"),
            ElementSnapshot::new("footer"),
        ]);
        assert_eq!(classify("/legal/terms", "Terms", &ancestors), ContextClass::Footer);

        let ancestors = chain(&[ElementSnapshot::new("div").with_id("site-footer")]);
        assert_eq!(classify("/about", "About", &ancestors), ContextClass::Footer);
    }

    #[test]
    fn test_data_table_links_are_navigation() {
        let ancestors = chain(&[
            ElementSnapshot::new("td"),
            ElementSnapshot::new("tr"),
            ElementSnapshot::new("table"),
        ]);
        assert_eq!(classify("/price/solana", "Solana", &ancestors), ContextClass::Navigation);

        let ancestors = chain(&[
            ElementSnapshot::new("div").with_class("ticker-row"),
            ElementSnapshot::new("p"),
        ]);
        assert_eq!(classify("/x", "x", &ancestors), ContextClass::Navigation);
    }

    #[test]
    fn test_trading_interface_links_are_navigation() {
        let in_paragraph = chain(&[ElementSnapshot::new("p")]);
        assert_eq!(
            classify("/trade/BTC-USDT", "Trade now", &in_paragraph),
            ContextClass::Navigation
        );
        assert_eq!(classify("/somewhere", "ETH/USDC", &in_paragraph), ContextClass::Navigation);
        // A trading path without a pair is fine in editorial text
        assert_eq!(
            classify("/trade", "our trading platform", &in_paragraph),
            ContextClass::Contextual
        );
    }

    #[test]
    fn test_numeric_ranges_are_not_ticker_pairs() {
        assert!(is_trading_interface_link("/somewhere", "BTC-USDT"));
        assert!(is_trading_interface_link("/somewhere", "1INCH/USDT"));
        assert!(!is_trading_interface_link("/somewhere", "2024-2025"));
        assert!(!is_trading_interface_link("/somewhere", "2024-ETH"));

        let in_paragraph = chain(&[ElementSnapshot::new("p")]);
        assert_eq!(
            classify("/reports/annual", "2024-2025", &in_paragraph),
            ContextClass::Contextual
        );
    }

    #[test]
    fn test_navigation_class_matches_whole_tokens() {
        let unavailable = chain(&[
            ElementSnapshot::new("p"),
            ElementSnapshot::new("div").with_class("unavailable"),
        ]);
        assert_eq!(classify("/learn/a", "a guide", &unavailable), ContextClass::Contextual);

        let navbar = chain(&[ElementSnapshot::new("div").with_class("top-navbar")]);
        assert_eq!(classify("/learn/a", "a guide", &navbar), ContextClass::Navigation);
        let breadcrumbs = chain(&[ElementSnapshot::new("ol").with_class("breadcrumbs")]);
        assert_eq!(classify("/learn", "Learn", &breadcrumbs), ContextClass::Navigation);
    }

    #[test]
    fn test_role_and_sitewide_markers() {
        let ancestors = chain(&[ElementSnapshot::new("div").with_role("navigation")]);
        assert_eq!(classify("/a", "a", &ancestors), ContextClass::Navigation);

        let ancestors = chain(&[
            ElementSnapshot::new("div").with_class("global-cta"),
            ElementSnapshot::new("p"),
        ]);
        assert_eq!(classify("/a", "a", &ancestors), ContextClass::Navigation);
    }

    #[test]
    fn test_unknown_context_defaults_to_navigation() {
        let ancestors = chain(&[
            ElementSnapshot::new("div"),
            ElementSnapshot::new("section"),
            ElementSnapshot::new("body"),
        ]);
        assert_eq!(classify("/a", "a", &ancestors), ContextClass::Navigation);
        assert_eq!(classify::<ElementSnapshot>("/a", "a", &[]), ContextClass::Navigation);
    }

    #[test]
    fn test_walk_depth_limits() {
        // Nav marker at level 6 is out of reach of the template walk
        let mut nodes = vec![ElementSnapshot::new("p")];
        nodes.extend((0..4).map(|_| ElementSnapshot::new("div")));
        nodes.push(ElementSnapshot::new("nav"));
        assert_eq!(classify("/a", "a", &nodes), ContextClass::Contextual);

        // Paragraph at level 4 is out of reach of the content walk
        let nodes = chain(&[
            ElementSnapshot::new("span"),
            ElementSnapshot::new("span"),
            ElementSnapshot::new("span"),
            ElementSnapshot::new("p"),
        ]);
        assert_eq!(classify("/a", "a", &nodes), ContextClass::Navigation);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let doc = Html::parse_document(
            r#"<html><body><nav><a href="/markets">Markets</a></nav><article><p>See <a href="/learn/staking">staking</a>.</p></article></body></html>"#,
        );
        let scope = LinkScope::new("https://example.com/blog/post").unwrap();
        let first = collect_links(&doc, &scope);
        let second = collect_links(&doc, &scope);
        assert_eq!(first.contextual_links, second.contextual_links);
        assert_eq!(first.navigation_count, second.navigation_count);
    }

    #[test]
    fn test_collect_links_counts() {
        let doc = Html::parse_document(
            r#"<html><body>
            <nav><a href="/">Home</a><a href="/markets">Markets</a></nav>
            <article>
              <p>Read <a href="/learn/staking">staking</a> and <a href="/learn/staking#risks">its risks</a>.</p>
              <p>Also <a href="https://example.com/fees" rel="nofollow sponsored">fees</a>
                 and <a href="https://other.org/report">a report</a>
                 and <a href="mailto:team@example.com">mail us</a>.</p>
            </article>
            <footer><a href="/legal/terms">Terms</a></footer>
            </body></html>"#,
        );
        let scope = LinkScope::new("https://example.com/blog/post").unwrap();
        let links = collect_links(&doc, &scope);

        assert_eq!(links.contextual_count(), 3);
        assert_eq!(links.unique_contextual_count(), 2);
        assert_eq!(links.navigation_count, 2);
        assert_eq!(links.footer_count, 1);
        assert_eq!(links.template_count(), 3);
        assert_eq!(links.external_count, 1);
        assert_eq!(links.nofollow_count, 1);
        assert!(links.unique_contextual.contains("https://example.com/learn/staking"));
        assert!(links.unique_contextual.contains("https://example.com/fees"));
    }

    #[test]
    fn test_diversity_and_balance() {
        let mut links = LinkSet::default();
        for i in 0..8 {
            links.push(
                Link {
                    href: format!("/page-{}", i % 4),
                    anchor_text: "page".to_string(),
                    is_internal: true,
                    context_class: ContextClass::Contextual,
                    nofollow: false,
                },
                format!("https://example.com/page-{}", i % 4),
            );
        }
        assert_eq!(links.contextual_count(), 8);
        assert_eq!(links.unique_contextual_count(), 4);
        assert_eq!(links.diversity_percent(), 50.0);

        links.external_count = 16;
        assert_eq!(links.external_balance(2.0), ExternalBalance::Balanced);
        links.external_count = 17;
        assert_eq!(links.external_balance(2.0), ExternalBalance::HighExternalRatio);

        let mut no_contextual = LinkSet::default();
        no_contextual.external_count = 11;
        assert_eq!(no_contextual.external_balance(2.0), ExternalBalance::ExternalOnly);
        no_contextual.external_count = 10;
        assert_eq!(no_contextual.external_balance(2.0), ExternalBalance::Balanced);
    }
}
