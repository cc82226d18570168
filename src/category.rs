use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// Page type inferred from the URL path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageCategory {
    Homepage,
    TradingPair,
    TradingGeneral,
    CryptoSpecific,
    MarketData,
    Portfolio,
    LearnHub,
    BlogArticle,
    SecurityPage,
    FeesPricing,
    ApiDeveloper,
    SupportHelp,
    LegalCompliance,
    AboutCompany,
    Other,
}

/// Path patterns in match order; the first hit wins
static CATEGORY_RULES: LazyLock<Vec<(PageCategory, Regex)>> = LazyLock::new(|| {
    [
        (PageCategory::Homepage, r"^/(index\.html?|[a-z]{2}(-[a-z]{2})?/?)?$"),
        (
            PageCategory::TradingPair,
            r"/(trade|spot|futures|margin|exchange)/[a-z0-9]{2,10}[-_/][a-z0-9]{2,10}/?$",
        ),
        (
            PageCategory::TradingGeneral,
            r"/(trade|trading|spot|futures|margin|exchange|convert|swap|buy|sell)(/|$)",
        ),
        (
            PageCategory::CryptoSpecific,
            r"/(bitcoin|ethereum|btc|eth|solana|crypto|cryptocurrenc(y|ies)|coins?|tokens?|currencies)(/|-|$)",
        ),
        (
            PageCategory::MarketData,
            r"/(markets?|prices?|charts?|tickers?|rankings|market-cap|data)(/|$)",
        ),
        (PageCategory::Portfolio, r"/(portfolio|wallets?|balances?|assets|dashboard)(/|$)"),
        (
            PageCategory::LearnHub,
            r"/(learn|academy|education|guides?|tutorials?|glossary)(/|$)",
        ),
        (PageCategory::BlogArticle, r"/(blog|news|articles?|insights|posts?|stories)(/|$)"),
        (PageCategory::SecurityPage, r"/(security|2fa|safety|anti-phishing)(/|-|$)"),
        (PageCategory::FeesPricing, r"/(fees?|pricing|rates|commissions?)(/|-|$)"),
        (PageCategory::ApiDeveloper, r"/(api|developers?|docs|sdk|documentation)(/|$)"),
        (PageCategory::SupportHelp, r"/(support|help|faq|contact|helpdesk)(/|-|$)"),
        (
            PageCategory::LegalCompliance,
            r"/(legal|terms|privacy|cookies?|compliance|aml|kyc|disclaimer|licen[cs]e)(/|-|$)",
        ),
        (PageCategory::AboutCompany, r"/(about|company|careers|team|press|investors)(/|-|$)"),
    ]
    .into_iter()
    .map(|(category, pattern)| {
        (
            category,
            Regex::new(pattern).expect("Category regex patterns should be valid"),
        )
    })
    .collect()
});

impl PageCategory {
    /// All categories in match order
    pub const ALL: [PageCategory; 15] = [
        PageCategory::Homepage,
        PageCategory::TradingPair,
        PageCategory::TradingGeneral,
        PageCategory::CryptoSpecific,
        PageCategory::MarketData,
        PageCategory::Portfolio,
        PageCategory::LearnHub,
        PageCategory::BlogArticle,
        PageCategory::SecurityPage,
        PageCategory::FeesPricing,
        PageCategory::ApiDeveloper,
        PageCategory::SupportHelp,
        PageCategory::LegalCompliance,
        PageCategory::AboutCompany,
        PageCategory::Other,
    ];

    /// Categorize a URL path such as `/learn/what-is-staking`
    pub fn from_path(path: &str) -> Self {
        let path = path.to_lowercase();
        for (category, pattern) in CATEGORY_RULES.iter() {
            if pattern.is_match(&path) {
                return *category;
            }
        }
        PageCategory::Other
    }

    /// Categorize a full URL; unparsable URLs are `Other`
    pub fn from_url(url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => Self::from_path(parsed.path()),
            Err(_) => PageCategory::Other,
        }
    }

    /// Contextual links a page of this category is expected to carry
    pub fn min_contextual_links(&self) -> usize {
        match self {
            PageCategory::Homepage => 4,
            PageCategory::TradingPair => 2,
            PageCategory::TradingGeneral => 3,
            PageCategory::CryptoSpecific => 3,
            PageCategory::MarketData => 2,
            PageCategory::Portfolio => 2,
            PageCategory::LearnHub => 5,
            PageCategory::BlogArticle => 3,
            PageCategory::SecurityPage => 2,
            PageCategory::FeesPricing => 2,
            PageCategory::ApiDeveloper => 3,
            PageCategory::SupportHelp => 2,
            PageCategory::LegalCompliance => 1,
            PageCategory::AboutCompany => 2,
            PageCategory::Other => 2,
        }
    }

    /// Score points added when the category minimum is not met (max 20)
    pub fn weight(&self) -> u32 {
        match self {
            PageCategory::Homepage => 20,
            PageCategory::TradingPair => 8,
            PageCategory::TradingGeneral => 10,
            PageCategory::CryptoSpecific => 12,
            PageCategory::MarketData => 8,
            PageCategory::Portfolio => 6,
            PageCategory::LearnHub => 15,
            PageCategory::BlogArticle => 15,
            PageCategory::SecurityPage => 8,
            PageCategory::FeesPricing => 8,
            PageCategory::ApiDeveloper => 10,
            PageCategory::SupportHelp => 8,
            PageCategory::LegalCompliance => 4,
            PageCategory::AboutCompany => 6,
            PageCategory::Other => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageCategory::Homepage => "homepage",
            PageCategory::TradingPair => "trading-pair",
            PageCategory::TradingGeneral => "trading-general",
            PageCategory::CryptoSpecific => "crypto-specific",
            PageCategory::MarketData => "market-data",
            PageCategory::Portfolio => "portfolio",
            PageCategory::LearnHub => "learn-hub",
            PageCategory::BlogArticle => "blog-article",
            PageCategory::SecurityPage => "security-page",
            PageCategory::FeesPricing => "fees-pricing",
            PageCategory::ApiDeveloper => "api-developer",
            PageCategory::SupportHelp => "support-help",
            PageCategory::LegalCompliance => "legal-compliance",
            PageCategory::AboutCompany => "about-company",
            PageCategory::Other => "other",
        }
    }
}

impl fmt::Display for PageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
