#![allow(clippy::too_many_arguments)]

pub mod analyzer;
pub mod category;
pub mod classifier;
pub mod clustering;
pub mod config;
pub mod dom;
pub mod embeddings;
pub mod error;
pub mod filter;
pub mod parsers;
pub mod results;
pub mod scoring;
pub mod session;
pub mod similarity;

// Re-export commonly used types for convenience
pub use analyzer::{AnalysisStatus, PageAnalysis, PageInput};
pub use config::AnalyzerConfig;
pub use error::{AnalysisError, Result};
pub use results::{ReportRecord, ReportValue};
pub use session::AnalysisSession;

use std::path::Path;

/// Main builder for analyzing pages
pub struct Analyzer {
    config: AnalyzerConfig,
    semantic: bool,
    offline: bool,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Create an analyzer with the default configuration
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            semantic: true,
            offline: false,
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = AnalyzerConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a JSON string
    pub fn with_config_str(self, json: &str) -> Result<Self> {
        let config = AnalyzerConfig::from_json(json)?;
        Ok(self.with_config(config))
    }

    /// Apply overrides from environment variables
    pub fn with_env(mut self) -> Self {
        self.config.apply_env();
        self
    }

    /// Override the embedding service endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.config.embedding.endpoint = endpoint.to_string();
        self
    }

    /// Enable or disable embedding-based analysis
    pub fn with_semantic(mut self, semantic: bool) -> Self {
        self.semantic = semantic;
        self
    }

    /// Never contact the embedding service; use fallback embeddings only
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Start a new session with this analyzer's configuration
    pub fn session(&self) -> Result<AnalysisSession> {
        if self.offline || !self.semantic {
            AnalysisSession::offline(self.config.clone())
        } else {
            AnalysisSession::with_service(self.config.clone())
        }
    }

    /// Analyze a page in a fresh session
    ///
    /// Always produces a record: fatal errors become an error record.
    pub async fn analyze(&self, page: &PageInput, peers: &[PageInput]) -> ReportRecord {
        match self.session() {
            Ok(mut session) => self.analyze_with(&mut session, page, peers).await,
            Err(e) => {
                ::log::error!("Cannot start analysis of {}: {}", page.url, e);
                ReportRecord::from_error(&page.url, &e)
            }
        }
    }

    /// Analyze a page in an existing session, sharing its cache and centroid
    pub async fn analyze_with(
        &self,
        session: &mut AnalysisSession,
        page: &PageInput,
        peers: &[PageInput],
    ) -> ReportRecord {
        match analyzer::analyze_page(session, page, peers, self.semantic).await {
            Ok(analysis) => ReportRecord::from_analysis(&analysis),
            Err(e) => {
                ::log::error!("Analysis of {} aborted: {}", page.url, e);
                ReportRecord::from_error(&page.url, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn page(url: &str, topic: &str) -> PageInput {
        let paragraph = format!(
            "This guide explains {topic} in plain language for new traders. It covers the \
             basics, common mistakes, costs involved and where to learn more about {topic}."
        );
        PageInput::new(
            url,
            format!(
                "<html><head><title>{topic}</title></head><body><nav><a href=\"/\">Home</a></nav>\
                 <article><h1>{topic}</h1><p>{paragraph} Read <a href=\"/learn/basics\">the basics</a>.</p>\
                 <p>{paragraph}</p><p>{paragraph}</p></article></body></html>"
            ),
        )
    }

    #[tokio::test]
    async fn test_offline_record_fields() {
        let analyzer = Analyzer::new().offline(true);
        let current = page("https://example.com/learn/staking", "Staking");
        let peers = vec![page("https://example.com/learn/lending", "Lending")];

        let record = analyzer.analyze(&current, &peers).await;

        assert_eq!(record.text("status"), Some("ok"));
        assert_eq!(record.text("page_category"), Some("learn-hub"));
        assert_eq!(record.integer("contextual_links"), Some(1));
        assert_eq!(record.text("embedding_method"), Some("fallback"));
        for key in [
            "content_word_count",
            "content_quality",
            "template_links",
            "unique_contextual_links",
            "link_diversity_percent",
            "link_density_percent",
            "ideal_link_count",
            "gap_size",
            "gap_severity",
            "external_balance",
            "opportunity_score",
            "top_issue",
            "recommended_action_1",
            "semantic_score",
            "similar_pages_found",
            "cluster_topic",
            "content_gaps",
        ] {
            assert!(record.contains(key), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_no_semantic_record() {
        let analyzer = Analyzer::new().with_semantic(false);
        let record = analyzer
            .analyze(&page("https://example.com/learn/staking", "Staking"), &[])
            .await;
        assert!(!record.contains("semantic_score"));
        assert!(!record.contains("embedding_method"));
    }

    #[tokio::test]
    async fn test_service_errors_degrade_to_fallback() {
        let server = MockServer::start();
        let tags = server.mock(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200).json_body(json!({ "models": [] }));
        });
        let embeddings = server.mock(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(500).body("out of memory");
        });

        let mut config = AnalyzerConfig::default();
        config.embedding.initial_backoff_ms = 1;
        config.embedding.rate_limit_ms = 0;
        let analyzer = Analyzer::new()
            .with_config(config)
            .with_endpoint(&server.base_url());

        let current = page("https://example.com/learn/staking", "Staking");
        let peers = vec![page("https://example.com/learn/lending", "Lending")];
        let record = analyzer.analyze(&current, &peers).await;

        tags.assert();
        // Retries are spent on the first text; the session then stays on fallback
        assert_eq!(embeddings.calls(), 3);
        assert_eq!(record.text("status"), Some("ok"));
        assert_eq!(record.text("embedding_method"), Some("fallback"));
    }

    #[tokio::test]
    async fn test_invalid_config_becomes_error_record() {
        let analyzer = Analyzer::new()
            .with_config_str(r#"{"embedding": {"dimension": 0}}"#)
            .unwrap();
        let record = analyzer
            .analyze(&page("https://example.com/learn/staking", "Staking"), &[])
            .await;
        assert_eq!(record.text("status"), Some("error"));
        assert_eq!(record.text("error_kind"), Some("config"));
    }
}
