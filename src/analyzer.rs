use crate::category::PageCategory;
use crate::classifier::{self, LinkSet};
use crate::clustering::{self, ClusterAssignment, ClusterPage};
use crate::config::AnalyzerConfig;
use crate::embeddings::EmbeddingMethod;
use crate::error::{AnalysisError, Result};
use crate::filter::{self, LinkScope};
use crate::parsers::{PageContent, html, text};
use crate::scoring::{self, BROKEN_PAGE_WORDS, OpportunityAssessment};
use crate::session::AnalysisSession;
use crate::similarity::{self, Candidate, SimilarPage, ThemeAlignment};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terms reported as content gaps
const MAX_CONTENT_GAPS: usize = 5;

/// A page handed to the analyzer by the host crawler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInput {
    pub url: String,
    /// Taken from `<title>` or the first `<h1>` when not given
    pub title: Option<String>,
    pub html: String,
}

impl PageInput {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            html: html.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Outcome of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Ok,
    /// Finished with reduced output, see the notes
    Degraded,
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Ok => "ok",
            AnalysisStatus::Degraded => "degraded",
            AnalysisStatus::Error => "error",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embedding-based findings for a page
#[derive(Debug, Clone)]
pub struct SemanticAnalysis {
    pub method: EmbeddingMethod,
    /// Cosine similarity to the site centroid
    pub theme_alignment: f64,
    pub alignment: ThemeAlignment,
    pub semantic_score: u32,
    pub similar_pages: Vec<SimilarPage>,
    pub cluster: ClusterAssignment,
    pub cluster_size: usize,
    pub authority_page: Option<String>,
    pub content_gaps: Vec<String>,
}

/// Everything learned about one page
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    pub url: String,
    pub title: Option<String>,
    pub category: PageCategory,
    pub url_depth: usize,
    pub content: PageContent,
    pub links: LinkSet,
    pub assessment: OpportunityAssessment,
    pub semantic: Option<SemanticAnalysis>,
    pub status: AnalysisStatus,
    /// Recovered problems, in the order they happened
    pub notes: Vec<String>,
}

/// Extracted peer page, ready for embedding
#[derive(Debug, Clone)]
struct PeerContent {
    url: String,
    title: Option<String>,
    text: String,
}

/// Result of the synchronous DOM pass over the current page
struct Inspection {
    title: Option<String>,
    content: PageContent,
    links: LinkSet,
    notes: Vec<String>,
}

/// Page title from `<title>`, else the first `<h1>`
pub fn page_title(doc: &Html) -> Option<String> {
    for pattern in ["title", "h1"] {
        let Ok(selector) = Selector::parse(pattern) else {
            continue;
        };
        if let Some(element) = doc.select(&selector).next() {
            let title = text::normalize_whitespace(&element.text().collect::<String>());
            if !title.is_empty() {
                return Some(title);
            }
        }
    }
    None
}

fn inspect(page: &PageInput, scope: &LinkScope, config: &AnalyzerConfig) -> Result<Inspection> {
    let doc = Html::parse_document(&page.html);
    let title = page.title.clone().or_else(|| page_title(&doc));
    let mut notes = Vec::new();

    let content = match html::extract_document(&doc, &config.scoring) {
        Ok(content) => content,
        Err(e @ AnalysisError::ExtractionFailure(_)) => {
            ::log::warn!("{}: {}", page.url, e);
            notes.push(e.to_string());
            PageContent::from_text("", &config.scoring)
        }
        Err(e) => return Err(e),
    };

    let links = classifier::collect_links(&doc, scope);
    Ok(Inspection {
        title,
        content,
        links,
        notes,
    })
}

/// Extract same-site peers with usable text, skipping the current page
fn extract_peers(
    current_url: &str,
    scope: &LinkScope,
    peers: &[PageInput],
    config: &AnalyzerConfig,
) -> Vec<PeerContent> {
    let mut extracted = Vec::with_capacity(peers.len());
    for peer in peers {
        if peer.url == current_url {
            continue;
        }
        if !scope.is_internal(&peer.url) {
            ::log::debug!("Skipping peer {} from another site", peer.url);
            continue;
        }
        let doc = Html::parse_document(&peer.html);
        match html::extract_document(&doc, &config.scoring) {
            Ok(content) if content.word_count >= BROKEN_PAGE_WORDS => {
                extracted.push(PeerContent {
                    url: peer.url.clone(),
                    title: peer.title.clone().or_else(|| page_title(&doc)),
                    text: content.clean_text,
                });
            }
            Ok(content) => {
                ::log::debug!("Skipping peer {} with {} words", peer.url, content.word_count);
            }
            Err(e) => {
                ::log::debug!("Skipping peer {}: {}", peer.url, e);
            }
        }
    }
    extracted
}

/// Analyze one page, optionally against a set of peer pages
///
/// Recoverable problems degrade the result instead of failing it. Errors
/// are returned only for fatal conditions such as an unparsable page URL or
/// embeddings of mismatched dimension.
pub async fn analyze_page(
    session: &mut AnalysisSession,
    page: &PageInput,
    peers: &[PageInput],
    semantic: bool,
) -> Result<PageAnalysis> {
    let config = session.config().clone();
    let scope = LinkScope::new(&page.url).map_err(|source| AnalysisError::InvalidUrl {
        url: page.url.clone(),
        source,
    })?;

    let Inspection {
        title,
        content,
        links,
        mut notes,
    } = inspect(page, &scope, &config)?;

    let category = PageCategory::from_path(scope.page_url().path());
    let url_depth = filter::url_depth(scope.page_url());
    let assessment = scoring::score(&links, &content, category, url_depth, &config.scoring);

    let mut status = if notes.is_empty() {
        AnalysisStatus::Ok
    } else {
        AnalysisStatus::Degraded
    };

    let mut semantic_analysis = None;
    if content.word_count < BROKEN_PAGE_WORDS {
        let insufficient = AnalysisError::InsufficientContent {
            words: content.word_count,
        };
        ::log::warn!("{}: {}", page.url, insufficient);
        notes.push(insufficient.to_string());
        status = AnalysisStatus::Degraded;
    } else if semantic {
        let peer_content = extract_peers(&page.url, &scope, peers, &config);
        let result =
            analyze_semantics(session, &page.url, &content.clean_text, &peer_content).await?;
        if result.method == EmbeddingMethod::Fallback {
            notes.push("fallback embeddings used, similarity is not semantic".to_string());
        }
        semantic_analysis = Some(result);
    }

    ::log::info!(
        "Analyzed {}: score {} ({}), {} contextual links",
        page.url,
        assessment.score,
        assessment.severity,
        links.contextual_count()
    );

    Ok(PageAnalysis {
        url: page.url.clone(),
        title,
        category,
        url_depth,
        content,
        links,
        assessment,
        semantic: semantic_analysis,
        status,
        notes,
    })
}

async fn analyze_semantics(
    session: &mut AnalysisSession,
    url: &str,
    current_text: &str,
    peers: &[PeerContent],
) -> Result<SemanticAnalysis> {
    let mut texts: Vec<&str> = Vec::with_capacity(peers.len() + 1);
    texts.push(current_text);
    texts.extend(peers.iter().map(|p| p.text.as_str()));

    let embedded = session.embed_batch(&texts).await?;
    let Some((current, peer_embedded)) = embedded.split_first() else {
        return Err(AnalysisError::ServiceUnavailable(
            "no embedding produced for the page".to_string(),
        ));
    };

    let vectors: Vec<&[f32]> = embedded.iter().map(|e| e.vector.as_slice()).collect();
    let theme_alignment = match session.site_centroid(&vectors)? {
        Some(centroid) => similarity::cosine_similarity(&current.vector, &centroid)?,
        None => 0.0,
    };

    let config = session.config();
    let candidates: Vec<Candidate<'_>> = peers
        .iter()
        .zip(peer_embedded)
        .map(|(peer, embedded)| Candidate {
            url: &peer.url,
            title: peer.title.as_deref(),
            embedding: &embedded.vector,
        })
        .collect();
    let similar_pages =
        similarity::find_similar(url, &current.vector, &candidates, &config.similarity)?;

    let threshold = config.similarity.cluster_threshold;
    let cluster_pages = peers
        .iter()
        .zip(peer_embedded)
        .map(|(peer, embedded)| ClusterPage {
            url: peer.url.clone(),
            title: peer.title.clone(),
            embedding: embedded.vector.clone(),
        })
        .collect();
    let clusters = clustering::build_clusters(cluster_pages, threshold)?;
    let cluster = clustering::assign(&current.vector, &clusters, threshold)?;

    let assigned = cluster.cluster_id().and_then(|id| clusters.get(id));
    let gap_texts: Vec<&str> = match assigned {
        Some(assigned) => peers
            .iter()
            .filter(|p| assigned.contains(&p.url))
            .map(|p| p.text.as_str())
            .collect(),
        None => peers
            .iter()
            .filter(|p| similar_pages.iter().any(|s| s.url == p.url))
            .map(|p| p.text.as_str())
            .collect(),
    };
    let content_gaps = clustering::content_gaps(current_text, &gap_texts, MAX_CONTENT_GAPS);

    ::log::debug!(
        "{}: alignment {:.3}, {} similar pages, cluster '{}'",
        url,
        theme_alignment,
        similar_pages.len(),
        cluster.topic()
    );

    Ok(SemanticAnalysis {
        method: current.method,
        theme_alignment,
        alignment: ThemeAlignment::from_score(theme_alignment),
        semantic_score: similarity::semantic_score(theme_alignment),
        similar_pages,
        cluster_size: assigned.map(|c| c.len() + 1).unwrap_or(1),
        authority_page: assigned.and_then(|c| c.authority_page.clone()),
        cluster,
        content_gaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ContextClass;
    use crate::embeddings::{Embedding, EmbeddingBackend};
    use crate::scoring::Severity;
    use crate::similarity::Relationship;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PARAGRAPH: &str = "Staking lets holders lock their coins with a validator and earn \
        rewards for helping secure the network. Rewards depend on the validator uptime, the \
        commission it charges and the total amount staked across the protocol. Unbonding \
        periods mean staked funds cannot be withdrawn instantly, so plan liquidity carefully \
        before committing a large share of your portfolio to a single validator.";

    fn article(title: &str, extra: &str) -> String {
        format!(
            r#"<html><head><title>{title}</title></head><body>
            <nav class="main-nav"><a href="/markets">Markets</a><a href="/fees">Fees</a></nav>
            <main><article>
              <h1>{title}</h1>
              <p>{PARAGRAPH} Read the <a href="/learn/validators">validator guide</a> and the
                 <a href="/learn/slashing">slashing explainer</a>.</p>
              <p>{PARAGRAPH} {extra}</p>
            </article></main>
            <footer><a href="/legal/terms">Terms</a></footer>
            </body></html>"#
        )
    }

    struct DownBackend {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmbeddingBackend for DownBackend {
        async fn embed(&self, _text: &str) -> Result<Embedding> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AnalysisError::ServiceUnavailable("connection refused".to_string()))
        }

        async fn is_available(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    /// Answers the first request, then fails like a crashed server
    struct FlakyBackend {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmbeddingBackend for FlakyBackend {
        async fn embed(&self, _text: &str) -> Result<Embedding> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![0.1; 768])
            } else {
                Err(AnalysisError::ServiceUnavailable("connection reset".to_string()))
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn down_session() -> (AnalysisSession, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = DownBackend { calls: calls.clone() };
        let mut config = AnalyzerConfig::default();
        config.embedding.rate_limit_ms = 0;
        let session = AnalysisSession::new(config, Box::new(backend)).unwrap();
        (session, calls)
    }

    #[tokio::test]
    async fn test_links_and_scoring() {
        let mut session = AnalysisSession::offline(AnalyzerConfig::default()).unwrap();
        let page = PageInput::new(
            "https://www.example.com/learn/what-is-staking",
            article("What is staking", ""),
        );

        let analysis = analyze_page(&mut session, &page, &[], false).await.unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Ok);
        assert_eq!(analysis.title.as_deref(), Some("What is staking"));
        assert_eq!(analysis.category, PageCategory::LearnHub);
        assert_eq!(analysis.url_depth, 2);
        assert_eq!(analysis.links.contextual_count(), 2);
        assert_eq!(analysis.links.navigation_count, 2);
        assert_eq!(analysis.links.footer_count, 1);
        assert!(
            analysis
                .links
                .contextual_links
                .iter()
                .all(|l| l.context_class == ContextClass::Contextual)
        );
        assert!(analysis.content.word_count > 50);
        // Learn hub pages expect five contextual links
        assert!(analysis.assessment.breakdown.iter().any(|(label, _)| label.contains("learn-hub")));
        assert!(analysis.semantic.is_none());
    }

    #[tokio::test]
    async fn test_service_down_uses_fallback_once_per_text() {
        let (mut session, calls) = down_session();
        let page = PageInput::new("https://example.com/learn/staking", article("Staking", ""));
        let peers = vec![PageInput::new(
            "https://example.com/learn/defi",
            article("DeFi lending", "Lending pools pay variable interest to depositors."),
        )];

        let analysis = analyze_page(&mut session, &page, &peers, true).await.unwrap();
        let semantic = analysis.semantic.expect("semantic analysis should run");

        assert_eq!(semantic.method, EmbeddingMethod::Fallback);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.stats().fallback_generations, 2);
        assert!(analysis.notes.iter().any(|n| n.contains("fallback")));
    }

    #[tokio::test]
    async fn test_service_failing_mid_run_reports_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut config = AnalyzerConfig::default();
        config.embedding.rate_limit_ms = 0;
        let backend = FlakyBackend { calls: calls.clone() };
        let mut session = AnalysisSession::new(config, Box::new(backend)).unwrap();
        let page = PageInput::new("https://example.com/learn/staking", article("Staking", ""));
        let peers = vec![PageInput::new(
            "https://example.com/learn/staking-risks",
            article("Staking", "Slashing can burn part of the stake."),
        )];

        let analysis = analyze_page(&mut session, &page, &peers, true).await.unwrap();
        let semantic = analysis.semantic.as_ref().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(semantic.method, EmbeddingMethod::Fallback);
        assert_eq!(session.stats().service_failures, 1);
        assert!(analysis.notes.iter().any(|n| n.contains("fallback")));

        let record = crate::results::ReportRecord::from_analysis(&analysis);
        assert_eq!(record.text("embedding_method"), Some("fallback"));
        assert!(record.text("notes").unwrap().contains("fallback"));
    }

    #[tokio::test]
    async fn test_identical_peer_is_duplicate_and_shares_cluster() {
        let mut session = AnalysisSession::offline(AnalyzerConfig::default()).unwrap();
        let page = PageInput::new("https://example.com/learn/staking", article("Staking", ""));
        let peers = vec![
            PageInput::new("https://example.com/learn/staking-copy", article("Staking", "")),
            page.clone(),
        ];

        let analysis = analyze_page(&mut session, &page, &peers, true).await.unwrap();
        let semantic = analysis.semantic.unwrap();

        assert_eq!(semantic.similar_pages.len(), 1);
        assert_eq!(semantic.similar_pages[0].url, "https://example.com/learn/staking-copy");
        assert_eq!(semantic.similar_pages[0].relationship, Relationship::Duplicate);
        assert_eq!(semantic.cluster.cluster_id(), Some(0));
        assert_eq!(semantic.cluster_size, 2);
        assert_eq!(semantic.semantic_score, 100);
        assert_eq!(semantic.alignment, ThemeAlignment::High);
        // Identical text: one generation, one cache hit
        assert_eq!(session.stats().fallback_generations, 1);
        assert_eq!(session.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_peers_from_other_sites_are_ignored() {
        let mut session = AnalysisSession::offline(AnalyzerConfig::default()).unwrap();
        let page = PageInput::new("https://example.com/learn/staking", article("Staking", ""));
        let peers = vec![
            PageInput::new("https://other.org/learn/staking", article("Staking", "")),
            PageInput::new("https://www.example.com/learn/copy", article("Staking", "")),
        ];

        let analysis = analyze_page(&mut session, &page, &peers, true).await.unwrap();
        let semantic = analysis.semantic.unwrap();

        assert_eq!(semantic.similar_pages.len(), 1);
        assert_eq!(semantic.similar_pages[0].url, "https://www.example.com/learn/copy");
    }

    #[tokio::test]
    async fn test_broken_page_is_degraded() {
        let mut session = AnalysisSession::offline(AnalyzerConfig::default()).unwrap();
        let page = PageInput::new(
            "https://example.com/blog/empty",
            "<html><body><main><p>Coming soon</p></main></body></html>",
        );

        let analysis = analyze_page(&mut session, &page, &[], true).await.unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Degraded);
        assert_eq!(analysis.assessment.score, 90);
        assert_eq!(analysis.assessment.severity, Severity::Critical);
        assert!(analysis.semantic.is_none());
        assert!(analysis.notes[0].contains("insufficient content"));
    }

    #[tokio::test]
    async fn test_empty_document_degrades() {
        let mut session = AnalysisSession::offline(AnalyzerConfig::default()).unwrap();
        let page = PageInput::new("https://example.com/", "");

        let analysis = analyze_page(&mut session, &page, &[], false).await.unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Degraded);
        assert_eq!(analysis.content.word_count, 0);
        assert!(analysis.notes.iter().any(|n| n.contains("extraction failed")));
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal() {
        let mut session = AnalysisSession::offline(AnalyzerConfig::default()).unwrap();
        let page = PageInput::new("not a url", article("Staking", ""));

        let err = analyze_page(&mut session, &page, &[], false).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidUrl { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_page_title_falls_back_to_h1() {
        let doc = Html::parse_document("<html><body><h1>  Fees   explained </h1></body></html>");
        assert_eq!(page_title(&doc).as_deref(), Some("Fees explained"));
        let doc = Html::parse_document("<html><body><p>no title</p></body></html>");
        assert_eq!(page_title(&doc), None);
    }
}
