use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Thresholds for the opportunity scorer and content quality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Words per ideal contextual link
    #[serde(default = "default_contextual_link_target")]
    pub contextual_link_target: usize,

    /// Minimum healthy contextual link density (percent of words)
    #[serde(default = "default_min_contextual_density")]
    pub min_contextual_density: f64,

    /// Maximum healthy contextual link density (percent of words)
    #[serde(default = "default_max_contextual_density")]
    pub max_contextual_density: f64,

    /// Pages below this word count are THIN
    #[serde(default = "default_thin_content_threshold")]
    pub thin_content_threshold: usize,

    /// Pages below this word count (and not thin) are MEDIUM
    #[serde(default = "default_medium_content_threshold")]
    pub medium_content_threshold: usize,

    /// Below this word count link scoring is skipped
    #[serde(default = "default_min_words_for_links")]
    pub min_words_for_links: usize,

    /// External-to-contextual ratio above which the page is flagged
    #[serde(default = "default_external_warning_ratio")]
    pub external_warning_ratio: f64,
}

/// Settings for the embedding service client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum attempts per text before falling back
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff interval in milliseconds, doubled on each retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Delay between consecutive requests in a batch
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Number of texts per batch group
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Vector dimension
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum number of characters sent to the service
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
}

/// Thresholds for similarity and clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Minimum similarity for a page to be suggested
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Similarity above which two pages are duplicates
    #[serde(default = "default_high_similarity_threshold")]
    pub high_similarity_threshold: f64,

    /// Similarity above which two pages are related
    #[serde(default = "default_related_threshold")]
    pub related_threshold: f64,

    /// Similarity needed to join a cluster
    #[serde(default = "default_cluster_threshold")]
    pub cluster_threshold: f64,

    /// Cap on similar pages reported per page
    #[serde(default = "default_max_suggestions_per_page")]
    pub max_suggestions_per_page: usize,

    /// Pages used to approximate the site centroid
    #[serde(default = "default_centroid_sample_size")]
    pub centroid_sample_size: usize,
}

/// Full analyzer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub similarity: SimilarityConfig,
}

fn default_contextual_link_target() -> usize {
    100
}

fn default_min_contextual_density() -> f64 {
    0.8
}

fn default_max_contextual_density() -> f64 {
    3.0
}

fn default_thin_content_threshold() -> usize {
    300
}

fn default_medium_content_threshold() -> usize {
    800
}

fn default_min_words_for_links() -> usize {
    50
}

fn default_external_warning_ratio() -> f64 {
    2.0
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_rate_limit_ms() -> u64 {
    150
}

fn default_batch_size() -> usize {
    20
}

fn default_dimension() -> usize {
    768
}

fn default_max_content_length() -> usize {
    8192
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_high_similarity_threshold() -> f64 {
    0.95
}

fn default_related_threshold() -> f64 {
    0.75
}

fn default_cluster_threshold() -> f64 {
    0.8
}

fn default_max_suggestions_per_page() -> usize {
    10
}

fn default_centroid_sample_size() -> usize {
    50
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            contextual_link_target: default_contextual_link_target(),
            min_contextual_density: default_min_contextual_density(),
            max_contextual_density: default_max_contextual_density(),
            thin_content_threshold: default_thin_content_threshold(),
            medium_content_threshold: default_medium_content_threshold(),
            min_words_for_links: default_min_words_for_links(),
            external_warning_ratio: default_external_warning_ratio(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            rate_limit_ms: default_rate_limit_ms(),
            batch_size: default_batch_size(),
            dimension: default_dimension(),
            max_content_length: default_max_content_length(),
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            high_similarity_threshold: default_high_similarity_threshold(),
            related_threshold: default_related_threshold(),
            cluster_threshold: default_cluster_threshold(),
            max_suggestions_per_page: default_max_suggestions_per_page(),
            centroid_sample_size: default_centroid_sample_size(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Override fields from environment variables, if set
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Override fields from an arbitrary variable source
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let scoring = &mut self.scoring;
        override_var(&lookup, "CONTEXTUAL_LINK_TARGET", &mut scoring.contextual_link_target);
        override_var(&lookup, "MIN_CONTEXTUAL_DENSITY", &mut scoring.min_contextual_density);
        override_var(&lookup, "MAX_CONTEXTUAL_DENSITY", &mut scoring.max_contextual_density);
        override_var(&lookup, "THIN_CONTENT_THRESHOLD", &mut scoring.thin_content_threshold);
        override_var(&lookup, "MEDIUM_CONTENT_THRESHOLD", &mut scoring.medium_content_threshold);
        override_var(&lookup, "MIN_WORDS_FOR_LINKS", &mut scoring.min_words_for_links);
        override_var(&lookup, "EXTERNAL_WARNING_RATIO", &mut scoring.external_warning_ratio);

        let embedding = &mut self.embedding;
        if let Some(endpoint) = lookup("OLLAMA_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                embedding.endpoint = endpoint.trim().to_string();
            }
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            if !model.trim().is_empty() {
                embedding.model = model.trim().to_string();
            }
        }
        override_var(&lookup, "EMBEDDING_TIMEOUT_SECS", &mut embedding.timeout_secs);
        override_var(&lookup, "EMBEDDING_MAX_RETRIES", &mut embedding.max_retries);
        override_var(&lookup, "EMBEDDING_RATE_LIMIT_MS", &mut embedding.rate_limit_ms);
        override_var(&lookup, "EMBEDDING_BATCH_SIZE", &mut embedding.batch_size);
        override_var(&lookup, "EMBEDDING_DIMENSION", &mut embedding.dimension);

        let similarity = &mut self.similarity;
        override_var(&lookup, "SIMILARITY_THRESHOLD", &mut similarity.similarity_threshold);
        override_var(
            &lookup,
            "HIGH_SIMILARITY_THRESHOLD",
            &mut similarity.high_similarity_threshold,
        );
        override_var(&lookup, "CLUSTER_THRESHOLD", &mut similarity.cluster_threshold);
        override_var(
            &lookup,
            "MAX_SUGGESTIONS_PER_PAGE",
            &mut similarity.max_suggestions_per_page,
        );
    }

    /// Reject configurations that can never produce a working analysis
    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        if scoring.contextual_link_target == 0 {
            return Err(AnalysisError::Config(
                "contextual_link_target must be at least 1".to_string(),
            ));
        }
        if scoring.min_contextual_density > scoring.max_contextual_density {
            return Err(AnalysisError::Config(format!(
                "min_contextual_density {} exceeds max_contextual_density {}",
                scoring.min_contextual_density, scoring.max_contextual_density
            )));
        }
        if scoring.thin_content_threshold > scoring.medium_content_threshold {
            return Err(AnalysisError::Config(format!(
                "thin_content_threshold {} exceeds medium_content_threshold {}",
                scoring.thin_content_threshold, scoring.medium_content_threshold
            )));
        }

        let embedding = &self.embedding;
        if embedding.endpoint.trim().is_empty() {
            return Err(AnalysisError::Config("embedding endpoint is empty".to_string()));
        }
        if embedding.dimension == 0 {
            return Err(AnalysisError::Config(
                "embedding dimension must be at least 1".to_string(),
            ));
        }
        if embedding.batch_size == 0 {
            return Err(AnalysisError::Config(
                "embedding batch_size must be at least 1".to_string(),
            ));
        }

        let similarity = &self.similarity;
        for (name, value) in [
            ("similarity_threshold", similarity.similarity_threshold),
            ("high_similarity_threshold", similarity.high_similarity_threshold),
            ("related_threshold", similarity.related_threshold),
            ("cluster_threshold", similarity.cluster_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        Ok(())
    }
}

/// Replace `target` with the parsed variable, keeping the old value on parse errors
fn override_var<F, T>(lookup: &F, name: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            ::log::debug!("Config override from {}: {}", name, raw.trim());
            *target = value;
        }
        Err(_) => {
            ::log::warn!("Ignoring unparsable value for {}: {:?}", name, raw);
        }
    }
}
