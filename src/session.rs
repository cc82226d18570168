use crate::config::AnalyzerConfig;
use crate::embeddings::{
    EmbeddedText, Embedding, EmbeddingBackend, EmbeddingCache, EmbeddingMethod, OllamaClient,
    fallback_embedding, parse_embedding_payload, repair_embedding_string,
};
use crate::error::{AnalysisError, Result};
use crate::parsers::text;
use crate::similarity;
use std::time::Duration;

/// Counters for one analysis session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub service_calls: usize,
    pub service_failures: usize,
    pub fallback_generations: usize,
    pub cache_hits: usize,
    pub repaired_payloads: usize,
    pub discarded_payloads: usize,
}

/// State shared by the analyses of one run
///
/// Owns the embedding cache, the site centroid and the backend. Nothing
/// here outlives the session; `clear` resets it for an independent run.
pub struct AnalysisSession {
    config: AnalyzerConfig,
    backend: Option<Box<dyn EmbeddingBackend>>,
    service_down: bool,
    cache: EmbeddingCache,
    centroid: Option<Embedding>,
    stats: SessionStats,
}

impl AnalysisSession {
    /// Create a session embedding through `backend`
    pub fn new(config: AnalyzerConfig, backend: Box<dyn EmbeddingBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend: Some(backend),
            service_down: false,
            cache: EmbeddingCache::new(),
            centroid: None,
            stats: SessionStats::default(),
        })
    }

    /// Create a session using the configured embedding service
    pub fn with_service(config: AnalyzerConfig) -> Result<Self> {
        let client = OllamaClient::new(&config.embedding)?;
        ::log::info!(
            "Embedding through {} with model {}",
            client.endpoint(),
            config.embedding.model
        );
        Self::new(config, Box::new(client))
    }

    /// Create a session that only uses fallback embeddings
    pub fn offline(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend: None,
            service_down: false,
            cache: EmbeddingCache::new(),
            centroid: None,
            stats: SessionStats::default(),
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Whether the service will be asked for new embeddings
    pub fn service_enabled(&self) -> bool {
        self.backend.is_some() && !self.service_down
    }

    /// Cache key for a text
    pub fn cache_key(&self, text: &str) -> String {
        text::normalize_for_embedding(text, self.config.embedding.max_content_length)
    }

    /// Embed one text, using the cache and falling back when the service fails
    ///
    /// Only a dimension mismatch between the service and the configuration
    /// is returned as an error.
    pub async fn embed(&mut self, text: &str) -> Result<EmbeddedText> {
        let key = self.cache_key(text);
        self.embed_key(key).await
    }

    /// Embed several texts sequentially with a client-side rate limit
    ///
    /// The service is probed once first; if it does not answer, every text
    /// of the batch gets a fallback vector without network calls.
    pub async fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<EmbeddedText>> {
        let keys: Vec<String> = texts.iter().map(|t| self.cache_key(t)).collect();

        let needs_service = keys.iter().any(|k| !self.cache.contains(k));
        if needs_service && self.service_enabled() {
            let available = match &self.backend {
                Some(backend) => backend.is_available().await,
                None => false,
            };
            if !available {
                ::log::warn!("Embedding service unavailable, using fallback embeddings");
                self.mark_service_down();
            }
        }

        let delay = Duration::from_millis(self.config.embedding.rate_limit_ms);
        let batch_size = self.config.embedding.batch_size.max(1);
        let total_batches = keys.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(keys.len());
        let mut requested = false;

        for (index, batch) in keys.chunks(batch_size).enumerate() {
            ::log::info!(
                "Embedding batch {}/{} ({} texts)",
                index + 1,
                total_batches,
                batch.len()
            );
            for key in batch {
                let will_request = self.service_enabled() && !self.cache.contains(key);
                if will_request && requested && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                requested |= will_request;
                results.push(self.embed_key(key.clone()).await?);
            }
        }

        // Vectors from two embedding spaces cannot be compared
        if results.iter().any(|r| r.method == EmbeddingMethod::Fallback) {
            for (key, result) in keys.iter().zip(results.iter_mut()) {
                if result.method != EmbeddingMethod::Fallback {
                    ::log::debug!("Regenerating service embedding as fallback");
                    *result = self.regenerate_fallback(key);
                }
            }
        }
        Ok(results)
    }

    /// Replace the cached vector for `key` with its fallback vector
    fn regenerate_fallback(&mut self, key: &str) -> EmbeddedText {
        let vector = fallback_embedding(key, self.config.embedding.dimension);
        self.stats.fallback_generations += 1;
        self.cache.insert(key.to_string(), vector.clone(), EmbeddingMethod::Fallback);
        EmbeddedText {
            vector,
            method: EmbeddingMethod::Fallback,
            cached: false,
        }
    }

    /// Stop asking the service for the rest of the session
    ///
    /// A centroid built from service vectors is dropped with it.
    fn mark_service_down(&mut self) {
        self.service_down = true;
        self.centroid = None;
    }

    async fn embed_key(&mut self, key: String) -> Result<EmbeddedText> {
        if let Some(hit) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            return Ok(hit);
        }

        let dimension = self.config.embedding.dimension;
        let (vector, method) = match self.request_service(&key).await? {
            Some(produced) => produced,
            None => {
                self.stats.fallback_generations += 1;
                (fallback_embedding(&key, dimension), EmbeddingMethod::Fallback)
            }
        };

        self.cache.insert(key, vector.clone(), method);
        Ok(EmbeddedText {
            vector,
            method,
            cached: false,
        })
    }

    /// Ask the backend; `None` means the caller should fall back
    async fn request_service(&mut self, key: &str) -> Result<Option<(Embedding, EmbeddingMethod)>> {
        if self.service_down {
            return Ok(None);
        }
        let Some(backend) = &self.backend else {
            return Ok(None);
        };

        let method = backend.method();
        let name = backend.name().to_string();
        self.stats.service_calls += 1;
        match backend.embed(key).await {
            Ok(vector) => {
                let expected = self.config.embedding.dimension;
                if vector.len() != expected {
                    return Err(AnalysisError::DimensionMismatch {
                        left: expected,
                        right: vector.len(),
                    });
                }
                Ok(Some((vector, method)))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                ::log::warn!("{} embedding failed, switching to fallback: {}", name, e);
                self.stats.service_failures += 1;
                self.mark_service_down();
                Ok(None)
            }
        }
    }

    /// Load a serialized embedding for `text` into the cache
    ///
    /// Damaged payloads are repaired when possible. Payloads that cannot be
    /// repaired are discarded and a fallback vector takes their place.
    pub fn import_serialized(
        &mut self,
        text: &str,
        raw: &str,
        method: EmbeddingMethod,
    ) -> EmbeddedText {
        let key = self.cache_key(text);
        let dimension = self.config.embedding.dimension;

        let imported = repair_embedding_string(raw).and_then(|repaired| {
            if repaired != raw.trim() {
                self.stats.repaired_payloads += 1;
            }
            parse_embedding_payload(&repaired, dimension)
        });

        let (vector, method) = match imported {
            Ok(vector) => (vector, method),
            Err(e) => {
                ::log::warn!("Discarding cached embedding: {}", e);
                self.stats.discarded_payloads += 1;
                self.stats.fallback_generations += 1;
                (fallback_embedding(&key, dimension), EmbeddingMethod::Fallback)
            }
        };

        self.cache.insert(key, vector.clone(), method);
        EmbeddedText {
            vector,
            method,
            cached: false,
        }
    }

    /// Site centroid, computed on first use from at most `centroid_sample_size` vectors
    pub fn site_centroid(&mut self, embeddings: &[&[f32]]) -> Result<Option<Embedding>> {
        if self.centroid.is_none() {
            let sample = self.config.similarity.centroid_sample_size;
            self.centroid = similarity::centroid(embeddings.iter().take(sample).copied())?;
            if self.centroid.is_some() {
                ::log::debug!(
                    "Site centroid computed from {} pages",
                    embeddings.len().min(sample)
                );
            }
        }
        Ok(self.centroid.clone())
    }

    /// Forget everything learned in this session
    pub fn clear(&mut self) {
        self.cache.clear();
        self.centroid = None;
        self.service_down = false;
        self.stats = SessionStats::default();
    }
}
