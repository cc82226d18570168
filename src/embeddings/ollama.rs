use super::{Embedding, EmbeddingBackend};
use crate::config::EmbeddingConfig;
use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use backoff::future::retry_notify;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Liveness probes must answer quickly or the service counts as down
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// HTTP client for an Ollama-compatible embedding service
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_attempts: u32,
    initial_backoff: Duration,
    max_content_length: usize,
}

impl OllamaClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_attempts: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_content_length: config.max_content_length,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One embedding request without retries
    async fn request(&self, prompt: &str) -> Result<Embedding> {
        let url = format!("{}/api/embeddings", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::ServiceUnavailable(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        let body: EmbeddingResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(AnalysisError::MalformedEmbeddingData(
                "service returned an empty embedding".to_string(),
            ));
        }
        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaClient {
    /// Embed text, retrying with exponential backoff
    ///
    /// Gives up after `max_retries` attempts in total and reports the last
    /// failure as `ServiceUnavailable`.
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let prompt: String = text.chars().take(self.max_content_length).collect();
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build();

        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;
        let prompt_ref = prompt.as_str();
        let max_attempts = self.max_attempts;

        let outcome = retry_notify(
            policy,
            move || async move {
                let attempt = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
                match self.request(prompt_ref).await {
                    Ok(embedding) => Ok(embedding),
                    Err(e) if attempt >= max_attempts => Err(backoff::Error::permanent(e)),
                    Err(e) => Err(backoff::Error::transient(e)),
                }
            },
            |err: AnalysisError, wait: Duration| {
                ::log::warn!("Embedding request failed ({}), retrying in {:?}", err, wait);
            },
        )
        .await;

        outcome.map_err(|e| {
            let attempts = attempts.load(Ordering::SeqCst);
            ::log::warn!("Embedding service gave up after {} attempts: {}", attempts, e);
            match e {
                AnalysisError::ServiceUnavailable(message) => AnalysisError::ServiceUnavailable(
                    format!("{message} after {attempts} attempts"),
                ),
                other => AnalysisError::ServiceUnavailable(format!(
                    "{other} after {attempts} attempts"
                )),
            }
        })
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.client.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                ::log::info!("Embedding service probe returned HTTP {}", response.status());
                false
            }
            Err(e) => {
                ::log::info!("Embedding service probe failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
