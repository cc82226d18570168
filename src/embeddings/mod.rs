//! Text embeddings.
//!
//! Vectors come from an embedding service behind [`EmbeddingBackend`] or,
//! when the service is unavailable, from the deterministic
//! [`fallback`] generator. Both are cached per session by normalized text.

pub mod cache;
pub mod fallback;
pub mod ollama;
pub mod repair;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use cache::EmbeddingCache;
pub use fallback::{FallbackBackend, fallback_embedding};
pub use ollama::OllamaClient;
pub use repair::{parse_embedding_payload, repair_embedding_string};

/// Fixed-dimension embedding vector
pub type Embedding = Vec<f32>;

/// Where a vector came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMethod {
    Service,
    Fallback,
}

impl EmbeddingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingMethod::Service => "service",
            EmbeddingMethod::Fallback => "fallback",
        }
    }
}

impl fmt::Display for EmbeddingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An embedding together with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedText {
    pub vector: Embedding,
    pub method: EmbeddingMethod,
    /// Served from the session cache
    pub cached: bool,
}

/// A source of embeddings
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed already normalized text
    ///
    /// Fails with `ServiceUnavailable` once the backend has given up.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Cheap liveness check made before batch runs
    async fn is_available(&self) -> bool {
        true
    }

    /// Method reported for vectors produced by this backend
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Service
    }

    /// Name used in log lines
    fn name(&self) -> &str;
}
