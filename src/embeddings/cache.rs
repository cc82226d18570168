use super::{EmbeddedText, Embedding, EmbeddingMethod};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct CachedEmbedding {
    vector: Embedding,
    method: EmbeddingMethod,
}

/// Session-scoped embedding cache keyed by exact normalized text
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: HashMap<String, CachedEmbedding>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<EmbeddedText> {
        self.entries.get(key).map(|entry| EmbeddedText {
            vector: entry.vector.clone(),
            method: entry.method,
            cached: true,
        })
    }

    pub fn insert(&mut self, key: String, vector: Embedding, method: EmbeddingMethod) {
        self.entries.insert(key, CachedEmbedding { vector, method });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
