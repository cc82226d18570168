//! Recovery of embedding vectors from damaged serialized payloads.
//!
//! Cached embeddings sometimes come back wrapped in one or more layers of
//! `{"embedding": ...}` objects, or with trailing metadata fields glued on.
//! Repair peels those layers off and only accepts the result when it is a
//! plain comma-separated list of numbers.

use super::Embedding;
use crate::error::{AnalysisError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// One `[{"embedding":"` style wrapper at the start of the payload
static WRAPPER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\[?\s*\{\s*"embedding"\s*:\s*"?"#)
        .expect("Wrapper prefix regex should be valid")
});

/// A `","method":"x"}` style metadata tail
static METADATA_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"?\s*,\s*"[A-Za-z_][A-Za-z0-9_]*"\s*:.*$"#)
        .expect("Metadata suffix regex should be valid")
});

/// Accepted result: numbers separated by commas
static NUMERIC_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?\d+(\.\d+)?([eE][-+]?\d+)?(,\s*[-+]?\d+(\.\d+)?([eE][-+]?\d+)?)*$")
        .expect("Numeric list regex should be valid")
});

/// Layers beyond this are treated as garbage
const MAX_WRAPPER_DEPTH: usize = 16;

/// Reduce a possibly wrapped payload to a bare numeric list
///
/// Already clean input is returned unchanged.
pub fn repair_embedding_string(raw: &str) -> Result<String> {
    let mut current = raw.trim();

    for _ in 0..MAX_WRAPPER_DEPTH {
        match WRAPPER_PREFIX.find(current) {
            Some(found) if !found.is_empty() => current = &current[found.end()..],
            _ => break,
        }
    }

    if let Some(found) = METADATA_SUFFIX.find(current) {
        current = &current[..found.start()];
    }

    let repaired = current
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '{' | '}' | '"'));

    if NUMERIC_LIST.is_match(repaired) {
        if repaired != raw {
            ::log::debug!("Repaired embedding payload of {} bytes", raw.len());
        }
        Ok(repaired.to_string())
    } else {
        let preview: String = raw.chars().take(60).collect();
        Err(AnalysisError::MalformedEmbeddingData(format!(
            "not a numeric list: {preview}"
        )))
    }
}

/// Repair a payload and parse it into a vector of the expected dimension
pub fn parse_embedding_payload(raw: &str, dimension: usize) -> Result<Embedding> {
    let repaired = repair_embedding_string(raw)?;
    let values = repaired
        .split(',')
        .map(|value| {
            value.trim().parse::<f32>().map_err(|e| {
                AnalysisError::MalformedEmbeddingData(format!("bad component '{value}': {e}"))
            })
        })
        .collect::<Result<Embedding>>()?;

    if values.len() != dimension {
        return Err(AnalysisError::MalformedEmbeddingData(format!(
            "expected {} components, found {}",
            dimension,
            values.len()
        )));
    }
    Ok(values)
}
