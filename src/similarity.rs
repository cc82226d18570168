use crate::config::SimilarityConfig;
use crate::embeddings::Embedding;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Cosine similarity of two equal-length vectors, in `[-1, 1]`
///
/// Accumulates in `f64` so identical vectors compare as exactly `1.0`.
/// A zero-magnitude vector has similarity `0.0` with everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(AnalysisError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0))
}

/// Component-wise mean of a set of vectors
pub fn centroid<'a, I>(embeddings: I) -> Result<Option<Embedding>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum: Option<Vec<f64>> = None;
    let mut count = 0usize;

    for embedding in embeddings {
        let acc = sum.get_or_insert_with(|| vec![0.0; embedding.len()]);
        if acc.len() != embedding.len() {
            return Err(AnalysisError::DimensionMismatch {
                left: acc.len(),
                right: embedding.len(),
            });
        }
        for (slot, &value) in acc.iter_mut().zip(embedding) {
            *slot += value as f64;
        }
        count += 1;
    }

    Ok(sum.map(|acc| acc.into_iter().map(|v| (v / count as f64) as f32).collect()))
}

/// How well a page matches the site's overall theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThemeAlignment {
    High,
    Medium,
    Low,
}

impl ThemeAlignment {
    pub fn from_score(alignment: f64) -> Self {
        if alignment > 0.8 {
            ThemeAlignment::High
        } else if alignment > 0.6 {
            ThemeAlignment::Medium
        } else {
            ThemeAlignment::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeAlignment::High => "HIGH",
            ThemeAlignment::Medium => "MEDIUM",
            ThemeAlignment::Low => "LOW",
        }
    }
}

/// 0-100 score derived from theme alignment; negative alignment scores 0
pub fn semantic_score(alignment: f64) -> u32 {
    (alignment.max(0.0) * 100.0).round() as u32
}

/// Relationship between two pages by similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    Duplicate,
    HighlyRelated,
    Related,
    LooselyRelated,
}

impl Relationship {
    pub fn from_similarity(similarity: f64, config: &SimilarityConfig) -> Self {
        if similarity > config.high_similarity_threshold {
            Relationship::Duplicate
        } else if similarity > config.similarity_threshold {
            Relationship::HighlyRelated
        } else if similarity > config.related_threshold {
            Relationship::Related
        } else {
            Relationship::LooselyRelated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Duplicate => "DUPLICATE",
            Relationship::HighlyRelated => "HIGHLY_RELATED",
            Relationship::Related => "RELATED",
            Relationship::LooselyRelated => "LOOSELY_RELATED",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page that may be similar to the one under analysis
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub url: &'a str,
    pub title: Option<&'a str>,
    pub embedding: &'a [f32],
}

/// A similar page, ready for a link suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPage {
    pub url: String,
    pub title: Option<String>,
    pub similarity: f64,
    pub relationship: Relationship,
}

/// Candidates at or above the similarity threshold, most similar first
///
/// Candidates with the same URL as `current_url` are skipped. Ties are
/// broken by URL so results are stable.
pub fn find_similar(
    current_url: &str,
    current: &[f32],
    candidates: &[Candidate<'_>],
    config: &SimilarityConfig,
) -> Result<Vec<SimilarPage>> {
    let mut found = Vec::new();
    for candidate in candidates {
        if candidate.url == current_url {
            continue;
        }
        let similarity = cosine_similarity(current, candidate.embedding)?;
        if similarity >= config.similarity_threshold {
            found.push(SimilarPage {
                url: candidate.url.to_string(),
                title: candidate.title.map(str::to_string),
                similarity,
                relationship: Relationship::from_similarity(similarity, config),
            });
        }
    }

    found.sort_by(|a, b| match b.similarity.total_cmp(&a.similarity) {
        Ordering::Equal => a.url.cmp(&b.url),
        other => other,
    });
    found.truncate(config.max_suggestions_per_page);
    ::log::debug!("{} similar pages for {}", found.len(), current_url);
    Ok(found)
}
