pub mod html;
pub mod text;

#[cfg(test)]
mod tests;

use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content quality bucket, ordered THIN < MEDIUM < HIGH
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentQuality {
    Thin,
    Medium,
    High,
}

impl ContentQuality {
    /// Quality from word count alone
    pub fn from_word_count(word_count: usize, config: &ScoringConfig) -> Self {
        if word_count < config.thin_content_threshold {
            ContentQuality::Thin
        } else if word_count < config.medium_content_threshold {
            ContentQuality::Medium
        } else {
            ContentQuality::High
        }
    }

    /// Applies the structure rule to a word-count based quality
    ///
    /// MEDIUM is promoted to HIGH with at least 3 headings and 4 paragraphs,
    /// HIGH is demoted to MEDIUM with fewer than 2 headings.
    pub fn adjust_for_structure(self, heading_count: usize, paragraph_count: usize) -> Self {
        match self {
            ContentQuality::Medium if heading_count >= 3 && paragraph_count >= 4 => {
                ContentQuality::High
            }
            ContentQuality::High if heading_count < 2 => ContentQuality::Medium,
            other => other,
        }
    }

    pub fn classify(
        word_count: usize,
        heading_count: usize,
        paragraph_count: usize,
        config: &ScoringConfig,
    ) -> Self {
        Self::from_word_count(word_count, config)
            .adjust_for_structure(heading_count, paragraph_count)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentQuality::Thin => "THIN",
            ContentQuality::Medium => "MEDIUM",
            ContentQuality::High => "HIGH",
        }
    }
}

impl fmt::Display for ContentQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clean main content of a page and its structure counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub word_count: usize,
    pub heading_count: usize,
    pub paragraph_count: usize,
    pub list_count: usize,
    pub quality: ContentQuality,
    pub clean_text: String,
}

impl PageContent {
    /// Builds the content record, deriving its quality
    pub fn new(
        word_count: usize,
        heading_count: usize,
        paragraph_count: usize,
        list_count: usize,
        clean_text: String,
        config: &ScoringConfig,
    ) -> Self {
        Self {
            word_count,
            heading_count,
            paragraph_count,
            list_count,
            quality: ContentQuality::classify(word_count, heading_count, paragraph_count, config),
            clean_text,
        }
    }

    /// Content from plain text, without structure signals
    pub fn from_text(text: &str, config: &ScoringConfig) -> Self {
        let clean_text = text::normalize_whitespace(text);
        Self::new(text::count_words(&clean_text), 0, 0, 0, clean_text, config)
    }
}
