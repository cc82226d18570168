use crate::analyzer::{AnalysisStatus, PageAnalysis};
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single report value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ReportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportValue::Integer(value) => write!(f, "{value}"),
            ReportValue::Float(value) => write!(f, "{value:.2}"),
            ReportValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for ReportValue {
    fn from(value: &str) -> Self {
        ReportValue::Text(value.to_string())
    }
}

impl From<String> for ReportValue {
    fn from(value: String) -> Self {
        ReportValue::Text(value)
    }
}

impl From<usize> for ReportValue {
    fn from(value: usize) -> Self {
        ReportValue::Integer(value as i64)
    }
}

impl From<u32> for ReportValue {
    fn from(value: u32) -> Self {
        ReportValue::Integer(value as i64)
    }
}

impl From<f64> for ReportValue {
    fn from(value: f64) -> Self {
        ReportValue::Float(round_to(value, 2))
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Flat mapping of field names to values, as handed back to the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportRecord {
    fields: BTreeMap<String, ReportValue>,
}

impl ReportRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ReportValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ReportValue> {
        self.fields.get(key)
    }

    /// Text value of a field, if it is text
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(ReportValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Integer value of a field, if it is an integer
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(ReportValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReportValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build the report for a finished analysis
    pub fn from_analysis(analysis: &PageAnalysis) -> Self {
        let mut record = Self::new();
        let assessment = &analysis.assessment;
        let links = &analysis.links;

        record.insert("status", analysis.status.as_str());
        record.insert("url", analysis.url.as_str());
        if let Some(title) = &analysis.title {
            record.insert("title", title.as_str());
        }
        record.insert("page_category", analysis.category.as_str());
        record.insert("url_depth", analysis.url_depth);

        record.insert("content_word_count", analysis.content.word_count);
        record.insert("content_quality", analysis.content.quality.as_str());
        record.insert("heading_count", analysis.content.heading_count);
        record.insert("paragraph_count", analysis.content.paragraph_count);

        record.insert("contextual_links", links.contextual_count());
        record.insert("template_links", links.template_count());
        record.insert("navigation_links", links.navigation_count);
        record.insert("footer_links", links.footer_count);
        record.insert("unique_contextual_links", links.unique_contextual_count());
        record.insert("link_diversity_percent", links.diversity_percent());
        record.insert("link_density_percent", assessment.density_percent);
        record.insert("external_links", links.external_count);
        record.insert("nofollow_links", links.nofollow_count);
        record.insert("external_balance", assessment.external_balance.as_str());

        record.insert("ideal_link_count", assessment.recommended_link_count);
        record.insert("gap_size", assessment.gap_size);
        record.insert("gap_severity", assessment.severity.as_str());
        record.insert("opportunity_score", assessment.score);
        record.insert("top_issue", assessment.top_issue());
        record.insert("opportunities", assessment.opportunities().join(" | "));
        for (index, action) in assessment.recommendations().iter().enumerate() {
            record.insert(&format!("recommended_action_{}", index + 1), *action);
        }
        if !assessment.breakdown.is_empty() {
            let breakdown = assessment
                .breakdown
                .iter()
                .map(|(label, points)| format!("{label} +{points}"))
                .collect::<Vec<_>>()
                .join("; ");
            record.insert("score_breakdown", breakdown);
        }

        if let Some(semantic) = &analysis.semantic {
            record.insert("embedding_method", semantic.method.as_str());
            record.insert("semantic_score", semantic.semantic_score);
            record.insert("theme_alignment", semantic.alignment.as_str());
            record.insert("theme_alignment_score", semantic.theme_alignment);
            record.insert("similar_pages_found", semantic.similar_pages.len());
            if let Some(top) = semantic.similar_pages.first() {
                record.insert("top_similar_page", top.url.as_str());
                record.insert("top_similarity", top.similarity);
                record.insert("top_relationship", top.relationship.as_str());
            }
            record.insert("cluster_topic", semantic.cluster.topic());
            record.insert("cluster_size", semantic.cluster_size);
            if let Some(authority) = &semantic.authority_page {
                record.insert("authority_page", authority.as_str());
            }
            record.insert("content_gaps", semantic.content_gaps.join(", "));
        }

        if !analysis.notes.is_empty() {
            record.insert("notes", analysis.notes.join("; "));
        }
        record
    }

    /// Build the error record for an analysis that could not complete
    pub fn from_error(url: &str, error: &AnalysisError) -> Self {
        let mut record = Self::new();
        record.insert("status", AnalysisStatus::Error.as_str());
        record.insert("url", url);
        record.insert("error_kind", error.kind());
        record.insert("error", error.to_string());
        record.insert("recommendation", recovery_hint(error));
        record
    }

    /// Flat JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One `key: value` line per field, in key order
    pub fn to_text(&self) -> String {
        let width = self.fields.keys().map(String::len).max().unwrap_or(0);
        self.fields
            .iter()
            .map(|(key, value)| format!("{key:<width$}  {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn recovery_hint(error: &AnalysisError) -> &'static str {
    match error {
        AnalysisError::DimensionMismatch { .. } => {
            "Use one embedding model per run and set the configured dimension to match it"
        }
        AnalysisError::Config(_) => "Fix the configuration value named in the error",
        AnalysisError::InvalidUrl { .. } => "Pass the absolute URL the page was crawled from",
        AnalysisError::Io(_) => "Check that the input files exist and are readable",
        _ => "Retry the analysis; if it keeps failing, inspect the page markup",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::PageCategory;
    use crate::classifier::{ContextClass, Link, LinkSet};
    use crate::config::ScoringConfig;
    use crate::parsers::PageContent;
    use crate::scoring;

    /// A learn-hub page with enough unique contextual links
    fn balanced_analysis() -> PageAnalysis {
        let config = ScoringConfig::default();
        let text = vec!["staking"; 395].join(" ");
        let content = PageContent::new(395, 4, 8, 0, text, &config);
        let mut links = LinkSet::default();
        for target in ["/learn/a", "/learn/b", "/learn/c", "/learn/d", "/learn/e"] {
            links.push(
                Link {
                    href: target.to_string(),
                    anchor_text: "related guide".to_string(),
                    is_internal: true,
                    context_class: ContextClass::Contextual,
                    nofollow: false,
                },
                format!("https://example.com{target}"),
            );
        }
        let assessment = scoring::score(&links, &content, PageCategory::LearnHub, 2, &config);

        PageAnalysis {
            url: "https://example.com/learn/staking".to_string(),
            title: Some("Staking".to_string()),
            category: PageCategory::LearnHub,
            url_depth: 2,
            content,
            links,
            assessment,
            semantic: None,
            status: AnalysisStatus::Ok,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_balanced_page_still_recommends_an_action() {
        let analysis = balanced_analysis();
        assert_eq!(analysis.assessment.score, 0);
        assert!(analysis.assessment.findings.is_empty());

        let record = ReportRecord::from_analysis(&analysis);
        assert_eq!(record.text("top_issue"), Some("No significant linking issues"));
        assert!(record.text("recommended_action_1").unwrap().starts_with("Keep"));
        assert!(!record.contains("recommended_action_2"));
        assert_eq!(record.integer("contextual_links"), Some(5));
        assert!(!record.contains("embedding_method"));
    }

    #[test]
    fn test_flat_json_object() {
        let mut record = ReportRecord::new();
        record.insert("url", "https://example.com/");
        record.insert("opportunity_score", 70u32);
        record.insert("link_density_percent", 1.23456);

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["url"], "https://example.com/");
        assert_eq!(value["opportunity_score"], 70);
        assert_eq!(value["link_density_percent"], 1.23);
    }

    #[test]
    fn test_error_record() {
        let error = AnalysisError::DimensionMismatch { left: 768, right: 384 };
        let record = ReportRecord::from_error("https://example.com/a", &error);

        assert_eq!(record.text("status"), Some("error"));
        assert_eq!(record.text("error_kind"), Some("dimension_mismatch"));
        assert!(record.text("recommendation").unwrap().contains("dimension"));
        assert!(!record.contains("opportunity_score"));
    }

    #[test]
    fn test_text_rendering_is_aligned() {
        let mut record = ReportRecord::new();
        record.insert("url", "https://example.com/");
        record.insert("gap_size", 3usize);
        assert_eq!(record.to_text(), "gap_size  3\nurl       https://example.com/");
    }
}
