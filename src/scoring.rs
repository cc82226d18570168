//! Linking opportunity scoring.
//!
//! The score is a sum of five capped factors (gap severity, density
//! imbalance, category minimum, duplicate targets, URL depth) clamped to
//! 0..=100. Every factor that fires is recorded in the breakdown so the
//! number can be explained line by line.

use crate::category::PageCategory;
use crate::classifier::{ExternalBalance, LinkSet};
use crate::config::ScoringConfig;
use crate::parsers::{ContentQuality, PageContent};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pages below this word count are reported as broken
pub const BROKEN_PAGE_WORDS: usize = 10;

const BROKEN_PAGE_SCORE: u32 = 90;
const INSUFFICIENT_CONTENT_SCORE: u32 = 50;
const ZERO_LINK_POINTS: u32 = 40;
const DEFICIT_POINTS_PER_LINK: u32 = 8;
const DEFICIT_POINTS_CAP: u32 = 30;
const LOW_DENSITY_POINTS: u32 = 15;
const HIGH_DENSITY_POINTS: u32 = 20;
const DUPLICATE_POINTS: u32 = 15;
const DUPLICATE_MIN_LINKS: usize = 5;
const DUPLICATE_MIN_UNIQUE_RATIO: f64 = 0.7;
const DEPTH_FREE_LEVELS: usize = 3;
const DEPTH_POINTS_PER_LEVEL: u32 = 3;
const DEPTH_POINTS_CAP: u32 = 10;
const MAX_RECOMMENDATIONS: usize = 3;
const NO_ISSUE: &str = "No significant linking issues";
const MAINTENANCE_ACTION: &str =
    "Keep the current contextual linking and review it when the content changes";

/// How urgent the linking gap is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    None,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of findings, declared in reporting precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    BrokenPage,
    ExternalImbalance,
    DuplicateLinks,
    OverLinking,
    PrimaryGap,
    CategoryGap,
    ContentExpansion,
}

/// One problem found on the page and what to do about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub issue: String,
    pub action: String,
}

/// Scored linking opportunity for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityAssessment {
    pub score: u32,
    pub severity: Severity,
    pub recommended_link_count: usize,
    pub current_link_count: usize,
    /// Ideal minus current contextual links, never negative
    pub gap_size: usize,
    pub density_percent: f64,
    pub external_balance: ExternalBalance,
    /// Factors that contributed points, in evaluation order
    pub breakdown: Vec<(String, u32)>,
    /// Findings in precedence order, at most three
    pub findings: Vec<Finding>,
}

impl OpportunityAssessment {
    /// Issue texts of the reported findings
    pub fn opportunities(&self) -> Vec<&str> {
        self.findings.iter().map(|f| f.issue.as_str()).collect()
    }

    /// Recommended actions of the reported findings, or a maintenance action
    pub fn recommendations(&self) -> Vec<&str> {
        if self.findings.is_empty() {
            return vec![MAINTENANCE_ACTION];
        }
        self.findings.iter().map(|f| f.action.as_str()).collect()
    }

    /// The most important issue, or a note that nothing was found
    pub fn top_issue(&self) -> &str {
        self.findings
            .first()
            .map(|f| f.issue.as_str())
            .unwrap_or(NO_ISSUE)
    }

    /// Sum of breakdown points before clamping
    pub fn raw_points(&self) -> u32 {
        self.breakdown.iter().map(|(_, points)| points).sum()
    }
}

/// Ideal contextual link count: one per `target` words, at least one
pub fn ideal_links(word_count: usize, target: usize) -> usize {
    (word_count / target.max(1)).max(1)
}

/// Contextual links per hundred words
pub fn density_percent(contextual_count: usize, word_count: usize) -> f64 {
    if word_count == 0 {
        return 0.0;
    }
    100.0 * contextual_count as f64 / word_count as f64
}

/// Points added for URLs deeper than three levels
pub fn depth_penalty(url_depth: usize) -> u32 {
    if url_depth <= DEPTH_FREE_LEVELS {
        return 0;
    }
    let extra = (url_depth - DEPTH_FREE_LEVELS) as u32;
    (extra.saturating_mul(DEPTH_POINTS_PER_LEVEL)).min(DEPTH_POINTS_CAP)
}

fn external_finding(balance: ExternalBalance, link_set: &LinkSet) -> Option<Finding> {
    match balance {
        ExternalBalance::Balanced => None,
        ExternalBalance::HighExternalRatio => Some(Finding {
            kind: FindingKind::ExternalImbalance,
            issue: format!(
                "External links outnumber contextual links ({} external vs {} contextual)",
                link_set.external_count,
                link_set.contextual_count()
            ),
            action: "Balance outbound links with internal links to related pages".to_string(),
        }),
        ExternalBalance::ExternalOnly => Some(Finding {
            kind: FindingKind::ExternalImbalance,
            issue: format!(
                "Page links out {} times but has no contextual internal links",
                link_set.external_count
            ),
            action: "Add internal links next to the external references".to_string(),
        }),
    }
}

fn content_expansion_finding(content: &PageContent, config: &ScoringConfig) -> Finding {
    Finding {
        kind: FindingKind::ContentExpansion,
        issue: format!("Thin content ({} words)", content.word_count),
        action: format!(
            "Expand the content to at least {} words to support more contextual links",
            config.thin_content_threshold
        ),
    }
}

fn finalize(
    mut findings: Vec<Finding>,
    breakdown: Vec<(String, u32)>,
    score: u32,
    severity: Severity,
    recommended_link_count: usize,
    link_set: &LinkSet,
    density: f64,
    external_balance: ExternalBalance,
) -> OpportunityAssessment {
    findings.sort_by_key(|f| f.kind);
    findings.truncate(MAX_RECOMMENDATIONS);
    let current_link_count = link_set.contextual_count();

    OpportunityAssessment {
        score: score.min(100),
        severity,
        recommended_link_count,
        current_link_count,
        gap_size: recommended_link_count.saturating_sub(current_link_count),
        density_percent: density,
        external_balance,
        breakdown,
        findings,
    }
}

/// Score the linking opportunity of a page
pub fn score(
    link_set: &LinkSet,
    content: &PageContent,
    category: PageCategory,
    url_depth: usize,
    config: &ScoringConfig,
) -> OpportunityAssessment {
    let contextual = link_set.contextual_count();
    let words = content.word_count;
    let density = density_percent(contextual, words);
    let external_balance = link_set.external_balance(config.external_warning_ratio);
    let mut findings: Vec<Finding> = external_finding(external_balance, link_set)
        .into_iter()
        .collect();

    if words < BROKEN_PAGE_WORDS {
        ::log::debug!("Page has {} words, scoring as broken", words);
        findings.push(Finding {
            kind: FindingKind::BrokenPage,
            issue: format!("Broken or empty page ({words} words of content)"),
            action: "Restore the page content before working on links".to_string(),
        });
        return finalize(
            findings,
            vec![("broken or empty page".to_string(), BROKEN_PAGE_SCORE)],
            BROKEN_PAGE_SCORE,
            Severity::Critical,
            1,
            link_set,
            density,
            external_balance,
        );
    }

    if words < config.min_words_for_links {
        ::log::debug!("Page has {} words, below the linking floor", words);
        findings.push(content_expansion_finding(content, config));
        return finalize(
            findings,
            vec![(
                "insufficient content for linking".to_string(),
                INSUFFICIENT_CONTENT_SCORE,
            )],
            INSUFFICIENT_CONTENT_SCORE,
            Severity::Medium,
            1,
            link_set,
            density,
            external_balance,
        );
    }

    let ideal = ideal_links(words, config.contextual_link_target);
    let mut breakdown: Vec<(String, u32)> = Vec::new();
    let mut severity = Severity::None;
    let mut primary_gap_reported = false;

    // Gap severity
    if contextual == 0 {
        breakdown.push(("no contextual links".to_string(), ZERO_LINK_POINTS));
        severity = Severity::Critical;
        primary_gap_reported = true;
        findings.push(Finding {
            kind: FindingKind::PrimaryGap,
            issue: format!("No contextual internal links in {words} words of content"),
            action: format!("Add {ideal} contextual links to related pages within the body text"),
        });
    } else if contextual < ideal {
        let deficit = ideal - contextual;
        let points = (deficit as u32)
            .saturating_mul(DEFICIT_POINTS_PER_LINK)
            .min(DEFICIT_POINTS_CAP);
        breakdown.push((format!("contextual link deficit of {deficit}"), points));
        severity = if deficit >= 3 {
            Severity::High
        } else {
            Severity::Medium
        };
        primary_gap_reported = true;
        findings.push(Finding {
            kind: FindingKind::PrimaryGap,
            issue: format!("{contextual} contextual links where {ideal} are expected"),
            action: format!("Add {deficit} more contextual links in the body text"),
        });
    }

    // Density imbalance; a density cannot be both too low and too high
    if density < config.min_contextual_density {
        breakdown.push((
            format!(
                "density {:.2}% below {:.2}%",
                density, config.min_contextual_density
            ),
            LOW_DENSITY_POINTS,
        ));
        if !primary_gap_reported {
            findings.push(Finding {
                kind: FindingKind::PrimaryGap,
                issue: format!(
                    "Contextual link density {:.2}% is below {:.2}%",
                    density, config.min_contextual_density
                ),
                action: "Link key terms in the body to their dedicated pages".to_string(),
            });
        }
    } else if density > config.max_contextual_density {
        breakdown.push((
            format!(
                "density {:.2}% above {:.2}%",
                density, config.max_contextual_density
            ),
            HIGH_DENSITY_POINTS,
        ));
        findings.push(Finding {
            kind: FindingKind::OverLinking,
            issue: format!(
                "Over-linked: contextual link density {:.2}% exceeds {:.2}%",
                density, config.max_contextual_density
            ),
            action: "Remove low-value links so the important ones stand out".to_string(),
        });
    }

    // Category minimum
    let category_min = category.min_contextual_links();
    if contextual < category_min {
        breakdown.push((
            format!("{category} expects at least {category_min} links"),
            category.weight(),
        ));
        findings.push(Finding {
            kind: FindingKind::CategoryGap,
            issue: format!(
                "{category} pages should carry at least {category_min} contextual links"
            ),
            action: format!(
                "Link this {category} page to at least {} more relevant pages",
                category_min - contextual
            ),
        });
    }

    // Duplicate targets
    let unique_ratio = link_set.unique_ratio();
    if contextual > DUPLICATE_MIN_LINKS && unique_ratio < DUPLICATE_MIN_UNIQUE_RATIO {
        breakdown.push((
            format!("duplicate targets ({:.0}% unique)", unique_ratio * 100.0),
            DUPLICATE_POINTS,
        ));
        findings.push(Finding {
            kind: FindingKind::DuplicateLinks,
            issue: format!(
                "Repeated link targets: {} unique of {} contextual links",
                link_set.unique_contextual_count(),
                contextual
            ),
            action: "Point repeated links at different related pages".to_string(),
        });
    }

    // URL depth
    let depth_points = depth_penalty(url_depth);
    if depth_points > 0 {
        breakdown.push((format!("URL depth {url_depth}"), depth_points));
    }

    if content.quality == ContentQuality::Thin {
        findings.push(content_expansion_finding(content, config));
    }

    let total: u32 = breakdown.iter().map(|(_, points)| points).sum();
    ::log::debug!(
        "Opportunity score {} ({} factors, severity {})",
        total.min(100),
        breakdown.len(),
        severity
    );

    finalize(
        findings,
        breakdown,
        total,
        severity,
        ideal,
        link_set,
        density,
        external_balance,
    )
}
