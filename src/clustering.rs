//! Greedy threshold clustering of pages by embedding similarity.
//!
//! Clusters are rebuilt from scratch for every analysis. Pages are taken
//! in input order and join the lowest-id cluster holding any member whose
//! similarity exceeds the threshold; otherwise they seed a new cluster.

use crate::embeddings::Embedding;
use crate::error::Result;
use crate::parsers::text;
use crate::similarity::cosine_similarity;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Reported as the topic when a page fits no cluster
pub const UNCLUSTERED: &str = "UNCLUSTERED";

const FALLBACK_TOPIC: &str = "general";
const TOPIC_WORDS: usize = 2;

/// A page taking part in clustering
#[derive(Debug, Clone)]
pub struct ClusterPage {
    pub url: String,
    pub title: Option<String>,
    pub embedding: Embedding,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    /// Creation order, starting at 0
    pub id: usize,
    pub topic: String,
    pub members: Vec<ClusterPage>,
    /// Member most similar to the rest of the cluster
    pub authority_page: Option<String>,
}

impl Cluster {
    /// Whether any member is more similar than `threshold` to `embedding`
    fn accepts(&self, embedding: &[f32], threshold: f64) -> Result<bool> {
        for member in &self.members {
            if cosine_similarity(embedding, &member.embedding)? > threshold {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.members.iter().any(|m| m.url == url)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Where the page under analysis landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterAssignment {
    Member { cluster_id: usize, topic: String },
    Unclustered,
}

impl ClusterAssignment {
    pub fn topic(&self) -> &str {
        match self {
            ClusterAssignment::Member { topic, .. } => topic,
            ClusterAssignment::Unclustered => UNCLUSTERED,
        }
    }

    pub fn cluster_id(&self) -> Option<usize> {
        match self {
            ClusterAssignment::Member { cluster_id, .. } => Some(*cluster_id),
            ClusterAssignment::Unclustered => None,
        }
    }
}

/// Group pages into clusters
pub fn build_clusters(pages: Vec<ClusterPage>, threshold: f64) -> Result<Vec<Cluster>> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for page in pages {
        let mut target = None;
        for cluster in &clusters {
            if cluster.accepts(&page.embedding, threshold)? {
                target = Some(cluster.id);
                break;
            }
        }
        match target {
            Some(id) => clusters[id].members.push(page),
            None => {
                let id = clusters.len();
                clusters.push(Cluster {
                    id,
                    topic: String::new(),
                    members: vec![page],
                    authority_page: None,
                });
            }
        }
    }

    for cluster in &mut clusters {
        cluster.topic = cluster_topic(&cluster.members);
        cluster.authority_page = authority_page(&cluster.members)?;
        ::log::debug!(
            "Cluster {} '{}' has {} members",
            cluster.id,
            cluster.topic,
            cluster.members.len()
        );
    }
    Ok(clusters)
}

/// Assign an embedding to the first cluster that accepts it
pub fn assign(
    embedding: &[f32],
    clusters: &[Cluster],
    threshold: f64,
) -> Result<ClusterAssignment> {
    for cluster in clusters {
        if cluster.accepts(embedding, threshold)? {
            return Ok(ClusterAssignment::Member {
                cluster_id: cluster.id,
                topic: cluster.topic.clone(),
            });
        }
    }
    Ok(ClusterAssignment::Unclustered)
}

/// Most frequent significant title words, or the seed URL's last segment
pub fn cluster_topic(members: &[ClusterPage]) -> String {
    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for title in members.iter().filter_map(|m| m.title.as_deref()) {
        for (term, count) in text::term_frequencies(title) {
            *frequencies.entry(term).or_insert(0) += count;
        }
    }

    let words: Vec<String> = text::rank_terms(frequencies)
        .into_iter()
        .take(TOPIC_WORDS)
        .map(|(term, _)| term)
        .collect();
    if !words.is_empty() {
        return words.join(" ");
    }

    members
        .first()
        .and_then(|seed| last_path_segment(&seed.url))
        .unwrap_or_else(|| FALLBACK_TOPIC.to_string())
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let readable = segment.replace(['-', '_'], " ").to_lowercase();
    let readable = text::normalize_whitespace(&readable);
    (!readable.is_empty()).then_some(readable)
}

/// Member with the highest mean similarity to the other members
pub fn authority_page(members: &[ClusterPage]) -> Result<Option<String>> {
    if members.len() < 2 {
        return Ok(None);
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, member) in members.iter().enumerate() {
        let mut total = 0.0;
        for (j, other) in members.iter().enumerate() {
            if i != j {
                total += cosine_similarity(&member.embedding, &other.embedding)?;
            }
        }
        let mean = total / (members.len() - 1) as f64;
        if best.is_none_or(|(_, best_mean)| mean > best_mean) {
            best = Some((i, mean));
        }
    }
    Ok(best.map(|(i, _)| members[i].url.clone()))
}

/// Terms shared by at least two peer texts but absent from the current text
///
/// Ranked by the number of peers using them, then alphabetically.
pub fn content_gaps(current_text: &str, peer_texts: &[&str], limit: usize) -> Vec<String> {
    let present: HashSet<String> = text::significant_terms(current_text).into_iter().collect();

    let mut document_frequency: HashMap<String, usize> = HashMap::new();
    for peer in peer_texts {
        let terms: HashSet<String> = text::significant_terms(peer).into_iter().collect();
        for term in terms {
            if !present.contains(&term) {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }
    }
    document_frequency.retain(|_, peers| *peers >= 2);

    text::rank_terms(document_frequency)
        .into_iter()
        .take(limit)
        .map(|(term, _)| term)
        .collect()
}
