// ── TabPilot Engine: Similarity & Keyword Utilities ────────────────────────
//
// Pure text-feature helpers shared by the knowledge graph and the grouping
// heuristics: keyword extraction, TF-IDF vectors, cosine similarity, and
// keyword Jaccard overlap.
//
// Contract: every function here is total and deterministic. Malformed URLs
// contribute nothing instead of failing; zero vectors and mismatched
// lengths score 0, never divide by zero.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::atoms::constants::{MAX_KEYWORDS_PER_TAB, MIN_KEYWORD_LEN};
use crate::atoms::types::Tab;

/// Tokens that carry no grouping signal. Not exhaustive; short tokens are
/// already dropped by the length filter before this set is consulted.
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "about", "after", "again", "also", "because", "been", "before", "being", "best",
        "between", "both", "could", "does", "doing", "down", "each", "every", "from", "google",
        "have", "here", "home", "html", "http", "https", "index", "into", "just", "like",
        "login", "main", "more", "most", "much", "news", "only", "other", "over", "page",
        "param", "query", "search", "should", "site", "some", "such", "than", "that", "their",
        "them", "then", "there", "these", "they", "this", "using", "very", "view", "what",
        "when", "where", "which", "while", "will", "with", "would", "your",
    ]
    .into_iter()
    .collect()
});

fn is_keyword(token: &str) -> bool {
    token.len() >= MIN_KEYWORD_LEN && !STOP_WORDS.contains(token)
}

/// Extract deduplicated keywords for a tab: title words, URL path segments,
/// and domain labels (minus `www`), all lower-cased and filtered through
/// the same length + stop-word gate. Order of first appearance is kept so
/// downstream truncation is deterministic.
pub fn extract_keywords(tab: &Tab) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keywords: Vec<String> = Vec::new();

    let mut push = |token: &str| {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if is_keyword(&token) && seen.insert(token.clone()) {
            keywords.push(token);
        }
    };

    for word in tab.title.split_whitespace() {
        push(word);
    }

    // Unparseable URLs contribute nothing.
    if let Ok(parsed) = url::Url::parse(&tab.url) {
        if let Some(segments) = parsed.path_segments() {
            for segment in segments {
                push(segment);
            }
        }
    }

    for label in tab.domain.split('.') {
        if label != "www" {
            push(label);
        }
    }

    keywords
}

// ── Document frequencies ───────────────────────────────────────────────────

/// Running document-frequency table over the current tab set. One "document"
/// is one tab's deduplicated keyword list, so each tab counts a term at most
/// once. Supports incremental add/remove so the graph can avoid full
/// rebuilds on single tab changes.
#[derive(Debug, Clone, Default)]
pub struct DocFrequency {
    counts: HashMap<String, u32>,
    total_docs: u32,
}

impl DocFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_docs(&self) -> u32 {
        self.total_docs
    }

    /// Register one tab's keyword list. Callers pass the deduplicated
    /// output of [`extract_keywords`].
    pub fn add_doc(&mut self, keywords: &[String]) {
        self.total_docs += 1;
        for kw in keywords {
            *self.counts.entry(kw.clone()).or_insert(0) += 1;
        }
    }

    /// Unregister a tab's keyword list. Saturating: removing a doc that was
    /// never added cannot underflow the table.
    pub fn remove_doc(&mut self, keywords: &[String]) {
        self.total_docs = self.total_docs.saturating_sub(1);
        for kw in keywords {
            if let Some(count) = self.counts.get_mut(kw) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.counts.remove(kw);
                }
            }
        }
    }

    /// Inverse document frequency: ln(totalDocs / df). Unknown terms are
    /// treated as df=1 so the result stays finite.
    pub fn idf(&self, term: &str) -> f32 {
        if self.total_docs == 0 {
            return 0.0;
        }
        let df = self.counts.get(term).copied().unwrap_or(1).max(1);
        (self.total_docs as f32 / df as f32).ln()
    }
}

// ── Vectors ────────────────────────────────────────────────────────────────

/// TF-IDF vector over the first 50 distinct keywords, L2-normalized.
/// Each component is (term frequency in `keywords`) × idf(term). Returns a
/// zero-filled vector when the norm is zero (single-tab corpora and empty
/// keyword lists both land here).
pub fn tfidf_vector(keywords: &[String], df: &DocFrequency) -> Vec<f32> {
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut tf: HashMap<&str, u32> = HashMap::new();
    for kw in keywords {
        *tf.entry(kw.as_str()).or_insert(0) += 1;
    }

    let mut distinct: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for kw in keywords {
        if seen.insert(kw.as_str()) {
            distinct.push(kw.as_str());
            if distinct.len() >= MAX_KEYWORDS_PER_TAB {
                break;
            }
        }
    }

    let mut vector: Vec<f32> = distinct
        .iter()
        .map(|term| tf.get(term).copied().unwrap_or(0) as f32 * df.idf(term))
        .collect();

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    } else {
        vector.iter_mut().for_each(|v| *v = 0.0);
    }
    vector
}

/// Cosine similarity between two vectors. Total: mismatched lengths and
/// zero-magnitude vectors score 0.0 rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Jaccard index over two keyword lists. Empty-vs-empty scores 0.0 — no
/// evidence is not similarity.
pub fn keyword_overlap(a: &[String], b: &[String]) -> f32 {
    let a_set: HashSet<&str> = a.iter().map(|s| s.as_str()).collect();
    let b_set: HashSet<&str> = b.iter().map(|s| s.as_str()).collect();
    let union = a_set.union(&b_set).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a_set.intersection(&b_set).count();
    intersection as f32 / union as f32
}
