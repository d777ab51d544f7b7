// ── TabPilot Atoms: Knowledge Graph Types ──────────────────────────────────
//
// Type definitions for the tab knowledge graph and the temporal pattern
// miner. These are pure data types (no logic beyond clamps and label
// conversion, no I/O).
//
// Follows the project pattern: structs in atoms/, impls in engine/.
// The graph itself is an arena of nodes plus adjacency lists of edge
// indices — edges refer to nodes by arena index, never by reference, so
// there are no ownership cycles to manage.

use serde::{Deserialize, Serialize};

use crate::atoms::constants::PATTERN_CONFIDENCE_DIVISOR;

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 1: Nodes
// ═══════════════════════════════════════════════════════════════════════════

/// Coarse activity classification for a tab, inferred from its keywords
/// and domain. Drives cluster reason strings and pattern context labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseContext {
    Work,
    Research,
    Shopping,
    Social,
    Entertainment,
    Other,
}

impl Default for BrowseContext {
    fn default() -> Self {
        BrowseContext::Other
    }
}

impl std::fmt::Display for BrowseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowseContext::Work => write!(f, "work"),
            BrowseContext::Research => write!(f, "research"),
            BrowseContext::Shopping => write!(f, "shopping"),
            BrowseContext::Social => write!(f, "social"),
            BrowseContext::Entertainment => write!(f, "entertainment"),
            BrowseContext::Other => write!(f, "other"),
        }
    }
}

/// One node in the knowledge graph — the analyzed form of a single tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Tab id this node was built from.
    pub id: String,
    pub title: String,
    pub domain: String,
    /// Deduplicated keywords from title, URL path, and domain labels.
    pub keywords: Vec<String>,
    /// TF-IDF vector over this node's own keywords, L2-normalized,
    /// at most 50 dimensions. Empty when the tab yields no keywords.
    pub embedding: Vec<f32>,
    pub context: BrowseContext,
    /// How many history events referenced this tab.
    pub visit_count: u32,
    /// Timestamp of the most recent event for this tab, ms. Zero when the
    /// tab never appears in history.
    pub last_visited_ms: i64,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 2: Edges
// ═══════════════════════════════════════════════════════════════════════════

/// Why an edge exists. A pair of nodes may carry up to one edge per
/// reason — a temporal co-occurrence strengthens the existing temporal
/// edge instead of overwriting a semantic or domain edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeReason {
    /// Keyword / embedding similarity above threshold.
    Semantic,
    /// Identical domain.
    Domain,
    /// Co-occurrence within a browsing session.
    Temporal,
}

impl std::fmt::Display for EdgeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeReason::Semantic => write!(f, "semantic"),
            EdgeReason::Domain => write!(f, "domain"),
            EdgeReason::Temporal => write!(f, "temporal"),
        }
    }
}

/// Directed weighted edge between two graph nodes, addressed by arena
/// index. Serialized exports translate indices back to tab ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Arena index of the source node.
    pub from: usize,
    /// Arena index of the target node.
    pub to: usize,
    /// Clamped to [0, 1].
    pub weight: f32,
    pub reason: EdgeReason,
    /// Clamped to [0, 1].
    pub confidence: f32,
    /// Session co-occurrence count; only meaningful for temporal edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_occurrence: Option<u32>,
}

impl GraphEdge {
    pub fn new(from: usize, to: usize, weight: f32, reason: EdgeReason, confidence: f32) -> Self {
        GraphEdge {
            from,
            to,
            weight: weight.clamp(0.0, 1.0),
            reason,
            confidence: confidence.clamp(0.0, 1.0),
            co_occurrence: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 3: Clusters
// ═══════════════════════════════════════════════════════════════════════════

/// A connected component of strongly-linked tabs, ready to present as a
/// grouping candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabCluster {
    /// Always ≥ 2 members.
    pub tab_ids: Vec<String>,
    /// Top-IDF keywords, shared domain, or "Related Tabs".
    pub label: String,
    /// Average intra-cluster edge weight × 1.2, capped at 1.
    pub confidence: f32,
    /// Human-readable grouping explanation.
    pub reason: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 4: Temporal Patterns
// ═══════════════════════════════════════════════════════════════════════════

/// Coarse time-of-day bucket. Boundaries: morning starts at 05:00,
/// afternoon at 12:00, evening at 17:00, night at 22:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    /// Bucket a local hour (0–23).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=16 => DayPart::Afternoon,
            17..=21 => DayPart::Evening,
            _ => DayPart::Night,
        }
    }
}

impl std::fmt::Display for DayPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayPart::Morning => write!(f, "morning"),
            DayPart::Afternoon => write!(f, "afternoon"),
            DayPart::Evening => write!(f, "evening"),
            DayPart::Night => write!(f, "night"),
        }
    }
}

/// A recurring tab-open sequence mined from the event history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalPattern {
    /// Ordered tab ids, length 2–5.
    pub sequence: Vec<String>,
    /// Occurrence count across sessions; always ≥ the miner's min support.
    pub frequency: u32,
    /// Mean gap between consecutive events inside the sequence, ms.
    pub avg_gap_ms: i64,
    /// min(1, frequency / 10).
    pub confidence: f32,
    /// Most frequent time-of-day bucket among contributing sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<DayPart>,
}

impl TemporalPattern {
    /// Confidence grows linearly with frequency and saturates at 1.
    pub fn confidence_for(frequency: u32) -> f32 {
        (frequency as f32 / PATTERN_CONFIDENCE_DIVISOR).min(1.0)
    }
}

/// What a workflow-recovery suggestion asks the shell to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryKind {
    /// Next tab in a matched pattern is still open — switch to it.
    Continuation,
    /// Next tab was closed — restore the full sequence.
    Restoration,
    /// Pattern habitually runs at this time of day.
    TimeOfDay,
}

/// One workflow-recovery suggestion derived from mined patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverySuggestion {
    pub kind: RecoveryKind,
    pub tab_ids: Vec<String>,
    pub confidence: f32,
    pub description: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 5: Export & Stats
// ═══════════════════════════════════════════════════════════════════════════

/// An edge in export form — indices resolved to tab ids so the data
/// survives independent of arena layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedEdge {
    pub from_id: String,
    pub to_id: String,
    pub weight: f32,
    pub reason: EdgeReason,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_occurrence: Option<u32>,
}

/// Plain-data snapshot of a built graph, for persistence by the shell.
/// No fixed binary format; serialize with whatever the shell prefers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<ExportedEdge>,
    pub clusters: Vec<TabCluster>,
    pub patterns: Vec<TemporalPattern>,
    pub built_at_ms: i64,
}

/// Aggregate counts for diagnostics surfaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub cluster_count: usize,
    pub pattern_count: usize,
    pub avg_edge_weight: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_part_boundaries() {
        assert_eq!(DayPart::from_hour(4), DayPart::Night);
        assert_eq!(DayPart::from_hour(5), DayPart::Morning);
        assert_eq!(DayPart::from_hour(11), DayPart::Morning);
        assert_eq!(DayPart::from_hour(12), DayPart::Afternoon);
        assert_eq!(DayPart::from_hour(16), DayPart::Afternoon);
        assert_eq!(DayPart::from_hour(17), DayPart::Evening);
        assert_eq!(DayPart::from_hour(21), DayPart::Evening);
        assert_eq!(DayPart::from_hour(22), DayPart::Night);
        assert_eq!(DayPart::from_hour(0), DayPart::Night);
    }

    #[test]
    fn test_pattern_confidence_saturates() {
        assert!((TemporalPattern::confidence_for(3) - 0.3).abs() < 1e-6);
        assert!((TemporalPattern::confidence_for(10) - 1.0).abs() < 1e-6);
        assert!((TemporalPattern::confidence_for(25) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_edge_new_clamps() {
        let e = GraphEdge::new(0, 1, 1.7, EdgeReason::Temporal, -0.2);
        assert!((e.weight - 1.0).abs() < 1e-6);
        assert!((e.confidence - 0.0).abs() < 1e-6);
    }
}
