// ── TabPilot Engine: Knowledge Graph ───────────────────────────────────────
//
// Builds and maintains the tab knowledge graph: one node per open tab,
// weighted directed edges for semantic similarity, shared domain, and
// session co-occurrence, plus derived clusters and mined temporal patterns.
//
// Representation: nodes live in an arena (`Vec<GraphNode>`) addressed by
// index, with a tab-id → index map and per-node adjacency lists of edge
// indices. Edges never hold references to nodes, so removal is a swap +
// remap with no ownership gymnastics.
//
// Lifecycle: Empty → Built → stale on any tab-set or history change →
// rebuilt (fully via `build`, or incrementally via `add_node`/`remove_node`
// which must agree with a full rebuild on the same inputs).

pub mod cache;
pub mod clusters;
pub mod context;

use std::collections::HashMap;

use log::{debug, info};

use crate::atoms::constants::{
    DOMAIN_EDGE_WEIGHT, GRAPH_SESSION_GAP_MS, SEMANTIC_EDGE_THRESHOLD, TEMPORAL_EDGE_BASE_WEIGHT,
    TEMPORAL_EDGE_STEP,
};
use crate::atoms::graph_types::{
    EdgeReason, ExportedEdge, GraphEdge, GraphExport, GraphNode, GraphStats, TabCluster,
    TemporalPattern,
};
use crate::atoms::types::{MinerConfig, Tab, TabEvent};
use crate::engine::events::split_sessions;
use crate::engine::patterns::mine_frequent_sequences;
use crate::engine::similarity::{
    cosine_similarity, extract_keywords, keyword_overlap, tfidf_vector, DocFrequency,
};

/// In-memory knowledge graph over the current tab set. Cheap to clone:
/// snapshots handed out by the cache are copy-on-write.
#[derive(Debug, Clone, Default)]
pub struct TabGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    /// Edge indices leaving / entering each node, parallel to `nodes`.
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    df: DocFrequency,
    clusters: Vec<TabCluster>,
    patterns: Vec<TemporalPattern>,
    built_at_ms: i64,
}

impl TabGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full rebuild: recompute document frequencies, one node per tab,
    /// all-pairs semantic + domain edges, session-derived temporal edges,
    /// mined patterns, and clusters. Duplicate tab ids collapse to the
    /// last occurrence so the node set always equals the input id set.
    pub fn build(tabs: &[Tab], history: &[TabEvent], miner: &MinerConfig) -> Self {
        let start = std::time::Instant::now();
        let mut graph = TabGraph::new();

        let mut ordered: Vec<&Tab> = Vec::new();
        let mut slot: HashMap<&str, usize> = HashMap::new();
        for tab in tabs {
            match slot.get(tab.id.as_str()) {
                Some(&i) => ordered[i] = tab,
                None => {
                    slot.insert(tab.id.as_str(), ordered.len());
                    ordered.push(tab);
                }
            }
        }

        for tab in &ordered {
            graph.insert_node(tab, history);
        }
        graph.refresh_embeddings();

        for from in 0..graph.nodes.len() {
            for to in (from + 1)..graph.nodes.len() {
                graph.connect_pair(from, to);
            }
        }

        graph.apply_temporal_edges(history, None);
        graph.patterns = mine_frequent_sequences(history, miner);
        graph.recompute_clusters();
        graph.built_at_ms = chrono::Utc::now().timestamp_millis();

        info!(
            "[graph] built: {} nodes, {} edges, {} clusters, {} patterns in {}ms",
            graph.nodes.len(),
            graph.edges.len(),
            graph.clusters.len(),
            graph.patterns.len(),
            start.elapsed().as_millis()
        );
        graph
    }

    // ── Incremental updates ────────────────────────────────────────────

    /// Add (or replace) a single tab without paying the O(n²) rebuild:
    /// only edges touching the new node are computed. Embeddings are
    /// refreshed everywhere because document frequencies shifted, which
    /// keeps incremental state identical to a full rebuild.
    pub fn add_node(&mut self, tab: &Tab, history: &[TabEvent], miner: &MinerConfig) {
        if self.index.contains_key(&tab.id) {
            self.remove_node(&tab.id, history, miner);
        }
        let new_idx = self.insert_node(tab, history);
        self.refresh_embeddings();

        for other in 0..self.nodes.len() {
            if other != new_idx {
                let (a, b) = (other.min(new_idx), other.max(new_idx));
                self.connect_pair(a, b);
            }
        }

        self.apply_temporal_edges(history, Some(new_idx));
        self.patterns = mine_frequent_sequences(history, miner);
        self.recompute_clusters();
        debug!("[graph] added node for tab {}", tab.id);
    }

    /// Remove a tab's node and every edge touching it.
    pub fn remove_node(&mut self, tab_id: &str, history: &[TabEvent], miner: &MinerConfig) {
        let Some(&victim) = self.index.get(tab_id) else {
            return;
        };
        let last = self.nodes.len() - 1;

        self.df.remove_doc(&self.nodes[victim].keywords);
        self.edges.retain(|e| e.from != victim && e.to != victim);
        // The node that swap_remove moves into `victim`'s slot keeps its
        // edges; remap their endpoints.
        for e in self.edges.iter_mut() {
            if e.from == last {
                e.from = victim;
            }
            if e.to == last {
                e.to = victim;
            }
        }

        let removed = self.nodes.swap_remove(victim);
        self.index.remove(&removed.id);
        if victim < self.nodes.len() {
            self.index.insert(self.nodes[victim].id.clone(), victim);
        }

        self.rebuild_adjacency();
        self.refresh_embeddings();
        self.patterns = mine_frequent_sequences(history, miner);
        self.recompute_clusters();
        debug!("[graph] removed node for tab {}", tab_id);
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, tab_id: &str) -> Option<&GraphNode> {
        self.index.get(tab_id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn patterns(&self) -> &[TemporalPattern] {
        &self.patterns
    }

    pub fn clusters(&self) -> &[TabCluster] {
        &self.clusters
    }

    /// Clusters with at least `min_size` members, strongest first.
    pub fn suggested_groups(&self, min_size: usize) -> Vec<TabCluster> {
        self.clusters.iter().filter(|c| c.tab_ids.len() >= min_size).cloned().collect()
    }

    /// Other tabs ranked by semantic closeness to `tab_id`: the stronger
    /// of keyword overlap and embedding cosine. Zero-scoring tabs are
    /// dropped.
    pub fn related_tabs(&self, tab_id: &str, limit: usize) -> Vec<(String, f32)> {
        let Some(&idx) = self.index.get(tab_id) else {
            return Vec::new();
        };
        let anchor = &self.nodes[idx];
        let mut scored: Vec<(String, f32)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, n)| {
                let overlap = keyword_overlap(&anchor.keywords, &n.keywords);
                let cosine = cosine_similarity(&anchor.embedding, &n.embedding);
                (n.id.clone(), overlap.max(cosine))
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    pub fn stats(&self) -> GraphStats {
        let avg = if self.edges.is_empty() {
            0.0
        } else {
            self.edges.iter().map(|e| e.weight).sum::<f32>() / self.edges.len() as f32
        };
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            cluster_count: self.clusters.len(),
            pattern_count: self.patterns.len(),
            avg_edge_weight: avg,
        }
    }

    /// Plain-data snapshot with edge endpoints resolved to tab ids.
    pub fn export(&self) -> GraphExport {
        let edges = self
            .edges
            .iter()
            .map(|e| ExportedEdge {
                from_id: self.nodes[e.from].id.clone(),
                to_id: self.nodes[e.to].id.clone(),
                weight: e.weight,
                reason: e.reason,
                confidence: e.confidence,
                co_occurrence: e.co_occurrence,
            })
            .collect();
        GraphExport {
            nodes: self.nodes.clone(),
            edges,
            clusters: self.clusters.clone(),
            patterns: self.patterns.clone(),
            built_at_ms: self.built_at_ms,
        }
    }

    /// Rename the cluster whose member set matches `tab_ids`. Returns
    /// false when no cluster matches. Used by deferred group naming.
    pub fn relabel_cluster(&mut self, tab_ids: &[String], label: &str) -> bool {
        let mut wanted: Vec<&String> = tab_ids.iter().collect();
        wanted.sort();
        for cluster in self.clusters.iter_mut() {
            let mut members: Vec<&String> = cluster.tab_ids.iter().collect();
            members.sort();
            if members == wanted {
                cluster.label = label.to_string();
                return true;
            }
        }
        false
    }

    // ── Construction internals ─────────────────────────────────────────

    fn insert_node(&mut self, tab: &Tab, history: &[TabEvent]) -> usize {
        let keywords = extract_keywords(tab);
        self.df.add_doc(&keywords);

        let mut visit_count = 0u32;
        let mut last_visited_ms = 0i64;
        for event in history {
            if event.tab_id == tab.id {
                visit_count += 1;
                last_visited_ms = last_visited_ms.max(event.timestamp_ms);
            }
        }

        let context = context::classify_context(&keywords, &tab.domain);
        let idx = self.nodes.len();
        self.nodes.push(GraphNode {
            id: tab.id.clone(),
            title: tab.title.clone(),
            domain: tab.domain.clone(),
            keywords,
            embedding: Vec::new(),
            context,
            visit_count,
            last_visited_ms,
        });
        self.index.insert(tab.id.clone(), idx);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        idx
    }

    /// Recompute every node's TF-IDF vector against the current document
    /// frequencies. Called after any change to the tab set.
    fn refresh_embeddings(&mut self) {
        for node in self.nodes.iter_mut() {
            node.embedding = tfidf_vector(&node.keywords, &self.df);
        }
    }

    /// Semantic and domain edges for one ordered pair. Keyword overlap
    /// above the similarity threshold creates a semantic edge; identical
    /// non-empty domains always create the fixed-weight domain edge,
    /// threshold or not.
    fn connect_pair(&mut self, from: usize, to: usize) {
        let overlap = keyword_overlap(&self.nodes[from].keywords, &self.nodes[to].keywords);
        if overlap > SEMANTIC_EDGE_THRESHOLD {
            self.push_edge(GraphEdge::new(from, to, overlap, EdgeReason::Semantic, overlap));
        }
        let (da, db) = (&self.nodes[from].domain, &self.nodes[to].domain);
        if !da.is_empty() && da == db {
            self.push_edge(GraphEdge::new(from, to, DOMAIN_EDGE_WEIGHT, EdgeReason::Domain, 1.0));
        }
    }

    /// Derive temporal edges from session co-occurrence. Within each
    /// session every pair of distinct tabs gets a temporal edge, or
    /// strengthens the existing one. `touching` restricts the work to
    /// pairs involving one node (incremental updates).
    fn apply_temporal_edges(&mut self, history: &[TabEvent], touching: Option<usize>) {
        for session in split_sessions(history, GRAPH_SESSION_GAP_MS) {
            let mut session_nodes: Vec<usize> = Vec::new();
            for event in &session {
                if let Some(&idx) = self.index.get(&event.tab_id) {
                    if !session_nodes.contains(&idx) {
                        session_nodes.push(idx);
                    }
                }
            }
            for i in 0..session_nodes.len() {
                for j in (i + 1)..session_nodes.len() {
                    let (from, to) = (session_nodes[i], session_nodes[j]);
                    if let Some(t) = touching {
                        if from != t && to != t {
                            continue;
                        }
                    }
                    self.strengthen_temporal(from, to);
                }
            }
        }
    }

    /// Existing temporal edge for (from, to) gains +0.1 weight (capped at
    /// 1) and a co-occurrence tick; otherwise a fresh one is created at
    /// the base weight. Semantic and domain edges between the same pair
    /// are left alone.
    fn strengthen_temporal(&mut self, from: usize, to: usize) {
        for &edge_idx in &self.outgoing[from] {
            let edge = &mut self.edges[edge_idx];
            if edge.to == to && edge.reason == EdgeReason::Temporal {
                edge.weight = (edge.weight + TEMPORAL_EDGE_STEP).min(1.0);
                edge.confidence = edge.weight;
                edge.co_occurrence = Some(edge.co_occurrence.unwrap_or(0) + 1);
                return;
            }
        }
        let mut edge = GraphEdge::new(
            from,
            to,
            TEMPORAL_EDGE_BASE_WEIGHT,
            EdgeReason::Temporal,
            TEMPORAL_EDGE_BASE_WEIGHT,
        );
        edge.co_occurrence = Some(1);
        self.push_edge(edge);
    }

    fn push_edge(&mut self, edge: GraphEdge) {
        let idx = self.edges.len();
        self.outgoing[edge.from].push(idx);
        self.incoming[edge.to].push(idx);
        self.edges.push(edge);
    }

    fn rebuild_adjacency(&mut self) {
        self.outgoing = vec![Vec::new(); self.nodes.len()];
        self.incoming = vec![Vec::new(); self.nodes.len()];
        for (idx, edge) in self.edges.iter().enumerate() {
            self.outgoing[edge.from].push(idx);
            self.incoming[edge.to].push(idx);
        }
    }

    fn recompute_clusters(&mut self) {
        self.clusters = clusters::detect_clusters(
            &self.nodes,
            &self.edges,
            &self.outgoing,
            &self.incoming,
            &self.df,
            &self.patterns,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{TabEventKind, TabEvent};

    fn tab(id: &str, title: &str, url: &str) -> Tab {
        Tab::new(id, title, url)
    }

    fn open(tab_id: &str, ts: i64) -> TabEvent {
        TabEvent::new(TabEventKind::Open, tab_id, ts)
    }

    fn miner() -> MinerConfig {
        MinerConfig::default()
    }

    /// Edge set in an arena-independent form, for comparing graphs.
    fn edge_signature(g: &TabGraph) -> Vec<(String, String, String, i32)> {
        let mut sig: Vec<(String, String, String, i32)> = g
            .edges()
            .iter()
            .map(|e| {
                (
                    g.nodes()[e.from].id.clone(),
                    g.nodes()[e.to].id.clone(),
                    e.reason.to_string(),
                    (e.weight * 10_000.0).round() as i32,
                )
            })
            .collect();
        sig.sort();
        sig
    }

    #[test]
    fn test_build_node_set_equals_tab_ids() {
        let tabs = vec![
            tab("1", "Rust Book", "https://doc.rust-lang.org/book"),
            tab("2", "Tokio Tutorial", "https://tokio.rs/tokio/tutorial"),
            tab("1", "Rust Book Updated", "https://doc.rust-lang.org/book/ch02"),
        ];
        let g = TabGraph::build(&tabs, &[], &miner());
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.node("1").map(|n| n.title.as_str()), Some("Rust Book Updated"));
    }

    #[test]
    fn test_empty_build_succeeds() {
        let g = TabGraph::build(&[], &[], &miner());
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.suggested_groups(2).is_empty());
        assert!(g.patterns().is_empty());
    }

    #[test]
    fn test_same_domain_pair_gets_fixed_weight_edge() {
        let tabs = vec![
            tab("1", "Pull requests", "https://github.com/rust-lang/cargo/pulls"),
            tab("2", "Issues", "https://github.com/tokio-rs/tokio/issues"),
            tab("3", "Weather", "https://unrelated.io/forecast"),
        ];
        let g = TabGraph::build(&tabs, &[], &miner());
        let domain_edges: Vec<_> =
            g.edges().iter().filter(|e| e.reason == EdgeReason::Domain).collect();
        assert_eq!(domain_edges.len(), 1);
        assert!((domain_edges[0].weight - DOMAIN_EDGE_WEIGHT).abs() < 1e-6);

        let groups = g.suggested_groups(2);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].tab_ids.len(), 2);
        assert!(groups[0].confidence >= 0.7);
    }

    #[test]
    fn test_shared_keywords_create_semantic_edge() {
        let tabs = vec![
            tab("1", "tokio async runtime scheduler", "https://a.example"),
            tab("2", "tokio async runtime internals", "https://b.example"),
            tab("3", "sourdough bread recipe", "https://c.example"),
        ];
        let g = TabGraph::build(&tabs, &[], &miner());
        let semantic: Vec<_> =
            g.edges().iter().filter(|e| e.reason == EdgeReason::Semantic).collect();
        assert_eq!(semantic.len(), 1);
        let e = semantic[0];
        let pair = (g.nodes()[e.from].id.as_str(), g.nodes()[e.to].id.as_str());
        assert_eq!(pair, ("1", "2"));
        assert!(e.weight > SEMANTIC_EDGE_THRESHOLD);
    }

    #[test]
    fn test_temporal_edge_strengthens_per_session_and_caps() {
        let tabs = vec![tab("a", "Alpha", "https://a.example"), tab("b", "Beta", "https://b.example")];
        // 10 sessions each containing both tabs, separated by > 30 min.
        let mut history = Vec::new();
        for s in 0..10i64 {
            let base = s * 60 * 60 * 1000;
            history.push(open("a", base));
            history.push(open("b", base + 1000));
        }
        let g = TabGraph::build(&tabs, &history, &miner());
        let temporal: Vec<_> =
            g.edges().iter().filter(|e| e.reason == EdgeReason::Temporal).collect();
        assert_eq!(temporal.len(), 1);
        // Base 0.3 + 9 × 0.1 = 1.2, capped at 1.0.
        assert!((temporal[0].weight - 1.0).abs() < 1e-6);
        assert_eq!(temporal[0].co_occurrence, Some(10));
    }

    #[test]
    fn test_temporal_edge_does_not_overwrite_domain_edge() {
        let tabs = vec![
            tab("1", "Feed", "https://news.example/feed"),
            tab("2", "Front page", "https://news.example/front"),
        ];
        let history = vec![open("1", 0), open("2", 1000)];
        let g = TabGraph::build(&tabs, &history, &miner());
        let reasons: Vec<EdgeReason> = g.edges().iter().map(|e| e.reason).collect();
        assert!(reasons.contains(&EdgeReason::Domain));
        assert!(reasons.contains(&EdgeReason::Temporal));
    }

    #[test]
    fn test_malformed_url_contributes_empty_not_error() {
        let tabs = vec![tab("1", "Broken", "not a url"), tab("2", "Fine", "https://ok.example")];
        let g = TabGraph::build(&tabs, &[], &miner());
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.node("1").map(|n| n.domain.as_str()), Some(""));
        // Empty domains never produce a domain edge.
        assert!(g.edges().iter().all(|e| e.reason != EdgeReason::Domain));
    }

    #[test]
    fn test_incremental_add_agrees_with_full_rebuild() {
        let t1 = tab("1", "github pull requests review", "https://github.com/org/repo/pulls");
        let t2 = tab("2", "github issues triage", "https://github.com/org/repo/issues");
        let t3 = tab("3", "tokio async tutorial", "https://tokio.rs/tokio/tutorial");
        let history = vec![open("1", 0), open("2", 1000), open("3", 2000)];

        let mut incremental = TabGraph::build(&[t1.clone(), t2.clone()], &history, &miner());
        incremental.add_node(&t3, &history, &miner());

        let full = TabGraph::build(&[t1, t2, t3], &history, &miner());
        assert_eq!(edge_signature(&incremental), edge_signature(&full));
        assert_eq!(incremental.node_count(), full.node_count());
    }

    #[test]
    fn test_incremental_remove_agrees_with_full_rebuild() {
        let t1 = tab("1", "github pull requests review", "https://github.com/org/repo/pulls");
        let t2 = tab("2", "github issues triage", "https://github.com/org/repo/issues");
        let t3 = tab("3", "tokio async tutorial", "https://tokio.rs/tokio/tutorial");
        let history = vec![open("1", 0), open("2", 1000), open("3", 2000)];

        let mut incremental =
            TabGraph::build(&[t1.clone(), t2.clone(), t3.clone()], &history, &miner());
        incremental.remove_node("2", &history, &miner());

        let full = TabGraph::build(&[t1, t3], &history, &miner());
        assert_eq!(edge_signature(&incremental), edge_signature(&full));
        assert_eq!(incremental.node_count(), 2);
        assert!(incremental.node("2").is_none());
    }

    #[test]
    fn test_remove_node_drops_all_touching_edges() {
        let tabs = vec![
            tab("1", "a", "https://same.example/x"),
            tab("2", "b", "https://same.example/y"),
            tab("3", "c", "https://same.example/z"),
        ];
        let mut g = TabGraph::build(&tabs, &[], &miner());
        // Each pair carries a domain edge and a keyword-overlap edge.
        assert_eq!(g.edge_count(), 6);
        g.remove_node("2", &[], &miner());
        assert_eq!(g.edge_count(), 2);
        for e in g.edges() {
            assert!(e.from < g.node_count());
            assert!(e.to < g.node_count());
        }
    }

    #[test]
    fn test_related_tabs_ranks_by_similarity() {
        let tabs = vec![
            tab("1", "rust tokio async runtime", "https://a.example"),
            tab("2", "rust tokio async channels", "https://b.example"),
            tab("3", "gardening tips roses", "https://c.example"),
        ];
        let g = TabGraph::build(&tabs, &[], &miner());
        let related = g.related_tabs("1", 5);
        assert!(!related.is_empty());
        assert_eq!(related[0].0, "2");
        for pair in related.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_relabel_cluster() {
        let tabs = vec![
            tab("1", "a", "https://same.example/x"),
            tab("2", "b", "https://same.example/y"),
        ];
        let mut g = TabGraph::build(&tabs, &[], &miner());
        let ids = g.suggested_groups(2)[0].tab_ids.clone();
        assert!(g.relabel_cluster(&ids, "Renamed"));
        assert_eq!(g.suggested_groups(2)[0].label, "Renamed");
        assert!(!g.relabel_cluster(&["nope".to_string()], "x"));
    }

    #[test]
    fn test_visit_stats_from_history() {
        let tabs = vec![tab("1", "a", "https://a.example")];
        let history = vec![open("1", 100), open("1", 900), open("other", 500)];
        let g = TabGraph::build(&tabs, &history, &miner());
        let node = g.node("1").unwrap();
        assert_eq!(node.visit_count, 2);
        assert_eq!(node.last_visited_ms, 900);
    }
}
