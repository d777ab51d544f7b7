// ── TabPilot Engine: Graph Clustering ──────────────────────────────────────
//
// Connected-component detection over the strong edges of the knowledge
// graph, plus the labeling/confidence/reason derivation that turns a raw
// component into a presentable grouping candidate.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::atoms::constants::{
    CLUSTER_CONFIDENCE_DEFAULT, CLUSTER_CONFIDENCE_SCALE, CLUSTER_EDGE_THRESHOLD,
    MIN_CLUSTER_SIZE,
};
use crate::atoms::graph_types::{GraphEdge, GraphNode, TabCluster, TemporalPattern};
use crate::engine::similarity::DocFrequency;

/// Find clusters: connected components over edges with weight above the
/// cluster threshold, traversed undirected (outgoing and incoming edges
/// both count). Components below the minimum size are discarded. Result
/// is sorted strongest-first; ties keep discovery order.
pub fn detect_clusters(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    outgoing: &[Vec<usize>],
    incoming: &[Vec<usize>],
    df: &DocFrequency,
    patterns: &[TemporalPattern],
) -> Vec<TabCluster> {
    let mut visited = vec![false; nodes.len()];
    let mut clusters: Vec<TabCluster> = Vec::new();

    for start in 0..nodes.len() {
        if visited[start] {
            continue;
        }
        let component = flood(start, edges, outgoing, incoming, &mut visited);
        if component.len() < MIN_CLUSTER_SIZE {
            continue;
        }

        let members: Vec<&GraphNode> = component.iter().map(|&i| &nodes[i]).collect();
        let tab_ids: Vec<String> = members.iter().map(|n| n.id.clone()).collect();
        let label = label_cluster(&members, df);
        let confidence = cluster_confidence(&component, edges);
        let reason = cluster_reason(&members, patterns);
        clusters.push(TabCluster { tab_ids, label, confidence, reason });
    }

    clusters.sort_by(|a, b| {
        b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal)
    });
    clusters
}

/// BFS from `start` following strong edges in both directions.
fn flood(
    start: usize,
    edges: &[GraphEdge],
    outgoing: &[Vec<usize>],
    incoming: &[Vec<usize>],
    visited: &mut [bool],
) -> Vec<usize> {
    let mut component = Vec::new();
    let mut queue = VecDeque::from([start]);
    visited[start] = true;

    while let Some(node) = queue.pop_front() {
        component.push(node);
        let neighbors = outgoing[node]
            .iter()
            .chain(incoming[node].iter())
            .filter(|&&e| edges[e].weight > CLUSTER_EDGE_THRESHOLD)
            .map(|&e| {
                let edge = &edges[e];
                if edge.from == node {
                    edge.to
                } else {
                    edge.from
                }
            });
        for next in neighbors {
            if !visited[next] {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }
    component
}

/// Label = top 3 member keywords ranked by aggregate IDF (occurrence count
/// × idf, so a term shared by several members can outrank a one-off rarity).
/// Falls back to the shared domain, then to "Related Tabs".
fn label_cluster(members: &[&GraphNode], df: &DocFrequency) -> String {
    let mut scores: Vec<(String, f32)> = Vec::new();
    for member in members {
        for kw in &member.keywords {
            match scores.iter_mut().find(|(k, _)| k == kw) {
                Some((_, score)) => *score += df.idf(kw),
                None => scores.push((kw.clone(), df.idf(kw))),
            }
        }
    }

    if !scores.is_empty() {
        scores.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
        });
        let label: Vec<String> = scores.iter().take(3).map(|(kw, _)| capitalize(kw)).collect();
        return label.join(" ");
    }

    if let Some(domain) = shared_domain(members) {
        return domain.to_string();
    }
    "Related Tabs".to_string()
}

/// Average of the strongest internal edge per node pair, scaled by 1.2 and
/// capped at 1. A pair can carry several edges with distinct reasons (a
/// fixed domain edge next to a weak keyword edge); only the strongest one
/// speaks for the pair, so parallel weak edges cannot dilute confidence.
/// A cluster with no internal edges (which clustering should not normally
/// produce) gets the neutral default.
fn cluster_confidence(component: &[usize], edges: &[GraphEdge]) -> f32 {
    let inside: HashSet<usize> = component.iter().copied().collect();
    let mut strongest: HashMap<(usize, usize), f32> = HashMap::new();
    for edge in edges {
        if !inside.contains(&edge.from) || !inside.contains(&edge.to) {
            continue;
        }
        let pair = (edge.from.min(edge.to), edge.from.max(edge.to));
        let weight = strongest.entry(pair).or_insert(0.0);
        if edge.weight > *weight {
            *weight = edge.weight;
        }
    }
    if strongest.is_empty() {
        return CLUSTER_CONFIDENCE_DEFAULT;
    }
    let avg = strongest.values().sum::<f32>() / strongest.len() as f32;
    (avg * CLUSTER_CONFIDENCE_SCALE).min(1.0)
}

/// Human-readable explanation: shared domain, shared context class, and
/// whether a mined temporal pattern runs inside this cluster.
fn cluster_reason(members: &[&GraphNode], patterns: &[TemporalPattern]) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(domain) = shared_domain(members) {
        parts.push(format!("all tabs from {domain}"));
    }

    let first_ctx = members[0].context;
    if members.iter().all(|m| m.context == first_ctx) {
        parts.push(format!("shared {first_ctx} context"));
    }

    let ids: HashSet<&str> = members.iter().map(|m| m.id.as_str()).collect();
    let in_pattern = patterns
        .iter()
        .any(|p| p.sequence.len() >= 2 && p.sequence.iter().all(|id| ids.contains(id.as_str())));
    if in_pattern {
        parts.push("matches a recurring browsing pattern".to_string());
    }

    if parts.is_empty() {
        return "Strongly linked browsing activity".to_string();
    }
    capitalize(&parts.join("; "))
}

fn shared_domain<'a>(members: &[&'a GraphNode]) -> Option<&'a str> {
    let first = members.first()?.domain.as_str();
    if !first.is_empty() && members.iter().all(|m| m.domain == first) {
        Some(first)
    } else {
        None
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{MinerConfig, Tab, TabEvent, TabEventKind};
    use crate::engine::graph::TabGraph;

    fn tab(id: &str, title: &str, url: &str) -> Tab {
        Tab::new(id, title, url)
    }

    #[test]
    fn test_two_independent_components() {
        let tabs = vec![
            tab("1", "alpha", "https://github.com/a"),
            tab("2", "beta", "https://github.com/b"),
            tab("3", "gamma", "https://shop.example/cart"),
            tab("4", "delta", "https://shop.example/checkout"),
        ];
        let g = TabGraph::build(&tabs, &[], &MinerConfig::default());
        let clusters = g.suggested_groups(2);
        assert_eq!(clusters.len(), 2);
        for cluster in &clusters {
            assert_eq!(cluster.tab_ids.len(), 2);
        }
    }

    #[test]
    fn test_isolated_nodes_are_not_clusters() {
        let tabs = vec![
            tab("1", "alpha one", "https://alpha-site.dev"),
            tab("2", "beta two", "https://beta-site.dev"),
        ];
        let g = TabGraph::build(&tabs, &[], &MinerConfig::default());
        assert_eq!(g.edge_count(), 0);
        assert!(g.suggested_groups(2).is_empty());
    }

    #[test]
    fn test_weak_temporal_edges_do_not_cluster() {
        // One shared session gives a 0.3 temporal edge, below the 0.4
        // cluster threshold.
        let tabs =
            vec![tab("a", "alpha", "https://a.example"), tab("b", "beta", "https://b.example")];
        let history = vec![
            TabEvent::new(TabEventKind::Open, "a", 0),
            TabEvent::new(TabEventKind::Open, "b", 1000),
        ];
        let g = TabGraph::build(&tabs, &history, &MinerConfig::default());
        assert!(g.edges().iter().any(|e| (e.weight - 0.3).abs() < 1e-6));
        assert!(g.suggested_groups(2).is_empty());
    }

    #[test]
    fn test_label_prefers_distinctive_shared_keywords() {
        // Keywords shared by both cluster members aggregate twice the IDF
        // of a member's one-off terms once the corpus is big enough.
        let tabs = vec![
            tab("1", "tokio runtime scheduler internals", "https://one.dev"),
            tab("2", "tokio runtime scheduler overview", "https://two.dev"),
            tab("3", "sourdough starter feeding", "https://bread.kitchen"),
            tab("4", "marathon training plan", "https://run.club"),
            tab("5", "jazz piano voicings", "https://music.school"),
            tab("6", "houseplant care watering", "https://plants.garden"),
        ];
        let g = TabGraph::build(&tabs, &[], &MinerConfig::default());
        let clusters = g.suggested_groups(2);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].label.contains("Tokio"));
        assert!(clusters[0].label.contains("Runtime"));
    }

    #[test]
    fn test_reason_mentions_shared_domain() {
        let tabs = vec![
            tab("1", "pulls", "https://github.com/org/a/pulls"),
            tab("2", "issues", "https://github.com/org/b/issues"),
        ];
        let g = TabGraph::build(&tabs, &[], &MinerConfig::default());
        let clusters = g.suggested_groups(2);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].reason.to_lowercase().contains("github.com"));
    }

    #[test]
    fn test_reason_mentions_recurring_pattern() {
        let tabs = vec![
            tab("a", "standup notes", "https://team.example/notes"),
            tab("b", "sprint board", "https://team.example/board"),
        ];
        // Three quick sessions opening a then b, far enough apart to be
        // separate sessions for the miner.
        let mut history = Vec::new();
        for s in 0..3i64 {
            let base = s * 60 * 60 * 1000;
            history.push(TabEvent::new(TabEventKind::Open, "a", base));
            history.push(TabEvent::new(TabEventKind::Open, "b", base + 30_000));
        }
        let g = TabGraph::build(&tabs, &history, &MinerConfig::default());
        let clusters = g.suggested_groups(2);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].reason.to_lowercase().contains("recurring"));
    }

    #[test]
    fn test_parallel_weak_edge_does_not_dilute_domain_confidence() {
        // Same-domain tabs also share the domain word as a keyword, so the
        // pair carries a weak keyword edge next to the fixed 0.8 domain
        // edge. Confidence must follow the strong edge.
        let tabs = vec![
            tab("1", "alpha", "https://github.com/x"),
            tab("2", "beta", "https://github.com/y"),
        ];
        let g = TabGraph::build(&tabs, &[], &MinerConfig::default());
        let clusters = g.suggested_groups(2);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].confidence >= 0.7, "got {}", clusters[0].confidence);
    }

    #[test]
    fn test_clusters_sorted_by_confidence() {
        let tabs = vec![
            // Domain pair: 0.8 edge.
            tab("1", "alpha", "https://strong.example/x"),
            tab("2", "beta", "https://strong.example/y"),
            // Keyword pair: Jaccard around 0.5.
            tab("3", "quantum computing primer basics", "https://one.example"),
            tab("4", "quantum computing hardware", "https://two.example"),
        ];
        let g = TabGraph::build(&tabs, &[], &MinerConfig::default());
        let clusters = g.suggested_groups(2);
        assert_eq!(clusters.len(), 2);
        assert!(clusters[0].confidence >= clusters[1].confidence);
        assert!(clusters[0].tab_ids.contains(&"1".to_string()));
    }
}
