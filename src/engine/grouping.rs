// ── TabPilot Engine: Grouping Suggestion Engine ────────────────────────────
//
// Answers "suggest tabs to group with these" and "suggest N groups" with
// a graph-first strategy and graceful degradation: reuse the cached
// knowledge graph when the tab set and history are unchanged, fall back
// to a pure similarity heuristic when the graph yields nothing, and fall
// back again to iterative domain bucketing for whole-set grouping.
//
// Naming can be deferred: the caller gets a fast heuristic name
// immediately and a background task resolves a model-quality name later,
// updating the name cache and the cached graph in place. The synchronous
// path never awaits the namer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::atoms::constants::{
    BUCKETING_BATCH_SIZE, BUCKETING_MAX_ITERATIONS, HEURISTIC_DOMAIN_EXACT,
    HEURISTIC_DOMAIN_SUBSTRING, HEURISTIC_MAX_CANDIDATES, HEURISTIC_PATH_SEGMENT_BONUS,
    HEURISTIC_SCORE_THRESHOLD, HEURISTIC_TITLE_JACCARD_SCALE, MIN_KEYWORD_LEN,
};
use crate::atoms::error::{CoreError, CoreResult};
use crate::atoms::types::{GroupSuggestion, MinerConfig, Tab, TabEvent};
use crate::engine::graph::cache::GraphCache;
use crate::engine::providers::{InvokeOptions, ModelTier};
use crate::engine::similarity::extract_keywords;

// ── Per-tab feature cache ──────────────────────────────────────────────────

/// Cheap derived features for the similarity heuristic. Cached per tab id
/// and invalidated whenever the tab's URL changes.
#[derive(Debug, Clone)]
struct TabFeatures {
    url: String,
    domain: String,
    title_words: HashSet<String>,
    path_segments: HashSet<String>,
}

impl TabFeatures {
    fn of(tab: &Tab) -> Self {
        let title_words: HashSet<String> = tab
            .title
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| w.len() >= MIN_KEYWORD_LEN)
            .collect();
        let path_segments: HashSet<String> = url::Url::parse(&tab.url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .map(|s| s.filter(|p| !p.is_empty()).map(|p| p.to_lowercase()).collect())
            })
            .unwrap_or_default();
        TabFeatures { url: tab.url.clone(), domain: tab.domain.clone(), title_words, path_segments }
    }
}

// ── Engine ─────────────────────────────────────────────────────────────────

pub struct GroupingEngine {
    graph_cache: Arc<GraphCache>,
    miner: MinerConfig,
    /// Optional compact model for high-quality group names. None = fast
    /// heuristic names only.
    namer: Option<Arc<dyn ModelTier>>,
    /// Content digest → resolved group name.
    name_cache: Mutex<HashMap<String, String>>,
    /// Sorted tab-id pair → heuristic score.
    sim_cache: Mutex<HashMap<(String, String), f32>>,
    features: Mutex<HashMap<String, TabFeatures>>,
}

impl GroupingEngine {
    pub fn new(graph_cache: Arc<GraphCache>, miner: MinerConfig) -> Self {
        GroupingEngine {
            graph_cache,
            miner,
            namer: None,
            name_cache: Mutex::new(HashMap::new()),
            sim_cache: Mutex::new(HashMap::new()),
            features: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_namer(mut self, namer: Arc<dyn ModelTier>) -> Self {
        self.namer = Some(namer);
        self
    }

    /// Features for one tab, cached. A changed URL invalidates the entry
    /// and every pairwise score involving this tab.
    fn features_for(&self, tab: &Tab) -> TabFeatures {
        {
            let mut cache = self.features.lock();
            match cache.get(&tab.id) {
                Some(hit) if hit.url == tab.url => return hit.clone(),
                Some(_) => {
                    cache.remove(&tab.id);
                    self.sim_cache.lock().retain(|(a, b), _| a != &tab.id && b != &tab.id);
                }
                None => {}
            }
        }
        let computed = TabFeatures::of(tab);
        self.features.lock().insert(tab.id.clone(), computed.clone());
        computed
    }

    /// Pairwise similarity heuristic: weighted sum of domain equality
    /// (0.5) / domain substring (0.3), title-word Jaccard × 0.3, and a
    /// flat bonus for any shared URL path segment, capped at 1.0.
    pub fn pair_score(&self, a: &Tab, b: &Tab) -> f32 {
        // Features first: a URL change must invalidate stale pair scores
        // before the pair cache is consulted.
        let fa = self.features_for(a);
        let fb = self.features_for(b);

        let key = if a.id <= b.id {
            (a.id.clone(), b.id.clone())
        } else {
            (b.id.clone(), a.id.clone())
        };
        if let Some(&hit) = self.sim_cache.lock().get(&key) {
            return hit;
        }
        let mut score = 0.0f32;

        if !fa.domain.is_empty() && fa.domain == fb.domain {
            score += HEURISTIC_DOMAIN_EXACT;
        } else if !fa.domain.is_empty()
            && !fb.domain.is_empty()
            && (fa.domain.contains(&fb.domain) || fb.domain.contains(&fa.domain))
        {
            score += HEURISTIC_DOMAIN_SUBSTRING;
        }

        let union = fa.title_words.union(&fb.title_words).count();
        if union > 0 {
            let intersection = fa.title_words.intersection(&fb.title_words).count();
            score += intersection as f32 / union as f32 * HEURISTIC_TITLE_JACCARD_SCALE;
        }

        if fa.path_segments.intersection(&fb.path_segments).next().is_some() {
            score += HEURISTIC_PATH_SEGMENT_BONUS;
        }

        let score = score.min(1.0);
        self.sim_cache.lock().insert(key, score);
        score
    }

    // ── Single-group suggestion ────────────────────────────────────────

    /// Suggest one group of tabs related to the seed set. Graph path
    /// first (cache-reusing), similarity heuristic as fallback. `Ok(None)`
    /// means "nothing worth grouping", which is a normal answer.
    pub async fn suggest_tab_grouping(
        self: &Arc<Self>,
        seed_ids: &[String],
        all_tabs: &[Tab],
        exclude_ids: &[String],
        defer_naming: bool,
        use_graph: bool,
        history: &[TabEvent],
    ) -> CoreResult<Option<GroupSuggestion>> {
        if seed_ids.is_empty() {
            return Err(CoreError::InvalidInput("suggest_tab_grouping: empty seed set".into()));
        }
        if all_tabs.len() < 2 {
            return Ok(None);
        }
        let excluded: HashSet<&str> = exclude_ids.iter().map(|s| s.as_str()).collect();

        if use_graph {
            if let Some(suggestion) =
                self.graph_suggestion(seed_ids, all_tabs, &excluded, defer_naming, history)
            {
                return Ok(Some(suggestion));
            }
            debug!("[grouping] graph path yielded nothing, using similarity heuristic");
        }

        Ok(self.heuristic_suggestion(seed_ids, all_tabs, &excluded))
    }

    /// Graph path: reuse (or build) the graph over the full tab set, pick
    /// the cluster containing a seed, and drop excluded members.
    fn graph_suggestion(
        self: &Arc<Self>,
        seed_ids: &[String],
        all_tabs: &[Tab],
        excluded: &HashSet<&str>,
        defer_naming: bool,
        history: &[TabEvent],
    ) -> Option<GroupSuggestion> {
        let graph = self.graph_cache.get_or_build(all_tabs, history, &self.miner);
        let cluster = graph
            .clusters()
            .iter()
            .find(|c| c.tab_ids.iter().any(|id| seed_ids.contains(id)))?;
        let tab_ids: Vec<String> =
            cluster.tab_ids.iter().filter(|id| !excluded.contains(id.as_str())).cloned().collect();
        if tab_ids.len() < 2 {
            return None;
        }

        let members: Vec<&Tab> =
            all_tabs.iter().filter(|t| tab_ids.contains(&t.id)).collect();
        let name = if defer_naming {
            let fast = self.fast_name(&members, &cluster.label);
            self.spawn_deferred_name(&members, tab_ids.clone());
            fast
        } else {
            self.cached_name(&members).unwrap_or_else(|| cluster.label.clone())
        };

        Some(GroupSuggestion {
            tab_ids,
            name,
            confidence: cluster.confidence.clamp(0.0, 1.0),
            reason: cluster.reason.clone(),
        })
    }

    /// Pure similarity fallback: score every candidate against the first
    /// available seed tab, keep scores above the threshold, cap at the
    /// top 10.
    fn heuristic_suggestion(
        &self,
        seed_ids: &[String],
        all_tabs: &[Tab],
        excluded: &HashSet<&str>,
    ) -> Option<GroupSuggestion> {
        let seed = all_tabs.iter().find(|t| seed_ids.contains(&t.id))?;
        let mut scored: Vec<(&Tab, f32)> = all_tabs
            .iter()
            .filter(|t| t.id != seed.id && !excluded.contains(t.id.as_str()))
            .map(|t| (t, self.pair_score(seed, t)))
            .filter(|(_, score)| *score >= HEURISTIC_SCORE_THRESHOLD)
            .collect();
        if scored.is_empty() {
            return None;
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(HEURISTIC_MAX_CANDIDATES);

        let confidence =
            (scored.iter().map(|(_, s)| s).sum::<f32>() / scored.len() as f32).clamp(0.0, 1.0);
        let mut members: Vec<&Tab> = vec![seed];
        members.extend(scored.iter().map(|(t, _)| *t));
        let tab_ids: Vec<String> = members.iter().map(|t| t.id.clone()).collect();
        let name = self.fast_name(&members, "Related Tabs");

        Some(GroupSuggestion {
            tab_ids,
            name,
            confidence,
            reason: format!("{} tabs similar to \"{}\"", members.len(), seed.title),
        })
    }

    // ── Multi-group suggestion ─────────────────────────────────────────

    /// Suggest a whole partition of the tab set: graph clustering first,
    /// iterative domain bucketing when the graph yields nothing usable.
    pub async fn suggest_multiple_groups(
        self: &Arc<Self>,
        all_tabs: &[Tab],
        exclude_ids: &[String],
        use_graph: bool,
        history: &[TabEvent],
    ) -> Vec<GroupSuggestion> {
        let excluded: HashSet<&str> = exclude_ids.iter().map(|s| s.as_str()).collect();

        if use_graph {
            let graph = self.graph_cache.get_or_build(all_tabs, history, &self.miner);
            let suggestions: Vec<GroupSuggestion> = graph
                .clusters()
                .iter()
                .filter_map(|cluster| {
                    let tab_ids: Vec<String> = cluster
                        .tab_ids
                        .iter()
                        .filter(|id| !excluded.contains(id.as_str()))
                        .cloned()
                        .collect();
                    if tab_ids.len() < 2 {
                        return None;
                    }
                    Some(GroupSuggestion {
                        tab_ids,
                        name: cluster.label.clone(),
                        confidence: cluster.confidence.clamp(0.0, 1.0),
                        reason: cluster.reason.clone(),
                    })
                })
                .collect();
            if !suggestions.is_empty() {
                return suggestions;
            }
            debug!("[grouping] no usable graph clusters, falling back to domain bucketing");
        }

        self.domain_bucketing(all_tabs, &excluded).await
    }

    /// Iterative domain bucketing: group same-domain tabs (≥2 members),
    /// scoring buckets in bounded-size parallel batches, marking grouped
    /// tabs as consumed, until nothing is left or the iteration cap hits.
    async fn domain_bucketing(
        self: &Arc<Self>,
        all_tabs: &[Tab],
        excluded: &HashSet<&str>,
    ) -> Vec<GroupSuggestion> {
        let mut consumed: HashSet<String> = HashSet::new();
        let mut suggestions: Vec<GroupSuggestion> = Vec::new();

        for _ in 0..BUCKETING_MAX_ITERATIONS {
            let mut buckets: HashMap<&str, Vec<&Tab>> = HashMap::new();
            for tab in all_tabs {
                if tab.domain.is_empty()
                    || excluded.contains(tab.id.as_str())
                    || consumed.contains(&tab.id)
                {
                    continue;
                }
                buckets.entry(tab.domain.as_str()).or_default().push(tab);
            }
            let mut ready: Vec<Vec<&Tab>> =
                buckets.into_values().filter(|members| members.len() >= 2).collect();
            if ready.is_empty() {
                break;
            }
            // Deterministic batch order regardless of hash iteration.
            ready.sort_by_key(|members| members[0].id.clone());

            for batch in ready.chunks(BUCKETING_BATCH_SIZE) {
                let scored = futures::future::join_all(
                    batch.iter().map(|members| self.score_bucket(members)),
                )
                .await;
                for suggestion in scored {
                    for id in &suggestion.tab_ids {
                        consumed.insert(id.clone());
                    }
                    suggestions.push(suggestion);
                }
            }
        }
        suggestions
    }

    async fn score_bucket(&self, members: &[&Tab]) -> GroupSuggestion {
        let mut score_sum = 0.0f32;
        let mut pairs = 0u32;
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                score_sum += self.pair_score(members[i], members[j]);
                pairs += 1;
            }
        }
        let confidence = if pairs == 0 {
            HEURISTIC_DOMAIN_EXACT
        } else {
            (score_sum / pairs as f32).clamp(0.0, 1.0)
        };
        GroupSuggestion {
            tab_ids: members.iter().map(|t| t.id.clone()).collect(),
            name: self.fast_name(members, "Related Tabs"),
            confidence,
            reason: format!("All tabs from {}", members[0].domain),
        }
    }

    // ── Naming ─────────────────────────────────────────────────────────

    /// Fast heuristic name: cached resolution, then shared domain label,
    /// then the most frequent keyword, then the supplied default.
    fn fast_name(&self, members: &[&Tab], default: &str) -> String {
        if let Some(cached) = self.cached_name(members) {
            return cached;
        }

        let first_domain = members.first().map(|t| t.domain.as_str()).unwrap_or("");
        if !first_domain.is_empty() && members.iter().all(|t| t.domain == first_domain) {
            if let Some(label) = first_domain.split('.').next() {
                return capitalize(label);
            }
        }

        let mut counts: HashMap<String, u32> = HashMap::new();
        for member in members {
            for kw in extract_keywords(member) {
                *counts.entry(kw).or_insert(0) += 1;
            }
        }
        if let Some((kw, _)) = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        {
            return capitalize(&kw);
        }
        default.to_string()
    }

    fn cached_name(&self, members: &[&Tab]) -> Option<String> {
        self.name_cache.lock().get(&content_digest(members)).cloned()
    }

    /// Fire-and-forget model-quality naming. On completion the resolved
    /// name lands in the name cache and the cached graph's cluster label,
    /// under the same locks as any other writer.
    fn spawn_deferred_name(self: &Arc<Self>, members: &[&Tab], tab_ids: Vec<String>) {
        let Some(namer) = self.namer.clone() else {
            return;
        };
        let digest = content_digest(members);
        if self.name_cache.lock().contains_key(&digest) {
            return;
        }
        let titles: Vec<String> = members.iter().map(|t| t.title.clone()).collect();
        let engine = Arc::clone(self);

        tokio::spawn(async move {
            let prompt = format!(
                "Suggest a concise 2-3 word name for a browser tab group containing:\n{}\nReply with the name only.",
                titles.iter().map(|t| format!("- {t}")).collect::<Vec<_>>().join("\n")
            );
            match namer.invoke(&prompt, &InvokeOptions { max_tokens: 16, deterministic: true }).await
            {
                Ok(raw) => {
                    let name = sanitize_name(&raw);
                    if name.is_empty() {
                        return;
                    }
                    engine.name_cache.lock().insert(digest, name.clone());
                    engine.graph_cache.relabel_cluster(&tab_ids, &name);
                    debug!("[grouping] deferred name resolved: {name}");
                }
                Err(e) => warn!("[grouping] deferred naming failed: {e}"),
            }
        });
    }
}

/// Digest of the members' identity-relevant content. Title or URL changes
/// produce a new key, so stale names are never reused.
fn content_digest(members: &[&Tab]) -> String {
    let mut parts: Vec<String> =
        members.iter().map(|t| format!("{}|{}|{}", t.id, t.title, t.url)).collect();
    parts.sort();
    let mut hasher = Sha256::new();
    for part in &parts {
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// First line of the model's reply, stripped of quotes and fencing,
/// bounded to something that fits a tab-group chip.
fn sanitize_name(raw: &str) -> String {
    let line = raw
        .lines()
        .map(|l| l.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`' || c == '*'))
        .find(|l| !l.is_empty())
        .unwrap_or("");
    line.chars().take(40).collect::<String>().trim().to_string()
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
    use crate::engine::providers::StaticTier;

    fn engine() -> Arc<GroupingEngine> {
        Arc::new(GroupingEngine::new(Arc::new(GraphCache::new()), MinerConfig::default()))
    }

    fn tab(id: &str, title: &str, url: &str) -> Tab {
        Tab::new(id, title, url)
    }

    #[test]
    fn test_pair_score_weights() {
        let e = engine();
        let a = tab("1", "Rust async book", "https://github.com/org/async-book");
        let b = tab("2", "Rust async patterns", "https://github.com/org/patterns");

        let score = e.pair_score(&a, &b);
        // Same domain (0.5) + title Jaccard 2/4 × 0.3 + shared "org" path
        // segment (0.2).
        assert!((score - 0.85).abs() < 1e-5);

        let unrelated = tab("3", "Sourdough", "https://bread.kitchen/recipes");
        assert!(e.pair_score(&a, &unrelated) < HEURISTIC_SCORE_THRESHOLD);
    }

    #[test]
    fn test_pair_score_caps_at_one() {
        let e = engine();
        let a = tab("1", "same title words here", "https://site.example/path/deep");
        let b = tab("2", "same title words here", "https://site.example/path/deep");
        assert!((e.pair_score(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_feature_cache_invalidates_on_url_change() {
        let e = engine();
        let a = tab("1", "Cart", "https://shop.example/cart");
        let b = tab("2", "Checkout", "https://shop.example/checkout");
        let before = e.pair_score(&a, &b);
        assert!(before >= HEURISTIC_DOMAIN_EXACT);

        // Tab 1 navigated away: same id, new URL.
        let moved = tab("1", "News", "https://news.example/front");
        let after = e.pair_score(&moved, &b);
        assert!(after < before);
    }

    #[tokio::test]
    async fn test_empty_seeds_is_contract_violation() {
        let e = engine();
        let tabs = vec![tab("1", "a", "https://a.example"), tab("2", "b", "https://b.example")];
        let result = e.suggest_tab_grouping(&[], &tabs, &[], false, true, &[]).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_graph_path_groups_domain_pair() {
        let e = engine();
        let tabs = vec![
            tab("1", "PRs", "https://github.com/org/a/pulls"),
            tab("2", "Issues", "https://github.com/org/b/issues"),
            tab("3", "Weather", "https://weather.example"),
        ];
        let suggestion = e
            .suggest_tab_grouping(&["1".into()], &tabs, &[], false, true, &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(suggestion.tab_ids.len(), 2);
        assert!(suggestion.tab_ids.contains(&"1".to_string()));
        assert!(suggestion.confidence >= 0.7);
    }

    #[tokio::test]
    async fn test_cache_reuse_on_identical_inputs() {
        let cache = Arc::new(GraphCache::new());
        let e = Arc::new(GroupingEngine::new(Arc::clone(&cache), MinerConfig::default()));
        let tabs = vec![
            tab("1", "PRs", "https://github.com/org/a/pulls"),
            tab("2", "Issues", "https://github.com/org/b/issues"),
        ];
        e.suggest_tab_grouping(&["1".into()], &tabs, &[], false, true, &[]).await.unwrap();
        e.suggest_tab_grouping(&["2".into()], &tabs, &[], false, true, &[]).await.unwrap();
        assert_eq!(cache.rebuild_count(), 1);
    }

    #[tokio::test]
    async fn test_heuristic_fallback_when_graph_disabled() {
        let e = engine();
        let tabs = vec![
            tab("1", "Cart", "https://shop.example/cart"),
            tab("2", "Checkout", "https://shop.example/checkout"),
            tab("3", "Totally different", "https://elsewhere.io"),
        ];
        let suggestion = e
            .suggest_tab_grouping(&["1".into()], &tabs, &[], false, false, &[])
            .await
            .unwrap()
            .unwrap();
        assert!(suggestion.tab_ids.contains(&"1".to_string()));
        assert!(suggestion.tab_ids.contains(&"2".to_string()));
        assert!(!suggestion.tab_ids.contains(&"3".to_string()));
        assert!(suggestion.confidence > 0.0 && suggestion.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_excluded_tabs_never_appear() {
        let e = engine();
        let tabs = vec![
            tab("1", "a", "https://same.example/x"),
            tab("2", "b", "https://same.example/y"),
            tab("3", "c", "https://same.example/z"),
        ];
        let suggestion = e
            .suggest_tab_grouping(&["1".into()], &tabs, &["3".into()], false, true, &[])
            .await
            .unwrap()
            .unwrap();
        assert!(!suggestion.tab_ids.contains(&"3".to_string()));
    }

    #[tokio::test]
    async fn test_multiple_groups_via_graph() {
        let e = engine();
        let tabs = vec![
            tab("1", "a", "https://github.com/x"),
            tab("2", "b", "https://github.com/y"),
            tab("3", "c", "https://shop.example/cart"),
            tab("4", "d", "https://shop.example/checkout"),
            tab("5", "e", "https://lonely.example"),
        ];
        let groups = e.suggest_multiple_groups(&tabs, &[], true, &[]).await;
        assert_eq!(groups.len(), 2);
        for group in &groups {
            assert!(group.tab_ids.len() >= 2);
            assert!(group.confidence >= 0.0 && group.confidence <= 1.0);
        }
    }

    #[tokio::test]
    async fn test_domain_bucketing_fallback() {
        let e = engine();
        let tabs = vec![
            tab("1", "a", "https://github.com/x"),
            tab("2", "b", "https://github.com/y"),
            tab("3", "c", "https://docs.rs/serde"),
            tab("4", "d", "https://docs.rs/tokio"),
            tab("5", "e", "https://single.example"),
        ];
        let groups = e.suggest_multiple_groups(&tabs, &[], false, &[]).await;
        assert_eq!(groups.len(), 2);
        let all_ids: Vec<&String> = groups.iter().flat_map(|g| g.tab_ids.iter()).collect();
        assert!(!all_ids.contains(&&"5".to_string()));
    }

    #[tokio::test]
    async fn test_empty_tab_set_yields_nothing() {
        let e = engine();
        assert!(e.suggest_multiple_groups(&[], &[], true, &[]).await.is_empty());
        let single = vec![tab("1", "a", "https://a.example")];
        let none =
            e.suggest_tab_grouping(&["1".into()], &single, &[], false, true, &[]).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_deferred_name_resolves_in_background() {
        let cache = Arc::new(GraphCache::new());
        let namer = Arc::new(StaticTier::scripted("namer", vec!["Code Review"]));
        let e = Arc::new(
            GroupingEngine::new(Arc::clone(&cache), MinerConfig::default()).with_namer(namer),
        );
        let tabs = vec![
            tab("1", "PRs", "https://github.com/org/a/pulls"),
            tab("2", "Issues", "https://github.com/org/b/issues"),
        ];
        let suggestion = e
            .suggest_tab_grouping(&["1".into()], &tabs, &[], true, true, &[])
            .await
            .unwrap()
            .unwrap();
        // Fast heuristic name immediately; never the model name.
        assert_eq!(suggestion.name, "Github");

        // Give the spawned task a moment, then the cache carries the
        // model-quality name.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let renamed = e
            .suggest_tab_grouping(&["1".into()], &tabs, &[], false, true, &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Code Review");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("\"Code Review\"\n"), "Code Review");
        assert_eq!(sanitize_name("```\nShopping\n```"), "Shopping");
        assert_eq!(sanitize_name("   "), "");
    }
}
