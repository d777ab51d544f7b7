// ── TabPilot Engine: Graph Cache ───────────────────────────────────────────
//
// Caches the most recent knowledge graph keyed by (sorted tab-id set,
// event-history fingerprint). Readers get cheap `Arc` snapshots; any
// change swaps the whole entry under a write lock, so a rebuild can never
// be observed half-written. A monotonic rebuild counter makes cache
// behavior observable from tests and diagnostics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::atoms::types::{MinerConfig, Tab, TabEvent};
use crate::engine::events::HistoryFingerprint;
use crate::engine::graph::TabGraph;

/// Cache key: which tab set and which history state a graph was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphKey {
    /// Sorted, deduplicated tab ids.
    tab_ids: Vec<String>,
    fingerprint: HistoryFingerprint,
}

impl GraphKey {
    pub fn new(tabs: &[Tab], history: &[TabEvent]) -> Self {
        let mut tab_ids: Vec<String> = tabs.iter().map(|t| t.id.clone()).collect();
        tab_ids.sort();
        tab_ids.dedup();
        GraphKey { tab_ids, fingerprint: HistoryFingerprint::of(history) }
    }
}

#[derive(Debug, Default)]
pub struct GraphCache {
    entry: RwLock<Option<(GraphKey, Arc<TabGraph>)>>,
    rebuilds: AtomicU64,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached graph when both the tab-id set and the history
    /// fingerprint match; otherwise run a full rebuild (outside the lock)
    /// and swap it in.
    pub fn get_or_build(
        &self,
        tabs: &[Tab],
        history: &[TabEvent],
        miner: &MinerConfig,
    ) -> Arc<TabGraph> {
        let key = GraphKey::new(tabs, history);
        {
            let guard = self.entry.read();
            if let Some((cached_key, graph)) = guard.as_ref() {
                if *cached_key == key {
                    debug!("[graph] cache hit ({} tabs)", key.tab_ids.len());
                    return Arc::clone(graph);
                }
            }
        }

        let graph = Arc::new(TabGraph::build(tabs, history, miner));
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        *self.entry.write() = Some((key, Arc::clone(&graph)));
        graph
    }

    /// Snapshot of whatever is cached, without triggering a build.
    pub fn cached(&self) -> Option<Arc<TabGraph>> {
        self.entry.read().as_ref().map(|(_, g)| Arc::clone(g))
    }

    /// Full rebuilds performed so far. Cache hits and in-place updates do
    /// not move this counter.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    pub fn invalidate(&self) {
        *self.entry.write() = None;
    }

    /// Rename a cached cluster in place (copy-on-write; the key is
    /// untouched, so subsequent lookups still hit). Used when a deferred
    /// model-quality group name resolves after the suggestion was already
    /// returned.
    pub fn relabel_cluster(&self, tab_ids: &[String], label: &str) -> bool {
        let mut guard = self.entry.write();
        let Some((key, graph)) = guard.take() else {
            return false;
        };
        let mut updated = (*graph).clone();
        let hit = updated.relabel_cluster(tab_ids, label);
        *guard = Some((key, if hit { Arc::new(updated) } else { graph }));
        hit
    }

    /// Patch the cache for a single tab open without a full rebuild.
    /// Applies only when the cached graph matches the pre-open state and
    /// every event appended since then references the new tab; any other
    /// drift falls back to the rebuild path (returns false).
    pub fn add_tab(&self, tab: &Tab, history: &[TabEvent], miner: &MinerConfig) -> bool {
        let mut guard = self.entry.write();
        let Some((key, graph)) = guard.take() else {
            return false;
        };
        if key.tab_ids.binary_search(&tab.id).is_ok()
            || !trailing_events_only_touch(&key.fingerprint, history, &tab.id)
        {
            *guard = Some((key, graph));
            return false;
        }

        let mut updated = (*graph).clone();
        updated.add_node(tab, history, miner);

        let mut tab_ids = key.tab_ids;
        let insert_at = tab_ids.binary_search(&tab.id).unwrap_err();
        tab_ids.insert(insert_at, tab.id.clone());
        let new_key = GraphKey { tab_ids, fingerprint: HistoryFingerprint::of(history) };
        *guard = Some((new_key, Arc::new(updated)));
        debug!("[graph] cache patched for opened tab {}", tab.id);
        true
    }

    /// Patch the cache for a single tab close. Same drift rules as
    /// [`GraphCache::add_tab`].
    pub fn remove_tab(&self, tab_id: &str, history: &[TabEvent], miner: &MinerConfig) -> bool {
        let mut guard = self.entry.write();
        let Some((key, graph)) = guard.take() else {
            return false;
        };
        let position = key.tab_ids.binary_search_by(|probe| probe.as_str().cmp(tab_id));
        let Ok(position) = position else {
            *guard = Some((key, graph));
            return false;
        };
        if !trailing_events_only_touch(&key.fingerprint, history, tab_id) {
            *guard = Some((key, graph));
            return false;
        }

        let mut updated = (*graph).clone();
        updated.remove_node(tab_id, history, miner);

        let mut tab_ids = key.tab_ids;
        tab_ids.remove(position);
        let new_key = GraphKey { tab_ids, fingerprint: HistoryFingerprint::of(history) };
        *guard = Some((new_key, Arc::new(updated)));
        debug!("[graph] cache patched for closed tab {tab_id}");
        true
    }
}

/// True when `history` extends the fingerprinted prefix and every appended
/// event references only `tab_id`. Ring eviction or foreign events force a
/// full rebuild instead.
fn trailing_events_only_touch(
    fingerprint: &HistoryFingerprint,
    history: &[TabEvent],
    tab_id: &str,
) -> bool {
    let prefix_len = fingerprint.count as usize;
    if history.len() < prefix_len {
        return false;
    }
    if prefix_len > 0 {
        let boundary = &history[prefix_len - 1];
        if boundary.timestamp_ms != fingerprint.last_timestamp_ms {
            return false;
        }
    }
    history[prefix_len..].iter().all(|e| {
        e.tab_id == tab_id && e.from_tab_id.as_deref().map(|f| f == tab_id).unwrap_or(true)
    })
}
