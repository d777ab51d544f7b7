// ── TabPilot Engine: Core Engine Facade ────────────────────────────────────
// Canonical owned state for the routing core: the event log, the graph
// cache, the grouping engine, the router, and the metrics sink all live
// here, constructed once at process start. No ambient globals — the
// shell holds one `CoreEngine` (typically in an `Arc`) and every API
// call goes through it.

use std::sync::Arc;

use chrono::Timelike;
use log::info;
use serde::{Deserialize, Serialize};

use crate::atoms::error::CoreResult;
use crate::atoms::graph_types::{GraphExport, GraphStats, RecoverySuggestion, TabCluster, TemporalPattern};
use crate::atoms::types::{
    CoreConfig, GroupSuggestion, MinerConfig, QueryContext, RoutingResult, Tab, TabEvent,
};
use crate::engine::device::{self, DeviceProfile};
use crate::engine::events::TabEventLog;
use crate::engine::graph::cache::GraphCache;
use crate::engine::grouping::GroupingEngine;
use crate::engine::metrics::{RoutingMetrics, RoutingStats};
use crate::engine::patterns;
use crate::engine::providers::{ModelTier, OllamaTier};
use crate::engine::router::QueryRouter;

/// Aggregate diagnostics across the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub routing: RoutingStats,
    pub graph: Option<GraphStats>,
    pub event_count: usize,
    pub graph_rebuilds: u64,
}

/// Plain-data snapshot for shell-side persistence. The graph export is
/// informational — on import only the event history is restored and the
/// graph rebuilds deterministically from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreStateExport {
    pub events: Vec<TabEvent>,
    pub graph: Option<GraphExport>,
}

pub struct CoreEngine {
    config: CoreConfig,
    device: DeviceProfile,
    events: TabEventLog,
    graph_cache: Arc<GraphCache>,
    grouping: Arc<GroupingEngine>,
    router: QueryRouter,
    metrics: Arc<RoutingMetrics>,
}

impl CoreEngine {
    /// Production wiring: probe the device, connect both local tiers to
    /// the configured inference runtime, and skip the reasoning tier on
    /// machines that cannot carry it.
    pub fn new(config: CoreConfig) -> Self {
        let device = device::detect();
        let compact: Arc<dyn ModelTier> =
            Arc::new(OllamaTier::new(&config.inference_base_url, &config.compact_model));
        let reasoning: Option<Arc<dyn ModelTier>> = if device.supports_local_reasoning() {
            Some(Arc::new(OllamaTier::new(&config.inference_base_url, &config.reasoning_model)))
        } else {
            info!("[engine] device tier {:?}: local reasoning disabled", device.tier);
            None
        };
        Self::with_tiers(config, device, Some(compact), reasoning)
    }

    /// Explicit wiring seam: tests and embedders inject their own tiers
    /// and device profile. `namer` powers deferred group naming.
    pub fn with_tiers(
        config: CoreConfig,
        device: DeviceProfile,
        namer: Option<Arc<dyn ModelTier>>,
        reasoning: Option<Arc<dyn ModelTier>>,
    ) -> Self {
        let graph_cache = Arc::new(GraphCache::new());
        let metrics = Arc::new(RoutingMetrics::new());
        let mut grouping =
            GroupingEngine::new(Arc::clone(&graph_cache), config.miner.clone());
        if let Some(namer) = namer {
            grouping = grouping.with_namer(namer);
        }
        let grouping = Arc::new(grouping);
        let router = QueryRouter::new(
            config.clone(),
            Arc::clone(&grouping),
            Arc::clone(&graph_cache),
            reasoning,
            Arc::clone(&metrics),
        );
        CoreEngine {
            config,
            device,
            events: TabEventLog::new(),
            graph_cache,
            grouping,
            router,
            metrics,
        }
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    // ── Events ─────────────────────────────────────────────────────────

    /// Append one tab event. Cheap; safe to call from the shell's event
    /// stream at any rate.
    pub fn record_event(&self, event: TabEvent) {
        self.events.record(event);
    }

    /// A tab opened: record the event and patch the cached graph
    /// incrementally when possible (full rebuild otherwise happens lazily
    /// on the next lookup).
    pub fn tab_opened(&self, tab: &Tab, event: TabEvent) {
        self.events.record(event);
        self.graph_cache.add_tab(tab, &self.events.snapshot(), &self.config.miner);
    }

    /// A tab closed: record and patch, same discipline as [`Self::tab_opened`].
    pub fn tab_closed(&self, tab_id: &str, event: TabEvent) {
        self.events.record(event);
        self.graph_cache.remove_tab(tab_id, &self.events.snapshot(), &self.config.miner);
    }

    // ── Routing ────────────────────────────────────────────────────────

    /// Route one query against the current tab snapshot. Always returns
    /// a result, never an error.
    pub async fn route(&self, query: &str, tabs: &[Tab], ctx: &QueryContext) -> RoutingResult {
        let history = self.events.snapshot();
        self.router.route(query, tabs, &history, ctx).await
    }

    // ── Grouping ───────────────────────────────────────────────────────

    pub async fn suggest_grouping(
        &self,
        seed_ids: &[String],
        tabs: &[Tab],
        exclude_ids: &[String],
        defer_naming: bool,
        use_graph: bool,
    ) -> CoreResult<Option<GroupSuggestion>> {
        let history = self.events.snapshot();
        self.grouping
            .suggest_tab_grouping(seed_ids, tabs, exclude_ids, defer_naming, use_graph, &history)
            .await
    }

    pub async fn suggest_multiple_groups(
        &self,
        tabs: &[Tab],
        exclude_ids: &[String],
        use_graph: bool,
    ) -> Vec<GroupSuggestion> {
        let history = self.events.snapshot();
        self.grouping.suggest_multiple_groups(tabs, exclude_ids, use_graph, &history).await
    }

    // ── Graph ──────────────────────────────────────────────────────────

    /// Build (or reuse) the knowledge graph for a tab snapshot.
    pub fn build_graph(&self, tabs: &[Tab]) -> GraphStats {
        let history = self.events.snapshot();
        self.graph_cache.get_or_build(tabs, &history, &self.config.miner).stats()
    }

    /// Clusters of at least `min_size` from the cached graph. Empty when
    /// no graph has been built yet.
    pub fn suggested_groups(&self, min_size: usize) -> Vec<TabCluster> {
        self.graph_cache
            .cached()
            .map(|graph| graph.suggested_groups(min_size))
            .unwrap_or_default()
    }

    // ── Pattern mining ─────────────────────────────────────────────────

    /// Mine the engine's own event history. `options` overrides the
    /// configured miner thresholds for this call.
    pub fn mine_frequent_sequences(&self, options: Option<MinerConfig>) -> Vec<TemporalPattern> {
        let cfg = options.unwrap_or_else(|| self.config.miner.clone());
        patterns::mine_frequent_sequences(&self.events.snapshot(), &cfg)
    }

    pub fn suggest_workflow_recovery(
        &self,
        current_tab_ids: &[String],
        all_tab_ids: &[String],
    ) -> Vec<RecoverySuggestion> {
        let mined = self.mine_frequent_sequences(None);
        let hour = chrono::Local::now().hour();
        patterns::suggest_workflow_recovery(&mined, current_tab_ids, all_tab_ids, hour)
    }

    pub fn predict_next_tabs(&self, current_tab_ids: &[String]) -> Vec<String> {
        let mined = self.mine_frequent_sequences(None);
        patterns::predict_next_tabs(&mined, current_tab_ids)
    }

    // ── Diagnostics & persistence ──────────────────────────────────────

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            routing: self.metrics.stats(),
            graph: self.graph_cache.cached().map(|g| g.stats()),
            event_count: self.events.len(),
            graph_rebuilds: self.graph_cache.rebuild_count(),
        }
    }

    pub fn export_state(&self) -> CoreStateExport {
        CoreStateExport {
            events: self.events.snapshot(),
            graph: self.graph_cache.cached().map(|g| g.export()),
        }
    }

    /// Restore a previously exported state. Only the event history is
    /// authoritative; the cached graph is invalidated and rebuilds from
    /// the restored history on the next lookup.
    pub fn import_state(&self, state: CoreStateExport) {
        self.events.import(state.events);
        self.graph_cache.invalidate();
        info!("[engine] state imported: {} events", self.events.len());
    }
}
