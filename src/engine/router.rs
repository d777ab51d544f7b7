// ── TabPilot Engine: Query Router ──────────────────────────────────────────
//
// Top-level orchestrator. One query runs the escalation chain strictly in
// order — pattern tier, compact grouping, local reasoning, remote
// delegation — and always produces a `RoutingResult`. A tier is skipped
// when its preconditions fail and never retried within the same call.
//
// Guarantee classes (grouping, workspace/container, direct tab actions)
// may never fail silently: when every earlier tier comes up empty the
// router still returns a remote delegation carrying `force_execution`,
// so the shell cannot drop it. Every terminal return lands one metrics
// sample.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::time::timeout;

use crate::atoms::constants::{FALLBACK_CONFIDENCE, PATTERN_TIER_CONFIDENCE};
use crate::atoms::types::{
    CoreConfig, GroupSuggestion, QueryContext, Route, RouteAction, RoutingResult, Tab, TabCommand,
    TabEvent,
};
use crate::engine::classify::{self, QueryClass};
use crate::engine::graph::cache::GraphCache;
use crate::engine::graph::TabGraph;
use crate::engine::grouping::GroupingEngine;
use crate::engine::metrics::RoutingMetrics;
use crate::engine::pattern_tier::PatternTier;
use crate::engine::providers::{parse_model_action, InvokeOptions, ModelAction, ModelTier};

pub struct QueryRouter {
    config: CoreConfig,
    pattern: PatternTier,
    grouping: Arc<GroupingEngine>,
    graph_cache: Arc<GraphCache>,
    /// Tier 3. None when the device cannot carry a reasoning model.
    reasoning: Option<Arc<dyn ModelTier>>,
    metrics: Arc<RoutingMetrics>,
}

impl QueryRouter {
    pub fn new(
        config: CoreConfig,
        grouping: Arc<GroupingEngine>,
        graph_cache: Arc<GraphCache>,
        reasoning: Option<Arc<dyn ModelTier>>,
        metrics: Arc<RoutingMetrics>,
    ) -> Self {
        QueryRouter {
            config,
            pattern: PatternTier::new(),
            grouping,
            graph_cache,
            reasoning,
            metrics,
        }
    }

    /// Route one query. Never returns an error: failed tiers only change
    /// which route label and confidence come back.
    pub async fn route(
        &self,
        query: &str,
        tabs: &[Tab],
        history: &[TabEvent],
        ctx: &QueryContext,
    ) -> RoutingResult {
        let start = Instant::now();
        let class = classify::classify(query);
        debug!("[router] query classed as {:?}", class);

        // Step 1: conversational queries need conversation context, not
        // tab semantics. Straight to the remote tier.
        if class == QueryClass::Conversational {
            return self.finish(
                start,
                query,
                Route::DirectLlm,
                RouteAction::Delegate { prompt: query.to_string(), force_execution: false },
                0.9,
                Some(self.config.remote_model.clone()),
                Some("conversational query, bypassing tab analysis".into()),
                true,
            );
        }

        // Step 2: deterministic rules.
        if let Some(hit) = self.pattern.evaluate(query, tabs, ctx) {
            return self.finish(
                start,
                query,
                Route::Pattern,
                RouteAction::Command { command: hit.command },
                PATTERN_TIER_CONFIDENCE,
                None,
                Some(format!("matched rule '{}'", hit.rule)),
                true,
            );
        }

        // Step 3: compact grouping tier, simple-grouping queries only.
        // Any internal failure falls through — it never fails the request.
        if let QueryClass::SimpleGrouping { site } = &class {
            if let Some(suggestion) = self.quick_grouping(site, tabs, history).await {
                let confidence = suggestion.confidence;
                return self.finish(
                    start,
                    query,
                    Route::QuickGrouping,
                    RouteAction::Group { suggestion },
                    confidence,
                    Some(self.config.compact_model.clone()),
                    None,
                    true,
                );
            }
        }

        // Step 4: workspace/container queries go to tier 3 first, with
        // tier 4 as the automatic backup.
        if class == QueryClass::Workspace {
            if let Some((action, reasoning)) = self.local_reasoning(query, tabs, history).await {
                return self.finish(
                    start,
                    query,
                    Route::Local,
                    action,
                    0.85,
                    self.reasoning.as_ref().map(|t| t.label().to_string()),
                    reasoning,
                    true,
                );
            }
            return self.finish(
                start,
                query,
                Route::Remote,
                RouteAction::Delegate { prompt: query.to_string(), force_execution: true },
                0.9,
                Some(self.config.remote_model.clone()),
                Some("workspace query, local reasoning unavailable".into()),
                true,
            );
        }

        // Step 5: local reasoning for anything still unresolved.
        if let Some((action, reasoning)) = self.local_reasoning(query, tabs, history).await {
            return self.finish(
                start,
                query,
                Route::Local,
                action,
                0.85,
                self.reasoning.as_ref().map(|t| t.label().to_string()),
                reasoning,
                true,
            );
        }

        // Step 6: remote tier for complex queries, and unconditionally for
        // guarantee classes — these must never fail silently.
        if class.is_guarantee() || classify::is_complex(query) {
            let force = class.is_guarantee();
            if force {
                warn!("[router] guarantee-class query exhausted local tiers, forcing remote");
            }
            return self.finish(
                start,
                query,
                Route::Remote,
                RouteAction::Delegate { prompt: query.to_string(), force_execution: force },
                0.9,
                Some(self.config.remote_model.clone()),
                None,
                true,
            );
        }

        // Step 7: nothing matched, nothing guaranteed — still a result,
        // never an error.
        self.finish(
            start,
            query,
            Route::Remote,
            RouteAction::Delegate { prompt: query.to_string(), force_execution: false },
            FALLBACK_CONFIDENCE,
            Some(self.config.remote_model.clone()),
            Some("no tier matched".into()),
            false,
        )
    }

    // ── Tier 2 ─────────────────────────────────────────────────────────

    /// Compact grouping: seed with the tabs mentioning the site keyword,
    /// defer naming, reuse the graph. Timeboxed; every failure is a
    /// fall-through.
    async fn quick_grouping(
        &self,
        site: &str,
        tabs: &[Tab],
        history: &[TabEvent],
    ) -> Option<GroupSuggestion> {
        let seeds: Vec<String> = tabs
            .iter()
            .filter(|t| t.domain.contains(site) || t.title.to_lowercase().contains(site))
            .map(|t| t.id.clone())
            .collect();
        if seeds.is_empty() {
            return None;
        }

        let budget = Duration::from_millis(self.config.compact_timeout_ms);
        let attempt =
            self.grouping.suggest_tab_grouping(&seeds, tabs, &[], true, true, history);
        match timeout(budget, attempt).await {
            Ok(Ok(suggestion)) => suggestion,
            Ok(Err(e)) => {
                warn!("[router] quick grouping failed, escalating: {e}");
                None
            }
            Err(_) => {
                warn!("[router] quick grouping timed out after {}ms", budget.as_millis());
                None
            }
        }
    }

    // ── Tier 3 ─────────────────────────────────────────────────────────

    /// Local reasoning model with graph context injection. Returns None
    /// on any failure (absent model, timeout, parse error) so the router
    /// escalates instead of hanging or propagating partial output.
    async fn local_reasoning(
        &self,
        query: &str,
        tabs: &[Tab],
        history: &[TabEvent],
    ) -> Option<(RouteAction, Option<String>)> {
        let tier = self.reasoning.as_ref()?;
        if !tier.ready().await {
            debug!("[router] reasoning model not ready, skipping tier 3");
            return None;
        }

        let graph = self.graph_cache.get_or_build(tabs, history, &self.config.miner);
        let prompt = build_reasoning_prompt(query, tabs, &graph);
        let budget = Duration::from_millis(self.config.local_timeout_ms);

        let text = match timeout(budget, tier.invoke(&prompt, &InvokeOptions::default())).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("[router] tier 3 failed, escalating: {e}");
                return None;
            }
            Err(_) => {
                warn!("[router] tier 3 timed out after {}ms, escalating", budget.as_millis());
                return None;
            }
        };

        match parse_model_action(&text) {
            Ok(action) => Some(self.realize_action(action, &graph)),
            Err(e) => {
                warn!("[router] tier 3 output rejected, escalating: {e}");
                None
            }
        }
    }

    /// Map a validated model action onto the routing surface. Recognized
    /// function calls execute immediately; grouping results are enriched
    /// with the graph's label and reason when the model omitted a name.
    fn realize_action(
        &self,
        action: ModelAction,
        graph: &TabGraph,
    ) -> (RouteAction, Option<String>) {
        match action {
            ModelAction::CloseTabs { tab_ids } => {
                (RouteAction::Command { command: TabCommand::CloseTabs { tab_ids } }, None)
            }
            ModelAction::PinTabs { tab_ids } => {
                (RouteAction::Command { command: TabCommand::PinTabs { tab_ids } }, None)
            }
            ModelAction::OpenUrl { url } => {
                (RouteAction::Command { command: TabCommand::OpenUrl { url } }, None)
            }
            ModelAction::FocusTab { tab_id } => {
                (RouteAction::Command { command: TabCommand::FocusTab { tab_id } }, None)
            }
            ModelAction::GroupTabs { tab_ids, name } => {
                let cluster = graph
                    .clusters()
                    .iter()
                    .find(|c| tab_ids.iter().all(|id| c.tab_ids.contains(id)));
                let name = if name.is_empty() {
                    cluster.map(|c| c.label.clone()).unwrap_or_else(|| "Related Tabs".into())
                } else {
                    name
                };
                let (confidence, reason) = cluster
                    .map(|c| (c.confidence, c.reason.clone()))
                    .unwrap_or((0.8, "suggested by the reasoning model".into()));
                let reasoning = Some(reason.clone());
                (
                    RouteAction::Group {
                        suggestion: GroupSuggestion { tab_ids, name, confidence, reason },
                    },
                    reasoning,
                )
            }
            ModelAction::Answer(text) => (RouteAction::Answer { text }, None),
        }
    }

    // ── Terminal ───────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        start: Instant,
        query: &str,
        route: Route,
        action: RouteAction,
        confidence: f32,
        model: Option<String>,
        reasoning: Option<String>,
        success: bool,
    ) -> RoutingResult {
        let latency_ms = start.elapsed().as_millis() as u64;
        let confidence = confidence.clamp(0.0, 1.0);
        self.metrics.record(route, latency_ms, success, query, confidence, model.as_deref());
        RoutingResult { action, route, latency_ms, confidence, model, reasoning }
    }
}

/// Tier-3 prompt: tab inventory plus the graph's cluster view, asking for
/// a single JSON function call.
fn build_reasoning_prompt(query: &str, tabs: &[Tab], graph: &TabGraph) -> String {
    let mut prompt = String::from(
        "You manage a browser's tabs. Reply with exactly one JSON function call:\n\
         {\"function\": \"close_tabs|pin_tabs|open_url|focus_tab|group_tabs\", \"args\": {...}}\n\
         close_tabs/pin_tabs args: {\"tab_ids\": [..]}; open_url args: {\"url\": ..};\n\
         focus_tab args: {\"tab_id\": ..}; group_tabs args: {\"tab_ids\": [..], \"name\": ..}.\n\
         If no action fits, answer in plain text instead.\n\nOpen tabs:\n",
    );
    for tab in tabs {
        prompt.push_str(&format!("- [{}] {} ({})\n", tab.id, tab.title, tab.url));
    }
    if !graph.clusters().is_empty() {
        prompt.push_str("\nRelated groups already detected:\n");
        for cluster in graph.clusters() {
            prompt.push_str(&format!("- {}: {}\n", cluster.label, cluster.tab_ids.join(", ")));
        }
    }
    prompt.push_str(&format!("\nUser request: {query}\n"));
    prompt
}
