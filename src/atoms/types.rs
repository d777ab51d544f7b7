// ── TabPilot Atoms: Core Data Types ────────────────────────────────────────
// Plain struct/enum definitions exchanged across the routing core.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.
//
// The graph-specific model (nodes, edges, clusters, patterns) lives in
// graph_types.rs; this file holds the tab snapshot, the event log entry,
// and the router's input/output surface.

use serde::{Deserialize, Serialize};

use crate::atoms::constants::{MINER_MAX_GAP_MS, MINER_MAX_LEN, MINER_MIN_LEN, MINER_MIN_SUPPORT};

// ── Tab snapshot ───────────────────────────────────────────────────────────

/// Lightweight immutable view of one open tab, passed into the core per
/// call. The core never mutates a tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    /// Stable unique id assigned by the shell.
    pub id: String,
    pub title: String,
    pub url: String,
    /// Derived: lower-cased host with a leading `www.` stripped.
    /// Empty when the URL does not parse — never an error.
    pub domain: String,
}

impl Tab {
    /// Build a snapshot, deriving `domain` from the URL.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let domain = derive_domain(&url);
        Tab { id: id.into(), title: title.into(), url, domain }
    }
}

/// Lower-cased host with `www.` stripped; empty string for unparseable URLs.
pub fn derive_domain(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(u) => {
            let host = u.host_str().unwrap_or("").to_lowercase();
            host.strip_prefix("www.").unwrap_or(&host).to_string()
        }
        Err(_) => String::new(),
    }
}

// ── Tab events ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabEventKind {
    Open,
    Close,
    Switch,
    Group,
}

/// One entry in the append-only tab activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabEvent {
    pub kind: TabEventKind,
    pub tab_id: String,
    /// Wall clock, milliseconds. Monotonic-ish: the log sorts by it before
    /// session grouping, so occasional clock skew is tolerated.
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_tab_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl TabEvent {
    pub fn new(kind: TabEventKind, tab_id: impl Into<String>, timestamp_ms: i64) -> Self {
        TabEvent { kind, tab_id: tab_id.into(), timestamp_ms, from_tab_id: None, group_id: None }
    }
}

// ── Routing surface ────────────────────────────────────────────────────────

/// Which tier produced (or will produce) the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Tier 1: deterministic regex rules.
    Pattern,
    /// Tier 2: compact local model, simple grouping only.
    QuickGrouping,
    /// Tier 3: larger local reasoning model.
    Local,
    /// Tier 4: remote high-quality model (executed by the shell).
    Remote,
    /// Conversational queries bypass all analysis and go straight to the
    /// remote tier with conversation context.
    DirectLlm,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Pattern => "pattern",
            Route::QuickGrouping => "quick_grouping",
            Route::Local => "local",
            Route::Remote => "remote",
            Route::DirectLlm => "direct_llm",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal per-query context handed to handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_tab_id: Option<String>,
}

/// A concrete tab operation a tier *describes*. Handlers never mutate tabs;
/// the shell executes these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabCommand {
    CloseTabs { tab_ids: Vec<String> },
    PinTabs { tab_ids: Vec<String> },
    OpenUrl { url: String },
    FocusTab { tab_id: String },
    /// "find / show me" — the ids that matched, for the shell to highlight.
    ListTabs { tab_ids: Vec<String> },
    CountTabs { count: usize },
}

/// One suggested tab group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSuggestion {
    /// Always ≥ 2 entries; callers may only create a group at that size.
    pub tab_ids: Vec<String>,
    pub name: String,
    /// Clamped to [0, 1].
    pub confidence: f32,
    pub reason: String,
}

/// Tier-specific result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RouteAction {
    Command { command: TabCommand },
    Group { suggestion: GroupSuggestion },
    Groups { groups: Vec<GroupSuggestion> },
    /// The shell must run this prompt against the remote tier.
    /// `force_execution` marks a guarantee-class delegation that may not be
    /// dropped silently.
    Delegate { prompt: String, force_execution: bool },
    /// A model tier answered directly.
    Answer { text: String },
}

/// Terminal result of `route()` — produced for every query, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingResult {
    pub action: RouteAction,
    pub route: Route,
    pub latency_ms: u64,
    /// Clamped to [0, 1].
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

// ── Configuration ──────────────────────────────────────────────────────────

/// Parameters for the temporal pattern miner. All thresholds are explicit so
/// tests can exercise edge densities directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Minimum occurrences for a sequence to become a pattern.
    pub min_support: u32,
    /// Session split gap for the miner (independent of the graph's gap).
    pub max_gap_ms: i64,
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            min_support: MINER_MIN_SUPPORT,
            max_gap_ms: MINER_MAX_GAP_MS,
            min_len: MINER_MIN_LEN,
            max_len: MINER_MAX_LEN,
        }
    }
}

/// Owned configuration for the routing core. Constructed once at process
/// start and passed down — no ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Base URL of the local inference runtime (Ollama wire format).
    pub inference_base_url: String,
    /// Tier 2 model — small, grouping-name quality is enough.
    pub compact_model: String,
    /// Tier 3 model — local reasoning.
    pub reasoning_model: String,
    /// Label attached to remote delegations so the shell knows the target.
    pub remote_model: String,
    pub compact_timeout_ms: u64,
    pub local_timeout_ms: u64,
    pub miner: MinerConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            inference_base_url: "http://localhost:11434".into(),
            compact_model: "qwen2.5:0.5b".into(),
            reasoning_model: "llama3.1:8b".into(),
            remote_model: "gemini-2.5-flash".into(),
            compact_timeout_ms: crate::atoms::constants::COMPACT_TIER_TIMEOUT_MS,
            local_timeout_ms: crate::atoms::constants::LOCAL_TIER_TIMEOUT_MS,
            miner: MinerConfig::default(),
        }
    }
}
