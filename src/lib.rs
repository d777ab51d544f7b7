// ── TabPilot Core ──────────────────────────────────────────────────────────
//
// Decision layer for free-text commands aimed at a browser's tab set.
// Each query is dispatched through increasingly expensive tiers:
//
//   1. pattern        deterministic regex rules (close/pin/open/find/count)
//   2. quick_grouping compact local model, simple grouping queries only
//   3. local          larger local reasoning model with graph context
//   4. remote         high-quality remote model, executed by the shell
//
// The middle tiers lean on two analytical engines: a knowledge graph that
// models semantic, domain, and temporal relationships between open tabs,
// and a temporal pattern miner that extracts recurring tab-usage
// sequences from the event history.
//
// The shell (windowing, UI, persistence, IPC) lives outside this crate;
// it feeds tab snapshots and events in and executes the `RouteAction`s
// that come back. `CoreEngine` in `engine::state` is the facade that owns
// all shared state.

pub mod atoms;
pub mod engine;

pub use atoms::error::{CoreError, CoreResult};
pub use atoms::graph_types::{
    BrowseContext, DayPart, GraphExport, GraphNode, GraphStats, RecoverySuggestion, TabCluster,
    TemporalPattern,
};
pub use atoms::types::{
    CoreConfig, GroupSuggestion, MinerConfig, QueryContext, Route, RouteAction, RoutingResult,
    Tab, TabCommand, TabEvent, TabEventKind,
};
pub use engine::state::CoreEngine;
