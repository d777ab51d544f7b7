// ── TabPilot Engine Layer ──────────────────────────────────────────────────
// All routing, graph, mining, and model-tier logic. Engine modules may
// depend on atoms/ and on each other; shared mutable state is limited to
// the event log, the graph cache, and the grouping engine's feature
// caches, each behind its own lock.

pub mod classify;
pub mod device;
pub mod events;
pub mod graph;
pub mod grouping;
pub mod metrics;
pub mod pattern_tier;
pub mod patterns;
pub mod providers;
pub mod router;
pub mod similarity;
pub mod state;
