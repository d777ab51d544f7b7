// ── TabPilot Atoms: Constants ──────────────────────────────────────────────
// All named constants for the crate live here.
// Rationale: collecting constants in one place eliminates magic numbers,
// makes auditing the tuning surface easier, and keeps every layer's code
// self-documenting.

// ── Event log ──────────────────────────────────────────────────────────────
// The tab-event log is a fixed-capacity ring: appends beyond the cap evict
// the oldest entry. 1000 entries covers several hours of heavy tab activity
// while keeping session grouping and sequence mining cheap.
pub const EVENT_LOG_CAP: usize = 1000;

// ── Keyword / embedding limits ─────────────────────────────────────────────
// A tab contributes at most this many deduplicated keywords, and its TF-IDF
// embedding is truncated to the same count before L2 normalization.
pub const MAX_KEYWORDS_PER_TAB: usize = 50;
// Tokens this short are almost always glue words even when not in the
// stop list.
pub const MIN_KEYWORD_LEN: usize = 4;

// ── Graph edges ────────────────────────────────────────────────────────────
// Minimum semantic similarity (cosine or keyword Jaccard) for an edge.
pub const SEMANTIC_EDGE_THRESHOLD: f32 = 0.3;
// Tabs on the same domain always get an edge at this fixed weight,
// regardless of keyword similarity.
pub const DOMAIN_EDGE_WEIGHT: f32 = 0.8;
// First co-occurrence within a session creates a temporal edge at this
// weight; each further co-occurrence strengthens it by the step below,
// capped at 1.0.
pub const TEMPORAL_EDGE_BASE_WEIGHT: f32 = 0.3;
pub const TEMPORAL_EDGE_STEP: f32 = 0.1;

// ── Session grouping ───────────────────────────────────────────────────────
// Events further apart than this belong to different sessions when the
// graph derives temporal edges.
pub const GRAPH_SESSION_GAP_MS: i64 = 30 * 60 * 1000;

// ── Clustering ─────────────────────────────────────────────────────────────
// Only edges above this weight count for connected-component traversal.
pub const CLUSTER_EDGE_THRESHOLD: f32 = 0.4;
// Clusters smaller than this are discarded.
pub const MIN_CLUSTER_SIZE: usize = 2;
// Mean intra-cluster edge weight is scaled by this factor (capped at 1.0)
// to produce the cluster confidence.
pub const CLUSTER_CONFIDENCE_SCALE: f32 = 1.2;
// Confidence when a cluster somehow has no intra-cluster edges.
pub const CLUSTER_CONFIDENCE_DEFAULT: f32 = 0.5;

// ── Pattern mining defaults ────────────────────────────────────────────────
pub const MINER_MIN_SUPPORT: u32 = 3;
pub const MINER_MAX_GAP_MS: i64 = 5 * 60 * 1000;
pub const MINER_MIN_LEN: usize = 2;
pub const MINER_MAX_LEN: usize = 5;
// confidence = min(1, frequency / this divisor)
pub const PATTERN_CONFIDENCE_DIVISOR: f32 = 10.0;
// Restoring a fully closed sequence is suggested at reduced confidence.
pub const RECOVERY_CLOSED_PENALTY: f32 = 0.8;

// ── Grouping heuristics ────────────────────────────────────────────────────
pub const HEURISTIC_DOMAIN_EXACT: f32 = 0.5;
pub const HEURISTIC_DOMAIN_SUBSTRING: f32 = 0.3;
pub const HEURISTIC_TITLE_JACCARD_SCALE: f32 = 0.3;
pub const HEURISTIC_PATH_SEGMENT_BONUS: f32 = 0.2;
pub const HEURISTIC_SCORE_THRESHOLD: f32 = 0.2;
pub const HEURISTIC_MAX_CANDIDATES: usize = 10;
// Iterative domain bucketing gives up after this many passes.
pub const BUCKETING_MAX_ITERATIONS: usize = 10;
// Domain buckets are scored in parallel batches of this size.
pub const BUCKETING_BATCH_SIZE: usize = 4;

// ── Router ─────────────────────────────────────────────────────────────────
// Deterministic rule matches are trusted at this fixed confidence.
pub const PATTERN_TIER_CONFIDENCE: f32 = 0.95;
// Queries outside every guarantee class that matched nothing are still
// delegated to the remote tier, at reduced confidence.
pub const FALLBACK_CONFIDENCE: f32 = 0.7;
// A query longer than this many words is classified complex.
pub const COMPLEX_QUERY_WORDS: usize = 15;
// Per-invocation budget for the local reasoning tier before the router
// escalates instead of waiting.
pub const LOCAL_TIER_TIMEOUT_MS: u64 = 20_000;
pub const COMPACT_TIER_TIMEOUT_MS: u64 = 8_000;

// ── Metrics ────────────────────────────────────────────────────────────────
// Per-route latency reservoirs are bounded so stats stay O(1) in memory.
pub const METRICS_LATENCY_WINDOW: usize = 256;
