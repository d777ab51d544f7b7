// ── TabPilot Atoms: Error Types ────────────────────────────────────────────
// Single canonical error enum for the routing core, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (Serialization, Network, Model…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • `CoreError` → `String` conversion is provided via `Display` so that
//     shell IPC boundaries (`Result<T, String>`) can call `.map_err(|e|
//     e.to_string())` without boilerplate.
//   • Tier failures inside the router are recovered by escalation and never
//     reach the caller of `route()`; these variants surface only on the
//     direct engine APIs (grouping, mining, export).

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Model-tier failure: the runtime answered with an error, or produced
    /// output the parse-then-validate step rejected.
    #[error("Model error: {tier}: {message}")]
    Model { tier: String, message: String },

    /// A model tier is not loaded / not reachable. Recoverable — the router
    /// escalates past it.
    #[error("Model tier unavailable: {0}")]
    Unavailable(String),

    /// Structured model output failed validation (missing fields, unknown
    /// function name, malformed criteria). Surfaced to the immediate caller.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Caller-supplied input violated a contract (e.g. empty seed set where
    /// one is required).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl CoreError {
    /// Create a model-tier error with tier label and message.
    pub fn model(tier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model { tier: tier.into(), message: message.into() }
    }
}

// ── Migration bridge: String → CoreError ───────────────────────────────────
// Allows `?` on helpers still returning `Result<T, String>` inside functions
// that return `CoreResult<T>`.

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All fallible core operations return this type.
/// At shell boundaries, convert with `.map_err(|e| e.to_string())`.
pub type CoreResult<T> = Result<T, CoreError>;

// ── Conversion: CoreError → String ─────────────────────────────────────────

impl From<CoreError> for String {
    fn from(e: CoreError) -> Self {
        e.to_string()
    }
}
