// ── TabPilot Engine: Query Pre-Classification ──────────────────────────────
//
// Decides which shape a query has before any tier runs. Example:
//   "yes"                        → Conversational  → straight to direct_llm
//   "group my facebook tabs"     → SimpleGrouping  → tier 2 is worth a try
//   "move these to my work workspace" → Workspace  → tier 3, tier 4 backup
//
// Keyword heuristics only — fast, deterministic, no model involved. The
// router trusts this classification for tier gating and for the guarantee
// classes that must never fail silently.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::atoms::constants::COMPLEX_QUERY_WORDS;

/// What kind of query the router is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryClass {
    /// Short/ambiguous follow-ups and generic conversational, identity, or
    /// summary queries. These need conversation context, not tab semantics.
    Conversational,
    /// Grouping by a single well-known site keyword. The compact tier can
    /// handle these.
    SimpleGrouping { site: String },
    /// Grouping that needs real reasoning.
    ComplexGrouping,
    /// Workspace / container / folder manipulation — multi-step reasoning.
    Workspace,
    /// Direct tab action (close / pin / open / focus / find / count).
    TabAction,
    /// Everything else.
    General,
}

impl QueryClass {
    /// Guarantee classes must always yield an actionable result: the router
    /// delegates to the remote tier rather than ever returning a failure.
    pub fn is_guarantee(&self) -> bool {
        matches!(
            self,
            QueryClass::SimpleGrouping { .. }
                | QueryClass::ComplexGrouping
                | QueryClass::Workspace
                | QueryClass::TabAction
        )
    }

    pub fn is_grouping(&self) -> bool {
        matches!(self, QueryClass::SimpleGrouping { .. } | QueryClass::ComplexGrouping)
    }
}

/// Site keywords the compact grouping tier understands. Lower-case, matched
/// as whole words.
static KNOWN_SITES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "amazon", "discord", "ebay", "facebook", "github", "gitlab", "gmail", "instagram",
        "linkedin", "netflix", "notion", "pinterest", "reddit", "slack", "spotify",
        "stackoverflow", "tiktok", "twitch", "twitter", "wikipedia", "youtube",
    ]
    .into_iter()
    .collect()
});

/// Classify one query. Checks run in priority order; the first class that
/// fires wins.
pub fn classify(query: &str) -> QueryClass {
    let q = query.trim().to_lowercase();
    let words: Vec<&str> = q.split_whitespace().collect();

    if is_conversational(&q, &words) {
        return QueryClass::Conversational;
    }

    if contains_any(&q, &["workspace", "container", "folder"]) {
        return QueryClass::Workspace;
    }

    if is_grouping_query(&q) {
        // Exactly one known-site word and nothing suggesting extra logic →
        // the compact tier can take it.
        let sites: Vec<&str> =
            words.iter().copied().filter(|w| KNOWN_SITES.contains(trim_word(w))).collect();
        if sites.len() == 1 && !is_complex(query) {
            return QueryClass::SimpleGrouping { site: trim_word(sites[0]).to_string() };
        }
        return QueryClass::ComplexGrouping;
    }

    if is_tab_action(&q, &words) {
        return QueryClass::TabAction;
    }

    QueryClass::General
}

/// Complexity gate for escalating straight to the remote tier: multi-clause
/// phrasing, negation, length, or abstract-concept vocabulary.
pub fn is_complex(query: &str) -> bool {
    let q = query.trim().to_lowercase();
    let word_count = q.split_whitespace().count();
    if word_count > COMPLEX_QUERY_WORDS {
        return true;
    }
    if contains_any(&q, &["except", "but not", "unless", "don't", "do not", "without", "other than"])
    {
        return true;
    }
    // Multi-clause: coordinating/sequencing connectives or several sentences.
    if contains_any(&q, &[" and then ", " then ", "; ", ", and "]) || q.matches(". ").count() >= 1 {
        return true;
    }
    contains_any(&q, &[
        "prioritize", "priorities", "workflow", "productivity", "relevant", "important",
        "distracting", "focus on", "context", "strategy", "efficient",
    ])
}

fn is_conversational(q: &str, words: &[&str]) -> bool {
    // Ambiguous follow-ups: too short to carry tab semantics, or a bare
    // confirmation. A leading action verb disqualifies — "open gmail" is
    // a command, not a follow-up.
    if words.len() <= 2 && !has_action_verb(words) {
        return true;
    }
    if matches!(q, "just do it" | "go ahead" | "do it again" | "never mind") {
        return true;
    }
    if starts_with_any(q, &[
        "who are you", "what are you", "what can you do", "how are you", "tell me about yourself",
        "thanks", "thank you", "hello", "hey ",
    ]) {
        return true;
    }
    // Summary / general-knowledge questions about the conversation, not tabs.
    starts_with_any(q, &["summarize", "summarise", "what did we", "what were we", "explain "])
        && !q.contains("tab")
}

fn is_grouping_query(q: &str) -> bool {
    contains_any(q, &["group", "organize", "organise", "cluster", "sort my tabs", "tidy"])
}

const ACTION_VERBS: [&str; 9] =
    ["close", "open", "pin", "unpin", "find", "show", "switch", "focus", "count"];

fn has_action_verb(words: &[&str]) -> bool {
    words.iter().any(|w| ACTION_VERBS.contains(&trim_word(w)))
}

fn is_tab_action(q: &str, words: &[&str]) -> bool {
    if has_action_verb(words) && q.contains("tab") {
        return true;
    }
    // A leading action verb is a tab command even without the word "tab":
    // "pin whatever I use the most often", "open gmail", "focus the docs".
    starts_with_any(q, &["close ", "open ", "pin ", "unpin ", "switch ", "focus "])
        || q.contains("how many tabs")
}

fn trim_word(w: &str) -> &str {
    w.trim_matches(|c: char| !c.is_alphanumeric())
}

fn starts_with_any(q: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| q.starts_with(p))
}

fn contains_any(q: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| q.contains(n))
}
