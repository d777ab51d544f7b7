// ── TabPilot Engine: Pattern Match Tier ────────────────────────────────────
//
// Tier 1: a registered table of (regex, handler) pairs evaluated in
// registration order. The first rule whose regex matches wins — its
// handler's verdict is final, with no backtracking into later rules.
// Handlers only *describe* an action against the snapshot (close these
// ids, open this url); the shell executes it.
//
// A handler may still return None on a matched rule (e.g. "open gmial"
// hits the shortcut rule but no shortcut resolves); that makes the whole
// tier return None, and the router escalates.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Instant;

use log::debug;
use regex::Regex;

use crate::atoms::types::{QueryContext, Tab, TabCommand};

/// Named captures a rule may bind, mapped out of the regex by name.
#[derive(Debug, Default, Clone)]
pub struct RuleParams {
    pub domain: Option<String>,
    pub keyword: Option<String>,
    pub url: Option<String>,
    pub count: Option<usize>,
    pub shortcut: Option<String>,
}

type Handler = fn(&[Tab], &RuleParams, &QueryContext) -> Option<TabCommand>;

pub struct PatternRule {
    /// Stable label for logs and metrics.
    pub name: &'static str,
    regex: Regex,
    handler: Handler,
}

impl PatternRule {
    pub fn new(name: &'static str, pattern: &str, handler: Handler) -> Self {
        // Rule patterns are compile-time literals; a malformed one is a
        // programming error, caught by the constructor tests.
        PatternRule { name, regex: Regex::new(pattern).expect("invalid rule pattern"), handler }
    }
}

/// Successful tier-1 outcome. Confidence is fixed by the router (0.95 —
/// deterministic rules are trusted); latency is measured end-to-end
/// around the match loop.
#[derive(Debug, Clone)]
pub struct PatternOutcome {
    pub command: TabCommand,
    pub rule: &'static str,
    pub latency_ms: u64,
}

pub struct PatternTier {
    rules: Vec<PatternRule>,
}

impl Default for PatternTier {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternTier {
    pub fn new() -> Self {
        PatternTier { rules: builtin_rules() }
    }

    /// Tier with a caller-supplied rule table, evaluated in the given
    /// order. Used by tests to pin down ordering behavior.
    pub fn with_rules(rules: Vec<PatternRule>) -> Self {
        PatternTier { rules }
    }

    /// First-match evaluation over the registered rules.
    pub fn evaluate(
        &self,
        query: &str,
        tabs: &[Tab],
        ctx: &QueryContext,
    ) -> Option<PatternOutcome> {
        let start = Instant::now();
        let query = query.trim();

        for rule in &self.rules {
            let Some(caps) = rule.regex.captures(query) else {
                continue;
            };
            let params = RuleParams {
                domain: named(&caps, "domain"),
                keyword: named(&caps, "keyword"),
                // URLs keep their case; paths can be case-sensitive.
                url: caps.name("url").map(|m| m.as_str().to_string()),
                count: named(&caps, "count").and_then(|c| c.parse().ok()),
                shortcut: named(&caps, "shortcut"),
            };
            let command = (rule.handler)(tabs, &params, ctx);
            let latency_ms = start.elapsed().as_millis() as u64;
            debug!("[pattern] rule '{}' matched in {}ms (hit: {})", rule.name, latency_ms, command.is_some());
            // First match wins either way: a None from the handler ends the
            // tier, it does not fall through to later rules.
            return command.map(|command| PatternOutcome { command, rule: rule.name, latency_ms });
        }
        None
    }
}

fn named(caps: &regex::Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_lowercase())
}

/// Shortcut names "open …" understands without a URL.
static SHORTCUTS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("amazon", "https://www.amazon.com"),
        ("calendar", "https://calendar.google.com"),
        ("docs", "https://docs.google.com"),
        ("facebook", "https://www.facebook.com"),
        ("github", "https://github.com"),
        ("gmail", "https://mail.google.com"),
        ("instagram", "https://www.instagram.com"),
        ("linkedin", "https://www.linkedin.com"),
        ("maps", "https://maps.google.com"),
        ("netflix", "https://www.netflix.com"),
        ("reddit", "https://www.reddit.com"),
        ("spotify", "https://open.spotify.com"),
        ("twitter", "https://x.com"),
        ("wikipedia", "https://www.wikipedia.org"),
        ("youtube", "https://www.youtube.com"),
    ])
});

/// Tabs whose domain, title, or URL mentions `token`.
fn matching_ids(tabs: &[Tab], token: &str) -> Vec<String> {
    tabs.iter()
        .filter(|t| {
            t.domain.contains(token)
                || t.title.to_lowercase().contains(token)
                || t.url.to_lowercase().contains(token)
        })
        .map(|t| t.id.clone())
        .collect()
}

/// The built-in rule set, most specific first. Ordering is load-bearing:
/// "close this tab" must precede the by-domain close rule, which would
/// otherwise bind domain="this".
fn builtin_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new("close_active", r"(?i)^close\s+(?:this|the\s+current)\s+tab$", |_, _, ctx| {
            let id = ctx.active_tab_id.clone()?;
            Some(TabCommand::CloseTabs { tab_ids: vec![id] })
        }),
        PatternRule::new("close_all", r"(?i)^close\s+(?:all|every)(?:\s+(?:of\s+)?my)?\s+tabs$", |tabs, _, _| {
            Some(TabCommand::CloseTabs { tab_ids: tabs.iter().map(|t| t.id.clone()).collect() })
        }),
        PatternRule::new("close_count", r"(?i)^close\s+(?:the\s+last\s+)?(?P<count>\d+)\s+tabs$", |tabs, p, _| {
            let count = p.count?;
            let skip = tabs.len().saturating_sub(count);
            Some(TabCommand::CloseTabs {
                tab_ids: tabs.iter().skip(skip).map(|t| t.id.clone()).collect(),
            })
        }),
        PatternRule::new(
            "close_by_domain",
            r"(?i)^close\s+(?:all\s+)?(?:of\s+)?(?:my\s+)?(?P<domain>[a-z0-9.-]+)\s+tabs?$",
            |tabs, p, _| {
                let token = p.domain.as_deref()?;
                Some(TabCommand::CloseTabs { tab_ids: matching_ids(tabs, token) })
            },
        ),
        PatternRule::new(
            "pin_by_domain",
            r"(?i)^pin\s+(?:all\s+)?(?:of\s+)?(?:my\s+)?(?:the\s+)?(?P<domain>[a-z0-9.-]+)\s+tabs?$",
            |tabs, p, _| {
                let token = p.domain.as_deref()?;
                Some(TabCommand::PinTabs { tab_ids: matching_ids(tabs, token) })
            },
        ),
        PatternRule::new("pin_active", r"(?i)^pin\s+(?:this|the\s+current)\s+tab$", |_, _, ctx| {
            let id = ctx.active_tab_id.clone()?;
            Some(TabCommand::PinTabs { tab_ids: vec![id] })
        }),
        PatternRule::new("open_url", r"(?i)^open\s+(?P<url>https?://\S+)$", |_, p, _| {
            Some(TabCommand::OpenUrl { url: p.url.clone()? })
        }),
        PatternRule::new("open_shortcut", r"(?i)^open\s+(?P<shortcut>[a-z]+)$", |_, p, _| {
            let shortcut = p.shortcut.as_deref()?;
            let url = SHORTCUTS.get(shortcut)?;
            Some(TabCommand::OpenUrl { url: (*url).to_string() })
        }),
        PatternRule::new(
            "find_by_keyword",
            r"(?i)^(?:find|show(?:\s+me)?)\s+(?:all\s+)?(?:of\s+)?(?:my\s+)?(?P<keyword>[\w.-]+)\s+tabs?$",
            |tabs, p, _| {
                let token = p.keyword.as_deref()?;
                Some(TabCommand::ListTabs { tab_ids: matching_ids(tabs, token) })
            },
        ),
        PatternRule::new(
            "switch_to",
            r"(?i)^(?:switch\s+to|focus)(?:\s+the)?\s+(?P<keyword>[\w.-]+)(?:\s+tab)?$",
            |tabs, p, _| {
                let token = p.keyword.as_deref()?;
                let id = matching_ids(tabs, token).into_iter().next()?;
                Some(TabCommand::FocusTab { tab_id: id })
            },
        ),
        PatternRule::new(
            "count_tabs",
            r"(?i)^how\s+many\s+tabs(?:\s+(?:do\s+i\s+have|are\s+open))?\??$",
            |tabs, _, _| Some(TabCommand::CountTabs { count: tabs.len() }),
        ),
    ]
}
