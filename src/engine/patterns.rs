// ── TabPilot Engine: Temporal Pattern Miner ────────────────────────────────
//
// Mines recurring tab-open sequences from the event history and turns
// them into workflow-recovery and next-tab suggestions. Independent of
// the knowledge graph; shares only the event log format and the session
// grouping helper (with its own, tighter gap).
//
// Everything here is pure: history in, patterns out. Thresholds come from
// `MinerConfig` so tests can exercise sparse and dense histories directly.

use std::collections::HashMap;

use chrono::Timelike;
use log::debug;

use crate::atoms::constants::RECOVERY_CLOSED_PENALTY;
use crate::atoms::graph_types::{DayPart, RecoveryKind, RecoverySuggestion, TemporalPattern};
use crate::atoms::types::{MinerConfig, TabEvent, TabEventKind};
use crate::engine::events::split_sessions;

/// Running tallies for one candidate sequence while mining.
#[derive(Debug, Default)]
struct SequenceStats {
    frequency: u32,
    gap_total_ms: i64,
    gap_count: u32,
    day_parts: HashMap<DayPart, u32>,
}

/// Mine frequent contiguous tab sequences. Events are grouped into
/// sessions by the miner's gap, then every contiguous open/switch
/// subsequence of length [min_len, max_len] is counted across sessions.
/// Sequences reaching min support become patterns, ordered by descending
/// frequency (ties keep first-seen order).
pub fn mine_frequent_sequences(history: &[TabEvent], cfg: &MinerConfig) -> Vec<TemporalPattern> {
    let mut order: Vec<Vec<String>> = Vec::new();
    let mut stats: HashMap<Vec<String>, SequenceStats> = HashMap::new();

    for session in split_sessions(history, cfg.max_gap_ms) {
        let steps: Vec<(&str, i64)> = session
            .iter()
            .filter(|e| matches!(e.kind, TabEventKind::Open | TabEventKind::Switch))
            .map(|e| (e.tab_id.as_str(), e.timestamp_ms))
            .collect();
        if steps.len() < cfg.min_len {
            continue;
        }
        let session_part = DayPart::from_hour(hour_of(steps[0].1));

        for start in 0..steps.len() {
            let longest = cfg.max_len.min(steps.len() - start);
            for len in cfg.min_len..=longest {
                let window = &steps[start..start + len];
                let sequence: Vec<String> = window.iter().map(|(id, _)| id.to_string()).collect();

                let entry = stats.entry(sequence.clone()).or_insert_with(|| {
                    order.push(sequence.clone());
                    SequenceStats::default()
                });
                entry.frequency += 1;
                for pair in window.windows(2) {
                    entry.gap_total_ms += pair[1].1 - pair[0].1;
                    entry.gap_count += 1;
                }
                *entry.day_parts.entry(session_part).or_insert(0) += 1;
            }
        }
    }

    let mut patterns: Vec<TemporalPattern> = order
        .into_iter()
        .filter_map(|sequence| {
            let s = stats.get(&sequence)?;
            if s.frequency < cfg.min_support {
                return None;
            }
            let avg_gap_ms =
                if s.gap_count == 0 { 0 } else { s.gap_total_ms / s.gap_count as i64 };
            Some(TemporalPattern {
                confidence: TemporalPattern::confidence_for(s.frequency),
                context: dominant_day_part(&s.day_parts),
                frequency: s.frequency,
                avg_gap_ms,
                sequence,
            })
        })
        .collect();

    patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    debug!("[miner] mined {} patterns from {} events", patterns.len(), history.len());
    patterns
}

/// Suggestions for resuming a habitual workflow. For every pattern whose
/// prefix equals the currently-focused sequence: suggest the next tab if
/// it is still open, or full-sequence restoration at a reduced confidence
/// if it was closed. Independently, the strongest pattern whose inferred
/// context matches the current time of day is offered as well.
pub fn suggest_workflow_recovery(
    patterns: &[TemporalPattern],
    current_tab_ids: &[String],
    all_tab_ids: &[String],
    now_hour: u32,
) -> Vec<RecoverySuggestion> {
    let mut suggestions: Vec<RecoverySuggestion> = Vec::new();

    for pattern in patterns {
        if pattern.sequence.len() <= current_tab_ids.len()
            || !pattern.sequence.starts_with(current_tab_ids)
        {
            continue;
        }
        let next = &pattern.sequence[current_tab_ids.len()];
        if all_tab_ids.contains(next) {
            suggestions.push(RecoverySuggestion {
                kind: RecoveryKind::Continuation,
                tab_ids: vec![next.clone()],
                confidence: pattern.confidence,
                description: format!("You usually continue to tab {next} from here"),
            });
        } else {
            suggestions.push(RecoverySuggestion {
                kind: RecoveryKind::Restoration,
                tab_ids: pattern.sequence.clone(),
                confidence: pattern.confidence * RECOVERY_CLOSED_PENALTY,
                description: format!(
                    "Restore your usual {}-tab sequence (next tab was closed)",
                    pattern.sequence.len()
                ),
            });
        }
    }

    let part = DayPart::from_hour(now_hour);
    if let Some(pattern) = patterns.iter().find(|p| p.context == Some(part)) {
        suggestions.push(RecoverySuggestion {
            kind: RecoveryKind::TimeOfDay,
            tab_ids: pattern.sequence.clone(),
            confidence: pattern.confidence,
            description: format!("You usually open these tabs together in the {part}"),
        });
    }

    suggestions
}

/// Lighter-weight continuation lookup: just the next tab id for every
/// pattern whose prefix matches, strongest pattern first, deduplicated.
pub fn predict_next_tabs(patterns: &[TemporalPattern], current_tab_ids: &[String]) -> Vec<String> {
    let mut next_ids: Vec<String> = Vec::new();
    for pattern in patterns {
        if pattern.sequence.len() <= current_tab_ids.len()
            || !pattern.sequence.starts_with(current_tab_ids)
        {
            continue;
        }
        let next = pattern.sequence[current_tab_ids.len()].clone();
        if !next_ids.contains(&next) {
            next_ids.push(next);
        }
    }
    next_ids
}

fn hour_of(timestamp_ms: i64) -> u32 {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.hour()).unwrap_or(0)
}

/// Most frequent bucket; ties resolve in fixed bucket order so results
/// are stable run to run.
fn dominant_day_part(counts: &HashMap<DayPart, u32>) -> Option<DayPart> {
    [DayPart::Morning, DayPart::Afternoon, DayPart::Evening, DayPart::Night]
        .into_iter()
        .filter_map(|part| counts.get(&part).map(|c| (part, *c)))
        .max_by_key(|(_, count)| *count)
        .map(|(part, _)| part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(tab_id: &str, ts: i64) -> TabEvent {
        TabEvent::new(TabEventKind::Open, tab_id, ts)
    }

    fn cfg() -> MinerConfig {
        MinerConfig::default()
    }

    /// Three sessions of A→B→C one minute apart, sessions separated by
    /// an hour.
    fn abc_history() -> Vec<TabEvent> {
        let mut history = Vec::new();
        for s in 0..3i64 {
            let base = s * 60 * 60 * 1000;
            history.push(open("A", base));
            history.push(open("B", base + 60_000));
            history.push(open("C", base + 120_000));
        }
        history
    }

    #[test]
    fn test_mines_repeated_sequence_with_default_support() {
        let patterns = mine_frequent_sequences(&abc_history(), &cfg());
        let abc = patterns
            .iter()
            .find(|p| p.sequence == vec!["A".to_string(), "B".to_string(), "C".to_string()]);
        let abc = abc.expect("full A,B,C pattern should be mined");
        assert_eq!(abc.frequency, 3);
        assert!((abc.confidence - 0.3).abs() < 1e-6);
        assert_eq!(abc.avg_gap_ms, 60_000);

        // Sub-sequences of length 2 are counted as well.
        assert!(patterns.iter().any(|p| p.sequence == vec!["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn test_below_support_yields_nothing() {
        let history = vec![open("A", 0), open("B", 60_000)];
        assert!(mine_frequent_sequences(&history, &cfg()).is_empty());
    }

    #[test]
    fn test_session_gap_splits_sequences() {
        // B follows A after 6 minutes — beyond the miner's 5 minute gap,
        // so "A,B" never forms even across many repetitions.
        let mut history = Vec::new();
        for s in 0..5i64 {
            let base = s * 60 * 60 * 1000;
            history.push(open("A", base));
            history.push(open("B", base + 6 * 60 * 1000));
        }
        assert!(mine_frequent_sequences(&history, &cfg()).is_empty());
    }

    #[test]
    fn test_close_events_are_ignored() {
        let mut history = abc_history();
        for s in 0..3i64 {
            history.push(TabEvent::new(TabEventKind::Close, "X", s * 60 * 60 * 1000 + 10_000));
        }
        let patterns = mine_frequent_sequences(&history, &cfg());
        assert!(patterns.iter().all(|p| !p.sequence.contains(&"X".to_string())));
    }

    #[test]
    fn test_sorted_by_frequency_with_stable_ties() {
        // "A,B" occurs in every session; "C,D" only in the first three.
        let mut history = Vec::new();
        for s in 0..4i64 {
            let base = s * 60 * 60 * 1000;
            history.push(open("A", base));
            history.push(open("B", base + 1000));
        }
        for s in 0..3i64 {
            let base = s * 60 * 60 * 1000 + 30 * 60 * 1000;
            history.push(open("C", base));
            history.push(open("D", base + 1000));
        }
        let patterns = mine_frequent_sequences(&history, &cfg());
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].sequence, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(patterns[0].frequency, 4);
        assert_eq!(patterns[1].frequency, 3);
    }

    #[test]
    fn test_max_len_bounds_sequences() {
        let mut history = Vec::new();
        for s in 0..3i64 {
            let base = s * 60 * 60 * 1000;
            for (i, id) in ["A", "B", "C", "D", "E", "F", "G"].iter().enumerate() {
                history.push(open(id, base + i as i64 * 1000));
            }
        }
        let patterns = mine_frequent_sequences(&history, &cfg());
        assert!(!patterns.is_empty());
        assert!(patterns.iter().all(|p| p.sequence.len() <= 5 && p.sequence.len() >= 2));
    }

    #[test]
    fn test_context_reflects_session_hour() {
        // 09:00 UTC on three consecutive days → morning bucket.
        let day = 24 * 60 * 60 * 1000;
        let nine_am = 9 * 60 * 60 * 1000;
        let mut history = Vec::new();
        for d in 0..3i64 {
            history.push(open("A", d * day + nine_am));
            history.push(open("B", d * day + nine_am + 1000));
        }
        let patterns = mine_frequent_sequences(&history, &cfg());
        assert_eq!(patterns[0].context, Some(DayPart::Morning));
    }

    #[test]
    fn test_recovery_continuation_when_next_tab_open() {
        let patterns = mine_frequent_sequences(&abc_history(), &cfg());
        let current = vec!["A".to_string(), "B".to_string()];
        let all = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let suggestions = suggest_workflow_recovery(&patterns, &current, &all, 3);

        let continuation =
            suggestions.iter().find(|s| s.kind == RecoveryKind::Continuation).unwrap();
        assert_eq!(continuation.tab_ids, vec!["C".to_string()]);
        assert!((continuation.confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_recovery_restoration_when_next_tab_closed() {
        let patterns = mine_frequent_sequences(&abc_history(), &cfg());
        let current = vec!["A".to_string(), "B".to_string()];
        let all = current.clone(); // C is closed
        let suggestions = suggest_workflow_recovery(&patterns, &current, &all, 3);

        let restoration =
            suggestions.iter().find(|s| s.kind == RecoveryKind::Restoration).unwrap();
        assert_eq!(restoration.tab_ids.len(), 3);
        assert!((restoration.confidence - 0.3 * RECOVERY_CLOSED_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn test_recovery_time_of_day_matches_current_bucket() {
        // Sessions at 00:00 UTC → night bucket.
        let patterns = mine_frequent_sequences(&abc_history(), &cfg());
        let night = suggest_workflow_recovery(&patterns, &[], &[], 23);
        assert!(night.iter().any(|s| s.kind == RecoveryKind::TimeOfDay));

        let afternoon = suggest_workflow_recovery(&patterns, &["Z".to_string()], &[], 14);
        assert!(afternoon.iter().all(|s| s.kind != RecoveryKind::TimeOfDay));
    }

    #[test]
    fn test_predict_next_tabs_dedups() {
        let patterns = mine_frequent_sequences(&abc_history(), &cfg());
        let next = predict_next_tabs(&patterns, &["A".to_string()]);
        assert_eq!(next, vec!["B".to_string()]);
        assert!(predict_next_tabs(&patterns, &["C".to_string()]).is_empty());
    }
}
