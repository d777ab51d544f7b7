// ── TabPilot Engine: Tab Event Log ─────────────────────────────────────────
//
// Bounded in-memory log of tab activity (open/close/switch/group). This is
// one of the three pieces of shared mutable state in the core; appends are
// cheap and the ring never grows past its cap, so recording from UI event
// streams is safe at any rate.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::atoms::constants::EVENT_LOG_CAP;
use crate::atoms::types::TabEvent;

/// Cheap identity of an event-history snapshot: entry count plus the
/// timestamp of the newest entry. Not cryptographic — collisions would
/// require appending and also rewinding the clock, which the ring's
/// append-only discipline rules out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HistoryFingerprint {
    pub count: u64,
    pub last_timestamp_ms: i64,
}

impl HistoryFingerprint {
    pub fn of(events: &[TabEvent]) -> Self {
        HistoryFingerprint {
            count: events.len() as u64,
            last_timestamp_ms: events.last().map(|e| e.timestamp_ms).unwrap_or(0),
        }
    }
}

/// Split a history slice into browsing sessions: events are sorted by
/// timestamp and a new session starts wherever the gap between consecutive
/// events exceeds `max_gap_ms`. Both the knowledge graph (30 min gap) and
/// the pattern miner (5 min gap) run on this grouping.
pub fn split_sessions(events: &[TabEvent], max_gap_ms: i64) -> Vec<Vec<TabEvent>> {
    if events.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<TabEvent> = events.to_vec();
    sorted.sort_by_key(|e| e.timestamp_ms);

    let mut sessions: Vec<Vec<TabEvent>> = Vec::new();
    let mut current: Vec<TabEvent> = Vec::new();
    let mut last_ts: Option<i64> = None;

    for event in sorted {
        if let Some(prev) = last_ts {
            if event.timestamp_ms - prev > max_gap_ms {
                sessions.push(std::mem::take(&mut current));
            }
        }
        last_ts = Some(event.timestamp_ms);
        current.push(event);
    }
    if !current.is_empty() {
        sessions.push(current);
    }
    sessions
}

/// Fixed-capacity ring of tab events, oldest evicted first.
#[derive(Debug, Default)]
pub struct TabEventLog {
    events: RwLock<VecDeque<TabEvent>>,
}

impl TabEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event, evicting the oldest entry past the cap.
    pub fn record(&self, event: TabEvent) {
        let mut events = self.events.write();
        events.push_back(event);
        while events.len() > EVENT_LOG_CAP {
            events.pop_front();
        }
    }

    /// Owned copy of the current history, oldest first. Callers analyze
    /// the copy without holding the lock.
    pub fn snapshot(&self) -> Vec<TabEvent> {
        self.events.read().iter().cloned().collect()
    }

    pub fn fingerprint(&self) -> HistoryFingerprint {
        let events = self.events.read();
        HistoryFingerprint {
            count: events.len() as u64,
            last_timestamp_ms: events.back().map(|e| e.timestamp_ms).unwrap_or(0),
        }
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Replace the log wholesale, e.g. when the shell restores persisted
    /// history at startup. The cap still applies; only the newest entries
    /// survive an oversized import.
    pub fn import(&self, history: Vec<TabEvent>) {
        let mut events = self.events.write();
        events.clear();
        let skip = history.len().saturating_sub(EVENT_LOG_CAP);
        events.extend(history.into_iter().skip(skip));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::TabEventKind;

    fn open(tab_id: &str, ts: i64) -> TabEvent {
        TabEvent::new(TabEventKind::Open, tab_id, ts)
    }

    #[test]
    fn test_record_and_snapshot() {
        let log = TabEventLog::new();
        log.record(open("a", 100));
        log.record(open("b", 200));
        let snap = log.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].tab_id, "a");
        assert_eq!(snap[1].tab_id, "b");
    }

    #[test]
    fn test_ring_evicts_oldest_beyond_cap() {
        let log = TabEventLog::new();
        for i in 0..(EVENT_LOG_CAP as i64 + 10) {
            log.record(open(&format!("t{i}"), i));
        }
        assert_eq!(log.len(), EVENT_LOG_CAP);
        let snap = log.snapshot();
        assert_eq!(snap[0].tab_id, "t10");
        assert_eq!(snap.last().map(|e| e.timestamp_ms), Some(EVENT_LOG_CAP as i64 + 9));
    }

    #[test]
    fn test_fingerprint_tracks_count_and_last_timestamp() {
        let log = TabEventLog::new();
        assert_eq!(log.fingerprint(), HistoryFingerprint::default());

        log.record(open("a", 100));
        let fp1 = log.fingerprint();
        log.record(open("b", 250));
        let fp2 = log.fingerprint();

        assert_ne!(fp1, fp2);
        assert_eq!(fp2.count, 2);
        assert_eq!(fp2.last_timestamp_ms, 250);
        assert_eq!(fp2, HistoryFingerprint::of(&log.snapshot()));
    }

    #[test]
    fn test_import_applies_cap_keeping_newest() {
        let log = TabEventLog::new();
        let history: Vec<TabEvent> =
            (0..(EVENT_LOG_CAP as i64 + 5)).map(|i| open(&format!("t{i}"), i)).collect();
        log.import(history);
        assert_eq!(log.len(), EVENT_LOG_CAP);
        assert_eq!(log.snapshot()[0].tab_id, "t5");
    }

    #[test]
    fn test_split_sessions_on_gap() {
        let events = vec![
            open("a", 0),
            open("b", 60_000),
            // 31 minute gap
            open("c", 60_000 + 31 * 60 * 1000),
            open("d", 60_000 + 32 * 60 * 1000),
        ];
        let sessions = split_sessions(&events, 30 * 60 * 1000);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].len(), 2);
        assert_eq!(sessions[1][0].tab_id, "c");
    }

    #[test]
    fn test_split_sessions_sorts_by_timestamp() {
        let events = vec![open("late", 500), open("early", 100)];
        let sessions = split_sessions(&events, 1000);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0][0].tab_id, "early");
    }

    #[test]
    fn test_split_sessions_empty() {
        assert!(split_sessions(&[], 1000).is_empty());
    }
}
