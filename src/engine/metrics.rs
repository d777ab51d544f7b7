// ── TabPilot Engine: Routing Metrics ───────────────────────────────────────
//
// Records one sample per terminal routing decision and aggregates
// per-route counts, latency (average and p95 over a bounded window),
// success rate, and route share. Everything lives behind one mutex;
// recording is a push plus a few counters, cheap enough for the hot path.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::atoms::constants::METRICS_LATENCY_WINDOW;
use crate::atoms::types::Route;

/// One terminal routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSample {
    pub id: Uuid,
    pub route: Route,
    pub latency_ms: u64,
    pub success: bool,
    pub query: String,
    pub confidence: f32,
    pub model: Option<String>,
    pub recorded_at_ms: i64,
}

#[derive(Debug, Default)]
struct RouteBucket {
    count: u64,
    successes: u64,
    confidence_sum: f64,
    /// Recent latencies, oldest evicted past the window.
    latencies: VecDeque<u64>,
}

/// Aggregated view of one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStats {
    pub route: Route,
    pub count: u64,
    pub success_rate: f32,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: u64,
    pub avg_confidence: f32,
    /// This route's share of all recorded queries, in percent.
    pub share_pct: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingStats {
    pub total_queries: u64,
    pub routes: Vec<RouteStats>,
}

#[derive(Debug, Default)]
pub struct RoutingMetrics {
    buckets: Mutex<HashMap<Route, RouteBucket>>,
    recent: Mutex<VecDeque<MetricsSample>>,
}

impl RoutingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        route: Route,
        latency_ms: u64,
        success: bool,
        query: &str,
        confidence: f32,
        model: Option<&str>,
    ) {
        {
            let mut buckets = self.buckets.lock();
            let bucket = buckets.entry(route).or_default();
            bucket.count += 1;
            if success {
                bucket.successes += 1;
            }
            bucket.confidence_sum += confidence as f64;
            bucket.latencies.push_back(latency_ms);
            while bucket.latencies.len() > METRICS_LATENCY_WINDOW {
                bucket.latencies.pop_front();
            }
        }

        let mut recent = self.recent.lock();
        recent.push_back(MetricsSample {
            id: Uuid::new_v4(),
            route,
            latency_ms,
            success,
            query: query.to_string(),
            confidence,
            model: model.map(String::from),
            recorded_at_ms: chrono::Utc::now().timestamp_millis(),
        });
        while recent.len() > METRICS_LATENCY_WINDOW {
            recent.pop_front();
        }
    }

    pub fn stats(&self) -> RoutingStats {
        let buckets = self.buckets.lock();
        let total_queries: u64 = buckets.values().map(|b| b.count).sum();

        let mut routes: Vec<RouteStats> = buckets
            .iter()
            .map(|(route, b)| {
                let avg_latency_ms = if b.latencies.is_empty() {
                    0.0
                } else {
                    b.latencies.iter().sum::<u64>() as f64 / b.latencies.len() as f64
                };
                RouteStats {
                    route: *route,
                    count: b.count,
                    success_rate: if b.count == 0 {
                        0.0
                    } else {
                        b.successes as f32 / b.count as f32
                    },
                    avg_latency_ms,
                    p95_latency_ms: percentile(&b.latencies, 0.95),
                    avg_confidence: if b.count == 0 {
                        0.0
                    } else {
                        (b.confidence_sum / b.count as f64) as f32
                    },
                    share_pct: if total_queries == 0 {
                        0.0
                    } else {
                        b.count as f32 / total_queries as f32 * 100.0
                    },
                }
            })
            .collect();
        routes.sort_by(|a, b| b.count.cmp(&a.count));

        RoutingStats { total_queries, routes }
    }

    /// Most recent samples, oldest first.
    pub fn recent_samples(&self) -> Vec<MetricsSample> {
        self.recent.lock().iter().cloned().collect()
    }
}

/// Nearest-rank percentile over the window. Empty window → 0.
fn percentile(latencies: &VecDeque<u64>, p: f64) -> u64 {
    if latencies.is_empty() {
        return 0;
    }
    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();
    let rank = ((sorted.len() as f64 * p).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_stats() {
        let m = RoutingMetrics::new();
        m.record(Route::Pattern, 2, true, "close all my linkedin tabs", 0.95, None);
        m.record(Route::Pattern, 4, true, "pin github tabs", 0.95, None);
        m.record(Route::Remote, 900, true, "organize everything", 0.85, Some("remote-xl"));

        let stats = m.stats();
        assert_eq!(stats.total_queries, 3);
        let pattern = stats.routes.iter().find(|r| r.route == Route::Pattern).unwrap();
        assert_eq!(pattern.count, 2);
        assert!((pattern.avg_latency_ms - 3.0).abs() < 1e-9);
        assert!((pattern.success_rate - 1.0).abs() < 1e-6);
        assert!((pattern.share_pct - 66.666_67).abs() < 0.01);
    }

    #[test]
    fn test_samples_round_trip_through_json() {
        let m = RoutingMetrics::new();
        m.record(Route::Pattern, 2, true, "close all my linkedin tabs", 0.95, None);
        let samples = m.recent_samples();
        let json = serde_json::to_string(&samples).unwrap();
        let back: Vec<MetricsSample> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id, samples[0].id);
        assert_eq!(back[0].route, Route::Pattern);
    }

    #[test]
    fn test_p95_nearest_rank() {
        let m = RoutingMetrics::new();
        for latency in 1..=100u64 {
            m.record(Route::Local, latency, true, "q", 0.8, None);
        }
        let stats = m.stats();
        let local = stats.routes.iter().find(|r| r.route == Route::Local).unwrap();
        assert_eq!(local.p95_latency_ms, 95);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let m = RoutingMetrics::new();
        for i in 0..(METRICS_LATENCY_WINDOW as u64 + 50) {
            m.record(Route::Pattern, i, true, "q", 0.95, None);
        }
        let stats = m.stats();
        let pattern = stats.routes.iter().find(|r| r.route == Route::Pattern).unwrap();
        // Count keeps the full tally; the latency window forgets the oldest.
        assert_eq!(pattern.count, METRICS_LATENCY_WINDOW as u64 + 50);
        assert!(pattern.avg_latency_ms >= 50.0);
        assert_eq!(m.recent_samples().len(), METRICS_LATENCY_WINDOW);
    }

    #[test]
    fn test_failure_rate() {
        let m = RoutingMetrics::new();
        m.record(Route::Local, 10, true, "a", 0.8, None);
        m.record(Route::Local, 10, false, "b", 0.8, None);
        let stats = m.stats();
        let local = stats.routes.iter().find(|r| r.route == Route::Local).unwrap();
        assert!((local.success_rate - 0.5).abs() < 1e-6);
    }
}
