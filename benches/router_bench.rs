// Hot-path benchmarks: graph construction over a realistic tab count and
// the pattern tier's per-query cost. Both run on every shell keystroke
// path, so regressions here are user-visible latency.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use tabpilot_core::engine::graph::TabGraph;
use tabpilot_core::engine::pattern_tier::PatternTier;
use tabpilot_core::{MinerConfig, QueryContext, Tab, TabEvent, TabEventKind};

/// A browsing session spread over a handful of domains, with enough
/// history to exercise the temporal-edge pass.
fn workload(tab_count: usize) -> (Vec<Tab>, Vec<TabEvent>) {
    let domains = ["github.com", "docs.rs", "news.ycombinator.com", "linkedin.com", "wikipedia.org"];
    let tabs: Vec<Tab> = (0..tab_count)
        .map(|i| {
            let domain = domains[i % domains.len()];
            Tab::new(
                i.to_string(),
                format!("Page {i} about topic {}", i % 7),
                format!("https://{domain}/section-{}/page-{i}", i % 3),
            )
        })
        .collect();
    let history: Vec<TabEvent> = (0..tab_count)
        .map(|i| TabEvent::new(TabEventKind::Open, i.to_string(), i as i64 * 60_000))
        .collect();
    (tabs, history)
}

fn bench_graph_build(c: &mut Criterion) {
    let cfg = MinerConfig::default();
    let mut group = c.benchmark_group("graph_build");
    for tab_count in [10usize, 50] {
        let (tabs, history) = workload(tab_count);
        group.bench_function(format!("{tab_count}_tabs"), |b| {
            b.iter(|| TabGraph::build(black_box(&tabs), black_box(&history), &cfg))
        });
    }
    group.finish();
}

fn bench_incremental_add(c: &mut Criterion) {
    let cfg = MinerConfig::default();
    let (tabs, history) = workload(50);
    let newcomer = Tab::new("999", "Fresh page", "https://github.com/fresh");
    c.bench_function("graph_add_node", |b| {
        b.iter_batched(
            || TabGraph::build(&tabs, &history, &cfg),
            |mut graph| graph.add_node(black_box(&newcomer), &history, &cfg),
            BatchSize::SmallInput,
        )
    });
}

fn bench_pattern_tier(c: &mut Criterion) {
    let tier = PatternTier::new();
    let (tabs, _) = workload(50);
    let ctx = QueryContext::default();
    let mut group = c.benchmark_group("pattern_tier");
    group.bench_function("rule_match", |b| {
        b.iter(|| tier.evaluate(black_box("close all my linkedin tabs"), &tabs, &ctx))
    });
    group.bench_function("full_scan_miss", |b| {
        b.iter(|| tier.evaluate(black_box("help me plan a trip to norway"), &tabs, &ctx))
    });
    group.finish();
}

criterion_group!(benches, bench_graph_build, bench_incremental_add, bench_pattern_tier);
criterion_main!(benches);
