use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use fixture_edge::cache::AnalysisCache;
use fixture_edge::config::EngineConfig;
use fixture_edge::goal_model::ExpectedGoals;
use fixture_edge::outcome_model::match_probabilities;
use fixture_edge::report::LeagueReporter;
use fixture_edge::store::MemoryAnalysisStore;
use fixture_edge::synthetic_feed::SyntheticFeed;
use fixture_edge::value::remove_margin;

fn bench_match_probabilities(c: &mut Criterion) {
    let xg = ExpectedGoals::new(1.42, 1.07);
    c.bench_function("match_probabilities", |b| {
        b.iter(|| {
            let p = match_probabilities(black_box(&xg), 10, 2.5);
            black_box(p.outcome.home_win);
        })
    });
}

fn bench_remove_margin(c: &mut Criterion) {
    let odds = [2.05, 3.40, 3.75];
    c.bench_function("remove_margin", |b| {
        b.iter(|| black_box(remove_margin(black_box(&odds))))
    });
}

fn bench_league_report_fresh(c: &mut Criterion) {
    let feed = Arc::new(SyntheticFeed::new(2025, 39));
    c.bench_function("league_report_fresh", |b| {
        b.iter(|| {
            let engine = feed.clone().engine(EngineConfig::default());
            let cache = Arc::new(AnalysisCache::new(
                engine,
                Arc::new(MemoryAnalysisStore::new()),
            ));
            let reporter = LeagueReporter::new(feed.clone(), cache);
            let report = reporter.report(39, false).unwrap();
            black_box(report.analysed);
        })
    });
}

fn bench_league_report_cached(c: &mut Criterion) {
    let feed = Arc::new(SyntheticFeed::new(2025, 39));
    let engine = feed.clone().engine(EngineConfig::default());
    let cache = Arc::new(AnalysisCache::new(
        engine,
        Arc::new(MemoryAnalysisStore::new()),
    ));
    let reporter = LeagueReporter::new(feed.clone(), cache);
    reporter.report(39, false).unwrap();

    c.bench_function("league_report_cached", |b| {
        b.iter(|| {
            let report = reporter.report(39, false).unwrap();
            black_box(report.top.len());
        })
    });
}

criterion_group!(
    benches,
    bench_match_probabilities,
    bench_remove_margin,
    bench_league_report_fresh,
    bench_league_report_cached
);
criterion_main!(benches);
