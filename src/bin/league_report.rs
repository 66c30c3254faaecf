use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use fixture_edge::analysis::AnalysisEngine;
use fixture_edge::cache::AnalysisCache;
use fixture_edge::confidence::confidence_label;
use fixture_edge::config::EngineConfig;
use fixture_edge::feed::SnapshotFeed;
use fixture_edge::league_params::{LeagueBaselines, baseline_from_results, default_overrides_path};
use fixture_edge::report::{LeagueReport, LeagueReporter};
use fixture_edge::sources::{FixtureSource, MappedResolver};
use fixture_edge::store::{AnalysisStore, MemoryAnalysisStore, SqliteAnalysisStore};
use fixture_edge::synthetic_feed::SyntheticFeed;

const DEFAULT_LEAGUE: u32 = 39;
const DEFAULT_SEED: u64 = 2025;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fixture_edge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = EngineConfig::from_env();
    let league_id = arg_value(&args, "--league")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(DEFAULT_LEAGUE);
    let force_refresh = args.iter().any(|a| a == "--refresh");
    let strict = args.iter().any(|a| a == "--strict");

    let mut baselines = LeagueBaselines::new(cfg.model.default_league_avg);
    let overrides = arg_value(&args, "--baselines")
        .map(PathBuf::from)
        .or_else(default_overrides_path);
    if let Some(path) = overrides.filter(|p| p.exists()) {
        let n = baselines
            .load_overrides(&path)
            .with_context(|| format!("league baselines {}", path.display()))?;
        tracing::info!(path = %path.display(), leagues = n, "baseline overrides loaded");
    }

    let (engine, fixtures): (AnalysisEngine, Arc<dyn FixtureSource>) =
        match arg_value(&args, "--snapshot") {
            Some(path) => {
                let feed = Arc::new(SnapshotFeed::load(&PathBuf::from(path))?);
                if !feed.results().is_empty() {
                    baselines.set(baseline_from_results(&baselines, league_id, feed.results()));
                }
                let engine = AnalysisEngine::new(cfg.clone(), feed.clone(), feed.clone())
                    .with_quality(feed.clone(), Arc::new(MappedResolver::identity()))
                    .with_predictions(feed.clone());
                (engine, feed as Arc<dyn FixtureSource>)
            }
            None => {
                let seed = arg_value(&args, "--seed")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_SEED);
                let feed = Arc::new(SyntheticFeed::new(seed, league_id));
                (feed.clone().engine(cfg.clone()), feed as Arc<dyn FixtureSource>)
            }
        };
    let engine = engine.with_baselines(baselines).with_stats_fallback(!strict);

    let store: Arc<dyn AnalysisStore> = match arg_value(&args, "--db") {
        Some(path) => Arc::new(SqliteAnalysisStore::open(&PathBuf::from(path))?),
        None => Arc::new(MemoryAnalysisStore::new()),
    };
    let cache = Arc::new(AnalysisCache::new(engine, store));
    let reporter = LeagueReporter::new(fixtures, cache.clone());

    let report = reporter.report(league_id, force_refresh)?;
    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    let stats = cache.stats()?;
    tracing::info!(
        total = stats.total_records,
        fresh = stats.fresh_records,
        stale = stats.stale_records,
        "analysis store"
    );
    Ok(())
}

fn print_report(report: &LeagueReport) {
    println!(
        "league {}  generated {}  analysed={} skipped={}",
        report.league_id,
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.analysed,
        report.skipped.len()
    );
    println!(
        "confidence: high={} medium={} low={}",
        report.buckets.high, report.buckets.medium, report.buckets.low
    );
    println!();
    println!(
        "{:<34} {:>5} {:>5}  {:>5} {:>5} {:>5}  {:>5}  {:<10} pick",
        "fixture", "xgH", "xgA", "1", "X", "2", "btts", "stars"
    );
    for entry in &report.entries {
        let r = &entry.record;
        let o = &r.probabilities.outcome;
        let pick = r
            .value
            .as_ref()
            .and_then(|v| v.best.as_ref())
            .map(|b| {
                format!(
                    "{:?}/{:?} @ {:.2} edge {:+.1}%",
                    b.market,
                    b.selection,
                    b.assessment.bookmaker_odds,
                    b.assessment.edge * 100.0
                )
            })
            .unwrap_or_else(|| if r.odds_available { "-".to_string() } else { "no odds".to_string() });
        println!(
            "{:<34} {:>5.2} {:>5.2}  {:>5.1} {:>5.1} {:>5.1}  {:>5.1}  {:<10} {}",
            truncate(&entry.label, 34),
            r.expected_goals.home_xg,
            r.expected_goals.away_xg,
            o.home_win * 100.0,
            o.draw * 100.0,
            o.away_win * 100.0,
            r.probabilities.btts * 100.0,
            format!("{} {}", entry.confidence, confidence_label(entry.confidence)),
            pick
        );
    }
    if !report.top.is_empty() {
        println!();
        println!("top picks:");
        for (i, entry) in report.top.iter().enumerate() {
            println!("  {}. {} ({} stars)", i + 1, entry.label, entry.confidence);
        }
    }
    for skipped in &report.skipped {
        println!("skipped {} {}: {}", skipped.fixture_id, skipped.label, skipped.error);
    }
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&prefix) {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}
