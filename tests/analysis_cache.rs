use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use fixture_edge::cache::{AnalysisCache, Clock, ManualClock};
use fixture_edge::config::{EngineConfig, RetentionPolicy};
use fixture_edge::analysis::AnalysisRecord;
use fixture_edge::error::EngineError;
use fixture_edge::report::LeagueReporter;
use fixture_edge::store::{AnalysisStore, MemoryAnalysisStore, SqliteAnalysisStore};
use fixture_edge::synthetic_feed::SyntheticFeed;

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 10, 18, 9, 0, 0).unwrap(),
    ))
}

fn cache_with(
    feed: SyntheticFeed,
    cfg: EngineConfig,
    store: Arc<dyn AnalysisStore>,
    clock: Arc<ManualClock>,
) -> AnalysisCache {
    let engine = Arc::new(feed).engine(cfg);
    AnalysisCache::new(engine, store).with_clock(clock)
}

#[test]
fn reuse_within_window_is_bit_identical() {
    let feed = SyntheticFeed::new(11, 39);
    let fixture = feed.fixtures()[0].clone();
    let clock = clock();
    let cache = cache_with(
        feed,
        EngineConfig::default(),
        Arc::new(MemoryAnalysisStore::new()),
        clock.clone(),
    );

    let first = cache.get_or_create(&fixture, false).unwrap();
    clock.advance(Duration::hours(2));
    let second = cache.get_or_create(&fixture, false).unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.stats().unwrap().total_records, 1);

    let third = cache.get_or_create(&fixture, true).unwrap();
    assert_eq!(cache.stats().unwrap().total_records, 2);
    assert!(third.created_at > first.created_at);
    assert_eq!(third.probabilities, first.probabilities);

    // The forced record is now the freshest one.
    let fourth = cache.get_or_create(&fixture, false).unwrap();
    assert_eq!(fourth, third);
}

#[test]
fn sqlite_round_trip_is_bit_identical() {
    let feed = SyntheticFeed::new(12, 39);
    let fixture = feed.fixtures()[1].clone();
    let store = Arc::new(SqliteAnalysisStore::open_in_memory().unwrap());
    let cache = cache_with(feed, EngineConfig::default(), store, clock());

    let first = cache.get_or_create(&fixture, false).unwrap();
    let second = cache.get_or_create(&fixture, false).unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.stats().unwrap().total_records, 1);
}

#[test]
fn expired_window_recomputes() {
    let feed = SyntheticFeed::new(13, 39);
    let fixture = feed.fixtures()[0].clone();
    let clock = clock();
    let cache = cache_with(
        feed,
        EngineConfig::default(),
        Arc::new(MemoryAnalysisStore::new()),
        clock.clone(),
    );

    let first = cache.get_or_create(&fixture, false).unwrap();
    clock.advance(Duration::hours(7));
    let stats = cache.stats().unwrap();
    assert_eq!(stats.fresh_records, 0);
    assert_eq!(stats.stale_records, 1);

    let second = cache.get_or_create(&fixture, false).unwrap();
    assert!(second.created_at > first.created_at);
    assert_eq!(cache.stats().unwrap().total_records, 2);
}

#[test]
fn invalidation_forces_next_read_to_recompute() {
    let feed = SyntheticFeed::new(14, 39);
    let fixture = feed.fixtures()[2].clone();
    let clock = clock();
    let cache = cache_with(
        feed,
        EngineConfig::default(),
        Arc::new(MemoryAnalysisStore::new()),
        clock.clone(),
    );

    cache.get_or_create(&fixture, false).unwrap();
    cache.get_or_create(&fixture, true).unwrap();
    assert_eq!(cache.invalidate(fixture.id).unwrap(), 2);
    assert_eq!(cache.invalidate(fixture.id).unwrap(), 0);

    clock.advance(Duration::minutes(1));
    let fresh = cache.get_or_create(&fixture, false).unwrap();
    assert_eq!(fresh.created_at, clock.now());
    assert_eq!(cache.stats().unwrap().total_records, 1);
}

#[test]
fn retention_caps_history_per_fixture() {
    let mut cfg = EngineConfig::default();
    cfg.cache.retention = RetentionPolicy {
        max_entries_per_fixture: Some(2),
        max_age_hours: Some(48),
    };
    let feed = SyntheticFeed::new(15, 39);
    let a = feed.fixtures()[0].clone();
    let b = feed.fixtures()[1].clone();
    let clock = clock();
    let store = Arc::new(SqliteAnalysisStore::open_in_memory().unwrap());
    let cache = cache_with(feed, cfg, store, clock.clone());

    for _ in 0..4 {
        cache.get_or_create(&a, true).unwrap();
        clock.advance(Duration::minutes(10));
    }
    cache.get_or_create(&b, false).unwrap();
    assert_eq!(cache.stats().unwrap().total_records, 3);

    clock.advance(Duration::hours(49));
    assert_eq!(cache.compact().unwrap(), 3);
    assert_eq!(cache.stats().unwrap().total_records, 0);
}

#[test]
fn provider_failure_is_not_cached() {
    let feed = SyntheticFeed::new(16, 39);
    let fixture = feed.fixtures()[0].clone();
    let feed = feed.with_failing_team(fixture.home.id);
    let cache = cache_with(
        feed,
        EngineConfig::default(),
        Arc::new(MemoryAnalysisStore::new()),
        clock(),
    );

    let err = cache.get_or_create(&fixture, false).unwrap_err();
    assert!(matches!(err, EngineError::Provider(_)));
    assert_eq!(cache.stats().unwrap().total_records, 0);
}

/// Reads find nothing and every write fails.
struct ReadOnlyStore;

impl AnalysisStore for ReadOnlyStore {
    fn append(&self, _record: &AnalysisRecord) -> Result<(), EngineError> {
        Err(EngineError::Store("disk full".into()))
    }

    fn latest_since(
        &self,
        _fixture_id: u64,
        _since: DateTime<Utc>,
    ) -> Result<Option<AnalysisRecord>, EngineError> {
        Ok(None)
    }

    fn delete_fixture(&self, _fixture_id: u64) -> Result<usize, EngineError> {
        Ok(0)
    }

    fn compact(
        &self,
        _fixture_id: Option<u64>,
        _policy: &RetentionPolicy,
        _now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        panic!("compaction should not follow a failed write")
    }

    fn count(&self) -> Result<usize, EngineError> {
        Ok(0)
    }

    fn count_since(&self, _since: DateTime<Utc>) -> Result<usize, EngineError> {
        Ok(0)
    }
}

#[test]
fn failed_cache_write_still_returns_the_analysis() {
    let feed = SyntheticFeed::new(17, 39);
    let fixture = feed.fixtures()[0].clone();
    let clock = clock();
    let cache = cache_with(
        feed,
        EngineConfig::default(),
        Arc::new(ReadOnlyStore),
        clock.clone(),
    );

    let record = cache.get_or_create(&fixture, false).unwrap();
    assert_eq!(record.fixture_id(), fixture.id);
    assert_eq!(record.created_at, clock.now());
}

#[test]
fn league_report_survives_an_unwritable_store() {
    let feed = Arc::new(SyntheticFeed::new(18, 39));
    let engine = feed.clone().engine(EngineConfig::default());
    let clock = clock();
    let cache = Arc::new(
        AnalysisCache::new(engine, Arc::new(ReadOnlyStore)).with_clock(clock.clone()),
    );
    let report = LeagueReporter::new(feed, cache).report(39, false).unwrap();

    assert_eq!(report.analysed, 5);
    assert!(report.skipped.is_empty());
    assert_eq!(report.generated_at, clock.now());
}
