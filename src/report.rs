use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::analysis::AnalysisRecord;
use crate::cache::AnalysisCache;
use crate::error::EngineError;
use crate::fixtures::Fixture;
use crate::sources::FixtureSource;

pub const TOP_PICKS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueReportEntry {
    pub fixture_id: u64,
    pub label: String,
    pub record: AnalysisRecord,
    pub confidence: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfidenceBuckets {
    /// 4-5 stars.
    pub high: usize,
    pub medium: usize,
    /// 1-2 stars.
    pub low: usize,
}

impl ConfidenceBuckets {
    pub fn from_entries(entries: &[LeagueReportEntry]) -> Self {
        let mut out = Self::default();
        for e in entries {
            match e.confidence {
                4.. => out.high += 1,
                3 => out.medium += 1,
                _ => out.low += 1,
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFixture {
    pub fixture_id: u64,
    pub label: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueReport {
    pub league_id: u32,
    pub generated_at: DateTime<Utc>,
    /// Highest confidence first.
    pub entries: Vec<LeagueReportEntry>,
    pub top: Vec<LeagueReportEntry>,
    pub buckets: ConfidenceBuckets,
    pub analysed: usize,
    pub skipped: Vec<SkippedFixture>,
}

pub struct LeagueReporter {
    fixtures: Arc<dyn FixtureSource>,
    cache: Arc<AnalysisCache>,
}

impl LeagueReporter {
    pub fn new(fixtures: Arc<dyn FixtureSource>, cache: Arc<AnalysisCache>) -> Self {
        Self { fixtures, cache }
    }

    /// Only a failing fixture listing is fatal; per-fixture failures are recorded as skipped.
    pub fn report(&self, league_id: u32, force_refresh: bool) -> Result<LeagueReport, EngineError> {
        let fixtures = self
            .fixtures
            .active_week_fixtures(league_id)
            .map_err(|err| EngineError::Provider(format!("{err:#}")))?;
        Ok(self.report_fixtures(league_id, &fixtures, force_refresh))
    }

    pub fn report_fixtures(
        &self,
        league_id: u32,
        fixtures: &[Fixture],
        force_refresh: bool,
    ) -> LeagueReport {
        let results: Vec<(&Fixture, Result<AnalysisRecord, EngineError>)> = fixtures
            .par_iter()
            .map(|f| (f, self.cache.get_or_create(f, force_refresh)))
            .collect();

        let mut entries = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (fixture, result) in results {
            match result {
                Ok(record) => entries.push(LeagueReportEntry {
                    fixture_id: fixture.id,
                    label: fixture.label(),
                    confidence: record.confidence,
                    record,
                }),
                Err(err) => {
                    if err.is_missing_data() {
                        warn!(fixture_id = fixture.id, %err, "skipping fixture");
                    } else {
                        error!(fixture_id = fixture.id, %err, "fixture analysis failed");
                    }
                    skipped.push(SkippedFixture {
                        fixture_id: fixture.id,
                        label: fixture.label(),
                        error: err.to_string(),
                    });
                }
            }
        }

        // Stable, so equal confidence keeps fixture order.
        entries.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        let top = entries.iter().take(TOP_PICKS).cloned().collect();
        let buckets = ConfidenceBuckets::from_entries(&entries);

        info!(
            league_id,
            analysed = entries.len(),
            skipped = skipped.len(),
            high = buckets.high,
            medium = buckets.medium,
            low = buckets.low,
            "league report built"
        );

        LeagueReport {
            league_id,
            generated_at: self.cache.now(),
            analysed: entries.len(),
            entries,
            top,
            buckets,
            skipped,
        }
    }
}
