use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::fixtures::{Fixture, MatchResult, parse_fixture, parse_match_result};
use crate::goal_model::TeamRateStats;
use crate::odds::{BookmakerOdds, parse_bookmaker_odds};
use crate::quality::{RecentMatchLine, SeasonAggregates};
use crate::sources::{
    FixtureSource, OddsSource, PredictionSource, ProviderPrediction, QualitySource,
    TeamStatsSource, parse_provider_prediction,
};

/// On-disk capture of provider responses. Fixtures, results, odds and predictions are kept in
/// the provider's raw layout and parsed on load.
#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    fixtures: Vec<Value>,
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    home_stats: HashMap<u32, TeamRateStats>,
    #[serde(default)]
    away_stats: HashMap<u32, TeamRateStats>,
    #[serde(default)]
    odds: HashMap<u64, Value>,
    #[serde(default)]
    predictions: HashMap<u64, Value>,
    #[serde(default)]
    quality: HashMap<u32, SeasonAggregates>,
    #[serde(default)]
    quality_matches: HashMap<u32, Vec<RecentMatchLine>>,
}

/// Read-only collaborator set backed by a snapshot file.
#[derive(Debug, Default)]
pub struct SnapshotFeed {
    fixtures: Vec<Fixture>,
    results: Vec<MatchResult>,
    home_stats: HashMap<u32, TeamRateStats>,
    away_stats: HashMap<u32, TeamRateStats>,
    odds: HashMap<u64, Vec<BookmakerOdds>>,
    predictions: HashMap<u64, ProviderPrediction>,
    quality: HashMap<u32, SeasonAggregates>,
    quality_matches: HashMap<u32, Vec<RecentMatchLine>>,
}

impl SnapshotFeed {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read snapshot {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(raw).context("parse snapshot json")?;

        let fixtures: Vec<Fixture> = file.fixtures.iter().filter_map(parse_fixture).collect();
        if fixtures.len() < file.fixtures.len() {
            warn!(
                dropped = file.fixtures.len() - fixtures.len(),
                "snapshot fixtures without id or teams"
            );
        }
        let mut results: Vec<MatchResult> =
            file.results.iter().filter_map(parse_match_result).collect();
        results.sort_by(|a, b| a.utc_time.cmp(&b.utc_time).then(a.id.cmp(&b.id)));

        let odds = file
            .odds
            .iter()
            .map(|(id, v)| (*id, parse_bookmaker_odds(v)))
            .collect();
        let predictions = file
            .predictions
            .iter()
            .filter_map(|(id, v)| parse_provider_prediction(v).map(|p| (*id, p)))
            .collect();

        debug!(
            fixtures = fixtures.len(),
            results = results.len(),
            "snapshot loaded"
        );
        Ok(Self {
            fixtures,
            results,
            home_stats: file.home_stats,
            away_stats: file.away_stats,
            odds,
            predictions,
            quality: file.quality,
            quality_matches: file.quality_matches,
        })
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Finished results, oldest first.
    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }
}

impl FixtureSource for SnapshotFeed {
    fn active_week_fixtures(&self, league_id: u32) -> Result<Vec<Fixture>> {
        let in_league: Vec<&Fixture> = self
            .fixtures
            .iter()
            .filter(|f| f.league_id == league_id)
            .collect();
        // The active week is the earliest round still listed.
        let week = in_league.iter().filter_map(|f| f.week).min();
        Ok(in_league
            .into_iter()
            .filter(|f| week.is_none() || f.week == week)
            .cloned()
            .collect())
    }
}

impl TeamStatsSource for SnapshotFeed {
    fn home_stats(&self, team_id: u32, _league_id: u32) -> Result<Option<TeamRateStats>> {
        Ok(self.home_stats.get(&team_id).copied())
    }

    fn away_stats(&self, team_id: u32, _league_id: u32) -> Result<Option<TeamRateStats>> {
        Ok(self.away_stats.get(&team_id).copied())
    }

    fn recent_matches(&self, team_id: u32, league_id: u32) -> Result<Vec<MatchResult>> {
        Ok(self
            .results
            .iter()
            .filter(|m| m.league_id == league_id && m.goals_for(team_id).is_some())
            .cloned()
            .collect())
    }
}

impl OddsSource for SnapshotFeed {
    fn bookmaker_odds(&self, fixture: &Fixture) -> Result<Vec<BookmakerOdds>> {
        Ok(self.odds.get(&fixture.id).cloned().unwrap_or_default())
    }
}

impl QualitySource for SnapshotFeed {
    fn season_aggregates(&self, source_team_id: u32) -> Result<Option<SeasonAggregates>> {
        Ok(self.quality.get(&source_team_id).copied())
    }

    fn recent_match_lines(&self, source_team_id: u32) -> Result<Vec<RecentMatchLine>> {
        Ok(self
            .quality_matches
            .get(&source_team_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl PredictionSource for SnapshotFeed {
    fn prediction(&self, fixture: &Fixture) -> Result<Option<ProviderPrediction>> {
        Ok(self.predictions.get(&fixture.id).cloned())
    }
}
