use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fixtures::{Fixture, MatchResult, TeamRef};
use crate::goal_model::TeamRateStats;
use crate::odds::BookmakerOdds;
use crate::quality::{RecentMatchLine, SeasonAggregates};

/// Scheduled fixtures per league.
pub trait FixtureSource: Send + Sync {
    fn active_week_fixtures(&self, league_id: u32) -> Result<Vec<Fixture>>;
}

/// Venue-scoped scoring records and recent results. `Ok(None)` / empty means "no data",
/// `Err` means the provider itself failed.
pub trait TeamStatsSource: Send + Sync {
    fn home_stats(&self, team_id: u32, league_id: u32) -> Result<Option<TeamRateStats>>;
    fn away_stats(&self, team_id: u32, league_id: u32) -> Result<Option<TeamRateStats>>;
    /// Recent results involving the team, oldest first.
    fn recent_matches(&self, team_id: u32, league_id: u32) -> Result<Vec<MatchResult>>;
}

pub trait OddsSource: Send + Sync {
    fn bookmaker_odds(&self, fixture: &Fixture) -> Result<Vec<BookmakerOdds>>;
}

/// Season aggregates keyed by the quality provider's own team ids.
pub trait QualitySource: Send + Sync {
    fn season_aggregates(&self, source_team_id: u32) -> Result<Option<SeasonAggregates>>;
    fn recent_match_lines(&self, _source_team_id: u32) -> Result<Vec<RecentMatchLine>> {
        Ok(Vec::new())
    }
}

/// Maps a fixture-provider team to the quality provider's id space.
pub trait TeamIdResolver: Send + Sync {
    fn resolve(&self, team: &TeamRef) -> Option<u32>;
}

pub trait PredictionSource: Send + Sync {
    fn prediction(&self, fixture: &Fixture) -> Result<Option<ProviderPrediction>>;
}

/// Pre-built id mapping, as produced by the offline onboarding step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappedResolver {
    pub ids: HashMap<u32, u32>,
}

impl MappedResolver {
    pub fn new(ids: HashMap<u32, u32>) -> Self {
        Self { ids }
    }

    /// Every team maps to itself.
    pub fn identity() -> IdentityResolver {
        IdentityResolver
    }
}

impl TeamIdResolver for MappedResolver {
    fn resolve(&self, team: &TeamRef) -> Option<u32> {
        self.ids.get(&team.id).copied()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl TeamIdResolver for IdentityResolver {
    fn resolve(&self, team: &TeamRef) -> Option<u32> {
        Some(team.id)
    }
}

/// A third-party 1X2 prediction, percentages 0-100.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderPrediction {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
    pub winner: Option<String>,
    pub advice: Option<String>,
}

impl ProviderPrediction {
    pub fn is_empty(&self) -> bool {
        self.home.is_none() && self.draw.is_none() && self.away.is_none() && self.winner.is_none()
    }
}

/// Accepts `[{predictions: {...}}]`, `{predictions: {...}}` or the bare predictions object.
pub fn parse_provider_prediction(v: &Value) -> Option<ProviderPrediction> {
    let item = match v {
        Value::Array(arr) => arr.first()?,
        Value::Object(_) => v,
        _ => return None,
    };
    let pred = item.get("predictions").unwrap_or(item);
    let percent = pred.get("percent");

    let out = ProviderPrediction {
        home: percent.and_then(|p| p.get("home")).and_then(percent_value),
        draw: percent.and_then(|p| p.get("draw")).and_then(percent_value),
        away: percent.and_then(|p| p.get("away")).and_then(percent_value),
        winner: pred
            .get("winner")
            .and_then(|w| w.get("name").or(Some(w)))
            .and_then(|w| w.as_str())
            .map(str::to_string),
        advice: pred
            .get("advice")
            .and_then(|a| a.as_str())
            .map(str::to_string),
    };
    (!out.is_empty()).then_some(out)
}

fn percent_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_percent_cell(s),
        _ => None,
    }
}

fn parse_percent_cell(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let s = s.trim_end_matches('%').replace(',', "");
    s.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_and_object_payloads_agree() {
        let body = r#"{"predictions": {
            "winner": {"id": 33, "name": "Manchester United"},
            "advice": "Double chance : Manchester United or draw",
            "percent": {"home": "45%", "draw": "30%", "away": "25%"}
        }}"#;
        let obj: Value = serde_json::from_str(body).unwrap();
        let list = Value::Array(vec![obj.clone()]);

        let a = parse_provider_prediction(&obj).unwrap();
        let b = parse_provider_prediction(&list).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.home, Some(45.0));
        assert_eq!(a.away, Some(25.0));
        assert_eq!(a.winner.as_deref(), Some("Manchester United"));
    }

    #[test]
    fn percent_cells() {
        assert_eq!(parse_percent_cell("58%"), Some(58.0));
        assert_eq!(parse_percent_cell(" 12 "), Some(12.0));
        assert_eq!(parse_percent_cell("-"), None);
        let v: Value = serde_json::json!({"percent": {"home": 50, "draw": "x", "away": null}});
        let p = parse_provider_prediction(&v).unwrap();
        assert_eq!(p.home, Some(50.0));
        assert_eq!(p.draw, None);
    }

    #[test]
    fn empty_payloads_are_none() {
        assert!(parse_provider_prediction(&Value::Array(vec![])).is_none());
        assert!(parse_provider_prediction(&serde_json::json!({})).is_none());
        assert!(parse_provider_prediction(&Value::Null).is_none());
    }

    #[test]
    fn mapped_resolver_is_opaque_lookup() {
        let r = MappedResolver::new(HashMap::from([(1, 901)]));
        let team = |id| TeamRef {
            id,
            name: "x".to_string(),
        };
        assert_eq!(r.resolve(&team(1)), Some(901));
        assert_eq!(r.resolve(&team(2)), None);
        assert_eq!(MappedResolver::identity().resolve(&team(2)), Some(2));
    }
}
