use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::analysis::AnalysisEngine;
use crate::config::EngineConfig;
use crate::fixtures::{Fixture, MatchResult, TeamRef};
use crate::goal_model::TeamRateStats;
use crate::odds::{BookmakerOdds, Market, Price, Selection};
use crate::quality::{RecentMatchLine, SeasonAggregates};
use crate::sources::{
    FixtureSource, MappedResolver, OddsSource, PredictionSource, ProviderPrediction,
    QualitySource, TeamStatsSource, parse_provider_prediction,
};

const TEAMS: [&str; 10] = [
    "Harbour City",
    "Northgate",
    "Red Mill",
    "Lakeside",
    "Old Forge",
    "Westmoor",
    "Kingsbridge",
    "Ashford Town",
    "Riverside",
    "Eastcliff",
];

const FIXTURE_ID_BASE: u64 = 700_000;
const QUALITY_ID_OFFSET: u32 = 50_000;
const RECENT_MATCHES: usize = 8;
const BOOKMAKERS: [&str; 2] = ["northbet", "southbook"];

/// Deterministic fake league for demos, benches and tests. Everything is drawn from a seeded
/// RNG at construction so the source traits stay pure lookups.
pub struct SyntheticFeed {
    league_id: u32,
    fixtures: Vec<Fixture>,
    home_stats: HashMap<u32, TeamRateStats>,
    away_stats: HashMap<u32, TeamRateStats>,
    recent: HashMap<u32, Vec<MatchResult>>,
    odds: HashMap<u64, Vec<BookmakerOdds>>,
    quality: HashMap<u32, SeasonAggregates>,
    lines: HashMap<u32, Vec<RecentMatchLine>>,
    failing_teams: HashSet<u32>,
}

impl SyntheticFeed {
    pub fn new(seed: u64, league_id: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let team_ids: Vec<u32> = (0..TEAMS.len() as u32).map(|i| league_id * 100 + i + 1).collect();

        let mut home_stats = HashMap::new();
        let mut away_stats = HashMap::new();
        let mut recent = HashMap::new();
        let mut quality = HashMap::new();
        let mut lines = HashMap::new();
        let start = NaiveDate::from_ymd_opt(2025, 8, 9).unwrap_or_default();

        for (idx, &id) in team_ids.iter().enumerate() {
            let attack = rng.gen_range(0.7..2.1);
            let leak = rng.gen_range(0.7..1.9);
            home_stats.insert(id, venue_stats(&mut rng, attack * 1.1, leak * 0.9));
            away_stats.insert(id, venue_stats(&mut rng, attack * 0.9, leak * 1.1));

            let mut played = Vec::with_capacity(RECENT_MATCHES);
            let mut detail = Vec::with_capacity(RECENT_MATCHES);
            for k in 0..RECENT_MATCHES {
                let opponent = team_ids[(idx + k + 1) % team_ids.len()];
                let at_home = k % 2 == 0;
                let (home_id, away_id) = if at_home { (id, opponent) } else { (opponent, id) };
                let home_goals: u8 = rng.gen_range(0..=3);
                let away_goals: u8 = rng.gen_range(0..=2);
                let day = start + Duration::days(7 * k as i64);
                played.push(MatchResult {
                    id: u64::from(id) * 100 + k as u64,
                    utc_time: day.and_time(NaiveTime::MIN).and_utc().to_rfc3339(),
                    league_id,
                    home_id,
                    away_id,
                    home_goals,
                    away_goals,
                    finished: true,
                    cancelled: false,
                });
                detail.push(RecentMatchLine {
                    home_id: home_id + QUALITY_ID_OFFSET,
                    away_id: away_id + QUALITY_ID_OFFSET,
                    home_goals: u32::from(home_goals),
                    away_goals: u32::from(away_goals),
                    home_corners: f64::from(rng.gen_range(2..10u32)),
                    away_corners: f64::from(rng.gen_range(1..8u32)),
                    home_shots: f64::from(rng.gen_range(8..20u32)),
                    away_shots: f64::from(rng.gen_range(5..16u32)),
                    home_shots_on_target: f64::from(rng.gen_range(2..8u32)),
                    away_shots_on_target: f64::from(rng.gen_range(1..6u32)),
                    home_possession: f64::from(rng.gen_range(40..62u32)),
                    away_possession: 0.0,
                });
            }
            for d in &mut detail {
                d.away_possession = 100.0 - d.home_possession;
            }
            recent.insert(id, played);

            // The last team is unknown to the quality provider.
            if idx + 1 < team_ids.len() {
                let qid = id + QUALITY_ID_OFFSET;
                quality.insert(qid, season_aggregates(&mut rng, attack, leak));
                lines.insert(qid, detail);
            }
        }

        let mut fixtures = Vec::new();
        let mut odds = HashMap::new();
        for pair in 0..team_ids.len() / 2 {
            let home = pair * 2;
            let away = pair * 2 + 1;
            let fixture = Fixture {
                id: FIXTURE_ID_BASE + u64::from(league_id) * 100 + pair as u64,
                league_id,
                season: Some(2025),
                week: Some(9),
                kickoff: Some(format!("2025-10-{:02}T15:00:00+00:00", 18 + pair % 2)),
                home: TeamRef {
                    id: team_ids[home],
                    name: TEAMS[home].to_string(),
                },
                away: TeamRef {
                    id: team_ids[away],
                    name: TEAMS[away].to_string(),
                },
            };
            // The last fixture has no market yet.
            if pair + 1 < team_ids.len() / 2 {
                odds.insert(fixture.id, synthetic_books(&mut rng));
            }
            fixtures.push(fixture);
        }

        Self {
            league_id,
            fixtures,
            home_stats,
            away_stats,
            recent,
            odds,
            quality,
            lines,
            failing_teams: HashSet::new(),
        }
    }

    /// Makes the stats provider error for `team_id`.
    pub fn with_failing_team(mut self, team_id: u32) -> Self {
        self.failing_teams.insert(team_id);
        self
    }

    /// Removes the venue records for `team_id`, leaving recent results in place.
    pub fn without_stats(mut self, team_id: u32) -> Self {
        self.home_stats.remove(&team_id);
        self.away_stats.remove(&team_id);
        self
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn resolver(&self) -> MappedResolver {
        let ids = self
            .home_stats
            .keys()
            .chain(self.away_stats.keys())
            .chain(self.recent.keys())
            .map(|id| (*id, id + QUALITY_ID_OFFSET))
            .collect();
        MappedResolver::new(ids)
    }

    /// Engine wired to this feed for every collaborator.
    pub fn engine(self: Arc<Self>, cfg: EngineConfig) -> AnalysisEngine {
        let resolver = Arc::new(self.resolver());
        AnalysisEngine::new(cfg, self.clone(), self.clone())
            .with_quality(self.clone(), resolver)
            .with_predictions(self)
    }

    fn check(&self, team_id: u32) -> Result<()> {
        if self.failing_teams.contains(&team_id) {
            bail!("synthetic provider outage for team {team_id}");
        }
        Ok(())
    }
}

fn venue_stats(rng: &mut StdRng, scored_rate: f64, conceded_rate: f64) -> TeamRateStats {
    let matches = rng.gen_range(6..14u32);
    let m = f64::from(matches);
    TeamRateStats::new(
        matches,
        (m * scored_rate).round() as u32,
        (m * conceded_rate).round() as u32,
    )
}

fn season_aggregates(rng: &mut StdRng, attack: f64, leak: f64) -> SeasonAggregates {
    SeasonAggregates {
        matches_played: rng.gen_range(10..30),
        avg_goals_scored: attack,
        avg_goals_conceded: leak,
        btts_percentage: rng.gen_range(25.0..75.0),
        over_25_percentage: rng.gen_range(25.0..75.0),
        clean_sheet_percentage: rng.gen_range(10.0..45.0),
        ppg: rng.gen_range(0.7..2.4),
    }
}

fn synthetic_books(rng: &mut StdRng) -> Vec<BookmakerOdds> {
    let home = rng.gen_range(1.6..4.2);
    let draw = rng.gen_range(3.0..4.4);
    let away = rng.gen_range(1.9..5.5);
    let yes = rng.gen_range(1.55..2.2);
    let over = rng.gen_range(1.6..2.4);

    BOOKMAKERS
        .iter()
        .map(|name| {
            let mut jitter = |v: f64| round_price(v + rng.gen_range(-0.15..0.15));
            BookmakerOdds {
                bookmaker: name.to_string(),
                prices: vec![
                    price(Market::MatchWinner, Selection::Home, jitter(home)),
                    price(Market::MatchWinner, Selection::Draw, jitter(draw)),
                    price(Market::MatchWinner, Selection::Away, jitter(away)),
                    price(Market::BothTeamsToScore, Selection::Yes, jitter(yes)),
                    price(Market::BothTeamsToScore, Selection::No, jitter(3.6 - yes)),
                    price(Market::OverUnder25, Selection::Over, jitter(over)),
                    price(Market::OverUnder25, Selection::Under, jitter(3.7 - over)),
                ],
            }
        })
        .collect()
}

fn price(market: Market, selection: Selection, decimal: f64) -> Price {
    Price {
        market,
        selection,
        decimal,
    }
}

fn round_price(v: f64) -> f64 {
    (v.max(1.01) * 100.0).round() / 100.0
}

impl FixtureSource for SyntheticFeed {
    fn active_week_fixtures(&self, league_id: u32) -> Result<Vec<Fixture>> {
        if league_id != self.league_id {
            return Ok(Vec::new());
        }
        Ok(self.fixtures.clone())
    }
}

impl TeamStatsSource for SyntheticFeed {
    fn home_stats(&self, team_id: u32, _league_id: u32) -> Result<Option<TeamRateStats>> {
        self.check(team_id)?;
        Ok(self.home_stats.get(&team_id).copied())
    }

    fn away_stats(&self, team_id: u32, _league_id: u32) -> Result<Option<TeamRateStats>> {
        self.check(team_id)?;
        Ok(self.away_stats.get(&team_id).copied())
    }

    fn recent_matches(&self, team_id: u32, _league_id: u32) -> Result<Vec<MatchResult>> {
        self.check(team_id)?;
        Ok(self.recent.get(&team_id).cloned().unwrap_or_default())
    }
}

impl OddsSource for SyntheticFeed {
    fn bookmaker_odds(&self, fixture: &Fixture) -> Result<Vec<BookmakerOdds>> {
        Ok(self.odds.get(&fixture.id).cloned().unwrap_or_default())
    }
}

impl QualitySource for SyntheticFeed {
    fn season_aggregates(&self, source_team_id: u32) -> Result<Option<SeasonAggregates>> {
        Ok(self.quality.get(&source_team_id).copied())
    }

    fn recent_match_lines(&self, source_team_id: u32) -> Result<Vec<RecentMatchLine>> {
        Ok(self.lines.get(&source_team_id).cloned().unwrap_or_default())
    }
}

impl PredictionSource for SyntheticFeed {
    fn prediction(&self, fixture: &Fixture) -> Result<Option<ProviderPrediction>> {
        let Some(books) = self.odds.get(&fixture.id) else {
            return Ok(None);
        };
        let pct = |sel: Selection| {
            books
                .first()
                .and_then(|b| {
                    b.prices
                        .iter()
                        .find(|p| p.market == Market::MatchWinner && p.selection == sel)
                })
                .map(|p| format!("{:.0}%", 100.0 / p.decimal))
        };
        let body = json!({
            "predictions": {
                "winner": {"id": fixture.home.id, "name": fixture.home.name},
                "advice": format!("Double chance : {} or draw", fixture.home.name),
                "percent": {
                    "home": pct(Selection::Home),
                    "draw": pct(Selection::Draw),
                    "away": pct(Selection::Away),
                }
            }
        });
        // The live provider wraps single predictions in a list half the time.
        let payload = if fixture.id % 2 == 0 {
            serde_json::Value::Array(vec![body])
        } else {
            body
        };
        Ok(parse_provider_prediction(&payload))
    }
}
