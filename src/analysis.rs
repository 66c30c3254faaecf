use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::confidence::ConfidenceInputs;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fixtures::{Fixture, TeamRef};
use crate::form::{FormComparison, FormResult, compare_forms, form_score, momentum};
use crate::goal_model::{ExpectedGoals, TeamRateStats, expected_goals};
use crate::league_params::LeagueBaselines;
use crate::odds::{MarketOdds, best_odds};
use crate::outcome_model::{MatchProbabilities, match_probabilities};
use crate::quality::{QualityAssessment, TeamQualityMetrics, blend, recent_match_averages};
use crate::sources::{
    OddsSource, PredictionSource, ProviderPrediction, QualitySource, TeamIdResolver,
    TeamStatsSource,
};
use crate::value::{ValueEngine, ValueScan};

// Venue records assumed when the stats provider has nothing for a team.
const FALLBACK_HOME: TeamRateStats = TeamRateStats {
    matches_played: 10,
    goals_scored: 15,
    goals_conceded: 10,
};
const FALLBACK_AWAY: TeamRateStats = TeamRateStats {
    matches_played: 10,
    goals_scored: 12,
    goals_conceded: 12,
};

/// Everything computed for one fixture. Immutable once stored; a refresh produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub fixture: Fixture,
    pub created_at: DateTime<Utc>,
    pub league_avg: f64,
    pub home_stats: TeamRateStats,
    pub away_stats: TeamRateStats,
    /// True when either side's stats were replaced by fallback values.
    pub stats_defaulted: bool,
    pub expected_goals: ExpectedGoals,
    pub probabilities: MatchProbabilities,
    pub home_form: FormResult,
    pub away_form: FormResult,
    pub home_momentum: f64,
    pub away_momentum: f64,
    pub form_comparison: FormComparison,
    pub sample_size: u32,
    /// `None` when the quality provider has nothing for either team.
    pub quality: Option<QualityAssessment>,
    pub odds_available: bool,
    pub odds: Option<MarketOdds>,
    pub value: Option<ValueScan>,
    pub prediction: Option<ProviderPrediction>,
    pub confidence: u8,
}

impl AnalysisRecord {
    pub fn fixture_id(&self) -> u64 {
        self.fixture.id
    }

    pub fn best_edge(&self) -> Option<f64> {
        self.value.as_ref().and_then(|v| v.best_edge())
    }

    pub fn has_value_pick(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.best.is_some())
    }
}

struct QualityProvider {
    source: Arc<dyn QualitySource>,
    resolver: Arc<dyn TeamIdResolver>,
}

/// Runs the full per-fixture pipeline over the collaborator sources.
pub struct AnalysisEngine {
    cfg: EngineConfig,
    baselines: LeagueBaselines,
    stats: Arc<dyn TeamStatsSource>,
    odds: Arc<dyn OddsSource>,
    quality: Option<QualityProvider>,
    predictions: Option<Arc<dyn PredictionSource>>,
    value: ValueEngine,
    stats_fallback: bool,
}

impl AnalysisEngine {
    pub fn new(
        cfg: EngineConfig,
        stats: Arc<dyn TeamStatsSource>,
        odds: Arc<dyn OddsSource>,
    ) -> Self {
        let baselines = LeagueBaselines::new(cfg.model.default_league_avg);
        let value = ValueEngine::new(cfg.value.clone());
        Self {
            cfg,
            baselines,
            stats,
            odds,
            quality: None,
            predictions: None,
            value,
            stats_fallback: true,
        }
    }

    pub fn with_baselines(mut self, baselines: LeagueBaselines) -> Self {
        self.baselines = baselines;
        self
    }

    pub fn with_quality(
        mut self,
        source: Arc<dyn QualitySource>,
        resolver: Arc<dyn TeamIdResolver>,
    ) -> Self {
        self.quality = Some(QualityProvider { source, resolver });
        self
    }

    pub fn with_predictions(mut self, source: Arc<dyn PredictionSource>) -> Self {
        self.predictions = Some(source);
        self
    }

    /// With the fallback off, a team without stats fails the fixture instead.
    pub fn with_stats_fallback(mut self, enabled: bool) -> Self {
        self.stats_fallback = enabled;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn analyze(
        &self,
        fixture: &Fixture,
        now: DateTime<Utc>,
    ) -> Result<AnalysisRecord, EngineError> {
        let league_id = fixture.league_id;
        let home_id = fixture.home.id;
        let away_id = fixture.away.id;

        let home_stats = self
            .stats
            .home_stats(home_id, league_id)
            .map_err(provider_error)?;
        let away_stats = self
            .stats
            .away_stats(away_id, league_id)
            .map_err(provider_error)?;
        let stats_defaulted = home_stats.is_none() || away_stats.is_none();
        let home_stats = self.stats_or_fallback(home_stats, home_id, FALLBACK_HOME)?;
        let away_stats = self.stats_or_fallback(away_stats, away_id, FALLBACK_AWAY)?;

        let baseline = self.baselines.resolve(Some(league_id));
        let xg = expected_goals(
            &home_stats,
            &away_stats,
            &baseline,
            self.baselines.default_avg(),
        );
        let model = &self.cfg.model;
        let probabilities = match_probabilities(&xg, model.max_goals, model.goal_line);

        let home_recent = self
            .stats
            .recent_matches(home_id, league_id)
            .map_err(provider_error)?;
        let away_recent = self
            .stats
            .recent_matches(away_id, league_id)
            .map_err(provider_error)?;
        let form_cfg = &self.cfg.form;
        let home_form = form_score(&home_recent, home_id, form_cfg.window);
        let away_form = form_score(&away_recent, away_id, form_cfg.window);
        let home_momentum = momentum(&home_recent, home_id, form_cfg);
        let away_momentum = momentum(&away_recent, away_id, form_cfg);
        let form_comparison = compare_forms(&home_form, &away_form);
        let sample_size = home_form.matches.min(away_form.matches);

        let quality = self.quality_assessment(fixture);
        let quality_score = quality.as_ref().map(|q| q.quality_score);

        let odds = self.market_odds(fixture);
        let value = odds
            .as_ref()
            .map(|o| self.value.scan(&probabilities, o, sample_size, quality_score));

        let prediction = self.prediction(fixture);

        let confidence = self.cfg.confidence.rate(
            &ConfidenceInputs {
                best_edge: value.as_ref().and_then(|v| v.best_edge()),
                sample_size,
                quality_score,
                home_form: home_form.score,
                away_form: away_form.score,
            },
            &self.cfg.value,
        );

        info!(
            fixture_id = fixture.id,
            fixture = %fixture.label(),
            home_xg = xg.home_xg,
            away_xg = xg.away_xg,
            confidence,
            odds = odds.is_some(),
            quality = quality.is_some(),
            "fixture analysed"
        );

        Ok(AnalysisRecord {
            fixture: fixture.clone(),
            created_at: now,
            league_avg: baseline.sanitized(self.baselines.default_avg()),
            home_stats,
            away_stats,
            stats_defaulted,
            expected_goals: xg,
            probabilities,
            home_form,
            away_form,
            home_momentum,
            away_momentum,
            form_comparison,
            sample_size,
            quality,
            odds_available: odds.is_some(),
            odds,
            value,
            prediction,
            confidence,
        })
    }

    fn stats_or_fallback(
        &self,
        stats: Option<TeamRateStats>,
        team_id: u32,
        fallback: TeamRateStats,
    ) -> Result<TeamRateStats, EngineError> {
        match stats {
            Some(s) => Ok(s),
            None if self.stats_fallback => {
                warn!(team_id, "no team statistics, using fallback record");
                Ok(fallback)
            }
            None => Err(EngineError::MissingTeamStats { team_id }),
        }
    }

    fn market_odds(&self, fixture: &Fixture) -> Option<MarketOdds> {
        match self.odds.bookmaker_odds(fixture) {
            Ok(books) => {
                let best = best_odds(&books);
                if best.is_empty() {
                    debug!(fixture_id = fixture.id, "no odds available");
                    None
                } else {
                    Some(best)
                }
            }
            Err(err) => {
                warn!(fixture_id = fixture.id, "odds fetch failed: {err:#}");
                None
            }
        }
    }

    fn quality_assessment(&self, fixture: &Fixture) -> Option<QualityAssessment> {
        let provider = self.quality.as_ref()?;
        let home = self.team_quality(provider, &fixture.home)?;
        let away = self.team_quality(provider, &fixture.away)?;
        Some(blend(home, away))
    }

    fn team_quality(&self, provider: &QualityProvider, team: &TeamRef) -> Option<TeamQualityMetrics> {
        let Some(source_id) = provider.resolver.resolve(team) else {
            debug!(team_id = team.id, team = %team.name, "no quality-source id for team");
            return None;
        };
        let season = match provider.source.season_aggregates(source_id) {
            Ok(Some(season)) => season,
            Ok(None) => return None,
            Err(err) => {
                warn!(team_id = team.id, source_id, "quality fetch failed: {err:#}");
                return None;
            }
        };
        let recent = match provider.source.recent_match_lines(source_id) {
            Ok(lines) => recent_match_averages(source_id, &lines),
            Err(err) => {
                warn!(source_id, "recent match fetch failed: {err:#}");
                None
            }
        };
        Some(TeamQualityMetrics {
            source_team_id: source_id,
            season,
            recent,
        })
    }

    fn prediction(&self, fixture: &Fixture) -> Option<ProviderPrediction> {
        let source = self.predictions.as_ref()?;
        match source.prediction(fixture) {
            Ok(p) => p,
            Err(err) => {
                warn!(fixture_id = fixture.id, "prediction fetch failed: {err:#}");
                None
            }
        }
    }
}

fn provider_error(err: anyhow::Error) -> EngineError {
    EngineError::Provider(format!("{err:#}"))
}
