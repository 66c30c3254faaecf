use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::confidence::edge_tier_rating;
use crate::config::ValueConfig;
use crate::error::EngineError;
use crate::odds::{Market, MarketOdds, Selection};
use crate::outcome_model::MatchProbabilities;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueAssessment {
    pub calculated_probability: f64,
    pub bookmaker_odds: f64,
    pub implied_probability: f64,
    pub edge: f64,
    pub expected_value: f64,
    pub probability_difference: f64,
    pub is_value: bool,
    pub confidence: u8,
    pub suggested_stake: f64,
}

impl ValueAssessment {
    pub fn stake_fraction(&self, bankroll: f64) -> f64 {
        if bankroll > 0.0 {
            self.suggested_stake / bankroll
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionAssessment {
    pub market: Market,
    pub selection: Selection,
    pub assessment: ValueAssessment,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueScan {
    pub assessments: Vec<SelectionAssessment>,
    /// Highest-edge selection that clears the minimum edge.
    pub best: Option<SelectionAssessment>,
}

impl ValueScan {
    pub fn best_edge(&self) -> Option<f64> {
        self.assessments
            .iter()
            .map(|a| a.assessment.edge)
            .fold(None, |acc: Option<f64>, e| Some(acc.map_or(e, |m| m.max(e))))
    }
}

/// Fails for `odds <= 0`; odds in `(0, 1]` are capped at probability 1.
pub fn implied_probability(odds: f64) -> Result<f64, EngineError> {
    if !(odds > 0.0) {
        error!(odds, "invalid odds, must be positive");
        return Err(EngineError::InvalidOdds(odds));
    }
    if odds <= 1.0 {
        warn!(odds, "odds at or below 1.0, capping implied probability at 1");
        return Ok(1.0);
    }
    Ok(1.0 / odds)
}

pub fn edge(probability: f64, odds: f64) -> f64 {
    probability * odds - 1.0
}

pub fn expected_value(probability: f64, odds: f64, stake: f64) -> f64 {
    probability * (odds - 1.0) * stake - (1.0 - probability) * stake
}

/// Fractional Kelly, capped at `bankroll * max_stake_pct`. Never negative.
pub fn kelly_stake(
    probability: f64,
    odds: f64,
    bankroll: f64,
    kelly_fraction: f64,
    max_stake_pct: f64,
) -> f64 {
    let p = probability.clamp(0.0, 1.0);
    let q = 1.0 - p;
    let b = odds - 1.0;
    if !(b > 0.0) {
        debug!(odds, "no profit at these odds, kelly stake is zero");
        return 0.0;
    }
    if !(bankroll > 0.0) {
        return 0.0;
    }

    let kelly_pct = (b * p - q) / b * kelly_fraction.max(0.0);
    if !(kelly_pct > 0.0) {
        return 0.0;
    }
    (kelly_pct * bankroll).min(bankroll * max_stake_pct.max(0.0))
}

/// Fair odds with the bookmaker margin removed. Invalid input comes back unchanged.
pub fn remove_margin(odds: &[f64]) -> Vec<f64> {
    if odds.is_empty() || odds.iter().any(|o| !o.is_finite() || *o <= 0.0) {
        error!(?odds, "invalid odds set for margin removal");
        return odds.to_vec();
    }
    let total_implied: f64 = odds.iter().map(|o| 1.0 / o).sum();
    odds.iter().map(|o| total_implied / (1.0 / o)).collect()
}

pub fn no_vig_probabilities(odds: &[f64]) -> Option<Vec<f64>> {
    if odds.is_empty() || odds.iter().any(|o| !o.is_finite() || *o <= 0.0) {
        return None;
    }
    let total_implied: f64 = odds.iter().map(|o| 1.0 / o).sum();
    Some(odds.iter().map(|o| (1.0 / o) / total_implied).collect())
}

pub struct ValueEngine {
    cfg: ValueConfig,
}

impl ValueEngine {
    pub fn new(cfg: ValueConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ValueConfig {
        &self.cfg
    }

    pub fn assess(
        &self,
        probability: f64,
        odds: f64,
        sample_size: u32,
        quality_score: Option<f64>,
    ) -> Result<ValueAssessment, EngineError> {
        let implied = implied_probability(odds)?;
        let edge = edge(probability, odds);
        let is_value = edge >= self.cfg.minimum_edge;

        if is_value {
            info!(
                edge_pct = edge * 100.0,
                probability_pct = probability * 100.0,
                implied_pct = implied * 100.0,
                "value bet detected"
            );
        } else {
            debug!(
                edge_pct = edge * 100.0,
                minimum_pct = self.cfg.minimum_edge * 100.0,
                "no value"
            );
        }

        Ok(ValueAssessment {
            calculated_probability: probability,
            bookmaker_odds: odds,
            implied_probability: implied,
            edge,
            expected_value: expected_value(probability, odds, self.cfg.reference_stake),
            probability_difference: probability - implied,
            is_value,
            confidence: edge_tier_rating(edge, sample_size, quality_score, &self.cfg),
            suggested_stake: kelly_stake(
                probability,
                odds,
                self.cfg.bankroll,
                self.cfg.kelly_fraction,
                self.cfg.max_stake_pct,
            ),
        })
    }

    /// Assesses every priced selection. Selections with invalid odds are skipped.
    pub fn scan(
        &self,
        probs: &MatchProbabilities,
        odds: &MarketOdds,
        sample_size: u32,
        quality_score: Option<f64>,
    ) -> ValueScan {
        let mut assessments = Vec::new();
        for market in Market::ALL {
            for &selection in market.selections() {
                let Some(price) = odds.get(market, selection) else {
                    continue;
                };
                let Some(p) = model_probability(probs, market, selection) else {
                    continue;
                };
                match self.assess(p, price, sample_size, quality_score) {
                    Ok(assessment) => assessments.push(SelectionAssessment {
                        market,
                        selection,
                        assessment,
                    }),
                    Err(err) => warn!(?market, ?selection, %err, "skipping selection"),
                }
            }
        }

        let best = assessments
            .iter()
            .filter(|a| a.assessment.is_value)
            .max_by(|a, b| a.assessment.edge.total_cmp(&b.assessment.edge))
            .copied();
        ValueScan { assessments, best }
    }
}

fn model_probability(probs: &MatchProbabilities, market: Market, selection: Selection) -> Option<f64> {
    match (market, selection) {
        (Market::MatchWinner, Selection::Home) => Some(probs.outcome.home_win),
        (Market::MatchWinner, Selection::Draw) => Some(probs.outcome.draw),
        (Market::MatchWinner, Selection::Away) => Some(probs.outcome.away_win),
        (Market::BothTeamsToScore, Selection::Yes) => Some(probs.btts),
        (Market::BothTeamsToScore, Selection::No) => Some(1.0 - probs.btts),
        (Market::OverUnder25, Selection::Over) if is_line_25(probs) => Some(probs.over_under.over),
        (Market::OverUnder25, Selection::Under) if is_line_25(probs) => Some(probs.over_under.under),
        _ => None,
    }
}

fn is_line_25(probs: &MatchProbabilities) -> bool {
    (probs.over_under.line - 2.5).abs() < 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal_model::ExpectedGoals;
    use crate::odds::{BookmakerOdds, Price, best_odds};
    use crate::outcome_model::match_probabilities;

    #[test]
    fn implied_probability_rules() {
        assert_eq!(implied_probability(2.0).unwrap(), 0.5);
        assert_eq!(implied_probability(1.0).unwrap(), 1.0);
        assert_eq!(implied_probability(0.5).unwrap(), 1.0);
        assert_eq!(implied_probability(0.0), Err(EngineError::InvalidOdds(0.0)));
        assert!(implied_probability(-2.0).is_err());
        assert!(implied_probability(f64::NAN).is_err());
    }

    #[test]
    fn edge_and_expected_value() {
        assert!((edge(0.442, 4.76) - 1.10392).abs() < 1e-9);
        // 0.5 * 1.2 * 100 - 0.5 * 100
        assert!((expected_value(0.5, 2.2, 100.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn kelly_caps_and_zeros() {
        // Full kelly (1.0*0.6 - 0.4)/1.0 = 0.2, quarter = 0.05 -> 50 of 1000, cap 50.
        assert!((kelly_stake(0.6, 2.0, 1000.0, 0.25, 0.05) - 50.0).abs() < 1e-9);
        assert!((kelly_stake(0.6, 2.0, 1000.0, 0.25, 0.02) - 20.0).abs() < 1e-9);
        assert_eq!(kelly_stake(0.4, 2.0, 1000.0, 0.25, 0.05), 0.0);
        assert_eq!(kelly_stake(0.9, 1.0, 1000.0, 0.25, 0.05), 0.0);
        assert_eq!(kelly_stake(0.9, 0.5, 1000.0, 0.25, 0.05), 0.0);
    }

    #[test]
    fn margin_removal_invalid_input_unchanged() {
        assert_eq!(remove_margin(&[2.0, -1.0, 3.0]), vec![2.0, -1.0, 3.0]);
        assert!(remove_margin(&[]).is_empty());
        let probs = no_vig_probabilities(&[2.1, 3.4, 3.6]).unwrap();
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scan_picks_highest_value_edge() {
        let engine = ValueEngine::new(ValueConfig::default());
        let probs = match_probabilities(&ExpectedGoals::new(0.36, 0.69), 10, 2.5);
        let books = vec![BookmakerOdds {
            bookmaker: "x".to_string(),
            prices: vec![
                Price { market: Market::MatchWinner, selection: Selection::Home, decimal: 6.0 },
                Price { market: Market::MatchWinner, selection: Selection::Draw, decimal: 4.76 },
                Price { market: Market::MatchWinner, selection: Selection::Away, decimal: 2.0 },
                Price { market: Market::OverUnder25, selection: Selection::Under, decimal: 1.10 },
            ],
        }];
        let scan = engine.scan(&probs, &best_odds(&books), 10, None);
        assert_eq!(scan.assessments.len(), 4);
        let best = scan.best.unwrap();
        assert_eq!(best.selection, Selection::Draw);
        assert!(best.assessment.is_value);
        assert_eq!(best.assessment.confidence, 5);
        assert!(best.assessment.suggested_stake <= 1000.0 * 0.05 + 1e-9);
        assert_eq!(scan.best_edge(), Some(best.assessment.edge));
    }
}
