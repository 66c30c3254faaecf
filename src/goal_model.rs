use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::league_params::LeagueBaseline;

/// Scoring record of one team in one venue context (home games or away games).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamRateStats {
    pub matches_played: u32,
    pub goals_scored: u32,
    pub goals_conceded: u32,
}

impl TeamRateStats {
    pub fn new(matches_played: u32, goals_scored: u32, goals_conceded: u32) -> Self {
        Self {
            matches_played,
            goals_scored,
            goals_conceded,
        }
    }

    fn matches_or_one(&self) -> f64 {
        if self.matches_played == 0 {
            warn!(
                goals_scored = self.goals_scored,
                goals_conceded = self.goals_conceded,
                "team stats with zero matches played, treating as one"
            );
            1.0
        } else {
            f64::from(self.matches_played)
        }
    }

    pub fn scored_per_match(&self) -> f64 {
        f64::from(self.goals_scored) / self.matches_or_one()
    }

    pub fn conceded_per_match(&self) -> f64 {
        f64::from(self.goals_conceded) / self.matches_or_one()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedGoals {
    pub home_xg: f64,
    pub away_xg: f64,
}

impl ExpectedGoals {
    /// Negative or non-finite inputs are floored at zero.
    pub fn new(home_xg: f64, away_xg: f64) -> Self {
        Self {
            home_xg: non_negative(home_xg),
            away_xg: non_negative(away_xg),
        }
    }

    pub fn total(&self) -> f64 {
        self.home_xg + self.away_xg
    }
}

/// Attack/defense strengths relative to the league average, anchored back to goals.
///
/// `home` is the home side's record in home games, `away` the away side's record in away
/// games. Results are rounded to two decimals.
pub fn expected_goals(
    home: &TeamRateStats,
    away: &TeamRateStats,
    baseline: &LeagueBaseline,
    default_avg: f64,
) -> ExpectedGoals {
    let avg = baseline.sanitized(default_avg);

    let home_attack = home.scored_per_match() / avg;
    let home_defense = home.conceded_per_match() / avg;
    let away_attack = away.scored_per_match() / avg;
    let away_defense = away.conceded_per_match() / avg;

    let home_xg = round2(home_attack * away_defense * avg);
    let away_xg = round2(away_attack * home_defense * avg);

    debug!(
        league_id = ?baseline.league_id,
        league_avg = avg,
        home_xg,
        away_xg,
        "expected goals"
    );
    ExpectedGoals::new(home_xg, away_xg)
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_teams_get_league_average_split() {
        // Both sides score and concede exactly the per-team share of a 2.5 league.
        let home = TeamRateStats::new(10, 25, 25);
        let away = TeamRateStats::new(10, 25, 25);
        let xg = expected_goals(&home, &away, &LeagueBaseline::new(None, 2.5), 2.5);
        assert!((xg.home_xg - 2.5).abs() < 1e-9);
        assert!((xg.away_xg - 2.5).abs() < 1e-9);
    }

    #[test]
    fn strong_attack_meets_weak_defense() {
        let home = TeamRateStats::new(10, 20, 8);
        let away = TeamRateStats::new(10, 9, 18);
        let b = LeagueBaseline::new(Some(39), 2.8);
        let xg = expected_goals(&home, &away, &b, 2.5);
        // (2.0/2.8) * (1.8/2.8) * 2.8 = 2.0 * 1.8 / 2.8
        assert!((xg.home_xg - round2(2.0 * 1.8 / 2.8)).abs() < 1e-9);
        assert!((xg.away_xg - round2(0.9 * 0.8 / 2.8)).abs() < 1e-9);
        assert!(xg.home_xg > xg.away_xg);
    }

    #[test]
    fn zero_matches_and_bad_baseline_do_not_divide_by_zero() {
        let home = TeamRateStats::new(0, 3, 1);
        let away = TeamRateStats::new(0, 0, 0);
        let xg = expected_goals(&home, &away, &LeagueBaseline::new(Some(1), 0.0), 2.5);
        assert!(xg.home_xg.is_finite() && xg.away_xg.is_finite());
        assert!(xg.home_xg >= 0.0 && xg.away_xg >= 0.0);
    }

    #[test]
    fn expected_goals_are_floored_at_zero() {
        let xg = ExpectedGoals::new(-0.3, f64::NAN);
        assert_eq!(xg.home_xg, 0.0);
        assert_eq!(xg.away_xg, 0.0);
    }
}
