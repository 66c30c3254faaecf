use serde::{Deserialize, Serialize};

use crate::goal_model::ExpectedGoals;

pub const DEFAULT_MAX_GOALS: u32 = 10;
/// Upper bound on any goal count a grid or CDF is built to.
pub const MAX_GRID_GOALS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl OutcomeProbabilities {
    pub fn sum(&self) -> f64 {
        self.home_win + self.draw + self.away_win
    }
}

/// Total-goals buckets "0-1", "2-3" and "4+".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalRangeProbabilities {
    #[serde(rename = "0-1")]
    pub low: f64,
    #[serde(rename = "2-3")]
    pub mid: f64,
    #[serde(rename = "4+")]
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverUnder {
    pub line: f64,
    pub over: f64,
    pub under: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchProbabilities {
    pub outcome: OutcomeProbabilities,
    pub goal_ranges: GoalRangeProbabilities,
    pub btts: f64,
    pub over_under: OverUnder,
}

pub fn match_probabilities(xg: &ExpectedGoals, max_goals: u32, goal_line: f64) -> MatchProbabilities {
    MatchProbabilities {
        outcome: outcome_probabilities(xg, max_goals),
        goal_ranges: goal_range_probabilities(xg),
        btts: btts_probability(xg),
        over_under: over_under(xg, goal_line),
    }
}

/// Sums the independent-Poisson score grid `0..=max_goals` on both axes. The omitted tail is
/// left out rather than renormalized, so the sum falls short of 1 by the truncation error.
pub fn outcome_probabilities(xg: &ExpectedGoals, max_goals: u32) -> OutcomeProbabilities {
    let pmf_h = poisson_pmf(xg.home_xg, max_goals);
    let pmf_a = poisson_pmf(xg.away_xg, max_goals);

    let mut home_win = 0.0;
    let mut draw = 0.0;
    let mut away_win = 0.0;

    for (i, p_i) in pmf_h.iter().enumerate() {
        for (j, p_j) in pmf_a.iter().enumerate() {
            let p = p_i * p_j;
            if i > j {
                home_win += p;
            } else if i < j {
                away_win += p;
            } else {
                draw += p;
            }
        }
    }

    OutcomeProbabilities {
        home_win,
        draw,
        away_win,
    }
}

/// Total goals are Poisson with the summed rate, so the buckets come straight from its CDF.
pub fn goal_range_probabilities(xg: &ExpectedGoals) -> GoalRangeProbabilities {
    let total = xg.total();
    let cdf1 = poisson_cdf(total, 1);
    let cdf3 = poisson_cdf(total, 3);
    GoalRangeProbabilities {
        low: cdf1,
        mid: cdf3 - cdf1,
        high: 1.0 - cdf3,
    }
}

/// Probability that each side scores at least once.
pub fn btts_probability(xg: &ExpectedGoals) -> f64 {
    let home_blank = (-xg.home_xg).exp();
    let away_blank = (-xg.away_xg).exp();
    (1.0 - home_blank) * (1.0 - away_blank)
}

/// `over` is P(total goals > line).
pub fn over_under(xg: &ExpectedGoals, line: f64) -> OverUnder {
    let line = if line.is_finite() {
        line.clamp(0.0, f64::from(MAX_GRID_GOALS))
    } else {
        2.5
    };
    let under = poisson_cdf(xg.total(), line.floor() as u32);
    OverUnder {
        line,
        over: 1.0 - under,
        under,
    }
}

pub fn poisson_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let max_k = max_k.min(MAX_GRID_GOALS) as usize;
    let lambda = if lambda.is_finite() { lambda.max(0.0) } else { 0.0 };
    let mut out = vec![0.0; max_k + 1];
    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    out
}

pub fn poisson_cdf(lambda: f64, k: u32) -> f64 {
    poisson_pmf(lambda, k).iter().sum::<f64>().min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pmf_recurrence_matches_closed_form() {
        let pmf = poisson_pmf(1.7, 5);
        let closed = (-1.7f64).exp() * 1.7f64.powi(3) / 6.0;
        assert!((pmf[3] - closed).abs() < 1e-12);
    }

    #[test]
    fn zero_rate_puts_all_mass_on_zero() {
        let pmf = poisson_pmf(0.0, 4);
        assert_eq!(pmf[0], 1.0);
        assert!(pmf[1..].iter().all(|p| *p == 0.0));
        let p = outcome_probabilities(&ExpectedGoals::new(0.0, 0.0), 10);
        assert_eq!(p.draw, 1.0);
    }

    #[test]
    fn low_scoring_scenario() {
        let xg = ExpectedGoals::new(0.36, 0.69);
        let p = outcome_probabilities(&xg, DEFAULT_MAX_GOALS);
        assert!((p.home_win - 0.17).abs() < 0.01);
        assert!((p.draw - 0.44).abs() < 0.01);
        assert!((p.away_win - 0.39).abs() < 0.01);

        let r = goal_range_probabilities(&xg);
        assert!((r.low - 0.72).abs() < 0.01);
        assert!((r.mid - 0.26).abs() < 0.01);
        assert!((r.high - 0.02).abs() < 0.01);
    }

    #[test]
    fn over_under_is_complementary() {
        let xg = ExpectedGoals::new(1.4, 1.1);
        let ou = over_under(&xg, 2.5);
        assert!((ou.over + ou.under - 1.0).abs() < 1e-12);
        // P(total > 2.5) == P(4+) + P(3)
        let r = goal_range_probabilities(&xg);
        let p3 = poisson_pmf(2.5, 3)[3];
        assert!((ou.over - (r.high + p3)).abs() < 1e-12);
    }

    #[test]
    fn oversized_grid_and_line_are_capped() {
        let xg = ExpectedGoals::new(1.2, 0.9);
        assert_eq!(poisson_pmf(1.2, u32::MAX).len(), MAX_GRID_GOALS as usize + 1);
        let huge = outcome_probabilities(&xg, u32::MAX);
        let capped = outcome_probabilities(&xg, MAX_GRID_GOALS);
        assert_eq!(huge, capped);
        assert!((huge.sum() - 1.0).abs() < 1e-9);

        let ou = over_under(&xg, 1e12);
        assert_eq!(ou.line, f64::from(MAX_GRID_GOALS));
        assert!(ou.over < 1e-12);
    }

    #[test]
    fn btts_matches_inclusion_exclusion() {
        let xg = ExpectedGoals::new(1.3, 0.8);
        let h0 = (-1.3f64).exp();
        let a0 = (-0.8f64).exp();
        let alt = 1.0 - h0 - a0 + h0 * a0;
        assert!((btts_probability(&xg) - alt).abs() < 1e-12);
    }
}
