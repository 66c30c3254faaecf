use serde::{Deserialize, Serialize};

use crate::goal_model::round2;

const GOALS_WEIGHT: f64 = 0.35;
const PPG_WEIGHT: f64 = 0.30;
const EXCITEMENT_WEIGHT: f64 = 0.35;

// Combined scoring/points levels that saturate their component at 100.
const GOALS_CAP: f64 = 3.0;
const PPG_CAP: f64 = 5.0;

/// Season-level numbers from the quality-metrics source. Percentages are 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeasonAggregates {
    pub matches_played: u32,
    pub avg_goals_scored: f64,
    pub avg_goals_conceded: f64,
    pub btts_percentage: f64,
    pub over_25_percentage: f64,
    #[serde(default)]
    pub clean_sheet_percentage: f64,
    pub ppg: f64,
}

/// One recent match with per-side detail stats, as the quality source reports it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecentMatchLine {
    pub home_id: u32,
    pub away_id: u32,
    pub home_goals: u32,
    pub away_goals: u32,
    #[serde(default)]
    pub home_corners: f64,
    #[serde(default)]
    pub away_corners: f64,
    #[serde(default)]
    pub home_shots: f64,
    #[serde(default)]
    pub away_shots: f64,
    #[serde(default)]
    pub home_shots_on_target: f64,
    #[serde(default)]
    pub away_shots_on_target: f64,
    #[serde(default)]
    pub home_possession: f64,
    #[serde(default)]
    pub away_possession: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentAverages {
    pub matches: u32,
    pub avg_goals_scored: f64,
    pub avg_goals_conceded: f64,
    pub avg_corners: f64,
    pub avg_shots: f64,
    pub avg_shots_on_target: f64,
    pub avg_possession: f64,
    pub btts_percentage: f64,
    pub over_25_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamQualityMetrics {
    pub source_team_id: u32,
    pub season: SeasonAggregates,
    pub recent: Option<RecentAverages>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub quality_score: f64,
    pub btts_probability: f64,
    pub over_25_probability: f64,
    pub intensity: Intensity,
    pub home: TeamQualityMetrics,
    pub away: TeamQualityMetrics,
}

pub fn blend(home: TeamQualityMetrics, away: TeamQualityMetrics) -> QualityAssessment {
    let h = &home.season;
    let a = &away.season;
    QualityAssessment {
        quality_score: quality_score(h, a),
        btts_probability: btts_probability(h, a),
        over_25_probability: over_25_probability(h, a),
        intensity: intensity(h, a),
        home,
        away,
    }
}

pub fn quality_score(home: &SeasonAggregates, away: &SeasonAggregates) -> f64 {
    let goals = ((home.avg_goals_scored + away.avg_goals_scored) / GOALS_CAP).min(1.0) * 100.0;
    let ppg = ((home.ppg + away.ppg) / PPG_CAP).min(1.0) * 100.0;
    let btts_avg = (home.btts_percentage + away.btts_percentage) / 2.0;
    let over_avg = (home.over_25_percentage + away.over_25_percentage) / 2.0;
    let excitement = (btts_avg + over_avg) / 2.0;

    let score = goals * GOALS_WEIGHT + ppg * PPG_WEIGHT + excitement * EXCITEMENT_WEIGHT;
    round2(score.clamp(0.0, 100.0))
}

pub fn btts_probability(home: &SeasonAggregates, away: &SeasonAggregates) -> f64 {
    round3((home.btts_percentage + away.btts_percentage) / 200.0)
}

/// 60% historical over-2.5 rate, 40% combined scoring rate (saturating at 3 goals).
pub fn over_25_probability(home: &SeasonAggregates, away: &SeasonAggregates) -> f64 {
    let historical = (home.over_25_percentage + away.over_25_percentage) / 200.0;
    let goals = ((home.avg_goals_scored + away.avg_goals_scored) / GOALS_CAP).min(1.0);
    round3(historical * 0.6 + goals * 0.4)
}

pub fn intensity(home: &SeasonAggregates, away: &SeasonAggregates) -> Intensity {
    let goals = home.avg_goals_scored + away.avg_goals_scored;
    let btts_avg = (home.btts_percentage + away.btts_percentage) / 2.0;
    let score = goals * 20.0 + btts_avg * 0.3;
    if score >= 50.0 {
        Intensity::High
    } else if score >= 25.0 {
        Intensity::Medium
    } else {
        Intensity::Low
    }
}

/// Averages over the recent matches `team_id` played in. `None` for an empty list.
pub fn recent_match_averages(team_id: u32, matches: &[RecentMatchLine]) -> Option<RecentAverages> {
    let mut n = 0u32;
    let mut scored = 0.0;
    let mut conceded = 0.0;
    let mut corners = 0.0;
    let mut shots = 0.0;
    let mut on_target = 0.0;
    let mut possession = 0.0;
    let mut btts = 0u32;
    let mut over = 0u32;

    for m in matches {
        let is_home = if m.home_id == team_id {
            true
        } else if m.away_id == team_id {
            false
        } else {
            continue;
        };

        if is_home {
            scored += f64::from(m.home_goals);
            conceded += f64::from(m.away_goals);
            corners += m.home_corners;
            shots += m.home_shots;
            on_target += m.home_shots_on_target;
            possession += m.home_possession;
        } else {
            scored += f64::from(m.away_goals);
            conceded += f64::from(m.home_goals);
            corners += m.away_corners;
            shots += m.away_shots;
            on_target += m.away_shots_on_target;
            possession += m.away_possession;
        }
        if m.home_goals > 0 && m.away_goals > 0 {
            btts += 1;
        }
        if m.home_goals + m.away_goals > 2 {
            over += 1;
        }
        n += 1;
    }

    if n == 0 {
        return None;
    }
    let d = f64::from(n);
    Some(RecentAverages {
        matches: n,
        avg_goals_scored: scored / d,
        avg_goals_conceded: conceded / d,
        avg_corners: corners / d,
        avg_shots: shots / d,
        avg_shots_on_target: on_target / d,
        avg_possession: possession / d,
        btts_percentage: f64::from(btts) / d * 100.0,
        over_25_percentage: f64::from(over) / d * 100.0,
    })
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(goals: f64, ppg: f64, btts: f64, over: f64) -> SeasonAggregates {
        SeasonAggregates {
            matches_played: 20,
            avg_goals_scored: goals,
            avg_goals_conceded: 1.0,
            btts_percentage: btts,
            over_25_percentage: over,
            clean_sheet_percentage: 30.0,
            ppg,
        }
    }

    #[test]
    fn quality_weights() {
        let h = season(1.5, 2.0, 60.0, 50.0);
        let a = season(1.2, 1.5, 40.0, 70.0);
        // goals 2.7/3 -> 90, ppg 3.5/5 -> 70, excitement (50 + 60)/2 = 55
        let expected = 90.0 * 0.35 + 70.0 * 0.30 + 55.0 * 0.35;
        assert!((quality_score(&h, &a) - round2(expected)).abs() < 1e-9);
    }

    #[test]
    fn components_saturate() {
        let h = season(3.0, 3.0, 100.0, 100.0);
        let a = season(3.0, 3.0, 100.0, 100.0);
        assert_eq!(quality_score(&h, &a), 100.0);
        assert_eq!(over_25_probability(&h, &a), 1.0);
        assert_eq!(intensity(&h, &a), Intensity::High);
    }

    #[test]
    fn blended_probabilities() {
        let h = season(1.0, 1.0, 50.0, 40.0);
        let a = season(0.5, 1.0, 30.0, 20.0);
        assert_eq!(btts_probability(&h, &a), 0.4);
        // 0.6 * 0.3 + 0.4 * 0.5
        assert_eq!(over_25_probability(&h, &a), 0.38);
        // 1.5 * 20 + 40 * 0.3 = 42
        assert_eq!(intensity(&h, &a), Intensity::Medium);
        assert_eq!(intensity(&season(0.4, 1.0, 10.0, 0.0), &season(0.4, 1.0, 10.0, 0.0)), Intensity::Low);
    }

    #[test]
    fn recent_averages_attribute_sides() {
        let lines = vec![
            RecentMatchLine {
                home_id: 10,
                away_id: 20,
                home_goals: 2,
                away_goals: 1,
                home_corners: 6.0,
                away_corners: 2.0,
                home_possession: 60.0,
                away_possession: 40.0,
                ..Default::default()
            },
            RecentMatchLine {
                home_id: 30,
                away_id: 10,
                home_goals: 0,
                away_goals: 0,
                home_corners: 5.0,
                away_corners: 4.0,
                home_possession: 45.0,
                away_possession: 55.0,
                ..Default::default()
            },
            RecentMatchLine {
                home_id: 30,
                away_id: 40,
                home_goals: 5,
                away_goals: 5,
                ..Default::default()
            },
        ];
        let avg = recent_match_averages(10, &lines).unwrap();
        assert_eq!(avg.matches, 2);
        assert_eq!(avg.avg_corners, 5.0);
        assert_eq!(avg.avg_possession, 57.5);
        assert_eq!(avg.btts_percentage, 50.0);
        assert_eq!(avg.over_25_percentage, 50.0);
        assert!(recent_match_averages(10, &[]).is_none());
    }
}
