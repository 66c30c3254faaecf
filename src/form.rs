use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FormConfig;
use crate::fixtures::MatchResult;
use crate::goal_model::round2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormResult {
    /// `None` when none of the supplied matches involved the team. Never conflate with 0.
    pub score: Option<f64>,
    pub matches: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_scored: u32,
    pub goals_conceded: u32,
    pub goal_difference: i32,
    /// Oldest first, e.g. "WWDLW".
    pub result_sequence: String,
    pub points: u32,
}

impl FormResult {
    fn empty() -> Self {
        Self {
            score: None,
            matches: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_scored: 0,
            goals_conceded: 0,
            goal_difference: 0,
            result_sequence: String::new(),
            points: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormAdvantage {
    StrongHome,
    ModerateHome,
    Balanced,
    ModerateAway,
    StrongAway,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormComparison {
    pub home_score: Option<f64>,
    pub away_score: Option<f64>,
    pub score_difference: Option<f64>,
    pub advantage: FormAdvantage,
}

/// Scores the last `window` matches `team_id` actually played in, in the order supplied
/// (oldest first). Home/away is decided per match.
pub fn form_score(matches: &[MatchResult], team_id: u32, window: usize) -> FormResult {
    let played = attributed(matches, team_id);
    let start = played.len().saturating_sub(window);
    score_slice(&played[start..])
}

/// Second-half score minus first-half score over the most recent matches. Neutral (0) when
/// fewer than `momentum_min_matches` matches can be attributed.
pub fn momentum(matches: &[MatchResult], team_id: u32, cfg: &FormConfig) -> f64 {
    let played = attributed(matches, team_id);
    if played.len() < cfg.momentum_min_matches.max(2) {
        return 0.0;
    }
    let n = cfg.momentum_window.max(2).min(played.len());
    let recent = &played[played.len() - n..];
    let (first, second) = recent.split_at(n / 2);

    let first = score_slice(first).score;
    let second = score_slice(second).score;
    let momentum = match (first, second) {
        (Some(a), Some(b)) => round2(b - a),
        _ => 0.0,
    };
    debug!(team_id, momentum, "form momentum");
    momentum
}

pub fn compare_forms(home: &FormResult, away: &FormResult) -> FormComparison {
    let (advantage, diff) = match (home.score, away.score) {
        (Some(h), Some(a)) => {
            let diff = h - a;
            let advantage = if diff > 20.0 {
                FormAdvantage::StrongHome
            } else if diff > 10.0 {
                FormAdvantage::ModerateHome
            } else if diff < -20.0 {
                FormAdvantage::StrongAway
            } else if diff < -10.0 {
                FormAdvantage::ModerateAway
            } else {
                FormAdvantage::Balanced
            };
            (advantage, Some(round2(diff)))
        }
        _ => (FormAdvantage::Unknown, None),
    };
    FormComparison {
        home_score: home.score,
        away_score: away.score,
        score_difference: diff,
        advantage,
    }
}

pub fn form_rating(score: f64) -> &'static str {
    if score >= 80.0 {
        "Excellent"
    } else if score >= 60.0 {
        "Good"
    } else if score >= 40.0 {
        "Average"
    } else if score >= 20.0 {
        "Poor"
    } else {
        "Very Poor"
    }
}

// (scored, conceded) for every countable match the team played, oldest first.
fn attributed(matches: &[MatchResult], team_id: u32) -> Vec<(u8, u8)> {
    matches
        .iter()
        .filter(|m| m.is_countable())
        .filter_map(|m| m.goals_for(team_id))
        .collect()
}

fn score_slice(games: &[(u8, u8)]) -> FormResult {
    if games.is_empty() {
        return FormResult::empty();
    }

    let mut out = FormResult::empty();
    for &(scored, conceded) in games {
        out.goals_scored += u32::from(scored);
        out.goals_conceded += u32::from(conceded);
        if scored > conceded {
            out.wins += 1;
            out.result_sequence.push('W');
        } else if scored == conceded {
            out.draws += 1;
            out.result_sequence.push('D');
        } else {
            out.losses += 1;
            out.result_sequence.push('L');
        }
    }

    out.matches = games.len() as u32;
    out.points = out.wins * 3 + out.draws;
    out.goal_difference = out.goals_scored as i32 - out.goals_conceded as i32;
    let max_points = f64::from(out.matches * 3);
    out.score = Some(round2(f64::from(out.points) / max_points * 100.0));
    out
}
