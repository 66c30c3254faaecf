use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValueConfig;

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

const HIGH_QUALITY: f64 = 80.0;
const LOW_QUALITY: f64 = 30.0;

/// Which 1-5 star algorithm an engine uses. Exactly one is active per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceStrategy {
    /// Edge tier table with sample-size and match-quality adjustments.
    #[default]
    EdgeTiers,
    /// Points-based: edge up to 2.5, quality data up to 1.5, form gap up to 1.0.
    Weighted,
}

impl ConfidenceStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "edge_tiers" | "edge" | "tiers" => Some(Self::EdgeTiers),
            "weighted" => Some(Self::Weighted),
            _ => None,
        }
    }

    pub fn rate(&self, inputs: &ConfidenceInputs, cfg: &ValueConfig) -> u8 {
        match self {
            Self::EdgeTiers => edge_tier_rating(
                inputs.best_edge.unwrap_or(f64::NEG_INFINITY),
                inputs.sample_size,
                inputs.quality_score,
                cfg,
            ),
            Self::Weighted => weighted_rating(inputs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceInputs {
    pub best_edge: Option<f64>,
    pub sample_size: u32,
    pub quality_score: Option<f64>,
    pub home_form: Option<f64>,
    pub away_form: Option<f64>,
}

pub fn edge_tier_rating(
    edge: f64,
    sample_size: u32,
    quality_score: Option<f64>,
    cfg: &ValueConfig,
) -> u8 {
    let [t5, t4, t3, t2] = cfg.confidence_thresholds;
    let mut stars: u8 = if edge >= t5 {
        5
    } else if edge >= t4 {
        4
    } else if edge >= t3 {
        3
    } else if edge >= t2 {
        2
    } else {
        1
    };

    if sample_size < cfg.min_sample_size {
        stars = stars.saturating_sub(1).max(MIN_STARS);
    }

    if let Some(q) = quality_score {
        if q >= HIGH_QUALITY {
            stars = (stars + 1).min(MAX_STARS);
        } else if q < LOW_QUALITY {
            stars = stars.saturating_sub(1).max(MIN_STARS);
        }
    }
    stars
}

pub fn weighted_rating(inputs: &ConfidenceInputs) -> u8 {
    let mut score: f64 = 0.0;

    let edge = inputs.best_edge.unwrap_or(0.0);
    if edge >= 0.15 {
        score += 2.5;
    } else if edge >= 0.10 {
        score += 2.0;
    } else if edge >= 0.07 {
        score += 1.5;
    } else if edge >= 0.05 {
        score += 1.0;
    }

    if let Some(q) = inputs.quality_score {
        score += 0.5;
        if q >= 70.0 {
            score += 1.0;
        } else if q >= 50.0 {
            score += 0.5;
        }
    }

    // A missing form score contributes nothing rather than a guessed gap.
    if let (Some(h), Some(a)) = (inputs.home_form, inputs.away_form) {
        let gap = (h - a).abs();
        if gap > 30.0 {
            score += 1.0;
        } else if gap > 15.0 {
            score += 0.5;
        }
    }

    // Half-point scores round to even.
    let stars = score.round_ties_even().clamp(f64::from(MIN_STARS), f64::from(MAX_STARS)) as u8;
    debug!(edge, score, stars, "weighted confidence");
    stars
}

pub fn confidence_label(stars: u8) -> &'static str {
    match stars {
        5 => "Very high",
        4 => "High",
        3 => "Medium",
        2 => "Low",
        _ => "Very low",
    }
}

pub fn should_recommend(stars: u8, min_stars: u8) -> bool {
    stars >= min_stars
}
