use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fixtures::MatchResult;

pub const DEFAULT_LEAGUE_AVG: f64 = 2.5;

const APP_DIR: &str = "fixture_edge";
const OVERRIDES_FILE: &str = "league_baselines.json";

// Samples at or above this size use the observed average as-is.
const FULL_WEIGHT_MATCHES: f64 = 200.0;

static KNOWN_AVERAGES: Lazy<HashMap<u32, f64>> = Lazy::new(|| {
    HashMap::from([
        (262, 2.3), // Liga MX
        (39, 2.8),  // Premier League
        (140, 2.6), // La Liga
        (78, 3.0),  // Bundesliga
        (135, 2.7), // Serie A
        (61, 2.6),  // Ligue 1
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueBaseline {
    pub league_id: Option<u32>,
    pub goals_per_match: f64,
    pub sample_matches: usize,
}

impl LeagueBaseline {
    pub fn new(league_id: Option<u32>, goals_per_match: f64) -> Self {
        Self {
            league_id,
            goals_per_match,
            sample_matches: 0,
        }
    }

    /// Returns the usable average, substituting `default` for non-positive or non-finite
    /// values.
    pub fn sanitized(&self, default: f64) -> f64 {
        if self.goals_per_match.is_finite() && self.goals_per_match > 0.0 {
            return self.goals_per_match;
        }
        warn!(
            league_id = ?self.league_id,
            value = self.goals_per_match,
            fallback = default,
            "league baseline not positive, using default"
        );
        default
    }
}

/// Goals-per-match lookup: built-in table, then file/explicit overrides, then the default.
#[derive(Debug, Clone)]
pub struct LeagueBaselines {
    default_avg: f64,
    overrides: HashMap<u32, LeagueBaseline>,
}

impl Default for LeagueBaselines {
    fn default() -> Self {
        Self::new(DEFAULT_LEAGUE_AVG)
    }
}

impl LeagueBaselines {
    pub fn new(default_avg: f64) -> Self {
        let default_avg = if default_avg.is_finite() && default_avg > 0.0 {
            default_avg
        } else {
            DEFAULT_LEAGUE_AVG
        };
        Self {
            default_avg,
            overrides: HashMap::new(),
        }
    }

    pub fn default_avg(&self) -> f64 {
        self.default_avg
    }

    pub fn set(&mut self, baseline: LeagueBaseline) {
        if let Some(id) = baseline.league_id {
            self.overrides.insert(id, baseline);
        }
    }

    pub fn resolve(&self, league_id: Option<u32>) -> LeagueBaseline {
        let Some(id) = league_id else {
            return LeagueBaseline::new(None, self.default_avg);
        };
        if let Some(b) = self.overrides.get(&id) {
            return *b;
        }
        match KNOWN_AVERAGES.get(&id) {
            Some(avg) => LeagueBaseline::new(Some(id), *avg),
            None => {
                debug!(league_id = id, "no known baseline, using default");
                LeagueBaseline::new(Some(id), self.default_avg)
            }
        }
    }

    pub fn load_overrides(&mut self, path: &Path) -> Result<usize> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read league baselines {}", path.display()))?;
        let parsed: HashMap<u32, LeagueBaseline> =
            serde_json::from_str(&raw).context("parse league baselines")?;
        let n = parsed.len();
        for (id, mut baseline) in parsed {
            baseline.league_id = Some(id);
            self.overrides.insert(id, baseline);
        }
        Ok(n)
    }

    pub fn save_overrides(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(&self.overrides).context("serialize league baselines")?;
        fs::write(&tmp, json).context("write league baselines")?;
        fs::rename(&tmp, path).context("swap league baselines")?;
        Ok(())
    }
}

/// Observed goals-per-match for a league, shrunk toward the known value when the sample is
/// small.
pub fn baseline_from_results(
    baselines: &LeagueBaselines,
    league_id: u32,
    results: &[MatchResult],
) -> LeagueBaseline {
    let mut total_goals = 0.0;
    let mut n = 0usize;
    for m in results {
        if m.league_id != league_id || !m.is_countable() {
            continue;
        }
        total_goals += f64::from(m.home_goals) + f64::from(m.away_goals);
        n += 1;
    }

    let prior = baselines.resolve(Some(league_id)).goals_per_match;
    let observed = if n > 0 {
        total_goals / n as f64
    } else {
        prior
    };
    let w = (n as f64 / FULL_WEIGHT_MATCHES).clamp(0.0, 1.0);

    LeagueBaseline {
        league_id: Some(league_id),
        goals_per_match: (1.0 - w) * prior + w * observed,
        sample_matches: n,
    }
}

pub fn default_overrides_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR).join(OVERRIDES_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(APP_DIR)
            .join(OVERRIDES_FILE),
    )
}
