use std::env;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueConfig {
    pub minimum_edge: f64,
    pub bankroll: f64,
    pub kelly_fraction: f64,
    pub max_stake_pct: f64,
    /// Stake used when reporting expected value.
    pub reference_stake: f64,
    pub min_sample_size: u32,
    /// Edge cut-offs for 5, 4, 3 and 2 stars, highest first.
    pub confidence_thresholds: [f64; 4],
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            minimum_edge: 0.05,
            bankroll: 1000.0,
            kelly_fraction: 0.25,
            max_stake_pct: 0.05,
            reference_stake: 100.0,
            min_sample_size: 3,
            confidence_thresholds: [0.15, 0.10, 0.07, 0.05],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FormConfig {
    pub window: usize,
    pub momentum_min_matches: usize,
    pub momentum_window: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            window: 5,
            momentum_min_matches: 6,
            momentum_window: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelConfig {
    pub max_goals: u32,
    pub default_league_avg: f64,
    pub goal_line: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_goals: 10,
            default_league_avg: 2.5,
            goal_line: 2.5,
        }
    }
}

/// Bounds on how much history the analysis store keeps per fixture. `None` disables a bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_entries_per_fixture: Option<usize>,
    pub max_age_hours: Option<i64>,
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self {
            max_entries_per_fixture: None,
            max_age_hours: None,
        }
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_hours.map(Duration::hours)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_entries_per_fixture: Some(10),
            max_age_hours: Some(24 * 14),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheConfig {
    pub reuse_window_hours: i64,
    pub retention: RetentionPolicy,
}

impl CacheConfig {
    pub fn reuse_window(&self) -> Duration {
        Duration::hours(self.reuse_window_hours)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reuse_window_hours: 6,
            retention: RetentionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub value: ValueConfig,
    pub form: FormConfig,
    pub model: ModelConfig,
    pub cache: CacheConfig,
    pub confidence: ConfidenceStrategy,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let num = |key: &str| -> Option<f64> {
            lookup(key).and_then(|v| v.trim().parse::<f64>().ok())
        };
        let int = |key: &str| -> Option<i64> {
            lookup(key).and_then(|v| v.trim().parse::<i64>().ok())
        };

        if let Some(v) = num("MINIMUM_EDGE") {
            cfg.value.minimum_edge = v.clamp(0.01, 0.5);
        }
        if let Some(v) = num("BANKROLL").filter(|v| *v > 0.0) {
            cfg.value.bankroll = v;
        }
        if let Some(v) = num("KELLY_FRACTION").filter(|v| *v > 0.0) {
            cfg.value.kelly_fraction = v.min(0.5);
        }
        if let Some(v) = num("MAX_STAKE_PERCENTAGE").filter(|v| *v > 0.0) {
            cfg.value.max_stake_pct = v.min(1.0);
        }
        if let Some(v) = int("FORM_MIN_SAMPLE_SIZE") {
            cfg.value.min_sample_size = v.clamp(1, 20) as u32;
        }
        if let Some(v) = int("MOMENTUM_MIN_MATCHES") {
            cfg.form.momentum_min_matches = v.clamp(3, 20) as usize;
        }
        if let Some(v) = int("ANALYSIS_CACHE_HOURS") {
            cfg.cache.reuse_window_hours = v.clamp(0, 24 * 7);
        }
        if let Some(v) = int("ANALYSIS_RETENTION_MAX_ENTRIES") {
            cfg.cache.retention.max_entries_per_fixture = (v > 0).then_some(v as usize);
        }
        if let Some(v) = int("ANALYSIS_RETENTION_MAX_AGE_HOURS") {
            cfg.cache.retention.max_age_hours = (v > 0).then_some(v);
        }
        if let Some(raw) = lookup("CONFIDENCE_STRATEGY") {
            if let Some(strategy) = ConfidenceStrategy::parse(&raw) {
                cfg.confidence = strategy;
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = EngineConfig::from_lookup(|_| None);
        assert_eq!(cfg.value.minimum_edge, 0.05);
        assert_eq!(cfg.value.kelly_fraction, 0.25);
        assert_eq!(cfg.form.window, 5);
        assert_eq!(cfg.model.max_goals, 10);
        assert_eq!(cfg.cache.reuse_window_hours, 6);
        assert_eq!(cfg.confidence, ConfidenceStrategy::EdgeTiers);
    }

    #[test]
    fn values_are_clamped_to_safe_ranges() {
        let cfg = EngineConfig::from_lookup(lookup_from(&[
            ("MINIMUM_EDGE", "0.9"),
            ("KELLY_FRACTION", "1.0"),
            ("MOMENTUM_MIN_MATCHES", "1"),
            ("BANKROLL", "-5"),
        ]));
        assert_eq!(cfg.value.minimum_edge, 0.5);
        assert_eq!(cfg.value.kelly_fraction, 0.5);
        assert_eq!(cfg.form.momentum_min_matches, 3);
        assert_eq!(cfg.value.bankroll, 1000.0);
    }

    #[test]
    fn garbage_values_fall_back() {
        let cfg = EngineConfig::from_lookup(lookup_from(&[
            ("ANALYSIS_CACHE_HOURS", "soon"),
            ("CONFIDENCE_STRATEGY", "weighted"),
            ("ANALYSIS_RETENTION_MAX_ENTRIES", "0"),
        ]));
        assert_eq!(cfg.cache.reuse_window_hours, 6);
        assert_eq!(cfg.confidence, ConfidenceStrategy::Weighted);
        assert_eq!(cfg.cache.retention.max_entries_per_fixture, None);
    }
}
