use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisEngine, AnalysisRecord};
use crate::config::CacheConfig;
use crate::error::EngineError;
use crate::fixtures::Fixture;
use crate::store::AnalysisStore;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for replaying reuse-window behaviour.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_records: usize,
    pub fresh_records: usize,
    pub stale_records: usize,
    pub reuse_window_hours: i64,
}

/// Decides per fixture whether to reuse a stored record or run the engine again.
pub struct AnalysisCache {
    engine: AnalysisEngine,
    store: Arc<dyn AnalysisStore>,
    cfg: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl AnalysisCache {
    pub fn new(engine: AnalysisEngine, store: Arc<dyn AnalysisStore>) -> Self {
        let cfg = engine.config().cache;
        Self {
            engine,
            store,
            cfg,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn get_or_create(
        &self,
        fixture: &Fixture,
        force_refresh: bool,
    ) -> Result<AnalysisRecord, EngineError> {
        let now = self.clock.now();

        if !force_refresh {
            let since = now - self.cfg.reuse_window();
            if let Some(cached) = self.store.latest_since(fixture.id, since)? {
                let age_mins = (now - cached.created_at).num_minutes();
                info!(fixture_id = fixture.id, age_mins, "analysis cache hit");
                return Ok(cached);
            }
        }

        if force_refresh {
            info!(fixture_id = fixture.id, "analysis forced refresh");
        } else {
            info!(fixture_id = fixture.id, "analysis cache miss");
        }

        let record = self.engine.analyze(fixture, now)?;
        if let Err(err) = self.store.append(&record) {
            warn!(fixture_id = fixture.id, %err, "analysis not cached");
            return Ok(record);
        }

        match self
            .store
            .compact(Some(fixture.id), &self.cfg.retention, now)
        {
            Ok(0) => {}
            Ok(removed) => debug!(fixture_id = fixture.id, removed, "retention applied"),
            Err(err) => warn!(fixture_id = fixture.id, %err, "retention pass failed"),
        }
        Ok(record)
    }

    /// Drops every stored record for the fixture so the next read recomputes.
    pub fn invalidate(&self, fixture_id: u64) -> Result<usize, EngineError> {
        let removed = self.store.delete_fixture(fixture_id)?;
        info!(fixture_id, removed, "analysis cache invalidated");
        Ok(removed)
    }

    pub fn compact(&self) -> Result<usize, EngineError> {
        let removed = self
            .store
            .compact(None, &self.cfg.retention, self.clock.now())?;
        info!(removed, "analysis cache compacted");
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CacheStats, EngineError> {
        let since = self.clock.now() - self.cfg.reuse_window();
        let total = self.store.count()?;
        let fresh = self.store.count_since(since)?;
        Ok(CacheStats {
            total_records: total,
            fresh_records: fresh,
            stale_records: total.saturating_sub(fresh),
            reuse_window_hours: self.cfg.reuse_window_hours,
        })
    }
}
