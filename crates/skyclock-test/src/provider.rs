//! Scripted forecast provider
//!
//! Clones share one script, so a test can keep a handle after moving the
//! provider into a primary role.

use std::sync::Arc;

use parking_lot::Mutex;

use skyclock_core::{AreaId, SkyError, SkyResult};
use skyclock_runtime::{ForecastProvider, ProviderForecast, LOOKAHEAD_WINDOWS, LOOKBACK_WINDOWS};

#[derive(Debug)]
struct Script {
    areas: Vec<AreaId>,
    row_limit: Option<usize>,
    failures_left: usize,
    extra_rows: Vec<ProviderForecast>,
    calls: usize,
}

/// Provider returning a deterministic table
#[derive(Clone, Debug)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    /// Full table for areas `1..=areas`, five windows each
    pub fn full(areas: i32) -> Self {
        Self::for_areas((1..=areas).map(AreaId::new).collect())
    }

    /// Full table for the given areas
    pub fn for_areas(areas: Vec<AreaId>) -> Self {
        ScriptedProvider {
            script: Arc::new(Mutex::new(Script {
                areas,
                row_limit: None,
                failures_left: 0,
                extra_rows: Vec::new(),
                calls: 0,
            })),
        }
    }

    /// Condition code the script assigns to an area and window offset
    pub fn code_for(area: AreaId, window: i64) -> i32 {
        area.get() * 100 + (window - LOOKBACK_WINDOWS) as i32
    }

    /// Truncate every answer to `limit` rows (`None` = full)
    pub fn set_row_limit(&self, limit: Option<usize>) {
        self.script.lock().row_limit = limit;
    }

    /// Fail the next `count` calls
    pub fn fail_next(&self, count: usize) {
        self.script.lock().failures_left = count;
    }

    /// Replace the areas covered by the table
    pub fn set_areas(&self, areas: Vec<AreaId>) {
        self.script.lock().areas = areas;
    }

    /// Append rows verbatim to every answer
    pub fn push_extra_row(&self, row: ProviderForecast) {
        self.script.lock().extra_rows.push(row);
    }

    pub fn calls(&self) -> usize {
        self.script.lock().calls
    }
}

impl ForecastProvider for ScriptedProvider {
    fn fetch_forecast(&mut self) -> SkyResult<Vec<ProviderForecast>> {
        let mut script = self.script.lock();
        script.calls += 1;

        if script.failures_left > 0 {
            script.failures_left -= 1;
            return Err(SkyError::Provider("scripted failure".into()));
        }

        let mut rows = Vec::new();
        for &area in &script.areas {
            for window in LOOKBACK_WINDOWS..=LOOKAHEAD_WINDOWS {
                rows.push(ProviderForecast {
                    window,
                    area,
                    code: Self::code_for(area, window),
                });
            }
        }
        if let Some(limit) = script.row_limit {
            rows.truncate(limit);
        }
        rows.extend(script.extra_rows.iter().copied());
        Ok(rows)
    }
}
