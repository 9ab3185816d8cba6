//! Forecast provider boundary (primary role only)

use skyclock_core::{AreaId, SkyResult};

/// Oldest window offset carried in a snapshot
pub const LOOKBACK_WINDOWS: i64 = -1;
/// Newest window offset carried in a snapshot
pub const LOOKAHEAD_WINDOWS: i64 = 3;

/// One provider row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderForecast {
    /// Window offset from the current window, `-1..=3`
    pub window: i64,
    pub area: AreaId,
    pub code: i32,
}

/// Source of the forecast table
pub trait ForecastProvider: Send {
    fn fetch_forecast(&mut self) -> SkyResult<Vec<ProviderForecast>>;
}

/// Deterministic table covering `areas` regions and every window offset
pub struct StaticProvider {
    areas: i32,
}

impl StaticProvider {
    pub fn new(areas: i32) -> Self {
        StaticProvider { areas }
    }
}

impl ForecastProvider for StaticProvider {
    fn fetch_forecast(&mut self) -> SkyResult<Vec<ProviderForecast>> {
        let mut rows = Vec::new();
        for area in 1..=self.areas {
            for window in LOOKBACK_WINDOWS..=LOOKAHEAD_WINDOWS {
                rows.push(ProviderForecast {
                    window,
                    area: AreaId::new(area),
                    code: (area * 7 + window as i32 * 3).rem_euclid(12),
                });
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider_full_table() {
        let rows = StaticProvider::new(24).fetch_forecast().unwrap();
        assert_eq!(rows.len(), 120);
        assert!(rows.iter().all(|r| (-1..=3).contains(&r.window)));
    }
}
