//! Selected weather area

use skyclock_core::{AreaId, Record, KEY_WEATHER_AREA};

/// The area whose forecast is shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AreaSelection {
    current: AreaId,
}

impl AreaSelection {
    pub fn new(area: AreaId) -> Self {
        AreaSelection { current: area }
    }

    pub fn current(&self) -> AreaId {
        self.current
    }

    /// Adopt `area`. Returns whether the selection changed.
    /// Negative ids are ignored.
    pub fn set(&mut self, area: AreaId) -> bool {
        if !area.is_valid() || area == self.current {
            return false;
        }
        self.current = area;
        true
    }

    /// Area carried by an `/data/area` record. `None` when the key is
    /// missing, not an integer, or out of `i32` range.
    pub fn from_record(record: &Record) -> Option<AreaId> {
        record
            .get_int(KEY_WEATHER_AREA)
            .and_then(|id| i32::try_from(id).ok())
            .map(AreaId::new)
    }

    /// Partial record carrying just the area key
    pub fn to_record(area: AreaId) -> Record {
        Record::new().with_int(KEY_WEATHER_AREA, area.get() as i64)
    }
}
