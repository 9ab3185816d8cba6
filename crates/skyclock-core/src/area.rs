//! Area identifiers
//!
//! An area is the geographic region whose forecast is shown. The selection is
//! replicated between roles through the `/data/area` record.

use std::fmt;

/// Weather area identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AreaId(pub i32);

impl AreaId {
    /// "No weather region" sentinel
    pub const NONE: AreaId = AreaId(0);

    #[inline]
    pub fn new(id: i32) -> Self {
        AreaId(id)
    }

    /// Whether this is a real region (not the sentinel)
    #[inline]
    pub fn is_region(self) -> bool {
        self.0 > 0
    }

    /// Whether a replicated value may be adopted as a selection.
    /// Negative ids are ignored by receivers.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    #[inline]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == AreaId::NONE {
            write!(f, "Area(none)")
        } else {
            write!(f, "Area({})", self.0)
        }
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
