//! Role events
//!
//! Every callback a role reacts to arrives as one of these, in order, through
//! `Role::handle`.

use skyclock_core::AreaId;
use skyclock_state::StoreChange;
use skyclock_time::TickKind;
use skyclock_wire::Message;

#[derive(Clone, Debug, PartialEq)]
pub enum RoleEvent {
    /// A scheduled tick fired
    Tick(TickKind),
    /// Message from the remote role
    Message(Message),
    /// A write landed in the replicated store
    StoreChanged(StoreChange),
    /// Screen became visible or invisible
    VisibilityChanged(bool),
    /// Screen entered or left ambient mode
    AmbientChanged(bool),
    /// Local user picked an area
    AreaSelected(AreaId),
    Shutdown,
}

impl RoleEvent {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            RoleEvent::Tick(_) => "tick",
            RoleEvent::Message(_) => "message",
            RoleEvent::StoreChanged(_) => "store_changed",
            RoleEvent::VisibilityChanged(_) => "visibility",
            RoleEvent::AmbientChanged(_) => "ambient",
            RoleEvent::AreaSelected(_) => "area_selected",
            RoleEvent::Shutdown => "shutdown",
        }
    }
}
