//! Fire-and-forget engine notifications for status-indicator integrations.

use mac_winctl::DisplayId;
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::{SlotId, Space};

/// What happened to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceAction {
    /// An arrangement was captured and stored.
    Saved,
    /// A stored arrangement was re-applied.
    Restored,
    /// A slot became live without repositioning (auto-activation).
    Activated,
    /// The live slot was dropped.
    Deactivated,
    /// A stored arrangement was removed.
    Cleared,
}

/// One notification to external integrations.
///
/// Delivery is best-effort: the engine never depends on a receiver existing
/// or keeping up.
#[derive(Debug, Clone)]
pub struct SpaceEvent {
    /// Slot number.
    pub slot: SlotId,
    /// Display the action applied to.
    pub display: DisplayId,
    /// Display label, if the slot is named.
    pub name: Option<String>,
    /// Owning-application ids of the affected arrangement.
    pub apps: Vec<String>,
    /// Action kind.
    pub action: SpaceAction,
}

/// Emit an event derived from a space; send failures are ignored.
pub(crate) fn emit_for_space(
    events: &broadcast::Sender<SpaceEvent>,
    space: &Space,
    action: SpaceAction,
) {
    emit(events, space.slot, space.display, space.name.clone(), space.app_ids(), action);
}

/// Emit an event; send failures (no receivers) are ignored.
pub(crate) fn emit(
    events: &broadcast::Sender<SpaceEvent>,
    slot: SlotId,
    display: DisplayId,
    name: Option<String>,
    apps: Vec<String>,
    action: SpaceAction,
) {
    let disp = display;
    debug!(slot, display = disp, ?action, "space event");
    let _ = events.send(SpaceEvent {
        slot,
        display,
        name,
        apps,
        action,
    });
}
