//! Persisted data model: window records and spaces.

use mac_winctl::{DisplayId, WindowId, geom::Rect};
use serde::{Deserialize, Serialize};

/// Slot identifier; spaces live in a small bounded range of numbered slots.
pub type SlotId = u8;

/// Number of addressable slots (0..MAX_SLOTS).
pub const MAX_SLOTS: SlotId = 10;

/// One captured window.
///
/// `frame` is stored in the engine's canonical bottom-left-origin space. `id`
/// is the CG window number when the capture path exposed one; arrangements
/// written by other tooling may omit it, and a missing field deserializes as
/// absent rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    /// Owning application identity.
    pub app: String,
    /// Window title at capture time; may be empty.
    pub title: String,
    /// Stable numeric window id, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WindowId>,
    /// Frame in the canonical bottom-left-origin space.
    pub frame: Rect,
    /// Capture-time front-to-back rank; 0 = frontmost, contiguous from 0.
    pub z: u32,
}

/// A saved arrangement: the windows of one display under one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Slot number.
    pub slot: SlotId,
    /// Optional display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The display this payload belongs to.
    pub display: DisplayId,
    /// Window records in capture z-order (index 0 = frontmost).
    pub windows: Vec<WindowRecord>,
}

impl Space {
    /// True when no windows were captured; empty spaces are never persisted.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Owning-application ids, deduplicated, in z-order of first appearance.
    pub fn app_ids(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for w in &self.windows {
            if !out.iter().any(|a| a == &w.app) {
                out.push(w.app.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(app: &str, z: u32) -> WindowRecord {
        WindowRecord {
            app: app.into(),
            title: String::new(),
            id: Some(z + 1),
            frame: Rect::new(0.0, 0.0, 100.0, 100.0),
            z,
        }
    }

    #[test]
    fn app_ids_dedup_in_z_order() {
        let space = Space {
            slot: 1,
            name: None,
            display: 1,
            windows: vec![record("Safari", 0), record("Mail", 1), record("Safari", 2)],
        };
        assert_eq!(space.app_ids(), vec!["Safari".to_string(), "Mail".to_string()]);
    }

    #[test]
    fn missing_id_deserializes_as_absent() {
        let text = r#"(
            slot: 3,
            display: 1,
            windows: [(
                app: "Safari",
                title: "Home",
                frame: (x: 0.0, y: 0.0, w: 800.0, h: 600.0),
                z: 0,
            )],
        )"#;
        let space: Space = ron::from_str(text).expect("well-formed space");
        assert_eq!(space.windows[0].id, None);
        assert_eq!(space.name, None);
    }
}
