//! Live-slot tracking: drift detection and passive layout recognition.
//!
//! `ActiveSlot` is transient, derived state; it is created on save/restore/
//! auto-activation, destroyed on focus leaving the tracked set, on frame
//! drift, or on explicit clear, and it is never persisted.

use std::collections::{HashMap, HashSet};

use mac_winctl::{WindowId, geom::Rect};
use tracing::debug;

use crate::{
    matcher::FRAME_TOL,
    model::{SlotId, Space, WindowRecord},
};

/// Pixel tolerance before a tracked window's movement counts as drift.
pub(crate) const DRIFT_EPS: f64 = 10.0;

/// Identity of a tracked window. Titles are not globally unique, so the key
/// combines app, title, and capture rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TrackKey {
    app: String,
    title: String,
    z: u32,
}

impl TrackKey {
    fn of(record: &WindowRecord) -> Self {
        Self {
            app: record.app.clone(),
            title: record.title.clone(),
            z: record.z,
        }
    }
}

/// The live slot on one display.
#[derive(Debug, Clone)]
pub(crate) struct ActiveSlot {
    /// Slot number considered live.
    pub(crate) slot: SlotId,
    /// Display label at activation time; renames update it in place.
    pub(crate) name: Option<String>,
    tracked_apps: HashSet<String>,
    frames: HashMap<TrackKey, Rect>,
}

impl ActiveSlot {
    /// Track the windows of a just-saved or just-restored space.
    pub(crate) fn from_space(space: &Space) -> Self {
        Self {
            slot: space.slot,
            name: space.name.clone(),
            tracked_apps: space.windows.iter().map(|w| w.app.clone()).collect(),
            frames: space
                .windows
                .iter()
                .map(|w| (TrackKey::of(w), w.frame))
                .collect(),
        }
    }

    /// Whether the given application owns any tracked window.
    pub(crate) fn tracks_app(&self, app: &str) -> bool {
        self.tracked_apps.contains(app)
    }

    /// Tracked application ids, sorted for stable event payloads.
    pub(crate) fn apps(&self) -> Vec<String> {
        let mut out: Vec<String> = self.tracked_apps.iter().cloned().collect();
        out.sort();
        out
    }

    /// True when any tracked window's live frame has moved beyond `eps`.
    ///
    /// Only windows still identifiable by their tracked key are compared; a
    /// missing window is not drift (focus transitions cover departure).
    pub(crate) fn drifted(&self, live: &[WindowRecord], eps: f64) -> bool {
        for rec in live {
            if let Some(last) = self.frames.get(&TrackKey::of(rec))
                && rec.frame.manhattan_distance(last) > eps
            {
                debug!(
                    app = %rec.app,
                    title = %rec.title,
                    "drift beyond tolerance"
                );
                return true;
            }
        }
        false
    }
}

/// Does the live capture exactly match a saved space?
///
/// Strong form first: when every window on both sides carries a stable id,
/// the (app, id) sets must be equal. Otherwise a tolerant fallback pairs each
/// saved window with a distinct live window by (app, frame-within-tolerance),
/// consuming every window on both sides exactly once.
pub(crate) fn layout_matches(saved: &Space, live: &[WindowRecord]) -> bool {
    if saved.windows.is_empty() || saved.windows.len() != live.len() {
        return false;
    }
    let all_ids =
        saved.windows.iter().all(|w| w.id.is_some()) && live.iter().all(|w| w.id.is_some());
    if all_ids {
        let a: HashSet<(&str, WindowId)> = saved
            .windows
            .iter()
            .filter_map(|w| w.id.map(|id| (w.app.as_str(), id)))
            .collect();
        let b: HashSet<(&str, WindowId)> = live
            .iter()
            .filter_map(|w| w.id.map(|id| (w.app.as_str(), id)))
            .collect();
        if a == b {
            return true;
        }
    }
    let mut used = vec![false; live.len()];
    'saved: for s in &saved.windows {
        for (i, l) in live.iter().enumerate() {
            if !used[i] && l.app == s.app && l.frame.manhattan_distance(&s.frame) <= FRAME_TOL {
                used[i] = true;
                continue 'saved;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(app: &str, title: &str, id: Option<u32>, frame: Rect, z: u32) -> WindowRecord {
        WindowRecord {
            app: app.into(),
            title: title.into(),
            id,
            frame,
            z,
        }
    }

    fn space_of(windows: Vec<WindowRecord>) -> Space {
        Space {
            slot: 1,
            name: None,
            display: 1,
            windows,
        }
    }

    #[test]
    fn drift_detected_beyond_tolerance() {
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        let space = space_of(vec![record("Safari", "a", Some(1), f, 0)]);
        let active = ActiveSlot::from_space(&space);
        let moved = vec![record("Safari", "a", Some(1), Rect::new(20.0, 0.0, 400.0, 400.0), 0)];
        assert!(active.drifted(&moved, DRIFT_EPS));
        let nudged = vec![record("Safari", "a", Some(1), Rect::new(3.0, 0.0, 400.0, 400.0), 0)];
        assert!(!active.drifted(&nudged, DRIFT_EPS));
    }

    #[test]
    fn missing_tracked_window_is_not_drift() {
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        let space = space_of(vec![record("Safari", "a", Some(1), f, 0)]);
        let active = ActiveSlot::from_space(&space);
        assert!(!active.drifted(&[], DRIFT_EPS));
    }

    #[test]
    fn layout_matches_by_id_sets() {
        let fa = Rect::new(0.0, 0.0, 400.0, 400.0);
        let fb = Rect::new(500.0, 0.0, 400.0, 400.0);
        let saved = space_of(vec![
            record("Safari", "a", Some(1), fa, 0),
            record("Mail", "b", Some(2), fb, 1),
        ]);
        // Same ids, different z order and drifted frames: still a match.
        let live = vec![
            record("Mail", "b", Some(2), Rect::new(600.0, 0.0, 400.0, 400.0), 0),
            record("Safari", "a", Some(1), Rect::new(90.0, 0.0, 400.0, 400.0), 1),
        ];
        assert!(layout_matches(&saved, &live));
    }

    #[test]
    fn layout_falls_back_to_frames_when_ids_changed() {
        let fa = Rect::new(0.0, 0.0, 400.0, 400.0);
        let fb = Rect::new(500.0, 0.0, 400.0, 400.0);
        let saved = space_of(vec![
            record("Safari", "a", Some(1), fa, 0),
            record("Mail", "b", Some(2), fb, 1),
        ]);
        // App restarted: fresh ids, same frames.
        let live = vec![
            record("Safari", "a", Some(11), fa, 0),
            record("Mail", "b", Some(12), fb, 1),
        ];
        assert!(layout_matches(&saved, &live));
    }

    #[test]
    fn layout_fallback_consumes_each_window_once() {
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        let saved = space_of(vec![
            record("Term", "a", None, f, 0),
            record("Term", "b", None, f, 1),
        ]);
        // Only one live window at that frame: must not satisfy both records.
        let live = vec![
            record("Term", "a", None, f, 0),
            record("Term", "b", None, Rect::new(900.0, 0.0, 100.0, 100.0), 1),
        ];
        assert!(!layout_matches(&saved, &live));
    }

    #[test]
    fn layout_count_mismatch_never_matches() {
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        let saved = space_of(vec![record("Safari", "a", Some(1), f, 0)]);
        let live = vec![
            record("Safari", "a", Some(1), f, 0),
            record("Mail", "b", Some(2), Rect::new(500.0, 0.0, 100.0, 100.0), 1),
        ];
        assert!(!layout_matches(&saved, &live));
        assert!(!layout_matches(&space_of(Vec::new()), &[]));
    }
}
