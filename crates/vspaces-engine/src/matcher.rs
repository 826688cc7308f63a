//! Tiered matching of saved window records to live control handles.
//!
//! Tiering exists because the two window views correlate only loosely:
//! stable ids are the strongest evidence, frame agreement between the two
//! live views is next, and a single-window app needs no evidence at all.
//! Every ambiguous case resolves to "no match" — a skipped window costs a
//! partial restore, a wrong match tiles someone else's window.

use mac_winctl::{CtlWindow, ops::WinOps};
use tracing::debug;

use crate::model::WindowRecord;

/// Base per-axis frame tolerance in points.
pub(crate) const POS_EPS: f64 = 2.0;

/// Manhattan-distance tolerance for whole-frame matching.
pub(crate) const FRAME_TOL: f64 = 4.0 * POS_EPS;

/// Locate the live control handle for a saved record, or `None`.
pub(crate) fn match_window(ops: &dyn WinOps, record: &WindowRecord) -> Option<CtlWindow> {
    let live = ops.list_windows();
    let mut pids: Vec<i32> = Vec::new();
    for w in live.iter().filter(|w| w.app == record.app) {
        if !pids.contains(&w.pid) {
            pids.push(w.pid);
        }
    }
    if pids.is_empty() {
        debug!(app = %record.app, "match: app not running");
        return None;
    }
    let candidates: Vec<CtlWindow> = pids.iter().flat_map(|p| ops.app_windows(*p)).collect();
    if candidates.is_empty() {
        debug!(app = %record.app, "match: no control windows");
        return None;
    }

    // Tier 1: the control view exposes the saved id directly.
    if let Some(want) = record.id {
        let mut hits = candidates.iter().filter(|c| c.id == Some(want));
        if let (Some(hit), None) = (hits.next(), hits.next()) {
            return Some(hit.clone());
        }
    }

    // Tier 2: find the saved id in a fresh enumeration and use its current
    // frame to pick among control windows.
    if let Some(want) = record.id
        && let Some(seen) = live
            .iter()
            .find(|w| w.app == record.app && w.id == want && w.frame.is_some())
    {
        let target = seen.frame.unwrap_or_default();
        let near: Vec<&CtlWindow> = candidates
            .iter()
            .filter(|c| c.frame.manhattan_distance(&target) <= FRAME_TOL)
            .collect();
        match near.len() {
            1 => return Some(near[0].clone()),
            0 => {
                debug!(app = %record.app, id = want, "match: id seen but no frame agreement");
            }
            _ => {
                let mut titled = near.iter().filter(|c| c.title == record.title);
                if let (Some(hit), None) = (titled.next(), titled.next()) {
                    return Some((*hit).clone());
                }
                debug!(
                    app = %record.app,
                    id = want,
                    candidates = near.len(),
                    "match: ambiguous frame candidates, refusing to guess"
                );
                return None;
            }
        }
    }

    // Tier 3: a single-window app is unambiguous by construction.
    if candidates.len() == 1 {
        return Some(candidates[0].clone());
    }
    debug!(
        app = %record.app,
        candidates = candidates.len(),
        "match: no safe candidate"
    );
    None
}

#[cfg(test)]
mod tests {
    use mac_winctl::{CtlWindow, WindowInfo, geom::Rect, ops::MockWinOps};

    use super::*;

    fn record(app: &str, title: &str, id: Option<u32>, frame: Rect) -> WindowRecord {
        WindowRecord {
            app: app.into(),
            title: title.into(),
            id,
            frame,
            z: 0,
        }
    }

    fn cg(pid: i32, id: u32, app: &str, title: &str, frame: Rect, z: u32) -> WindowInfo {
        WindowInfo {
            app: app.into(),
            title: title.into(),
            pid,
            id,
            layer: 0,
            frame: Some(frame),
            z,
        }
    }

    fn ctl(pid: i32, idx: usize, id: Option<u32>, title: &str, frame: Rect) -> CtlWindow {
        CtlWindow {
            pid,
            idx,
            id,
            title: title.into(),
            frame,
        }
    }

    #[test]
    fn tier1_stable_id_wins() {
        let ops = MockWinOps::new();
        let fa = Rect::new(0.0, 0.0, 400.0, 400.0);
        let fb = Rect::new(500.0, 0.0, 400.0, 400.0);
        ops.set_windows(vec![cg(10, 7, "Safari", "a", fa, 0)]);
        ops.set_app_windows(
            10,
            vec![ctl(10, 0, Some(9), "b", fb), ctl(10, 1, Some(7), "a", fa)],
        );
        let got = match_window(&ops, &record("Safari", "a", Some(7), fa)).expect("match");
        assert_eq!(got.idx, 1);
    }

    #[test]
    fn tier2_frame_agreement_beats_closer_numeric_id() {
        // The control view exposes no ids, so tier 1 is inconclusive; the
        // saved id is found in the enumeration view and its frame selects
        // the right control window even though another window exists.
        let ops = MockWinOps::new();
        let fa = Rect::new(0.0, 0.0, 400.0, 400.0);
        let fb = Rect::new(500.0, 0.0, 400.0, 400.0);
        ops.set_windows(vec![
            cg(10, 7, "Safari", "a", fa, 0),
            cg(10, 8, "Safari", "b", fb, 1),
        ]);
        ops.set_app_windows(10, vec![ctl(10, 0, None, "b", fb), ctl(10, 1, None, "a", fa)]);
        let got = match_window(&ops, &record("Safari", "a", Some(7), fa)).expect("match");
        assert_eq!(got.idx, 1);
    }

    #[test]
    fn tier2_small_drift_within_tolerance() {
        let ops = MockWinOps::new();
        let saved = Rect::new(0.0, 0.0, 400.0, 400.0);
        let drifted = Rect::new(3.0, 2.0, 400.0, 401.0);
        ops.set_windows(vec![
            cg(10, 7, "Safari", "a", saved, 0),
            cg(10, 8, "Safari", "b", Rect::new(900.0, 0.0, 100.0, 100.0), 1),
        ]);
        ops.set_app_windows(
            10,
            vec![
                ctl(10, 0, None, "a", drifted),
                ctl(10, 1, None, "b", Rect::new(900.0, 0.0, 100.0, 100.0)),
            ],
        );
        let got = match_window(&ops, &record("Safari", "a", Some(7), saved)).expect("match");
        assert_eq!(got.idx, 0);
    }

    #[test]
    fn ambiguous_twins_refuse_to_match() {
        // Two live windows with identical frames and identical titles: no
        // arbitrary pick at any tier.
        let ops = MockWinOps::new();
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        ops.set_windows(vec![
            cg(10, 7, "Term", "shell", f, 0),
            cg(10, 8, "Term", "shell", f, 1),
        ]);
        ops.set_app_windows(
            10,
            vec![ctl(10, 0, None, "shell", f), ctl(10, 1, None, "shell", f)],
        );
        assert!(match_window(&ops, &record("Term", "shell", Some(7), f)).is_none());
    }

    #[test]
    fn tier2_title_disambiguates_frame_twins() {
        let ops = MockWinOps::new();
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        ops.set_windows(vec![
            cg(10, 7, "Term", "build", f, 0),
            cg(10, 8, "Term", "logs", f, 1),
        ]);
        ops.set_app_windows(
            10,
            vec![ctl(10, 0, None, "logs", f), ctl(10, 1, None, "build", f)],
        );
        let got = match_window(&ops, &record("Term", "build", Some(7), f)).expect("match");
        assert_eq!(got.idx, 1);
    }

    #[test]
    fn tier3_single_window_fallback_without_id() {
        let ops = MockWinOps::new();
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        ops.set_windows(vec![cg(10, 7, "Calculator", "", f, 0)]);
        ops.set_app_windows(10, vec![ctl(10, 0, None, "", f)]);
        let got =
            match_window(&ops, &record("Calculator", "", None, f)).expect("single-window match");
        assert_eq!(got.pid, 10);
    }

    #[test]
    fn stale_id_with_multiple_windows_is_no_match() {
        let ops = MockWinOps::new();
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        ops.set_windows(vec![
            cg(10, 20, "Safari", "a", f, 0),
            cg(10, 21, "Safari", "b", Rect::new(500.0, 0.0, 400.0, 400.0), 1),
        ]);
        ops.set_app_windows(
            10,
            vec![
                ctl(10, 0, None, "a", f),
                ctl(10, 1, None, "b", Rect::new(500.0, 0.0, 400.0, 400.0)),
            ],
        );
        // Saved id 7 no longer exists anywhere.
        assert!(match_window(&ops, &record("Safari", "a", Some(7), f)).is_none());
    }

    #[test]
    fn app_not_running_is_no_match() {
        let ops = MockWinOps::new();
        ops.set_windows(Vec::new());
        let f = Rect::new(0.0, 0.0, 400.0, 400.0);
        assert!(match_window(&ops, &record("Safari", "a", Some(7), f)).is_none());
    }
}
