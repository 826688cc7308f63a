//! Display capture: turn the live enumeration view into window records.

use mac_winctl::{DisplayInfo, WindowInfo, geom::point_in_rect, ops::WinOps};
use tracing::{debug, trace};

use crate::{
    model::WindowRecord,
    visibility::{VISIBLE_MIN_PERCENT, visible_percents},
};

/// Capture the target display's visible application windows, front to back.
///
/// Pure read: enumeration failure (or an empty display) yields an empty
/// vector, never an error. Frames in the returned records are converted into
/// the canonical bottom-left-origin space using `primary_h`.
pub(crate) fn capture_display(
    ops: &dyn WinOps,
    display: &DisplayInfo,
    primary_h: f64,
) -> Vec<WindowRecord> {
    let host = ops.host_pid();
    let all = ops.list_windows();
    let disp = display;
    trace!(display = disp.id, total = all.len(), "capture enumeration");

    // Normal app windows on this display, still in front-to-back order.
    let candidates: Vec<&WindowInfo> = all
        .iter()
        .filter(|w| w.layer == 0 && w.pid != host)
        .filter(|w| {
            w.frame
                .is_some_and(|f| point_in_rect(f.cx(), f.cy(), &display.frame))
        })
        .collect();

    // An empty title usually marks a decorative sub-window, except for
    // single-window utilities that never title their window.
    let keep_untitled = |w: &WindowInfo| -> bool {
        !candidates
            .iter()
            .any(|other| other.pid == w.pid && other.id != w.id && !other.title.is_empty())
    };

    let frames: Vec<_> = candidates
        .iter()
        .map(|w| w.frame.unwrap_or_default())
        .collect();
    let percents = visible_percents(&frames);

    let mut out = Vec::new();
    for (i, w) in candidates.iter().enumerate() {
        if percents[i] < VISIBLE_MIN_PERCENT {
            debug!(
                app = %w.app,
                title = %w.title,
                visible = percents[i],
                "capture: dropping mostly-hidden window"
            );
            continue;
        }
        if w.title.is_empty() && !keep_untitled(w) {
            debug!(app = %w.app, id = w.id, "capture: dropping untitled sub-window");
            continue;
        }
        let frame = w.frame.unwrap_or_default().flip_vertical(primary_h);
        out.push(WindowRecord {
            app: w.app.clone(),
            title: w.title.clone(),
            id: Some(w.id),
            frame,
            z: out.len() as u32,
        });
    }
    out
}
