//! Phased restore of a saved arrangement.
//!
//! Application activation is asynchronous and can reorder raises issued too
//! early, so restore runs in three phases: position everything first, then
//! activate and raise app groups back-to-front with a bounded settle delay,
//! then fix up final focus. Unmatched windows are skipped everywhere; a
//! partial restore is the expected degraded outcome.

use std::time::Duration;

use mac_winctl::{CtlWindow, ops::WinOps};
use tracing::{debug, info, warn};

use crate::{matcher, model::Space};

/// Counts reported back to the restore caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Windows located and restored.
    pub matched: usize,
    /// Saved windows that could not be located.
    pub skipped: usize,
}

impl RestoreReport {
    /// Accumulate another report (multi-display restores).
    pub(crate) fn absorb(&mut self, other: Self) {
        self.matched += other.matched;
        self.skipped += other.skipped;
    }
}

/// Restore one space: reposition, re-stack, and refocus its matched windows.
///
/// `primary_h` converts the records' canonical frames back into the
/// platform's top-left space; `settle` is the per-group activation delay.
pub(crate) async fn restore_space(
    ops: &dyn WinOps,
    space: &Space,
    primary_h: f64,
    settle: Duration,
) -> RestoreReport {
    let mut matched: Vec<(u32, &crate::model::WindowRecord, CtlWindow)> = Vec::new();
    let mut report = RestoreReport::default();
    for rec in &space.windows {
        match matcher::match_window(ops, rec) {
            Some(ctl) => matched.push((rec.z, rec, ctl)),
            None => {
                info!(
                    app = %rec.app,
                    title = %rec.title,
                    z = rec.z,
                    "restore: window not found, skipping"
                );
                report.skipped += 1;
            }
        }
    }
    report.matched = matched.len();

    // Phase 1: frames only. No raising or activation yet, so later phases
    // are not interrupted by layout reflow.
    for (_, rec, ctl) in &matched {
        let frame = rec.frame.flip_vertical(primary_h);
        if let Err(e) = ops.set_frame(ctl, frame) {
            warn!(app = %rec.app, title = %rec.title, "restore: set_frame failed: {}", e);
        }
    }

    // Phase 2: activate and raise per app group, most-background group
    // first. Last-activated wins, which leaves the app switcher ordered as
    // saved.
    let mut groups: Vec<(i32, u32)> = Vec::new(); // (pid, max z)
    for (z, _, ctl) in &matched {
        match groups.iter_mut().find(|(pid, _)| *pid == ctl.pid) {
            Some((_, max_z)) => *max_z = (*max_z).max(*z),
            None => groups.push((ctl.pid, *z)),
        }
    }
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    for (pid, _) in &groups {
        if let Err(e) = ops.activate_app(*pid) {
            warn!(pid, "restore: activate failed: {}", e);
            continue;
        }
        // Activation has no completion signal; give it a bounded moment.
        tokio::time::sleep(settle).await;
        // Back to front within the group: the group's frontmost window is
        // raised last and ends up on top.
        let mut wins: Vec<&(u32, &crate::model::WindowRecord, CtlWindow)> =
            matched.iter().filter(|(_, _, c)| c.pid == *pid).collect();
        wins.sort_by_key(|(z, _, _)| std::cmp::Reverse(*z));
        for (z, rec, ctl) in wins {
            if let Err(e) = ops.raise(ctl) {
                debug!(app = %rec.app, z, "restore: raise failed: {}", e);
            }
        }
    }

    // Phase 3: residual focus drift correction for the saved frontmost
    // window.
    if let Some((_, rec, ctl)) = matched.iter().find(|(z, _, _)| *z == 0) {
        if let Err(e) = ops.activate_app(ctl.pid) {
            warn!(app = %rec.app, "restore: final activate failed: {}", e);
        }
        if let Err(e) = ops.focus(ctl) {
            warn!(app = %rec.app, "restore: final focus failed: {}", e);
        }
    }
    report
}
