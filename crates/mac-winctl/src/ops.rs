//! The `WinOps` seam between the engine and the window platform.
//!
//! `RealWinOps` delegates to the CG/AX modules on macOS; `MockWinOps` scripts
//! both views for tests and records every mutating call.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{CtlWindow, DisplayInfo, Result, WindowInfo, geom::Rect};

/// Trait abstraction over window operations to improve testability.
///
/// Read calls degrade to empty results on platform failure; only mutating
/// calls return errors.
pub trait WinOps: Send + Sync {
    /// Enumeration view: all on-screen windows, front to back.
    fn list_windows(&self) -> Vec<WindowInfo>;
    /// Control view: the app's windows as lookup tokens.
    fn app_windows(&self, pid: i32) -> Vec<CtlWindow>;
    /// Set a window's frame (top-left-origin coordinates).
    fn set_frame(&self, win: &CtlWindow, frame: Rect) -> Result<()>;
    /// Raise a window within its application.
    fn raise(&self, win: &CtlWindow) -> Result<()>;
    /// Focus a window (and bring its app frontmost).
    fn focus(&self, win: &CtlWindow) -> Result<()>;
    /// Request asynchronous application activation.
    fn activate_app(&self, pid: i32) -> Result<()>;
    /// Connected displays.
    fn displays(&self) -> Vec<DisplayInfo>;
    /// Process id of the host application (its windows are never captured).
    fn host_pid(&self) -> i32;
}

/// Production implementation delegating to the platform modules.
#[cfg(target_os = "macos")]
pub struct RealWinOps;

#[cfg(target_os = "macos")]
impl WinOps for RealWinOps {
    fn list_windows(&self) -> Vec<WindowInfo> {
        crate::window::list_windows()
    }
    fn app_windows(&self, pid: i32) -> Vec<CtlWindow> {
        crate::ax::app_windows(pid)
    }
    fn set_frame(&self, win: &CtlWindow, frame: Rect) -> Result<()> {
        crate::ax::set_frame(win, frame)
    }
    fn raise(&self, win: &CtlWindow) -> Result<()> {
        crate::ax::raise(win)
    }
    fn focus(&self, win: &CtlWindow) -> Result<()> {
        crate::ax::focus(win)
    }
    fn activate_app(&self, pid: i32) -> Result<()> {
        crate::activate::activate_pid(pid)
    }
    fn displays(&self) -> Vec<DisplayInfo> {
        crate::screen::displays()
    }
    fn host_pid(&self) -> i32 {
        std::process::id() as i32
    }
}

/// Shared production instance as a trait object.
#[cfg(target_os = "macos")]
pub fn real_ops() -> Arc<dyn WinOps> {
    Arc::new(RealWinOps)
}

/// Scriptable mock implementation for tests.
#[derive(Clone, Default)]
pub struct MockWinOps {
    windows: Arc<Mutex<Vec<WindowInfo>>>,
    app_windows: Arc<Mutex<HashMap<i32, Vec<CtlWindow>>>>,
    displays: Arc<Mutex<Vec<DisplayInfo>>>,
    host_pid: Arc<Mutex<i32>>,
    calls: Arc<Mutex<Vec<String>>>,
    set_frames: Arc<Mutex<Vec<(i32, usize, Rect)>>>,
    activations: Arc<Mutex<Vec<i32>>>,
    focused: Arc<Mutex<Option<(i32, usize)>>>,
    fail_set_frame: Arc<AtomicBool>,
    fail_activate: Arc<AtomicBool>,
}

impl MockWinOps {
    /// New mock with empty views.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the enumeration view.
    pub fn set_windows(&self, wins: Vec<WindowInfo>) {
        *self.windows.lock() = wins;
    }

    /// Script the control view for one app.
    pub fn set_app_windows(&self, pid: i32, wins: Vec<CtlWindow>) {
        self.app_windows.lock().insert(pid, wins);
    }

    /// Script the display list.
    pub fn set_displays(&self, displays: Vec<DisplayInfo>) {
        *self.displays.lock() = displays;
    }

    /// Script the host pid (excluded from capture).
    pub fn set_host_pid(&self, pid: i32) {
        *self.host_pid.lock() = pid;
    }

    /// Make `set_frame` fail.
    pub fn set_fail_set_frame(&self, v: bool) {
        self.fail_set_frame.store(v, Ordering::SeqCst);
    }

    /// Make `activate_app` fail.
    pub fn set_fail_activate(&self, v: bool) {
        self.fail_activate.store(v, Ordering::SeqCst);
    }

    /// True if a call with the given note was recorded.
    pub fn calls_contains(&self, s: &str) -> bool {
        self.calls.lock().iter().any(|x| x == s)
    }

    /// All recorded call notes, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Recorded `set_frame` calls as (pid, idx, frame).
    pub fn set_frame_calls(&self) -> Vec<(i32, usize, Rect)> {
        self.set_frames.lock().clone()
    }

    /// Recorded activation requests, in order.
    pub fn activations(&self) -> Vec<i32> {
        self.activations.lock().clone()
    }

    /// The most recent `focus` target as (pid, idx).
    pub fn focused(&self) -> Option<(i32, usize)> {
        *self.focused.lock()
    }

    /// Clear all recorded calls (keeps the scripted views).
    pub fn reset_recording(&self) {
        self.calls.lock().clear();
        self.set_frames.lock().clear();
        self.activations.lock().clear();
        *self.focused.lock() = None;
    }

    fn note(&self, s: String) {
        self.calls.lock().push(s);
    }
}

impl WinOps for MockWinOps {
    fn list_windows(&self) -> Vec<WindowInfo> {
        self.windows.lock().clone()
    }
    fn app_windows(&self, pid: i32) -> Vec<CtlWindow> {
        self.app_windows.lock().get(&pid).cloned().unwrap_or_default()
    }
    fn set_frame(&self, win: &CtlWindow, frame: Rect) -> Result<()> {
        self.note(format!("set_frame:{}:{}", win.pid, win.idx));
        if self.fail_set_frame.load(Ordering::SeqCst) {
            return Err(crate::Error::WindowGone);
        }
        self.set_frames.lock().push((win.pid, win.idx, frame));
        Ok(())
    }
    fn raise(&self, win: &CtlWindow) -> Result<()> {
        self.note(format!("raise:{}:{}", win.pid, win.idx));
        Ok(())
    }
    fn focus(&self, win: &CtlWindow) -> Result<()> {
        self.note(format!("focus:{}:{}", win.pid, win.idx));
        *self.focused.lock() = Some((win.pid, win.idx));
        Ok(())
    }
    fn activate_app(&self, pid: i32) -> Result<()> {
        self.note(format!("activate:{}", pid));
        if self.fail_activate.load(Ordering::SeqCst) {
            return Err(crate::Error::ActivationFailed);
        }
        self.activations.lock().push(pid);
        Ok(())
    }
    fn displays(&self) -> Vec<DisplayInfo> {
        self.displays.lock().clone()
    }
    fn host_pid(&self) -> i32 {
        *self.host_pid.lock()
    }
}
