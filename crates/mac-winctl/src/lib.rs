//! mac-winctl: macOS window enumeration and control for vspaces.
//!
//! Two independent views of the same windows are exposed:
//! - the CoreGraphics *enumeration* view ([`WindowInfo`]): every on-screen
//!   window in front-to-back order, with a numeric window id and a frame;
//! - the Accessibility *control* view ([`CtlWindow`]): per-application window
//!   handles that can be positioned, raised, and focused.
//!
//! The two views correlate only loosely (ids are reused, titles collide,
//! enumeration is racy), which is why [`CtlWindow`] is a plain-data lookup
//! token rather than a live reference: every operation re-resolves the
//! underlying AX element fresh, and a token that no longer resolves yields
//! [`Error::WindowGone`].
//!
//! All real operations require Accessibility permission and are only compiled
//! on macOS; the [`ops::WinOps`] trait and [`ops::MockWinOps`] build anywhere.

mod error;
pub mod geom;
pub mod ops;

#[cfg(target_os = "macos")]
mod activate;
#[cfg(target_os = "macos")]
mod ax;
#[cfg(target_os = "macos")]
mod cfutil;
#[cfg(target_os = "macos")]
mod focus_watch;
#[cfg(target_os = "macos")]
mod screen;
#[cfg(target_os = "macos")]
mod window;

pub use error::{Error, Result};
#[cfg(target_os = "macos")]
pub use focus_watch::{install_focus_observer, pump_focus_events, set_focus_sink};

use crate::geom::Rect;

/// Alias for CoreGraphics CGWindowID (kCGWindowNumber).
pub type WindowId = u32;

/// Identifier for a physical display.
pub type DisplayId = u32;

/// One window in the enumeration (CoreGraphics) view, front-to-back ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    /// Owning application name.
    pub app: String,
    /// Window title; may be empty.
    pub title: String,
    /// Owning process id.
    pub pid: i32,
    /// CG window number.
    pub id: WindowId,
    /// CG window layer; 0 for normal application windows.
    pub layer: i32,
    /// Frame in the platform's top-left-origin space, when reported.
    pub frame: Option<Rect>,
    /// Front-to-back rank within the enumeration, 0 = frontmost.
    pub z: u32,
}

/// One window in the control (Accessibility) view.
///
/// A snapshot taken at enumeration time: plain data, safe to hold across
/// threads and awaits. Operations taking a `CtlWindow` look the live element
/// up again; holders must expect [`Error::WindowGone`].
#[derive(Debug, Clone, PartialEq)]
pub struct CtlWindow {
    /// Owning process id.
    pub pid: i32,
    /// Index within the app's AX window list at enumeration time.
    pub idx: usize,
    /// CG window number when the control interface exposed one.
    pub id: Option<WindowId>,
    /// Title at enumeration time.
    pub title: String,
    /// Frame at enumeration time, top-left-origin space.
    pub frame: Rect,
}

/// A connected display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayInfo {
    /// Stable display identifier.
    pub id: DisplayId,
    /// Display bounds in the global top-left-origin space.
    pub frame: Rect,
    /// True for the primary display (menu bar; origin of the global space).
    pub primary: bool,
}

/// Application-activation notification from the window platform.
#[derive(Debug, Clone)]
pub struct FocusEvent {
    /// Name of the newly active application (may be empty if unavailable).
    pub app: String,
    /// Process id of the newly active application (-1 if unavailable).
    pub pid: i32,
}

/// Height of the primary display, the reference for coordinate flips.
///
/// Returns 0.0 when no display is reported; callers treat that as "nothing
/// visible" rather than an error.
pub fn primary_height(displays: &[DisplayInfo]) -> f64 {
    displays
        .iter()
        .find(|d| d.primary)
        .or_else(|| displays.first())
        .map(|d| d.frame.h)
        .unwrap_or(0.0)
}
