//! Accessibility (AX) control-view operations.
//!
//! AX element references are unstable: they cannot be compared across
//! enumeration calls and go stale whenever a window closes. Everything here
//! therefore works from [`CtlWindow`] tokens and re-resolves the live element
//! per operation; see [`resolve`].

use std::{cell::RefCell, collections::HashMap, ffi::c_void, ptr, thread_local};

use core_foundation::{
    array::{CFArray, CFArrayGetCount, CFArrayGetValueAtIndex},
    base::{CFRelease, CFTypeRef, TCFType},
    boolean::kCFBooleanTrue,
    number::CFNumber,
    string::{CFString, CFStringRef},
};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::{
    CtlWindow, WindowId,
    error::{Error, Result},
    geom::{CGPoint, CGSize, Rect},
};

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXUIElementCreateApplication(pid: i32) -> *mut c_void;
    fn AXUIElementCopyAttributeValue(
        element: *mut c_void,
        attr: CFStringRef,
        value: *mut CFTypeRef,
    ) -> i32;
    fn AXUIElementSetAttributeValue(element: *mut c_void, attr: CFStringRef, value: CFTypeRef)
    -> i32;
    fn AXUIElementPerformAction(element: *mut c_void, action: CFStringRef) -> i32;
    fn AXIsProcessTrusted() -> bool;

    // AXValue helpers for CGPoint/CGSize
    fn AXValueCreate(the_type: i32, value_ptr: *const c_void) -> CFTypeRef;
    fn AXValueGetValue(the_value: CFTypeRef, the_type: i32, value_ptr: *mut c_void) -> bool;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFRetain(cf: CFTypeRef) -> CFTypeRef;
}

// AXValue type constants (per Apple docs)
const K_AX_VALUE_CGPOINT_TYPE: i32 = 1;
const K_AX_VALUE_CGSIZE_TYPE: i32 = 2;
// AX error for invalid UI element (window closed / stale reference)
const K_AX_ERROR_INVALID_UI_ELEMENT: i32 = -25202;

/// RAII guard that releases a retained AX element on drop.
pub(crate) struct AXElem(*mut c_void);

impl AXElem {
    /// Take ownership of a Create-rule reference.
    pub(crate) fn from_create(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() { None } else { Some(Self(ptr)) }
    }

    /// Retain a borrowed reference and take ownership of the retain.
    pub(crate) fn retain_from_borrowed(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        unsafe { CFRetain(ptr as CFTypeRef) };
        Some(Self(ptr))
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

impl Drop for AXElem {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0 as CFTypeRef) };
    }
}

thread_local! {
    static ATTR_STRINGS: RefCell<HashMap<&'static str, CFString>> = RefCell::new(HashMap::new());
}

/// Return a stable CFStringRef for known attribute/action names. Avoids
/// toll-free bridging of static strings, which can trip pointer
/// authentication on recent macOS versions.
fn cfstr(name: &'static str) -> CFStringRef {
    ATTR_STRINGS.with(|cell| {
        let mut m = cell.borrow_mut();
        let s = m.entry(name).or_insert_with(|| CFString::new(name));
        s.as_concrete_TypeRef()
    })
}

/// Error unless Accessibility permission has been granted to this process.
pub(crate) fn ax_check() -> Result<()> {
    if unsafe { AXIsProcessTrusted() } {
        Ok(())
    } else {
        Err(Error::Permission)
    }
}

fn ax_get_point(element: *mut c_void, attr: CFStringRef) -> Result<CGPoint> {
    let mut v: CFTypeRef = ptr::null_mut();
    let err = unsafe { AXUIElementCopyAttributeValue(element, attr, &mut v) };
    if err != 0 {
        if err == K_AX_ERROR_INVALID_UI_ELEMENT {
            return Err(Error::WindowGone);
        }
        return Err(Error::AxCode(err));
    }
    if v.is_null() {
        return Err(Error::Unsupported);
    }
    let mut p = CGPoint { x: 0.0, y: 0.0 };
    let ok =
        unsafe { AXValueGetValue(v, K_AX_VALUE_CGPOINT_TYPE, &mut p as *mut _ as *mut c_void) };
    unsafe { CFRelease(v) };
    if !ok {
        return Err(Error::Unsupported);
    }
    Ok(p)
}

fn ax_get_size(element: *mut c_void, attr: CFStringRef) -> Result<CGSize> {
    let mut v: CFTypeRef = ptr::null_mut();
    let err = unsafe { AXUIElementCopyAttributeValue(element, attr, &mut v) };
    if err != 0 {
        if err == K_AX_ERROR_INVALID_UI_ELEMENT {
            return Err(Error::WindowGone);
        }
        return Err(Error::AxCode(err));
    }
    if v.is_null() {
        return Err(Error::Unsupported);
    }
    let mut s = CGSize {
        width: 0.0,
        height: 0.0,
    };
    let ok = unsafe { AXValueGetValue(v, K_AX_VALUE_CGSIZE_TYPE, &mut s as *mut _ as *mut c_void) };
    unsafe { CFRelease(v) };
    if !ok {
        return Err(Error::Unsupported);
    }
    Ok(s)
}

fn ax_get_string(element: *mut c_void, attr: CFStringRef) -> Option<String> {
    let mut v: CFTypeRef = ptr::null_mut();
    let err = unsafe { AXUIElementCopyAttributeValue(element, attr, &mut v) };
    if err != 0 || v.is_null() {
        return None;
    }
    let s = unsafe { CFString::wrap_under_create_rule(v as _) };
    Some(s.to_string())
}

fn ax_set_point(element: *mut c_void, attr: CFStringRef, p: CGPoint) -> Result<()> {
    let v = unsafe { AXValueCreate(K_AX_VALUE_CGPOINT_TYPE, &p as *const _ as *const c_void) };
    if v.is_null() {
        return Err(Error::Unsupported);
    }
    let err = unsafe { AXUIElementSetAttributeValue(element, attr, v) };
    unsafe { CFRelease(v) };
    if err != 0 {
        return Err(Error::AxCode(err));
    }
    Ok(())
}

fn ax_set_size(element: *mut c_void, attr: CFStringRef, s: CGSize) -> Result<()> {
    let v = unsafe { AXValueCreate(K_AX_VALUE_CGSIZE_TYPE, &s as *const _ as *const c_void) };
    if v.is_null() {
        return Err(Error::Unsupported);
    }
    let err = unsafe { AXUIElementSetAttributeValue(element, attr, v) };
    unsafe { CFRelease(v) };
    if err != 0 {
        return Err(Error::AxCode(err));
    }
    Ok(())
}

fn ax_set_true(element: *mut c_void, attr: CFStringRef) {
    let _ = unsafe { AXUIElementSetAttributeValue(element, attr, kCFBooleanTrue as CFTypeRef) };
}

// Private `_AXUIElementGetWindow` gives the CG window number for an AX window
// element; the public AXWindowNumber attribute is the fallback.

type AxGetWindowFn = unsafe extern "C" fn(*mut c_void, *mut u32) -> i32;

static AX_GET_WINDOW_SYM: OnceCell<Option<AxGetWindowFn>> = OnceCell::new();

fn ax_get_window_sym() -> Option<AxGetWindowFn> {
    *AX_GET_WINDOW_SYM.get_or_init(|| unsafe {
        let name = c"_AXUIElementGetWindow";
        let sym = libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr());
        if sym.is_null() {
            None
        } else {
            Some(std::mem::transmute::<*mut c_void, AxGetWindowFn>(sym))
        }
    })
}

/// Best-effort CG window number for an AX window element.
fn window_id_for_element(element: *mut c_void) -> Option<WindowId> {
    if let Some(f) = ax_get_window_sym() {
        let mut id: u32 = 0;
        let rc = unsafe { f(element, &mut id as *mut u32) };
        if rc == 0 && id != 0 {
            return Some(id);
        }
    }
    let mut num_ref: CFTypeRef = ptr::null_mut();
    let err =
        unsafe { AXUIElementCopyAttributeValue(element, cfstr("AXWindowNumber"), &mut num_ref) };
    if err != 0 || num_ref.is_null() {
        return None;
    }
    let n = unsafe { CFNumber::wrap_under_create_rule(num_ref as _) };
    match n.to_i64() {
        Some(v) if v > 0 => Some(v as u32),
        _ => None,
    }
}

/// Copy the app's AXWindows array; the callback receives each non-null
/// element pointer (borrowed, valid for the duration of the call).
fn for_each_app_window(pid: i32, mut f: impl FnMut(usize, *mut c_void)) -> Result<()> {
    ax_check()?;
    let app = AXElem::from_create(unsafe { AXUIElementCreateApplication(pid) })
        .ok_or(Error::AppElement)?;
    let mut wins_ref: CFTypeRef = ptr::null_mut();
    let err =
        unsafe { AXUIElementCopyAttributeValue(app.as_ptr(), cfstr("AXWindows"), &mut wins_ref) };
    if err != 0 || wins_ref.is_null() {
        return Err(Error::AxCode(err));
    }
    let arr = unsafe { CFArray::<*const c_void>::wrap_under_create_rule(wins_ref as _) };
    let n = unsafe { CFArrayGetCount(arr.as_concrete_TypeRef()) };
    let mut idx = 0usize;
    for i in 0..n {
        let w = unsafe { CFArrayGetValueAtIndex(arr.as_concrete_TypeRef(), i) } as *mut c_void;
        if w.is_null() {
            continue;
        }
        f(idx, w);
        idx += 1;
    }
    Ok(())
}

/// Enumerate the app's control-view windows as plain-data tokens.
///
/// Windows without a readable frame are skipped; a missing title becomes the
/// empty string, and a missing window number leaves `id` unset.
pub(crate) fn app_windows(pid: i32) -> Vec<CtlWindow> {
    let mut out = Vec::new();
    let res = for_each_app_window(pid, |idx, w| {
        let pos = ax_get_point(w, cfstr("AXPosition"));
        let size = ax_get_size(w, cfstr("AXSize"));
        let (Ok(p), Ok(s)) = (pos, size) else {
            return;
        };
        out.push(CtlWindow {
            pid,
            idx,
            id: window_id_for_element(w),
            title: ax_get_string(w, cfstr("AXTitle")).unwrap_or_default(),
            frame: Rect::from((p, s)),
        });
    });
    if let Err(e) = res {
        debug!("app_windows: pid={} unavailable: {}", pid, e);
    }
    out
}

/// Resolve a control token to a live AX element.
///
/// Identity precedence: stable window number, then (index, exact title), then
/// a unique exact-title match anywhere in the list. Anything weaker risks
/// acting on the wrong window, so it resolves to [`Error::WindowGone`].
fn resolve(win: &CtlWindow) -> Result<AXElem> {
    let mut by_id: Option<AXElem> = None;
    let mut by_idx: Option<AXElem> = None;
    let mut by_title: Vec<AXElem> = Vec::new();
    for_each_app_window(win.pid, |idx, w| {
        if by_id.is_none()
            && let Some(want) = win.id
            && window_id_for_element(w) == Some(want)
        {
            by_id = AXElem::retain_from_borrowed(w);
            return;
        }
        let title = ax_get_string(w, cfstr("AXTitle")).unwrap_or_default();
        if idx == win.idx && title == win.title && by_idx.is_none() {
            by_idx = AXElem::retain_from_borrowed(w);
        } else if title == win.title
            && let Some(elem) = AXElem::retain_from_borrowed(w)
        {
            by_title.push(elem);
        }
    })?;
    if let Some(elem) = by_id {
        return Ok(elem);
    }
    if let Some(elem) = by_idx {
        return Ok(elem);
    }
    if by_title.len() == 1 {
        return Ok(by_title.remove(0));
    }
    Err(Error::WindowGone)
}

/// Set a window's frame (top-left-origin coordinates).
pub(crate) fn set_frame(win: &CtlWindow, frame: Rect) -> Result<()> {
    let elem = resolve(win)?;
    let (p, s): (CGPoint, CGSize) = frame.into();
    ax_set_point(elem.as_ptr(), cfstr("AXPosition"), p)?;
    ax_set_size(elem.as_ptr(), cfstr("AXSize"), s)?;
    debug!(
        "set_frame: pid={} idx={} -> ({:.0},{:.0} {:.0}x{:.0})",
        win.pid, win.idx, frame.x, frame.y, frame.w, frame.h
    );
    Ok(())
}

/// Raise a window within its application via AXRaise.
pub(crate) fn raise(win: &CtlWindow) -> Result<()> {
    let elem = resolve(win)?;
    ax_set_true(elem.as_ptr(), cfstr("AXMain"));
    let err = unsafe { AXUIElementPerformAction(elem.as_ptr(), cfstr("AXRaise")) };
    if err != 0 {
        warn!("raise: AXRaise failed for pid={} err={}", win.pid, err);
        return Err(Error::AxCode(err));
    }
    Ok(())
}

/// Focus a window: mark it main/focused on the window and the app element,
/// then raise it.
pub(crate) fn focus(win: &CtlWindow) -> Result<()> {
    let elem = resolve(win)?;
    ax_set_true(elem.as_ptr(), cfstr("AXMain"));
    ax_set_true(elem.as_ptr(), cfstr("AXFocused"));
    if let Some(app) = AXElem::from_create(unsafe { AXUIElementCreateApplication(win.pid) }) {
        let _ = unsafe {
            AXUIElementSetAttributeValue(
                app.as_ptr(),
                cfstr("AXFocusedWindow"),
                elem.as_ptr() as CFTypeRef,
            )
        };
        ax_set_true(app.as_ptr(), cfstr("AXFrontmost"));
    }
    let err = unsafe { AXUIElementPerformAction(elem.as_ptr(), cfstr("AXRaise")) };
    if err != 0 {
        debug!("focus: AXRaise failed for pid={} err={}", win.pid, err);
    }
    Ok(())
}
