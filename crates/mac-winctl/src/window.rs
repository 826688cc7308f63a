//! CoreGraphics window enumeration (the front-to-back view).

use std::ffi::c_void;

use core_foundation::{
    array::{CFArray, CFArrayGetCount, CFArrayGetValueAtIndex},
    base::{CFTypeRef, TCFType},
    dictionary::CFDictionaryRef,
};
use core_graphics::window as cgw;
use tracing::{trace, warn};

use crate::{
    WindowInfo,
    cfutil::{dict_get_i32, dict_get_rect, dict_get_string},
};

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGWindowListCopyWindowInfo(option: u32, relative_to_window: u32) -> CFTypeRef; // CFArrayRef
}

const K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY: u32 = 1 << 0;
const K_CG_WINDOW_LIST_OPTION_EXCLUDE_DESKTOP_ELEMENTS: u32 = 1 << 4;

/// Enumerate on-screen windows front to back.
///
/// Every entry is annotated with its enumeration rank (`z`); the engine
/// re-indexes after filtering. A null CFArray (enumeration failure) yields an
/// empty list, never an error.
pub(crate) fn list_windows() -> Vec<WindowInfo> {
    trace!("list_windows");
    let mut out = Vec::new();
    unsafe {
        let arr_ref = CGWindowListCopyWindowInfo(
            K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY
                | K_CG_WINDOW_LIST_OPTION_EXCLUDE_DESKTOP_ELEMENTS,
            0,
        );
        if arr_ref.is_null() {
            warn!("list_windows: CGWindowListCopyWindowInfo returned null");
            return out;
        }
        let arr: CFArray<*const c_void> = CFArray::wrap_under_create_rule(arr_ref as _);
        let key_pid = cgw::kCGWindowOwnerPID;
        let key_layer = cgw::kCGWindowLayer;
        let key_num = cgw::kCGWindowNumber;
        let key_app = cgw::kCGWindowOwnerName;
        let key_title = cgw::kCGWindowName;
        let key_bounds = cgw::kCGWindowBounds;
        #[allow(non_snake_case)]
        unsafe extern "C" {
            fn CFGetTypeID(cf: CFTypeRef) -> u64;
            fn CFDictionaryGetTypeID() -> u64;
        }
        for i in 0..CFArrayGetCount(arr.as_concrete_TypeRef()) {
            let item = CFArrayGetValueAtIndex(arr.as_concrete_TypeRef(), i) as CFTypeRef;
            if item.is_null() || CFGetTypeID(item) != CFDictionaryGetTypeID() {
                continue;
            }
            let d = item as CFDictionaryRef;
            let pid = match dict_get_i32(d, key_pid) {
                Some(p) => p,
                None => continue,
            };
            let id = match dict_get_i32(d, key_num) {
                Some(n) if n > 0 => n as u32,
                _ => continue,
            };
            let layer = dict_get_i32(d, key_layer).unwrap_or(0);
            let app = dict_get_string(d, key_app).unwrap_or_default();
            let title = dict_get_string(d, key_title).unwrap_or_default();
            let frame = dict_get_rect(d, key_bounds);
            let z = out.len() as u32;
            out.push(WindowInfo {
                app,
                title,
                pid,
                id,
                layer,
                frame,
                z,
            });
        }
    }
    out
}
