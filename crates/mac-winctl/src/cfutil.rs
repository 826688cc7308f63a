//! CFDictionary field extraction helpers for the CG window list.

use core_foundation::{
    base::TCFType,
    dictionary::CFDictionaryRef,
    number::CFNumber,
    string::{CFString, CFStringRef},
};

use crate::geom::Rect;

/// Get a String value for the given CFDictionary key.
pub(crate) fn dict_get_string(dict: CFDictionaryRef, key: CFStringRef) -> Option<String> {
    let value = unsafe {
        core_foundation::dictionary::CFDictionaryGetValue(dict, key as *const core::ffi::c_void)
    };
    if value.is_null() {
        return None;
    }
    let cf = unsafe { CFString::wrap_under_get_rule(value as CFStringRef) };
    Some(cf.to_string())
}

/// Get a 32-bit integer from CFDictionary for the given key.
pub(crate) fn dict_get_i32(dict: CFDictionaryRef, key: CFStringRef) -> Option<i32> {
    let value = unsafe {
        core_foundation::dictionary::CFDictionaryGetValue(dict, key as *const core::ffi::c_void)
    };
    if value.is_null() {
        return None;
    }
    let n = unsafe { CFNumber::wrap_under_get_rule(value as _) };
    n.to_i64().map(|v| v as i32)
}

/// Get an f64 from CFDictionary for the given key.
fn dict_get_f64(dict: CFDictionaryRef, key: CFStringRef) -> Option<f64> {
    let value = unsafe {
        core_foundation::dictionary::CFDictionaryGetValue(dict, key as *const core::ffi::c_void)
    };
    if value.is_null() {
        return None;
    }
    let n = unsafe { CFNumber::wrap_under_get_rule(value as _) };
    n.to_f64()
}

/// Decode a kCGWindowBounds-style sub-dictionary ({X, Y, Width, Height}) into
/// a top-left-origin [`Rect`].
pub(crate) fn dict_get_rect(dict: CFDictionaryRef, key: CFStringRef) -> Option<Rect> {
    let value = unsafe {
        core_foundation::dictionary::CFDictionaryGetValue(dict, key as *const core::ffi::c_void)
    };
    if value.is_null() {
        return None;
    }
    let bounds = value as CFDictionaryRef;
    let kx = CFString::from_static_string("X");
    let ky = CFString::from_static_string("Y");
    let kw = CFString::from_static_string("Width");
    let kh = CFString::from_static_string("Height");
    let x = dict_get_f64(bounds, kx.as_concrete_TypeRef())?;
    let y = dict_get_f64(bounds, ky.as_concrete_TypeRef())?;
    let w = dict_get_f64(bounds, kw.as_concrete_TypeRef())?;
    let h = dict_get_f64(bounds, kh.as_concrete_TypeRef())?;
    Some(Rect::new(x, y, w, h))
}
