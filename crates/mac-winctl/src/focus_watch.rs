//! NSWorkspace application-activation notifications.
//!
//! The observer must be installed on the main thread and notifications only
//! arrive while a CFRunLoop is pumping; CLI callers install the observer and
//! then hand the main thread to [`pump_focus_events`]. Events are forwarded
//! into a tokio channel so the engine consumes them off the delivery queue
//! without ever blocking it.

use std::{ptr::NonNull, sync::Mutex};

use block2::StackBlock;
use core_foundation::runloop::CFRunLoop;
use objc2_app_kit::{NSRunningApplication, NSWorkspace};
use objc2_foundation::NSNotification;
use once_cell::sync::Lazy;
use tracing::info;

use crate::FocusEvent;

// Sink for NSWorkspace events; set before installing the observer.
static FOCUS_SINK: Lazy<Mutex<Option<tokio::sync::mpsc::UnboundedSender<FocusEvent>>>> =
    Lazy::new(|| Mutex::new(None));

// Tracks one-time observer installation.
static OBSERVER_INSTALLED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

/// Register the channel that receives [`FocusEvent`]s.
///
/// Call before [`install_focus_observer`]; replacing the sink is allowed and
/// takes effect for subsequent notifications.
pub fn set_focus_sink(tx: tokio::sync::mpsc::UnboundedSender<FocusEvent>) {
    if let Ok(mut guard) = FOCUS_SINK.lock() {
        *guard = Some(tx);
    }
}

fn emit(app: String, pid: i32) {
    if let Ok(guard) = FOCUS_SINK.lock()
        && let Some(tx) = &*guard
    {
        let _ = tx.send(FocusEvent { app, pid });
    }
}

/// Install the NSWorkspace activation observer on the current (main) thread.
///
/// Idempotent; only the first call performs the install. The notification
/// center retains the handler block, keeping the observer alive for the
/// process lifetime.
pub fn install_focus_observer() {
    let Ok(mut installed) = OBSERVER_INSTALLED.lock() else {
        return;
    };
    if *installed {
        return;
    }
    unsafe {
        let ws = NSWorkspace::sharedWorkspace();
        let center = ws.notificationCenter();
        let block = StackBlock::new(move |notif: NonNull<NSNotification>| {
            let notif = notif.as_ref();
            let mut sent = false;
            if let Some(obj) = notif.object()
                && let Some(app) = obj.downcast_ref::<NSRunningApplication>()
            {
                let pid = app.processIdentifier();
                if let Some(name) = app.localizedName() {
                    let c = name.UTF8String();
                    if !c.is_null()
                        && let Ok(s) = std::ffi::CStr::from_ptr(c).to_str()
                    {
                        emit(s.to_string(), pid);
                        sent = true;
                    }
                }
                if !sent && let Some(bid) = app.bundleIdentifier() {
                    let c = bid.UTF8String();
                    if !c.is_null()
                        && let Ok(s) = std::ffi::CStr::from_ptr(c).to_str()
                    {
                        emit(s.to_string(), pid);
                        sent = true;
                    }
                }
            }
            if !sent {
                emit(String::new(), -1);
            }
        })
        .copy();
        let _token = center.addObserverForName_object_queue_usingBlock(None, None, None, &block);
        *installed = true;
        info!("NSWorkspace focus observer installed");
    }
}

/// Run the current thread's CFRunLoop so notifications are delivered.
///
/// Blocks until the run loop is stopped. Intended for the CLI `watch` command,
/// which parks the main thread here while the engine runs on tokio workers.
pub fn pump_focus_events() {
    CFRunLoop::run_current();
}
