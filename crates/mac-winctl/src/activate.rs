//! Application activation via AppKit.

use objc2_app_kit::{NSApplicationActivationOptions, NSRunningApplication};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Request activation of the application owning `pid`.
///
/// Activation is asynchronous on the platform side; a successful return only
/// means the request was accepted. Callers that need the activation to have
/// settled wait a bounded delay afterwards.
pub(crate) fn activate_pid(pid: i32) -> Result<()> {
    let app = unsafe {
        NSRunningApplication::runningApplicationWithProcessIdentifier(pid as libc::pid_t)
    }
    .ok_or(Error::ActivationFailed)?;
    let ok =
        unsafe { app.activateWithOptions(NSApplicationActivationOptions::ActivateAllWindows) };
    if ok {
        debug!("activate_pid: requested activation for pid={}", pid);
    } else {
        // The request was delivered; AppKit reports false for apps already
        // frontmost or mid-launch. Not an error for our purposes.
        warn!("activate_pid: activateWithOptions returned false for pid={}", pid);
    }
    Ok(())
}
