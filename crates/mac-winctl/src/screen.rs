//! Display enumeration via CoreGraphics.
//!
//! CG display bounds share the global top-left-origin space used by the CG
//! window list, so no coordinate conversion happens at this layer.

use core_graphics::display::CGDisplay;
use tracing::warn;

use crate::{DisplayInfo, geom::Rect};

/// Enumerate connected displays. Failure yields an empty list.
pub(crate) fn displays() -> Vec<DisplayInfo> {
    let ids = match CGDisplay::active_displays() {
        Ok(ids) => ids,
        Err(e) => {
            warn!("displays: CGGetActiveDisplayList failed: {}", e);
            return Vec::new();
        }
    };
    let main_id = CGDisplay::main().id;
    ids.into_iter()
        .map(|id| {
            let b = CGDisplay::new(id).bounds();
            DisplayInfo {
                id,
                frame: Rect::new(b.origin.x, b.origin.y, b.size.width, b.size.height),
                primary: id == main_id,
            }
        })
        .collect()
}
