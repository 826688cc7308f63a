//! Occlusion math for capture filtering.
//!
//! For each window in a front-to-back list, computes the fraction of its
//! frame not covered by windows in front of it. Coverage is computed by
//! splitting the frame into disjoint fragments against each occluder, so
//! overlapping occluders are never subtracted twice.

use mac_winctl::geom::Rect;

/// Windows whose visible share falls below this are dropped from capture.
pub(crate) const VISIBLE_MIN_PERCENT: f64 = 40.0;

/// Subtract `occ` from `frag`, appending the up-to-four disjoint remainder
/// pieces to `out`.
fn subtract_into(frag: Rect, occ: &Rect, out: &mut Vec<Rect>) {
    let Some(cut) = frag.intersect(occ) else {
        out.push(frag);
        return;
    };
    // Left and right slabs span the fragment's full height; top and bottom
    // strips are clamped to the cut's x span so the pieces stay disjoint.
    if cut.min_x() > frag.min_x() {
        out.push(Rect::new(
            frag.min_x(),
            frag.min_y(),
            cut.min_x() - frag.min_x(),
            frag.h,
        ));
    }
    if frag.max_x() > cut.max_x() {
        out.push(Rect::new(
            cut.max_x(),
            frag.min_y(),
            frag.max_x() - cut.max_x(),
            frag.h,
        ));
    }
    if cut.min_y() > frag.min_y() {
        out.push(Rect::new(
            cut.min_x(),
            frag.min_y(),
            cut.w,
            cut.min_y() - frag.min_y(),
        ));
    }
    if frag.max_y() > cut.max_y() {
        out.push(Rect::new(
            cut.min_x(),
            cut.max_y(),
            cut.w,
            frag.max_y() - cut.max_y(),
        ));
    }
}

/// Percentage of `target` left unobstructed by `occluders`.
///
/// Degenerate targets report 0% visible.
pub(crate) fn visible_percent(target: &Rect, occluders: &[Rect]) -> f64 {
    let total = target.area();
    if total <= 0.0 {
        return 0.0;
    }
    let mut fragments = vec![*target];
    for occ in occluders {
        if occ.is_degenerate() {
            continue;
        }
        let mut next = Vec::with_capacity(fragments.len());
        for frag in fragments {
            subtract_into(frag, occ, &mut next);
        }
        fragments = next;
        if fragments.is_empty() {
            return 0.0;
        }
    }
    let visible: f64 = fragments.iter().map(Rect::area).sum();
    100.0 * visible / total
}

/// Visible percentage for each rectangle in a front-to-back list, occluded by
/// everything in front of it (lower index = closer to the viewer).
pub(crate) fn visible_percents(rects: &[Rect]) -> Vec<f64> {
    rects
        .iter()
        .enumerate()
        .map(|(i, r)| visible_percent(r, &rects[..i]))
        .collect()
}
