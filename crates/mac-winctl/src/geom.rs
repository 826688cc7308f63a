// Unified geometry primitives and helpers.
// CGPoint/CGSize mirror CoreGraphics types (f64 fields) for AXValue interop.

use serde::{Deserialize, Serialize};

/// A point in screen coordinates, mirroring the CoreGraphics layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CGPoint {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A size in screen coordinates, mirroring the CoreGraphics layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CGSize {
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

/// Axis-aligned rectangle. Orientation of the y axis is a caller contract:
/// platform frames are top-left origin, engine-canonical frames bottom-left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Origin x.
    pub x: f64,
    /// Origin y.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    /// Construct a rectangle from origin and extent.
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Minimum x edge.
    #[inline]
    pub fn min_x(&self) -> f64 {
        self.x
    }

    /// Maximum x edge.
    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x + self.w
    }

    /// Minimum y edge.
    #[inline]
    pub fn min_y(&self) -> f64 {
        self.y
    }

    /// Maximum y edge.
    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y + self.h
    }

    /// Horizontal center.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.w / 2.0
    }

    /// Vertical center.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.h / 2.0
    }

    /// Area; zero for degenerate extents.
    #[inline]
    pub fn area(&self) -> f64 {
        if self.w <= 0.0 || self.h <= 0.0 {
            0.0
        } else {
            self.w * self.h
        }
    }

    /// True when width or height is not strictly positive.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Intersection with `other`, or `None` when the overlap is empty.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x0 = self.min_x().max(other.min_x());
        let y0 = self.min_y().max(other.min_y());
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 > x0 && y1 > y0 {
            Some(Self::new(x0, y0, x1 - x0, y1 - y0))
        } else {
            None
        }
    }

    /// Sum of absolute differences over origin and extent.
    ///
    /// Used as the frame-match metric: small drift on several axes and a
    /// large jump on one axis score the same.
    #[inline]
    pub fn manhattan_distance(&self, other: &Self) -> f64 {
        (self.x - other.x).abs()
            + (self.y - other.y).abs()
            + (self.w - other.w).abs()
            + (self.h - other.h).abs()
    }

    /// Mirror the rectangle across a horizontal axis of height `ref_h`.
    ///
    /// Converts a top-left-origin frame into the bottom-left-origin canonical
    /// space (and back; the operation is its own inverse). `ref_h` is the
    /// primary display height and must be the same on every conversion path.
    #[inline]
    pub fn flip_vertical(&self, ref_h: f64) -> Self {
        Self::new(self.x, ref_h - self.y - self.h, self.w, self.h)
    }
}

impl From<(CGPoint, CGSize)> for Rect {
    fn from(v: (CGPoint, CGSize)) -> Self {
        let (p, s) = v;
        Self::new(p.x, p.y, s.width, s.height)
    }
}

impl From<Rect> for (CGPoint, CGSize) {
    fn from(r: Rect) -> Self {
        (
            CGPoint { x: r.x, y: r.y },
            CGSize {
                width: r.w,
                height: r.h,
            },
        )
    }
}

/// Approximate scalar equality within `eps`.
#[inline]
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Approximate per-axis rectangle equality within `eps`.
#[inline]
pub fn rect_approx_eq(a: &Rect, b: &Rect, eps: f64) -> bool {
    approx_eq(a.x, b.x, eps)
        && approx_eq(a.y, b.y, eps)
        && approx_eq(a.w, b.w, eps)
        && approx_eq(a.h, b.h, eps)
}

/// Inclusive point-in-rectangle test.
#[inline]
pub fn point_in_rect(px: f64, py: f64, r: &Rect) -> bool {
    px >= r.min_x() && px <= r.max_x() && py >= r.min_y() && py <= r.max_y()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_edges_and_center() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.min_x(), 10.0);
        assert_eq!(r.max_x(), 40.0);
        assert_eq!(r.min_y(), 20.0);
        assert_eq!(r.max_y(), 60.0);
        assert_eq!(r.cx(), 25.0);
        assert_eq!(r.cy(), 40.0);
        assert_eq!(r.area(), 1200.0);
    }

    #[test]
    fn degenerate_rect_has_zero_area() {
        assert_eq!(Rect::new(5.0, 5.0, 0.0, 10.0).area(), 0.0);
        assert_eq!(Rect::new(5.0, 5.0, 10.0, -1.0).area(), 0.0);
        assert!(Rect::new(0.0, 0.0, 0.0, 0.0).is_degenerate());
    }

    #[test]
    fn intersect_overlapping_and_disjoint() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i, Rect::new(5.0, 5.0, 5.0, 5.0));
        let c = Rect::new(20.0, 20.0, 5.0, 5.0);
        assert!(a.intersect(&c).is_none());
        // Edge contact has zero overlap.
        let d = Rect::new(10.0, 0.0, 5.0, 5.0);
        assert!(a.intersect(&d).is_none());
    }

    #[test]
    fn manhattan_distance_sums_all_axes() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(3.0, -2.0, 101.0, 50.0);
        assert_eq!(a.manhattan_distance(&b), 6.0);
        assert_eq!(a.manhattan_distance(&a), 0.0);
    }

    #[test]
    fn flip_vertical_is_involution() {
        let ref_h = 1080.0;
        let r = Rect::new(100.0, 200.0, 640.0, 480.0);
        let flipped = r.flip_vertical(ref_h);
        assert_eq!(flipped.y, 1080.0 - 200.0 - 480.0);
        assert_eq!(flipped.flip_vertical(ref_h), r);
    }

    #[test]
    fn point_in_rect_inclusive() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(point_in_rect(0.0, 0.0, &r));
        assert!(point_in_rect(10.0, 10.0, &r));
        assert!(!point_in_rect(-0.1, 0.0, &r));
        assert!(!point_in_rect(0.0, 10.1, &r));
    }
}
