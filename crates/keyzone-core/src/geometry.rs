#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Layout coordinates are signed so that scrolled-away content (negative
//! offsets) can still take part in spatial navigation. All comparisons stay in
//! integer space; centers are expressed doubled (`2*x + w`) so that ordering is
//! exact without division.

/// An axis of motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    /// Left/right.
    Horizontal,
    /// Up/down.
    Vertical,
}

impl Axis {
    /// The other axis.
    #[inline]
    #[must_use]
    pub const fn perpendicular(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

/// A closed-open interval `[start, end)` on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Inclusive start.
    pub start: i32,
    /// Exclusive end.
    pub end: i32,
}

impl Span {
    /// Create a span. `end` is clamped so that it is never before `start`.
    #[inline]
    #[must_use]
    pub const fn new(start: i32, end: i32) -> Self {
        Self {
            start,
            end: if end < start { start } else { end },
        }
    }

    /// Length of the span.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> i32 {
        self.end - self.start
    }

    /// True when the span covers nothing.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Doubled midpoint (`start + end`).
    #[inline]
    #[must_use]
    pub const fn center2(&self) -> i64 {
        self.start as i64 + self.end as i64
    }

    /// True when the two spans share at least part of their extent.
    ///
    /// Zero-length spans overlap a span that strictly contains their point.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Span) -> bool {
        if self.is_empty() {
            return other.start <= self.start && self.start < other.end;
        }
        if other.is_empty() {
            return self.start <= other.start && other.start < self.end;
        }
        self.start < other.end && other.start < self.end
    }

    /// True when `other` lies entirely within this span.
    #[inline]
    #[must_use]
    pub const fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A rectangle in layout coordinates (origin at top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: i32,
    /// Top edge (inclusive).
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Left edge (alias for x).
    #[inline]
    #[must_use]
    pub const fn left(&self) -> i32 {
        self.x
    }

    /// Top edge (alias for y).
    #[inline]
    #[must_use]
    pub const fn top(&self) -> i32 {
        self.y
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Check if the rectangle has zero area.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// The extent of this rectangle along `axis`.
    #[inline]
    #[must_use]
    pub const fn span(&self, axis: Axis) -> Span {
        match axis {
            Axis::Horizontal => Span::new(self.left(), self.right()),
            Axis::Vertical => Span::new(self.top(), self.bottom()),
        }
    }

    /// The beam of a move along `motion`: the projection on the
    /// perpendicular axis.
    #[inline]
    #[must_use]
    pub const fn beam(&self, motion: Axis) -> Span {
        self.span(motion.perpendicular())
    }

    /// Doubled center coordinates `(2*x + w, 2*y + h)`.
    #[inline]
    #[must_use]
    pub const fn center2(&self) -> (i64, i64) {
        (
            self.span(Axis::Horizontal).center2(),
            self.span(Axis::Vertical).center2(),
        )
    }

    /// Compute the intersection with another rectangle.
    ///
    /// Returns `None` if the rectangles don't overlap.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > x && bottom > y {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// The smallest rectangle that contains both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges() {
        let r = Rect::new(10, 20, 30, 5);
        assert_eq!(r.left(), 10);
        assert_eq!(r.top(), 20);
        assert_eq!(r.right(), 40);
        assert_eq!(r.bottom(), 25);
    }

    #[test]
    fn negative_origin_is_allowed() {
        let r = Rect::new(-5, -5, 10, 10);
        assert!(r.contains(0, 0));
        assert!(r.contains(-5, -5));
        assert!(!r.contains(5, 5));
    }

    #[test]
    fn beam_is_perpendicular_projection() {
        let r = Rect::new(10, 20, 30, 5);
        assert_eq!(r.beam(Axis::Vertical), Span::new(10, 40));
        assert_eq!(r.beam(Axis::Horizontal), Span::new(20, 25));
    }

    #[test]
    fn span_overlap_and_containment() {
        let a = Span::new(0, 10);
        let b = Span::new(5, 15);
        let c = Span::new(10, 20);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c), "touching spans do not overlap");
        assert!(Span::new(0, 20).contains(&b));
        assert!(!b.contains(&a));
    }

    #[test]
    fn zero_length_span_overlaps_container() {
        let point = Span::new(5, 5);
        assert!(point.overlaps(&Span::new(0, 10)));
        assert!(Span::new(0, 10).overlaps(&point));
        assert!(!point.overlaps(&Span::new(5, 5)));
    }

    #[test]
    fn span_new_clamps_inverted() {
        let s = Span::new(10, 3);
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn doubled_center() {
        assert_eq!(Rect::new(0, 0, 3, 5).center2(), (3, 5));
        assert_eq!(Rect::new(2, 4, 2, 2).center2(), (6, 10));
    }

    #[test]
    fn intersection_and_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.union(&b), Rect::new(0, 0, 15, 15));
        assert_eq!(a.intersection(&Rect::new(20, 20, 1, 1)), None);
    }

    #[test]
    fn empty_rect() {
        assert!(Rect::new(0, 0, 0, 3).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }
}
