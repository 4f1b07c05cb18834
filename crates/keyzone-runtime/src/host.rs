#![forbid(unsafe_code)]

//! The platform seam.
//!
//! The engine never measures or focuses anything itself. Layout queries go
//! through [`Geometry`]; the Project phase moves the platform's active
//! element through [`Host`]. [`HeadlessHost`] keeps both in memory for
//! tests and for embedders without a visual surface.

use ahash::AHashMap;
use keyzone_core::{ItemId, Rect};

/// Layout queries used by spatial and corner navigation.
pub trait Geometry {
    /// The item's layout rectangle, `None` if it is not laid out.
    fn rect(&self, item: &ItemId) -> Option<Rect>;

    /// The item's nesting depth among tiled items.
    fn depth(&self, _item: &ItemId) -> u32 {
        0
    }
}

/// Geometry plus active-element projection.
pub trait Host: Geometry {
    /// The element the platform currently treats as focused.
    fn active_element(&self) -> Option<ItemId>;

    /// Move the platform focus. `None` blurs.
    fn set_active_element(&mut self, item: Option<&ItemId>);
}

/// In-memory host.
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    rects: AHashMap<ItemId, (Rect, u32)>,
    active: Option<ItemId>,
    projections: u64,
}

impl HeadlessHost {
    /// An empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out an item at depth 0.
    pub fn place(&mut self, item: impl Into<ItemId>, rect: Rect) {
        self.place_at_depth(item, rect, 0);
    }

    /// Lay out an item at a nesting depth.
    pub fn place_at_depth(&mut self, item: impl Into<ItemId>, rect: Rect, depth: u32) {
        self.rects.insert(item.into(), (rect, depth));
    }

    /// Forget an item's layout.
    pub fn unplace(&mut self, item: &ItemId) {
        self.rects.remove(item);
    }

    /// Number of times the active element was actually moved.
    #[must_use]
    pub fn projections(&self) -> u64 {
        self.projections
    }
}

impl Geometry for HeadlessHost {
    fn rect(&self, item: &ItemId) -> Option<Rect> {
        self.rects.get(item).map(|(r, _)| *r)
    }

    fn depth(&self, item: &ItemId) -> u32 {
        self.rects.get(item).map_or(0, |(_, d)| *d)
    }
}

impl Host for HeadlessHost {
    fn active_element(&self) -> Option<ItemId> {
        self.active.clone()
    }

    fn set_active_element(&mut self, item: Option<&ItemId>) {
        self.active = item.cloned();
        self.projections += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_geometry() {
        let mut host = HeadlessHost::new();
        host.place("a", Rect::new(0, 0, 10, 10));
        host.place_at_depth("b", Rect::new(10, 0, 10, 10), 2);
        assert_eq!(host.rect(&"a".into()), Some(Rect::new(0, 0, 10, 10)));
        assert_eq!(host.depth(&"b".into()), 2);
        assert_eq!(host.depth(&"zz".into()), 0);
        host.unplace(&"a".into());
        assert_eq!(host.rect(&"a".into()), None);
    }

    #[test]
    fn projection_counter() {
        let mut host = HeadlessHost::new();
        host.set_active_element(Some(&"a".into()));
        host.set_active_element(None);
        assert_eq!(host.active_element(), None);
        assert_eq!(host.projections(), 2);
    }
}
