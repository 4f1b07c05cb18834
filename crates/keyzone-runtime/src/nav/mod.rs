#![forbid(unsafe_code)]

//! Navigation strategies.
//!
//! Every strategy is a pure function from "where focus is now" plus the
//! zone's items (and, for the geometric strategies, their rectangles) to
//! "where focus goes next". None of them touch a store; the pipeline commits
//! the result.
//!
//! | Orientation | Strategy |
//! |---|---|
//! | `Vertical`, `Horizontal` | [`linear`] |
//! | `Spatial` | [`spatial`] |
//! | `Corner` | [`corner`] |
//!
//! Tab traversal across zones lives in [`tab`].

pub mod corner;
pub mod linear;
pub mod spatial;
pub mod tab;

use keyzone_core::{Axis, ItemId, Rect};
use serde::{Deserialize, Serialize};

use crate::store::FocusState;
use crate::zone::{EntryStrategy, ItemSpec, Orientation};

/// Arrow-key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Up.
    Up,
    /// Down.
    Down,
    /// Left.
    Left,
    /// Right.
    Right,
    /// First item.
    Home,
    /// Last item.
    End,
}

impl Direction {
    /// The axis of motion, `None` for `Home`/`End`.
    #[must_use]
    pub const fn axis(self) -> Option<Axis> {
        match self {
            Self::Up | Self::Down => Some(Axis::Vertical),
            Self::Left | Self::Right => Some(Axis::Horizontal),
            Self::Home | Self::End => None,
        }
    }

    /// True for moves toward the end of a list or the bottom/right.
    #[must_use]
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Down | Self::Right | Self::End)
    }
}

/// Tab direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabDirection {
    /// Tab.
    #[default]
    Forward,
    /// Shift+Tab.
    Backward,
}

/// Result of a resolved move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Focus moves to this item.
    Target(ItemId),
    /// The move hit the edge; focus stays where it is.
    Boundary,
}

/// An item with its layout rectangle and nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Item id.
    pub id: ItemId,
    /// Layout rectangle.
    pub rect: Rect,
    /// Nesting depth.
    pub depth: u32,
}

impl Candidate {
    /// Create a candidate at depth 0.
    pub fn new(id: impl Into<ItemId>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect,
            depth: 0,
        }
    }

    /// Set the nesting depth.
    #[must_use]
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// Expansion change requested by a horizontal move on a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandAction {
    /// Flip.
    Toggle,
    /// Open.
    Expand,
    /// Close.
    Collapse,
}

impl ExpandAction {
    /// The expansion state after applying this action, or `None` if nothing
    /// would change.
    #[must_use]
    pub fn apply(self, expanded: bool) -> Option<bool> {
        let next = match self {
            Self::Toggle => !expanded,
            Self::Expand => true,
            Self::Collapse => false,
        };
        (next != expanded).then_some(next)
    }
}

/// Whether an arrow move on `item` should change expansion instead of moving.
///
/// Right opens a collapsed node and Left closes an open one, except in
/// horizontal lists where Left/Right are the movement keys. Any other case
/// returns `None` and the move proceeds.
#[must_use]
pub fn expansion_for(
    item: &ItemSpec,
    expanded: bool,
    direction: Direction,
    orientation: Orientation,
) -> Option<bool> {
    if !item.expandable || orientation == Orientation::Horizontal {
        return None;
    }
    match direction {
        Direction::Right => ExpandAction::Expand.apply(expanded),
        Direction::Left => ExpandAction::Collapse.apply(expanded),
        _ => None,
    }
}

/// The item that receives focus when a zone is entered without a cursor.
#[must_use]
pub fn entry_item(
    items: &[ItemSpec],
    state: Option<&FocusState>,
    strategy: EntryStrategy,
) -> Option<ItemId> {
    let first = items.first().map(|i| i.id.clone());
    let member = |id: &ItemId| items.iter().any(|i| &i.id == id);
    let restored = || {
        state
            .and_then(|s| s.focused.clone())
            .filter(|id| member(id))
    };
    match strategy {
        EntryStrategy::First => first,
        EntryStrategy::Last => items.last().map(|i| i.id.clone()),
        EntryStrategy::Restore => restored().or(first),
        EntryStrategy::Selected => state
            .and_then(|s| {
                items
                    .iter()
                    .find(|i| s.selection.contains(&i.id))
                    .map(|i| i.id.clone())
            })
            .or_else(restored)
            .or(first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ids: &[&str]) -> Vec<ItemSpec> {
        ids.iter().map(|id| ItemSpec::new(*id)).collect()
    }

    #[test]
    fn direction_axes() {
        assert_eq!(Direction::Up.axis(), Some(Axis::Vertical));
        assert_eq!(Direction::Right.axis(), Some(Axis::Horizontal));
        assert_eq!(Direction::Home.axis(), None);
        assert!(Direction::End.is_forward());
        assert!(!Direction::Left.is_forward());
    }

    #[test]
    fn expand_action_noop_detection() {
        assert_eq!(ExpandAction::Expand.apply(false), Some(true));
        assert_eq!(ExpandAction::Expand.apply(true), None);
        assert_eq!(ExpandAction::Toggle.apply(true), Some(false));
        assert_eq!(ExpandAction::Collapse.apply(false), None);
    }

    #[test]
    fn expansion_only_for_tree_nodes() {
        let node = ItemSpec::expandable("n");
        let leaf = ItemSpec::new("l");
        let v = Orientation::Vertical;
        assert_eq!(expansion_for(&node, false, Direction::Right, v), Some(true));
        assert_eq!(expansion_for(&node, true, Direction::Right, v), None);
        assert_eq!(expansion_for(&node, true, Direction::Left, v), Some(false));
        assert_eq!(expansion_for(&leaf, false, Direction::Right, v), None);
        assert_eq!(
            expansion_for(&node, false, Direction::Right, Orientation::Horizontal),
            None
        );
    }

    #[test]
    fn entry_strategies() {
        let list = items(&["a", "b", "c"]);
        let state = FocusState {
            focused: Some("b".into()),
            selection: [ItemId::new("c")].into_iter().collect(),
            ..FocusState::default()
        };
        assert_eq!(entry_item(&list, Some(&state), EntryStrategy::First), Some("a".into()));
        assert_eq!(entry_item(&list, Some(&state), EntryStrategy::Last), Some("c".into()));
        assert_eq!(entry_item(&list, Some(&state), EntryStrategy::Restore), Some("b".into()));
        assert_eq!(entry_item(&list, Some(&state), EntryStrategy::Selected), Some("c".into()));
        assert_eq!(entry_item(&list, None, EntryStrategy::Restore), Some("a".into()));
        assert_eq!(entry_item(&[], None, EntryStrategy::First), None);
    }
}
