#![forbid(unsafe_code)]

//! Per-zone focus and selection store.
//!
//! Each zone owns exactly one [`FocusStore`]. Reads are open to everyone
//! (spatial hand-off and Tab traversal inspect neighbouring zones), writes go
//! through [`FocusStore::commit`], which the crate only calls from the
//! pipeline's Commit phase and from registry repair.
//!
//! # Invariants
//!
//! 1. `focused` is `None` or a member of the zone's item list.
//! 2. `selection` is a subset of the item list.
//! 3. `anchor` is `None` or a member of `selection`.
//! 4. A commit that changes nothing does not bump the version.

use std::collections::BTreeSet;

use keyzone_core::ItemId;

use crate::zone::ItemSpec;

/// One zone's cursor, selection and expansion state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusState {
    /// Focused item.
    pub focused: Option<ItemId>,
    /// Selected items.
    pub selection: BTreeSet<ItemId>,
    /// Anchor for range selection.
    pub anchor: Option<ItemId>,
    /// Expanded tree nodes.
    pub expanded: BTreeSet<ItemId>,
    /// Remembered doubled x coordinate for vertical moves.
    pub sticky_x: Option<i64>,
    /// Remembered doubled y coordinate for horizontal moves.
    pub sticky_y: Option<i64>,
    /// Where focus goes if the focused item is removed.
    pub recovery_target: Option<ItemId>,
}

impl FocusState {
    /// Selected ids in item order.
    #[must_use]
    pub fn selection_in_order(&self, items: &[ItemSpec]) -> Vec<ItemId> {
        items
            .iter()
            .filter(|item| self.selection.contains(&item.id))
            .map(|item| item.id.clone())
            .collect()
    }
}

/// A partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusPatch {
    /// New focused item.
    pub focused: Option<Option<ItemId>>,
    /// New selection.
    pub selection: Option<BTreeSet<ItemId>>,
    /// New anchor.
    pub anchor: Option<Option<ItemId>>,
    /// New expanded set.
    pub expanded: Option<BTreeSet<ItemId>>,
    /// New sticky x.
    pub sticky_x: Option<Option<i64>>,
    /// New sticky y.
    pub sticky_y: Option<Option<i64>>,
}

impl FocusPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move focus.
    #[must_use]
    pub fn focus(mut self, item: Option<ItemId>) -> Self {
        self.focused = Some(item);
        self
    }

    /// Replace selection and anchor.
    #[must_use]
    pub fn select(mut self, selection: BTreeSet<ItemId>, anchor: Option<ItemId>) -> Self {
        self.selection = Some(selection);
        self.anchor = Some(anchor);
        self
    }

    /// Replace the expanded set.
    #[must_use]
    pub fn expanded(mut self, expanded: BTreeSet<ItemId>) -> Self {
        self.expanded = Some(expanded);
        self
    }

    /// Set both sticky coordinates.
    #[must_use]
    pub fn sticky(mut self, x: Option<i64>, y: Option<i64>) -> Self {
        self.sticky_x = Some(x);
        self.sticky_y = Some(y);
        self
    }

    /// Clear both sticky coordinates.
    #[must_use]
    pub fn reset_sticky(self) -> Self {
        self.sticky(None, None)
    }

    /// True if the patch carries no field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.focused.is_none()
            && self.selection.is_none()
            && self.anchor.is_none()
            && self.expanded.is_none()
            && self.sticky_x.is_none()
            && self.sticky_y.is_none()
    }

    /// Merge `later` on top of this patch.
    #[must_use]
    pub fn then(mut self, later: FocusPatch) -> Self {
        if later.focused.is_some() {
            self.focused = later.focused;
        }
        if later.selection.is_some() {
            self.selection = later.selection;
        }
        if later.anchor.is_some() {
            self.anchor = later.anchor;
        }
        if later.expanded.is_some() {
            self.expanded = later.expanded;
        }
        if later.sticky_x.is_some() {
            self.sticky_x = later.sticky_x;
        }
        if later.sticky_y.is_some() {
            self.sticky_y = later.sticky_y;
        }
        self
    }
}

/// A zone's store.
#[derive(Debug, Clone, Default)]
pub struct FocusStore {
    state: FocusState,
    version: u64,
}

impl FocusStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &FocusState {
        &self.state
    }

    /// Number of effective commits so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Apply the fields of `patch` that differ from the current state,
    /// enforcing membership against `items`. Returns true if anything changed.
    pub(crate) fn commit(&mut self, patch: FocusPatch, items: &[ItemSpec]) -> bool {
        let mut next = self.state.clone();
        let member = |id: &ItemId| items.iter().any(|item| &item.id == id);

        if let Some(focused) = patch.focused {
            next.focused = focused.filter(|id| member(id));
        }
        if let Some(selection) = patch.selection {
            next.selection = selection.into_iter().filter(|id| member(id)).collect();
        }
        if let Some(anchor) = patch.anchor {
            next.anchor = anchor;
        }
        if let Some(expanded) = patch.expanded {
            next.expanded = expanded.into_iter().filter(|id| member(id)).collect();
        }
        if let Some(x) = patch.sticky_x {
            next.sticky_x = x;
        }
        if let Some(y) = patch.sticky_y {
            next.sticky_y = y;
        }
        if next.anchor.as_ref().is_some_and(|a| !next.selection.contains(a)) {
            next.anchor = None;
        }
        next.recovery_target = recovery_target(next.focused.as_ref(), items);

        if next == self.state {
            return false;
        }
        self.state = next;
        self.version += 1;
        true
    }

    /// Replace the whole state, re-validated against `items`.
    pub(crate) fn restore(&mut self, state: &FocusState, items: &[ItemSpec]) -> bool {
        let patch = FocusPatch {
            focused: Some(state.focused.clone()),
            selection: Some(state.selection.clone()),
            anchor: Some(state.anchor.clone()),
            expanded: Some(state.expanded.clone()),
            sticky_x: Some(state.sticky_x),
            sticky_y: Some(state.sticky_y),
        };
        self.commit(patch, items)
    }
}

/// The item after `focused`, else the one before it.
#[must_use]
pub fn recovery_target(focused: Option<&ItemId>, items: &[ItemSpec]) -> Option<ItemId> {
    let focused = focused?;
    let idx = items.iter().position(|item| &item.id == focused)?;
    items
        .get(idx + 1)
        .or_else(|| idx.checked_sub(1).and_then(|prev| items.get(prev)))
        .map(|item| item.id.clone())
}
