#![forbid(unsafe_code)]

//! Selection algebra.
//!
//! Pure functions from a zone's current [`FocusState`] and item list to the
//! next `(selection, anchor)` pair. They return `None` when the operation
//! would not change anything or is refused by the zone's [`SelectConfig`],
//! so callers can skip the commit entirely.
//!
//! # Invariants
//!
//! - The result selection is a subset of the items.
//! - The result anchor is `None` or a member of the result selection.
//! - `Single` mode never yields more than one selected item.
//! - With `disallow_empty`, a non-empty selection never becomes empty.

use std::collections::BTreeSet;

use keyzone_core::ItemId;
use serde::{Deserialize, Serialize};

use crate::store::FocusState;
use crate::zone::{ItemSpec, SelectConfig, SelectionMode};

/// How a selection request combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectOp {
    /// Select only the target.
    #[default]
    Replace,
    /// Flip the target's membership.
    Toggle,
    /// Select the span from the anchor to the target, in item order.
    Range,
    /// Add the target, keeping the rest.
    Add,
}

/// Next selection and anchor.
pub type Selection = (BTreeSet<ItemId>, Option<ItemId>);

fn changed(state: &FocusState, next: Selection) -> Option<Selection> {
    (next.0 != state.selection || next.1 != state.anchor).then_some(next)
}

fn refuses_empty(config: &SelectConfig, state: &FocusState, next: &BTreeSet<ItemId>) -> bool {
    config.disallow_empty && next.is_empty() && !state.selection.is_empty()
}

/// Apply `op` with `target` as the subject.
#[must_use]
pub fn apply(
    state: &FocusState,
    items: &[ItemSpec],
    config: &SelectConfig,
    target: &ItemId,
    op: SelectOp,
) -> Option<Selection> {
    let position = |id: &ItemId| items.iter().position(|i| &i.id == id);
    let target_idx = position(target)?;

    let next: Selection = match config.mode {
        SelectionMode::None => return None,
        SelectionMode::Single => {
            if op == SelectOp::Toggle && state.selection.contains(target) {
                (BTreeSet::new(), None)
            } else {
                (BTreeSet::from([target.clone()]), Some(target.clone()))
            }
        }
        SelectionMode::Multiple => match op {
            SelectOp::Replace => (BTreeSet::from([target.clone()]), Some(target.clone())),
            SelectOp::Add => {
                let mut sel = state.selection.clone();
                sel.insert(target.clone());
                (sel, Some(target.clone()))
            }
            SelectOp::Toggle => {
                let mut sel = state.selection.clone();
                if sel.remove(target) {
                    let anchor = state.anchor.clone().filter(|a| a != target);
                    (sel, anchor)
                } else {
                    sel.insert(target.clone());
                    (sel, Some(target.clone()))
                }
            }
            SelectOp::Range => {
                let anchor = state
                    .anchor
                    .clone()
                    .filter(|a| position(a).is_some())
                    .or_else(|| state.focused.clone().filter(|f| position(f).is_some()))
                    .unwrap_or_else(|| target.clone());
                let anchor_idx = position(&anchor).unwrap_or(target_idx);
                let (lo, hi) = if anchor_idx <= target_idx {
                    (anchor_idx, target_idx)
                } else {
                    (target_idx, anchor_idx)
                };
                let sel = items[lo..=hi].iter().map(|i| i.id.clone()).collect();
                (sel, Some(anchor))
            }
        },
    };

    if refuses_empty(config, state, &next.0) {
        return None;
    }
    changed(state, next)
}

/// Select every item. Only `Multiple` zones support this.
#[must_use]
pub fn select_all(
    state: &FocusState,
    items: &[ItemSpec],
    config: &SelectConfig,
) -> Option<Selection> {
    if config.mode != SelectionMode::Multiple || items.is_empty() {
        return None;
    }
    let sel: BTreeSet<ItemId> = items.iter().map(|i| i.id.clone()).collect();
    let anchor = state
        .anchor
        .clone()
        .filter(|a| sel.contains(a))
        .or_else(|| items.first().map(|i| i.id.clone()));
    changed(state, (sel, anchor))
}

/// Clear the selection.
#[must_use]
pub fn clear(state: &FocusState, config: &SelectConfig) -> Option<Selection> {
    if refuses_empty(config, state, &BTreeSet::new()) {
        return None;
    }
    changed(state, (BTreeSet::new(), None))
}
