#![forbid(unsafe_code)]

//! Linear navigation: index ± 1 along the item list.
//!
//! # Invariants
//!
//! - `Home`/`End` jump to the first/last item regardless of orientation.
//! - A move along the perpendicular axis is unresolved (`None`).
//! - At a boundary the result is [`Step::Boundary`] without looping, or the
//!   opposite end with looping.
//! - Without a current item, forward moves enter at the first item and
//!   backward moves at the last.

use keyzone_core::{Axis, ItemId};

use super::{Direction, Step};
use crate::zone::ItemSpec;

/// Resolve a move in a linear list.
#[must_use]
pub fn navigate(
    items: &[ItemSpec],
    current: Option<&ItemId>,
    direction: Direction,
    axis: Axis,
    looping: bool,
) -> Option<Step> {
    let first = items.first()?;
    let last = items.last()?;
    let target = |item: &ItemSpec| Some(Step::Target(item.id.clone()));

    match direction {
        Direction::Home => return target(first),
        Direction::End => return target(last),
        d if d.axis() != Some(axis) => return None,
        _ => {}
    }

    let forward = direction.is_forward();
    let Some(idx) = current.and_then(|c| items.iter().position(|i| &i.id == c)) else {
        return target(if forward { first } else { last });
    };

    let len = items.len();
    let next = if forward {
        if idx + 1 < len {
            idx + 1
        } else if looping {
            0
        } else {
            return Some(Step::Boundary);
        }
    } else if idx > 0 {
        idx - 1
    } else if looping {
        len - 1
    } else {
        return Some(Step::Boundary);
    };
    target(&items[next])
}
