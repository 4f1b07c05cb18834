#![forbid(unsafe_code)]

//! Tab traversal.
//!
//! Tab is the one move that crosses zone borders by default. What happens is
//! decided by the active zone's [`TabBehavior`]:
//!
//! - `Trap`: cycle through the zone's items, never leaving.
//! - `Flow`: walk the items; past the last one, continue into the next zone
//!   in document order at its first item (last item when going backward).
//! - `Escape`: leave at once for the next zone in document order, entering
//!   through that zone's entry strategy.
//!
//! Zones without items are skipped. Document order does not wrap; running
//! off the end leaves the move unresolved so the platform default applies.

use keyzone_core::{ItemId, ZoneId};

use super::{TabDirection, entry_item};
use crate::registry::ZoneRegistry;
use crate::zone::{EntryStrategy, TabBehavior};

/// Where a Tab press lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabTarget {
    /// Zone receiving jurisdiction.
    pub zone: ZoneId,
    /// Item receiving focus.
    pub item: ItemId,
}

/// Resolve a Tab press against the registry's active zone.
#[must_use]
pub fn resolve(registry: &ZoneRegistry, direction: TabDirection) -> Option<TabTarget> {
    let forward = direction == TabDirection::Forward;
    let Some(zone) = registry.active_zone() else {
        return next_zone(registry, None, forward, None);
    };
    let spec = registry.zone(zone)?;
    let items = registry.items(zone);
    let focused_idx = registry
        .state(zone)
        .and_then(|s| s.focused.as_ref())
        .and_then(|f| items.iter().position(|i| &i.id == f));

    let here = |idx: usize| {
        Some(TabTarget {
            zone: zone.clone(),
            item: items[idx].id.clone(),
        })
    };

    match spec.config.tab.behavior {
        TabBehavior::Trap => {
            if items.is_empty() {
                return None;
            }
            let len = items.len();
            let idx = match (focused_idx, forward) {
                (Some(i), true) => (i + 1) % len,
                (Some(i), false) => (i + len - 1) % len,
                (None, true) => 0,
                (None, false) => len - 1,
            };
            here(idx)
        }
        TabBehavior::Flow => {
            let next = match (focused_idx, forward) {
                (Some(i), true) => Some(i + 1).filter(|n| *n < items.len()),
                (Some(i), false) => i.checked_sub(1),
                (None, true) => (!items.is_empty()).then_some(0),
                (None, false) => items.len().checked_sub(1),
            };
            match next {
                Some(idx) => here(idx),
                None => {
                    let edge = if forward {
                        EntryStrategy::First
                    } else {
                        EntryStrategy::Last
                    };
                    next_zone(registry, Some(zone), forward, Some(edge))
                }
            }
        }
        TabBehavior::Escape => next_zone(registry, Some(zone), forward, None),
    }
}

/// The next non-empty zone after `from` in document order. `entry` overrides
/// the target zone's own entry strategy.
fn next_zone(
    registry: &ZoneRegistry,
    from: Option<&ZoneId>,
    forward: bool,
    entry: Option<EntryStrategy>,
) -> Option<TabTarget> {
    let mut order = registry.document_order();
    if !forward {
        order.reverse();
    }
    let start = match from {
        Some(z) => order.iter().position(|id| id == z)? + 1,
        None => 0,
    };
    order[start..].iter().find_map(|id| {
        let items = registry.items(id);
        if items.is_empty() {
            return None;
        }
        let strategy = entry
            .or_else(|| registry.zone(id).map(|s| s.config.navigate.entry))
            .unwrap_or_default();
        entry_item(items, registry.state(id), strategy).map(|item| TabTarget {
            zone: id.clone(),
            item,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FocusPatch;
    use crate::zone::{ItemSpec, ZoneConfig, ZoneSpec};

    fn zid(s: &str) -> ZoneId {
        ZoneId::new(s)
    }

    fn setup(behavior: TabBehavior) -> ZoneRegistry {
        let mut reg = ZoneRegistry::new();
        reg.register(ZoneSpec::new("root")).unwrap();
        reg.register(
            ZoneSpec::new("one")
                .parent("root")
                .order(0)
                .config(ZoneConfig::list().tab(behavior)),
        )
        .unwrap();
        reg.register(ZoneSpec::new("empty").parent("root").order(1)).unwrap();
        reg.register(
            ZoneSpec::new("two")
                .parent("root")
                .order(2)
                .config(ZoneConfig::list().entry(EntryStrategy::Last)),
        )
        .unwrap();
        reg.set_items(&zid("one"), vec!["a".into(), "b".into(), "c".into()]).unwrap();
        reg.set_items(&zid("two"), vec![ItemSpec::new("x"), ItemSpec::new("y")]).unwrap();
        reg.set_active_zone(Some(zid("one"))).unwrap();
        reg
    }

    fn focus(reg: &mut ZoneRegistry, zone: &str, item: &str) {
        reg.commit(&zid(zone), FocusPatch::new().focus(Some(ItemId::new(item))));
    }

    fn target(zone: &str, item: &str) -> Option<TabTarget> {
        Some(TabTarget {
            zone: zid(zone),
            item: ItemId::new(item),
        })
    }

    #[test]
    fn trap_wraps_within_zone() {
        let mut reg = setup(TabBehavior::Trap);
        focus(&mut reg, "one", "c");
        assert_eq!(resolve(&reg, TabDirection::Forward), target("one", "a"));
        focus(&mut reg, "one", "a");
        assert_eq!(resolve(&reg, TabDirection::Backward), target("one", "c"));
    }

    #[test]
    fn flow_walks_items_then_next_zone() {
        let mut reg = setup(TabBehavior::Flow);
        focus(&mut reg, "one", "b");
        assert_eq!(resolve(&reg, TabDirection::Forward), target("one", "c"));
        focus(&mut reg, "one", "c");
        // Skips the empty zone and enters "two" at its first item.
        assert_eq!(resolve(&reg, TabDirection::Forward), target("two", "x"));
    }

    #[test]
    fn flow_backward_past_start_is_unresolved() {
        let mut reg = setup(TabBehavior::Flow);
        focus(&mut reg, "one", "a");
        assert_eq!(resolve(&reg, TabDirection::Backward), None);
    }

    #[test]
    fn escape_uses_target_entry_strategy() {
        let mut reg = setup(TabBehavior::Escape);
        focus(&mut reg, "one", "a");
        assert_eq!(resolve(&reg, TabDirection::Forward), target("two", "y"));
    }

    #[test]
    fn backward_from_last_zone_enters_at_last_item() {
        let mut reg = setup(TabBehavior::Flow);
        reg.register(
            ZoneSpec::new("two")
                .parent("root")
                .order(2)
                .config(ZoneConfig::list().tab(TabBehavior::Flow)),
        )
        .unwrap();
        reg.set_active_zone(Some(zid("two"))).unwrap();
        focus(&mut reg, "two", "x");
        assert_eq!(resolve(&reg, TabDirection::Backward), target("one", "c"));
    }

    #[test]
    fn no_active_zone_enters_first_nonempty() {
        let mut reg = setup(TabBehavior::Escape);
        reg.set_active_zone(None).unwrap();
        assert_eq!(resolve(&reg, TabDirection::Forward), target("one", "a"));
        assert_eq!(resolve(&reg, TabDirection::Backward), target("two", "y"));
    }
}
