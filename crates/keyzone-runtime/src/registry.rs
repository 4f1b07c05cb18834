#![forbid(unsafe_code)]

//! Zone registry: the zone tree, item membership and the active zone.
//!
//! The registry is an explicit service object: construct one per engine (or
//! per test), call [`init`](ZoneRegistry::init) to start and
//! [`teardown`](ZoneRegistry::teardown) to drop everything. Records are keyed
//! by stable string ids and removed only on an explicit unregister.
//!
//! # Debounced removal
//!
//! Unmount/remount cycles are common (a list re-rendering, a panel moving in
//! the tree). [`unregister`](ZoneRegistry::unregister) therefore only marks a
//! zone as pending; it disappears at the next
//! [`flush_pending`](ZoneRegistry::flush_pending), which the pipeline runs at
//! the start and end of every pass. Registering the same id before the flush
//! cancels the removal and keeps the zone's store and items.
//!
//! # Invariants
//!
//! 1. The parent relation is acyclic among registered zones.
//! 2. Every item belongs to at most one zone.
//! 3. The active zone is `None` or a registered zone.
//! 4. Each store satisfies the [`FocusStore`] invariants for its item list.

use std::collections::BTreeSet;

use ahash::AHashMap;
use keyzone_core::{ItemId, ZoneId};
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::nav::Direction;
use crate::store::{FocusPatch, FocusState, FocusStore};
use crate::zone::{ItemSpec, ZoneSpec};

const TARGET: &str = "keyzone.registry";

/// Default hop limit for focus path walks.
pub const DEFAULT_FOCUS_PATH_GUARD: usize = 100;

#[derive(Debug, Clone)]
struct ZoneEntry {
    spec: ZoneSpec,
    items: Vec<ItemSpec>,
    store: FocusStore,
    seq: u64,
}

/// The zone registry.
#[derive(Debug, Clone)]
pub struct ZoneRegistry {
    zones: AHashMap<ZoneId, ZoneEntry>,
    item_zone: AHashMap<ItemId, ZoneId>,
    active: Option<ZoneId>,
    pending: Vec<ZoneId>,
    next_seq: u64,
    focus_path_guard: usize,
    debounce: bool,
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneRegistry {
    /// Create an empty registry with debounced removal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zones: AHashMap::new(),
            item_zone: AHashMap::new(),
            active: None,
            pending: Vec::new(),
            next_seq: 0,
            focus_path_guard: DEFAULT_FOCUS_PATH_GUARD,
            debounce: true,
        }
    }

    /// Set the hop limit for [`focus_path`](Self::focus_path).
    #[must_use]
    pub fn with_focus_path_guard(mut self, guard: usize) -> Self {
        self.focus_path_guard = guard.max(1);
        self
    }

    /// Enable or disable debounced removal.
    #[must_use]
    pub fn with_debounce(mut self, debounce: bool) -> Self {
        self.debounce = debounce;
        self
    }

    // --- Lifecycle -------------------------------------------------------

    /// Start from an empty tree.
    pub fn init(&mut self) {
        self.clear();
        debug!(target: TARGET, "registry initialized");
    }

    /// Drop every zone, item and pending removal.
    pub fn teardown(&mut self) {
        let zones = self.zones.len();
        self.clear();
        debug!(target: TARGET, zones, "registry torn down");
    }

    fn clear(&mut self) {
        self.zones.clear();
        self.item_zone.clear();
        self.active = None;
        self.pending.clear();
        self.next_seq = 0;
    }

    // --- Zones -----------------------------------------------------------

    /// Register a zone, or update an existing registration in place.
    ///
    /// Re-registering a zone that is pending removal cancels the removal.
    pub fn register(&mut self, spec: ZoneSpec) -> Result<(), RegistryError> {
        if let Some(parent) = &spec.parent
            && self.would_cycle(&spec.id, parent)
        {
            warn!(target: TARGET, zone = %spec.id, parent = %parent, "rejected zone cycle");
            return Err(RegistryError::Cycle {
                zone: spec.id.clone(),
                parent: parent.clone(),
            });
        }

        if let Some(pos) = self.pending.iter().position(|id| id == &spec.id) {
            self.pending.remove(pos);
            debug!(target: TARGET, zone = %spec.id, "pending removal cancelled");
        }

        if let Some(entry) = self.zones.get_mut(&spec.id) {
            entry.spec = spec;
            return Ok(());
        }

        debug!(target: TARGET, zone = %spec.id, parent = ?spec.parent, "zone registered");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.zones.insert(
            spec.id.clone(),
            ZoneEntry {
                spec,
                items: Vec::new(),
                store: FocusStore::new(),
                seq,
            },
        );
        Ok(())
    }

    fn would_cycle(&self, zone: &ZoneId, parent: &ZoneId) -> bool {
        let mut cursor = Some(parent.clone());
        let mut hops = 0;
        while let Some(id) = cursor {
            if &id == zone {
                return true;
            }
            hops += 1;
            if hops > self.zones.len() {
                return true;
            }
            cursor = self.zones.get(&id).and_then(|e| e.spec.parent.clone());
        }
        false
    }

    /// Unregister a zone. With debouncing on, removal happens at the next
    /// [`flush_pending`](Self::flush_pending).
    pub fn unregister(&mut self, id: &ZoneId) {
        if !self.zones.contains_key(id) {
            return;
        }
        if self.debounce {
            if !self.pending.contains(id) {
                debug!(target: TARGET, zone = %id, "zone removal pending");
                self.pending.push(id.clone());
            }
        } else {
            self.remove_now(std::slice::from_ref(id));
        }
    }

    /// Zones awaiting removal.
    #[must_use]
    pub fn pending(&self) -> &[ZoneId] {
        &self.pending
    }

    /// Remove every pending zone. Returns the number removed.
    pub fn flush_pending(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let ids = std::mem::take(&mut self.pending);
        self.remove_now(&ids)
    }

    fn remove_now(&mut self, ids: &[ZoneId]) -> usize {
        let ancestors = self.active.as_ref().map(|a| self.ancestors(a));
        let mut removed = 0;
        for id in ids {
            if let Some(entry) = self.zones.remove(id) {
                for item in &entry.items {
                    self.item_zone.remove(&item.id);
                }
                removed += 1;
                debug!(target: TARGET, zone = %id, "zone removed");
            }
        }
        if let Some(active) = &self.active
            && !self.zones.contains_key(active)
        {
            let fallback = ancestors
                .unwrap_or_default()
                .into_iter()
                .skip(1)
                .find(|z| self.zones.contains_key(z));
            debug!(target: TARGET, from = %active, to = ?fallback, "active zone removed");
            self.active = fallback;
        }
        removed
    }

    /// `zone` followed by its ancestors, innermost first, guarded.
    fn ancestors(&self, zone: &ZoneId) -> Vec<ZoneId> {
        let mut chain = vec![zone.clone()];
        let mut cursor = self.zones.get(zone).and_then(|e| e.spec.parent.clone());
        while let Some(id) = cursor {
            if chain.len() >= self.focus_path_guard || chain.contains(&id) {
                warn!(target: TARGET, zone = %zone, "focus path guard hit");
                break;
            }
            cursor = self.zones.get(&id).and_then(|e| e.spec.parent.clone());
            chain.push(id);
        }
        chain
    }

    /// Is the zone registered (and not yet flushed)?
    #[must_use]
    pub fn contains(&self, id: &ZoneId) -> bool {
        self.zones.contains_key(id)
    }

    /// A zone's registration.
    #[must_use]
    pub fn zone(&self, id: &ZoneId) -> Option<&ZoneSpec> {
        self.zones.get(id).map(|e| &e.spec)
    }

    /// Number of registered zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// True if no zone is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Iterate over registered zone ids in arbitrary order.
    pub fn zone_ids(&self) -> impl Iterator<Item = &ZoneId> {
        self.zones.keys()
    }

    // --- Active zone and tree queries -------------------------------------

    /// Give a zone keyboard jurisdiction. `None` clears it.
    pub fn set_active_zone(&mut self, id: Option<ZoneId>) -> Result<(), RegistryError> {
        if let Some(id) = &id
            && !self.zones.contains_key(id)
        {
            return Err(RegistryError::UnknownZone(id.clone()));
        }
        if self.active != id {
            debug!(target: TARGET, zone = ?id, "active zone changed");
            self.active = id;
        }
        Ok(())
    }

    /// The zone holding jurisdiction.
    #[must_use]
    pub fn active_zone(&self) -> Option<&ZoneId> {
        self.active.as_ref()
    }

    /// Root-to-active chain.
    #[must_use]
    pub fn focus_path(&self) -> Vec<ZoneId> {
        let mut path = self.bubble_path();
        path.reverse();
        path
    }

    /// Active-to-root chain, the order keybindings bubble in.
    #[must_use]
    pub fn bubble_path(&self) -> Vec<ZoneId> {
        self.active
            .as_ref()
            .map(|a| self.ancestors(a))
            .unwrap_or_default()
    }

    fn sort_key(&self, id: &ZoneId) -> (i64, u64) {
        self.zones
            .get(id)
            .map_or((i64::MAX, u64::MAX), |e| (e.spec.order, e.seq))
    }

    /// Registered children of `parent` (`None` for roots) in rendered order.
    ///
    /// A zone whose parent is not registered counts as a root.
    #[must_use]
    pub fn children(&self, parent: Option<&ZoneId>) -> Vec<ZoneId> {
        let mut out: Vec<ZoneId> = self
            .zones
            .iter()
            .filter(|(_, e)| {
                let effective = e.spec.parent.as_ref().filter(|p| self.zones.contains_key(*p));
                effective == parent
            })
            .map(|(id, _)| id.clone())
            .collect();
        out.sort_by_key(|id| self.sort_key(id));
        out
    }

    /// The adjacent sibling of the active zone. Siblings share its parent and
    /// are ordered by rendered position. There is no wrap-around.
    #[must_use]
    pub fn sibling_zone(&self, direction: Direction) -> Option<ZoneId> {
        let active = self.active.as_ref()?;
        let parent = self
            .zones
            .get(active)?
            .spec
            .parent
            .as_ref()
            .filter(|p| self.zones.contains_key(*p));
        let siblings = self.children(parent);
        let idx = siblings.iter().position(|z| z == active)?;
        match direction {
            Direction::Down | Direction::Right => siblings.get(idx + 1).cloned(),
            Direction::Up | Direction::Left => {
                idx.checked_sub(1).and_then(|i| siblings.get(i).cloned())
            }
            Direction::Home | Direction::End => None,
        }
    }

    /// Every zone in depth-first document order.
    #[must_use]
    pub fn document_order(&self) -> Vec<ZoneId> {
        let mut out = Vec::with_capacity(self.zones.len());
        let mut stack: Vec<ZoneId> = self.children(None);
        stack.reverse();
        while let Some(id) = stack.pop() {
            if out.contains(&id) {
                continue;
            }
            let mut kids = self.children(Some(&id));
            kids.reverse();
            out.push(id);
            stack.extend(kids);
        }
        out
    }

    // --- Items -----------------------------------------------------------

    /// Insert an item at `index` (append if `None` or out of range). An item
    /// already in this zone is moved.
    pub fn insert_item(
        &mut self,
        zone: &ZoneId,
        item: ItemSpec,
        index: Option<usize>,
    ) -> Result<(), RegistryError> {
        if let Some(owner) = self.item_zone.get(&item.id)
            && owner != zone
        {
            return Err(RegistryError::DuplicateItem {
                item: item.id.clone(),
                zone: owner.clone(),
            });
        }
        let entry = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| RegistryError::UnknownZone(zone.clone()))?;
        let old = entry.items.clone();
        entry.items.retain(|i| i.id != item.id);
        let at = index.unwrap_or(entry.items.len()).min(entry.items.len());
        self.item_zone.insert(item.id.clone(), zone.clone());
        entry.items.insert(at, item);
        Self::repair(entry, &old);
        Ok(())
    }

    /// Remove an item from whichever zone owns it.
    pub fn remove_item(&mut self, item: &ItemId) -> Result<(), RegistryError> {
        let zone = self
            .item_zone
            .remove(item)
            .ok_or_else(|| RegistryError::UnknownItem(item.clone()))?;
        if let Some(entry) = self.zones.get_mut(&zone) {
            let old = entry.items.clone();
            entry.items.retain(|i| &i.id != item);
            Self::repair(entry, &old);
        }
        Ok(())
    }

    /// Replace a zone's whole item list, in render order.
    pub fn set_items(&mut self, zone: &ZoneId, items: Vec<ItemSpec>) -> Result<(), RegistryError> {
        if !self.zones.contains_key(zone) {
            return Err(RegistryError::UnknownZone(zone.clone()));
        }
        for item in &items {
            if let Some(owner) = self.item_zone.get(&item.id)
                && owner != zone
            {
                return Err(RegistryError::DuplicateItem {
                    item: item.id.clone(),
                    zone: owner.clone(),
                });
            }
        }
        let Some(entry) = self.zones.get_mut(zone) else {
            return Err(RegistryError::UnknownZone(zone.clone()));
        };
        for old in &entry.items {
            self.item_zone.remove(&old.id);
        }
        let mut seen = BTreeSet::new();
        let items: Vec<ItemSpec> = items
            .into_iter()
            .filter(|i| seen.insert(i.id.clone()))
            .collect();
        for item in &items {
            self.item_zone.insert(item.id.clone(), zone.clone());
        }
        let old = std::mem::replace(&mut entry.items, items);
        Self::repair(entry, &old);
        Ok(())
    }

    /// Prune the store after a membership change and recover a lost cursor.
    fn repair(entry: &mut ZoneEntry, old: &[ItemSpec]) {
        let state = entry.store.state().clone();
        let items = &entry.items;
        let alive = |id: &ItemId| items.iter().any(|i| &i.id == id);

        let mut patch = FocusPatch::new();
        if let Some(focused) = &state.focused
            && !alive(focused)
        {
            let recovered = state
                .recovery_target
                .clone()
                .filter(|id| alive(id))
                .or_else(|| nearest_survivor(old, focused, &alive));
            debug!(target: TARGET, zone = %entry.spec.id, lost = %focused, recovered = ?recovered, "focus recovered");
            patch = patch.focus(recovered);
        }
        entry.store.commit(
            patch
                .select(state.selection, state.anchor)
                .expanded(state.expanded),
            items,
        );
    }

    /// The zone owning an item.
    #[must_use]
    pub fn zone_of(&self, item: &ItemId) -> Option<&ZoneId> {
        self.item_zone.get(item)
    }

    /// A zone's items in render order. Unknown zones have none.
    #[must_use]
    pub fn items(&self, zone: &ZoneId) -> &[ItemSpec] {
        self.zones.get(zone).map_or(&[], |e| e.items.as_slice())
    }

    /// An item's registration.
    #[must_use]
    pub fn item(&self, item: &ItemId) -> Option<&ItemSpec> {
        let zone = self.item_zone.get(item)?;
        self.items(zone).iter().find(|i| &i.id == item)
    }

    // --- Stores ----------------------------------------------------------

    /// A zone's focus state.
    #[must_use]
    pub fn state(&self, zone: &ZoneId) -> Option<&FocusState> {
        self.zones.get(zone).map(|e| e.store.state())
    }

    /// A zone's store.
    #[must_use]
    pub fn store(&self, zone: &ZoneId) -> Option<&FocusStore> {
        self.zones.get(zone).map(|e| &e.store)
    }

    /// Every zone's state, sorted by zone id.
    #[must_use]
    pub fn states(&self) -> Vec<(ZoneId, FocusState)> {
        let mut out: Vec<_> = self
            .zones
            .iter()
            .map(|(id, e)| (id.clone(), e.store.state().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Commit a patch to one zone's own store.
    pub(crate) fn commit(&mut self, zone: &ZoneId, patch: FocusPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        match self.zones.get_mut(zone) {
            Some(entry) => entry.store.commit(patch, &entry.items),
            None => false,
        }
    }

    /// Restore a zone's state from a snapshot.
    pub(crate) fn restore(&mut self, zone: &ZoneId, state: &FocusState) -> bool {
        match self.zones.get_mut(zone) {
            Some(entry) => entry.store.restore(state, &entry.items),
            None => false,
        }
    }
}

fn nearest_survivor(
    old: &[ItemSpec],
    lost: &ItemId,
    alive: &impl Fn(&ItemId) -> bool,
) -> Option<ItemId> {
    let idx = old.iter().position(|i| &i.id == lost)?;
    let after = old[idx + 1..].iter().find(|i| alive(&i.id));
    let before = old[..idx].iter().rev().find(|i| alive(&i.id));
    after.or(before).map(|i| i.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zid(s: &str) -> ZoneId {
        ZoneId::new(s)
    }

    fn iid(s: &str) -> ItemId {
        ItemId::new(s)
    }

    fn registry() -> ZoneRegistry {
        let mut reg = ZoneRegistry::new();
        reg.init();
        reg.register(ZoneSpec::new("app")).unwrap();
        reg.register(ZoneSpec::new("left").parent("app").order(0)).unwrap();
        reg.register(ZoneSpec::new("right").parent("app").order(1)).unwrap();
        reg.register(ZoneSpec::new("inner").parent("left")).unwrap();
        reg
    }

    #[test]
    fn cycle_is_rejected() {
        let mut reg = registry();
        let err = reg.register(ZoneSpec::new("app").parent("inner")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Cycle {
                zone: zid("app"),
                parent: zid("inner")
            }
        );
        assert!(reg.register(ZoneSpec::new("solo").parent("solo")).is_err());
    }

    #[test]
    fn focus_path_is_root_first() {
        let mut reg = registry();
        reg.set_active_zone(Some(zid("inner"))).unwrap();
        assert_eq!(reg.focus_path(), vec![zid("app"), zid("left"), zid("inner")]);
        assert_eq!(reg.bubble_path(), vec![zid("inner"), zid("left"), zid("app")]);
    }

    #[test]
    fn focus_path_guard_limits_walk() {
        let mut reg = ZoneRegistry::new().with_focus_path_guard(2);
        reg.register(ZoneSpec::new("a")).unwrap();
        reg.register(ZoneSpec::new("b").parent("a")).unwrap();
        reg.register(ZoneSpec::new("c").parent("b")).unwrap();
        reg.set_active_zone(Some(zid("c"))).unwrap();
        assert_eq!(reg.focus_path(), vec![zid("b"), zid("c")]);
    }

    #[test]
    fn set_active_unknown_zone_fails() {
        let mut reg = registry();
        assert_eq!(
            reg.set_active_zone(Some(zid("nope"))),
            Err(RegistryError::UnknownZone(zid("nope")))
        );
        assert!(reg.set_active_zone(None).is_ok());
    }

    #[test]
    fn sibling_lookup_without_wrap() {
        let mut reg = registry();
        reg.set_active_zone(Some(zid("left"))).unwrap();
        assert_eq!(reg.sibling_zone(Direction::Right), Some(zid("right")));
        assert_eq!(reg.sibling_zone(Direction::Left), None);
        reg.set_active_zone(Some(zid("right"))).unwrap();
        assert_eq!(reg.sibling_zone(Direction::Up), Some(zid("left")));
        assert_eq!(reg.sibling_zone(Direction::Down), None);
    }

    #[test]
    fn document_order_is_depth_first() {
        let reg = registry();
        assert_eq!(
            reg.document_order(),
            vec![zid("app"), zid("left"), zid("inner"), zid("right")]
        );
    }

    #[test]
    fn debounced_unregister_and_cancel() {
        let mut reg = registry();
        reg.insert_item(&zid("right"), ItemSpec::new("r1"), None).unwrap();
        reg.unregister(&zid("right"));
        assert!(reg.contains(&zid("right")));
        reg.register(ZoneSpec::new("right").parent("app").order(1)).unwrap();
        assert_eq!(reg.flush_pending(), 0);
        assert_eq!(reg.items(&zid("right")).len(), 1);

        reg.unregister(&zid("right"));
        assert_eq!(reg.flush_pending(), 1);
        assert!(!reg.contains(&zid("right")));
        assert_eq!(reg.zone_of(&iid("r1")), None);
    }

    #[test]
    fn immediate_unregister_without_debounce() {
        let mut reg = ZoneRegistry::new().with_debounce(false);
        reg.register(ZoneSpec::new("a")).unwrap();
        reg.unregister(&zid("a"));
        assert!(!reg.contains(&zid("a")));
    }

    #[test]
    fn active_falls_back_to_nearest_ancestor() {
        let mut reg = registry();
        reg.set_active_zone(Some(zid("inner"))).unwrap();
        reg.unregister(&zid("inner"));
        reg.unregister(&zid("left"));
        reg.flush_pending();
        assert_eq!(reg.active_zone(), Some(&zid("app")));
    }

    #[test]
    fn duplicate_item_in_other_zone() {
        let mut reg = registry();
        reg.insert_item(&zid("left"), ItemSpec::new("x"), None).unwrap();
        assert_eq!(
            reg.insert_item(&zid("right"), ItemSpec::new("x"), None),
            Err(RegistryError::DuplicateItem {
                item: iid("x"),
                zone: zid("left")
            })
        );
    }

    #[test]
    fn insert_at_index_and_move() {
        let mut reg = registry();
        let z = zid("left");
        reg.set_items(&z, vec!["a".into(), "b".into(), "c".into()]).unwrap();
        reg.insert_item(&z, ItemSpec::new("c"), Some(0)).unwrap();
        let ids: Vec<_> = reg.items(&z).iter().map(|i| i.id.as_str().to_string()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn removing_focused_item_recovers_next() {
        let mut reg = registry();
        let z = zid("left");
        reg.set_items(&z, vec!["a".into(), "b".into(), "c".into()]).unwrap();
        reg.commit(&z, FocusPatch::new().focus(Some(iid("b"))));
        reg.remove_item(&iid("b")).unwrap();
        assert_eq!(reg.state(&z).unwrap().focused, Some(iid("c")));
        reg.remove_item(&iid("c")).unwrap();
        assert_eq!(reg.state(&z).unwrap().focused, Some(iid("a")));
        reg.remove_item(&iid("a")).unwrap();
        assert_eq!(reg.state(&z).unwrap().focused, None);
    }

    #[test]
    fn set_items_prunes_selection() {
        let mut reg = registry();
        let z = zid("left");
        reg.set_items(&z, vec!["a".into(), "b".into()]).unwrap();
        let sel: BTreeSet<ItemId> = [iid("a"), iid("b")].into_iter().collect();
        reg.commit(&z, FocusPatch::new().select(sel, Some(iid("b"))));
        reg.set_items(&z, vec!["a".into()]).unwrap();
        let state = reg.state(&z).unwrap();
        assert_eq!(state.selection.len(), 1);
        assert_eq!(state.anchor, None);
        assert_eq!(reg.zone_of(&iid("b")), None);
    }

    #[test]
    fn teardown_clears_everything() {
        let mut reg = registry();
        reg.set_active_zone(Some(zid("app"))).unwrap();
        reg.teardown();
        assert!(reg.is_empty());
        assert_eq!(reg.active_zone(), None);
    }
}
