#![forbid(unsafe_code)]

//! Engine built-in commands.
//!
//! Built-ins never mutate anything directly. [`plan`] reads the registry
//! and the host geometry and returns a [`Transition`]: focus patches per
//! zone, an optional change of jurisdiction, application commands to
//! delegate to, and an optional history step. The pipeline applies it in
//! its Commit phase.
//!
//! | Id | Payload |
//! |---|---|
//! | `os.navigate` | `{ direction, select?: "range" }` |
//! | `os.tab` | `{ direction?: "forward" \| "backward" }` |
//! | `os.focus` | `{ id, zone? }` |
//! | `os.focus_zone` | `{ zone }` |
//! | `os.select` | `{ id?, mode?: "replace" \| "toggle" \| "range" \| "add" }` |
//! | `os.select_all`, `os.clear_selection` | none |
//! | `os.activate` | `{ id? }` |
//! | `os.click` | `{ id, mode?, activate? }` |
//! | `os.dismiss` | none |
//! | `os.expand` | `{ id?, action?: "toggle" \| "expand" \| "collapse" }` |
//! | `os.copy`, `os.cut`, `os.paste`, `os.delete` | none |
//! | `os.undo`, `os.redo` | none |
//!
//! A missing `id` means the focused item of the active zone.

use std::collections::BTreeSet;

use keyzone_core::{Axis, ItemId, ZoneId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Binding;
use crate::error::CommandError;
use crate::host::Geometry;
use crate::nav::{
    Candidate, Direction, ExpandAction, Step, TabDirection, corner, entry_item, expansion_for,
    linear, spatial, tab,
};
use crate::registry::ZoneRegistry;
use crate::selection::{self, SelectOp};
use crate::store::{FocusPatch, FocusState};
use crate::zone::{CommandCall, EscapeBehavior, ItemSpec, Orientation, ZoneSpec};

/// Built-in command ids.
pub mod ids {
    /// Arrow navigation.
    pub const NAVIGATE: &str = "os.navigate";
    /// Tab traversal.
    pub const TAB: &str = "os.tab";
    /// Focus an item.
    pub const FOCUS: &str = "os.focus";
    /// Enter a zone.
    pub const FOCUS_ZONE: &str = "os.focus_zone";
    /// Change the selection.
    pub const SELECT: &str = "os.select";
    /// Select every item.
    pub const SELECT_ALL: &str = "os.select_all";
    /// Clear the selection.
    pub const CLEAR_SELECTION: &str = "os.clear_selection";
    /// Activate an item.
    pub const ACTIVATE: &str = "os.activate";
    /// Pointer click.
    pub const CLICK: &str = "os.click";
    /// Escape.
    pub const DISMISS: &str = "os.dismiss";
    /// Expand or collapse a tree node.
    pub const EXPAND: &str = "os.expand";
    /// Copy.
    pub const COPY: &str = "os.copy";
    /// Cut.
    pub const CUT: &str = "os.cut";
    /// Paste.
    pub const PASTE: &str = "os.paste";
    /// Delete.
    pub const DELETE: &str = "os.delete";
    /// Undo.
    pub const UNDO: &str = "os.undo";
    /// Redo.
    pub const REDO: &str = "os.redo";

    /// Every built-in id.
    pub const ALL: [&str; 17] = [
        NAVIGATE,
        TAB,
        FOCUS,
        FOCUS_ZONE,
        SELECT,
        SELECT_ALL,
        CLEAR_SELECTION,
        ACTIVATE,
        CLICK,
        DISMISS,
        EXPAND,
        COPY,
        CUT,
        PASTE,
        DELETE,
        UNDO,
        REDO,
    ];
}

/// True for ids in the engine's reserved `os.` namespace.
#[must_use]
pub fn is_builtin(id: &str) -> bool {
    ids::ALL.contains(&id)
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `os.navigate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NavigateArgs {
    /// Direction.
    pub direction: Direction,
    /// `range` extends the selection from the anchor.
    #[serde(default)]
    pub select: Option<SelectOp>,
}

/// `os.tab`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct TabArgs {
    /// Direction.
    #[serde(default)]
    pub direction: TabDirection,
}

/// `os.focus`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FocusArgs {
    /// Item.
    pub id: ItemId,
    /// Owning zone; looked up when absent.
    #[serde(default)]
    pub zone: Option<ZoneId>,
}

/// `os.focus_zone`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FocusZoneArgs {
    /// Zone.
    pub zone: ZoneId,
}

/// `os.select`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SelectArgs {
    /// Item; focused item when absent.
    #[serde(default)]
    pub id: Option<ItemId>,
    /// Combination mode.
    #[serde(default)]
    pub mode: SelectOp,
}

/// `os.activate`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ActivateArgs {
    /// Item; focused item when absent.
    #[serde(default)]
    pub id: Option<ItemId>,
}

/// `os.click`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClickArgs {
    /// Clicked item.
    pub id: ItemId,
    /// Selection mode from the pointer modifiers.
    #[serde(default)]
    pub mode: SelectOp,
    /// Activate regardless of the zone's `on_click`.
    #[serde(default)]
    pub activate: bool,
}

/// `os.expand`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExpandArgs {
    /// Item; focused item when absent.
    #[serde(default)]
    pub id: Option<ItemId>,
    /// Change.
    #[serde(default = "default_expand")]
    pub action: ExpandAction,
}

fn default_expand() -> ExpandAction {
    ExpandAction::Toggle
}

/// Decode a payload; `null` reads as an empty object.
pub fn args<T: DeserializeOwned>(command: &str, payload: &Value) -> Result<T, CommandError> {
    let payload = if payload.is_null() {
        json!({})
    } else {
        payload.clone()
    };
    serde_json::from_value(payload).map_err(|source| CommandError::InvalidPayload {
        command: command.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Built-in keymap
// ---------------------------------------------------------------------------

/// The global bindings installed unless disabled in
/// [`EngineConfig`](crate::config::EngineConfig).
#[must_use]
pub fn keymap() -> Vec<Binding> {
    let mut out = Vec::new();
    for (key, dir) in [
        ("ArrowUp", "up"),
        ("ArrowDown", "down"),
        ("ArrowLeft", "left"),
        ("ArrowRight", "right"),
        ("Home", "home"),
        ("End", "end"),
    ] {
        out.push(Binding::new(key, ids::NAVIGATE).args(json!({ "direction": dir })));
        out.push(
            Binding::new(format!("Shift+{key}"), ids::NAVIGATE)
                .args(json!({ "direction": dir, "select": "range" })),
        );
    }
    out.extend([
        Binding::new("Tab", ids::TAB).args(json!({ "direction": "forward" })),
        Binding::new("Shift+Tab", ids::TAB).args(json!({ "direction": "backward" })),
        Binding::new("Enter", ids::ACTIVATE),
        Binding::new("Space", ids::SELECT).args(json!({ "mode": "toggle" })),
        Binding::new("Escape", ids::DISMISS),
        Binding::new("Mod+A", ids::SELECT_ALL),
        Binding::new("Mod+C", ids::COPY),
        Binding::new("Mod+X", ids::CUT),
        Binding::new("Mod+V", ids::PASTE),
        Binding::new("Delete", ids::DELETE),
        Binding::new("Backspace", ids::DELETE),
        Binding::new("Mod+Z", ids::UNDO),
        Binding::new("Mod+Shift+Z", ids::REDO),
        Binding::new("Mod+Y", ids::REDO),
    ]);
    out
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// History step requested by `os.undo` / `os.redo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOp {
    /// Step back.
    Undo,
    /// Step forward.
    Redo,
}

/// An application command to run on behalf of a zone role.
#[derive(Debug, Clone, PartialEq)]
pub struct Delegation {
    /// Command id.
    pub command: String,
    /// Payload with `{ id, ids, zone }` merged in.
    pub payload: Value,
}

/// Everything a built-in wants to change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// New active zone; `Some(None)` clears jurisdiction.
    pub activate: Option<Option<ZoneId>>,
    /// Patches, each for the named zone's own store.
    pub commits: Vec<(ZoneId, FocusPatch)>,
    /// Application commands to run afterwards, in order.
    pub delegate: Vec<Delegation>,
    /// History step.
    pub history: Option<HistoryOp>,
}

impl Transition {
    /// True if applying this would do nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activate.is_none()
            && self.commits.iter().all(|(_, p)| p.is_empty())
            && self.delegate.is_empty()
            && self.history.is_none()
    }
}

/// Plan a built-in command.
pub fn plan<G: Geometry + ?Sized>(
    command: &str,
    payload: &Value,
    registry: &ZoneRegistry,
    geometry: &G,
) -> Result<Transition, CommandError> {
    let planner = Planner { registry, geometry };
    let mut t = Transition::default();
    match command {
        ids::NAVIGATE => planner.navigate(args(command, payload)?, &mut t),
        ids::TAB => planner.tab(args::<TabArgs>(command, payload)?.direction, &mut t),
        ids::FOCUS => planner.focus(args(command, payload)?, &mut t),
        ids::FOCUS_ZONE => planner.focus_zone(&args::<FocusZoneArgs>(command, payload)?.zone, &mut t),
        ids::SELECT => planner.select(args(command, payload)?, &mut t),
        ids::SELECT_ALL => planner.select_all(&mut t),
        ids::CLEAR_SELECTION => planner.clear_selection(&mut t),
        ids::ACTIVATE => planner.activate(args::<ActivateArgs>(command, payload)?.id, &mut t),
        ids::CLICK => planner.click(args(command, payload)?, &mut t),
        ids::DISMISS => planner.dismiss(&mut t),
        ids::EXPAND => planner.expand(args(command, payload)?, &mut t),
        ids::COPY => planner.delegate_role(|b| b.copy.as_ref(), &mut t),
        ids::CUT => planner.delegate_role(|b| b.cut.as_ref(), &mut t),
        ids::PASTE => planner.delegate_role(|b| b.paste.as_ref(), &mut t),
        ids::DELETE => planner.delegate_role(|b| b.delete.as_ref(), &mut t),
        ids::UNDO => planner.history(HistoryOp::Undo, &mut t),
        ids::REDO => planner.history(HistoryOp::Redo, &mut t),
        other => return Err(CommandError::Unknown(other.to_string())),
    }
    Ok(t)
}

struct Planner<'a, G: ?Sized> {
    registry: &'a ZoneRegistry,
    geometry: &'a G,
}

/// Where a move ended up.
enum Moved {
    /// New item in the same zone, with the sticky patch to apply.
    To(ItemId, FocusPatch),
    /// Hit the edge of the zone.
    Edge,
}

impl<G: Geometry + ?Sized> Planner<'_, G> {
    fn active(&self) -> Option<(&ZoneId, &ZoneSpec, &[ItemSpec], FocusState)> {
        let zone = self.registry.active_zone()?;
        let spec = self.registry.zone(zone)?;
        let state = self.registry.state(zone).cloned().unwrap_or_default();
        Some((zone, spec, self.registry.items(zone), state))
    }

    fn candidate(&self, id: &ItemId) -> Option<Candidate> {
        self.geometry
            .rect(id)
            .map(|rect| Candidate::new(id.clone(), rect).depth(self.geometry.depth(id)))
    }

    fn candidates(&self, items: &[ItemSpec]) -> Vec<Candidate> {
        items.iter().filter_map(|i| self.candidate(&i.id)).collect()
    }

    /// Ids a role command acts on: the selection, else the focused item.
    fn role_ids(state: &FocusState, items: &[ItemSpec]) -> Vec<ItemId> {
        let sel = state.selection_in_order(items);
        if sel.is_empty() {
            state.focused.iter().cloned().collect()
        } else {
            sel
        }
    }

    fn push_call(
        t: &mut Transition,
        call: &CommandCall,
        zone: &ZoneId,
        id: Option<&ItemId>,
        ids: &[ItemId],
    ) {
        t.delegate.push(Delegation {
            command: call.command.clone(),
            payload: call.payload_for(zone, id, ids),
        });
    }

    /// Focus `target` in `zone`, applying selection and activation side
    /// effects. Returns true if an activation was delegated.
    fn land(
        &self,
        zone: &ZoneId,
        target: &ItemId,
        explicit: Option<SelectOp>,
        sticky: FocusPatch,
        t: &mut Transition,
    ) -> bool {
        let Some(spec) = self.registry.zone(zone) else {
            return false;
        };
        let items = self.registry.items(zone);
        let state = self.registry.state(zone).cloned().unwrap_or_default();
        let moved = state.focused.as_ref() != Some(target);
        // Sticky slots only change when the cursor moves.
        let sticky = if moved { sticky } else { FocusPatch::new() };
        let mut patch = FocusPatch::new().focus(Some(target.clone())).then(sticky);

        let op = explicit.or(spec.config.select.follow_focus.then_some(SelectOp::Replace));
        if let Some(op) = op
            && let Some((sel, anchor)) = selection::apply(&state, items, &spec.config.select, target, op)
        {
            if let Some(call) = &spec.bound.select {
                let ids: Vec<ItemId> = items
                    .iter()
                    .filter(|i| sel.contains(&i.id))
                    .map(|i| i.id.clone())
                    .collect();
                Self::push_call(t, call, zone, Some(target), &ids);
            }
            patch = patch.select(sel, anchor);
        }
        t.commits.push((zone.clone(), patch));

        if moved
            && spec.config.activate.on_focus
            && let Some(call) = &spec.bound.activate
        {
            Self::push_call(t, call, zone, Some(target), std::slice::from_ref(target));
            return true;
        }
        false
    }

    fn enter(&self, zone: &ZoneId, t: &mut Transition) {
        if self.registry.active_zone() != Some(zone) {
            t.activate = Some(Some(zone.clone()));
        }
    }

    // --- Navigation ------------------------------------------------------

    fn navigate(&self, args: NavigateArgs, t: &mut Transition) {
        let Some((zone, spec, items, state)) = self.active() else {
            return;
        };
        let nav = spec.config.navigate;
        let direction = args.direction;

        if let Some(focused) = &state.focused
            && let Some(item) = items.iter().find(|i| &i.id == focused)
            && let Some(open) =
                expansion_for(item, state.expanded.contains(focused), direction, nav.orientation)
        {
            let mut expanded = state.expanded.clone();
            if open {
                expanded.insert(focused.clone());
            } else {
                expanded.remove(focused);
            }
            t.commits.push((zone.clone(), FocusPatch::new().expanded(expanded)));
            return;
        }

        let moved = match nav.orientation {
            Orientation::Vertical | Orientation::Horizontal => {
                let axis = if nav.orientation == Orientation::Vertical {
                    Axis::Vertical
                } else {
                    Axis::Horizontal
                };
                match linear::navigate(items, state.focused.as_ref(), direction, axis, nav.looping) {
                    Some(Step::Target(id)) => Moved::To(id, FocusPatch::new().reset_sticky()),
                    Some(Step::Boundary) | None => Moved::Edge,
                }
            }
            Orientation::Spatial => self.spatial_step(items, &state, direction),
            Orientation::Corner => self.corner_step(items, &state, direction),
        };

        let select = args.select.filter(|op| *op == SelectOp::Range);
        match moved {
            Moved::To(target, sticky) => {
                self.land(zone, &target, select, sticky, t);
            }
            Moved::Edge if nav.seamless => self.hand_off(zone, &state, direction, t),
            Moved::Edge => {}
        }
    }

    fn spatial_step(&self, items: &[ItemSpec], state: &FocusState, direction: Direction) -> Moved {
        let reset = FocusPatch::new().reset_sticky();
        let source = state.focused.as_ref().and_then(|f| self.candidate(f));
        let (Some(source), Some(axis)) = (source, direction.axis()) else {
            // Home/End or no measurable cursor: jump to an end of the list.
            let target = match direction {
                Direction::Home => items.first().map(|i| i.id.clone()),
                Direction::End => items.last().map(|i| i.id.clone()),
                _ if state.focused.is_none() => items.first().map(|i| i.id.clone()),
                _ => None,
            };
            return target
                .filter(|id| state.focused.as_ref() != Some(id))
                .map_or(Moved::Edge, |id| Moved::To(id, reset));
        };

        let slot = spatial::sticky_slot(axis);
        let sticky = match slot {
            Axis::Horizontal => state.sticky_x,
            Axis::Vertical => state.sticky_y,
        };
        let candidates = self.candidates(items);
        match spatial::navigate(&source, &candidates, direction, sticky) {
            Some(hit) => {
                let patch = match slot {
                    Axis::Horizontal => FocusPatch::new().sticky(Some(hit.sticky), None),
                    Axis::Vertical => FocusPatch::new().sticky(None, Some(hit.sticky)),
                };
                Moved::To(hit.target, patch)
            }
            None => Moved::Edge,
        }
    }

    fn corner_step(&self, items: &[ItemSpec], state: &FocusState, direction: Direction) -> Moved {
        let reset = FocusPatch::new().reset_sticky();
        let source = state.focused.as_ref().and_then(|f| self.candidate(f));
        let target = match (source, direction) {
            (_, Direction::Home) => items.first().map(|i| i.id.clone()),
            (_, Direction::End) => items.last().map(|i| i.id.clone()),
            (Some(source), _) => corner::navigate(&source, &self.candidates(items), direction),
            (None, _) if state.focused.is_none() => items.first().map(|i| i.id.clone()),
            (None, _) => None,
        };
        target
            .filter(|id| state.focused.as_ref() != Some(id))
            .map_or(Moved::Edge, |id| Moved::To(id, reset))
    }

    /// Seamless boundary crossing into the adjacent sibling zone.
    fn hand_off(&self, from: &ZoneId, state: &FocusState, direction: Direction, t: &mut Transition) {
        let Some(next) = self.registry.sibling_zone(direction) else {
            return;
        };
        let items = self.registry.items(&next);
        if items.is_empty() {
            return;
        }
        let source = state.focused.as_ref().and_then(|f| self.candidate(f));
        let nearest = source.and_then(|src| {
            spatial::navigate(&src, &self.candidates(items), direction, None).map(|m| m.target)
        });
        let strategy = self
            .registry
            .zone(&next)
            .map(|s| s.config.navigate.entry)
            .unwrap_or_default();
        let target = nearest.or_else(|| entry_item(items, self.registry.state(&next), strategy));
        if let Some(target) = target {
            debug!(target: "keyzone.pipeline", from = %from, to = %next, item = %target, "zone hand-off");
            self.enter(&next, t);
            self.land(&next, &target, None, FocusPatch::new().reset_sticky(), t);
        }
    }

    fn tab(&self, direction: TabDirection, t: &mut Transition) {
        if let Some(target) = tab::resolve(self.registry, direction) {
            self.enter(&target.zone, t);
            self.land(&target.zone, &target.item, None, FocusPatch::new().reset_sticky(), t);
        }
    }

    fn focus(&self, args: FocusArgs, t: &mut Transition) {
        let owner = self.registry.zone_of(&args.id).cloned();
        let Some(zone) = args.zone.or(owner.clone()) else {
            return;
        };
        if owner.as_ref() != Some(&zone) {
            return;
        }
        self.enter(&zone, t);
        self.land(&zone, &args.id, None, FocusPatch::new().reset_sticky(), t);
    }

    fn focus_zone(&self, zone: &ZoneId, t: &mut Transition) {
        let Some(spec) = self.registry.zone(zone) else {
            return;
        };
        self.enter(zone, t);
        let items = self.registry.items(zone);
        let state = self.registry.state(zone);
        let current = state
            .and_then(|s| s.focused.clone())
            .filter(|f| items.iter().any(|i| &i.id == f));
        if current.is_none()
            && let Some(target) = entry_item(items, state, spec.config.navigate.entry)
        {
            self.land(zone, &target, None, FocusPatch::new().reset_sticky(), t);
        }
    }

    // --- Selection ---------------------------------------------------------

    fn select(&self, args: SelectArgs, t: &mut Transition) {
        let Some((zone, spec, items, state)) = self.active() else {
            return;
        };
        let Some(target) = args.id.or_else(|| state.focused.clone()) else {
            return;
        };
        if args.mode == SelectOp::Toggle
            && let Some(call) = &spec.bound.toggle
        {
            Self::push_call(t, call, zone, Some(&target), std::slice::from_ref(&target));
            return;
        }
        if let Some(next) = selection::apply(&state, items, &spec.config.select, &target, args.mode) {
            self.commit_selection(zone, spec, items, Some(&target), next, t);
        }
    }

    fn select_all(&self, t: &mut Transition) {
        let Some((zone, spec, items, state)) = self.active() else {
            return;
        };
        if let Some(next) = selection::select_all(&state, items, &spec.config.select) {
            self.commit_selection(zone, spec, items, state.focused.as_ref(), next, t);
        }
    }

    fn clear_selection(&self, t: &mut Transition) {
        let Some((zone, spec, items, state)) = self.active() else {
            return;
        };
        if let Some(next) = selection::clear(&state, &spec.config.select) {
            self.commit_selection(zone, spec, items, state.focused.as_ref(), next, t);
        }
    }

    fn commit_selection(
        &self,
        zone: &ZoneId,
        spec: &ZoneSpec,
        items: &[ItemSpec],
        target: Option<&ItemId>,
        (sel, anchor): (BTreeSet<ItemId>, Option<ItemId>),
        t: &mut Transition,
    ) {
        if let Some(call) = &spec.bound.select {
            let ids: Vec<ItemId> = items
                .iter()
                .filter(|i| sel.contains(&i.id))
                .map(|i| i.id.clone())
                .collect();
            Self::push_call(t, call, zone, target, &ids);
        }
        t.commits.push((zone.clone(), FocusPatch::new().select(sel, anchor)));
    }

    // --- Activation ----------------------------------------------------------

    fn activate(&self, id: Option<ItemId>, t: &mut Transition) {
        let Some((zone, spec, items, state)) = self.active() else {
            return;
        };
        let Some(target) = id.or_else(|| state.focused.clone()) else {
            return;
        };
        if let Some(call) = &spec.bound.activate {
            Self::push_call(t, call, zone, Some(&target), std::slice::from_ref(&target));
            return;
        }
        if items.iter().any(|i| i.id == target && i.expandable) {
            self.expand(
                ExpandArgs {
                    id: Some(target),
                    action: ExpandAction::Toggle,
                },
                t,
            );
        }
    }

    fn click(&self, args: ClickArgs, t: &mut Transition) {
        let Some(zone) = self.registry.zone_of(&args.id).cloned() else {
            return;
        };
        let Some(spec) = self.registry.zone(&zone) else {
            return;
        };
        self.enter(&zone, t);
        let activated = self.land(&zone, &args.id, Some(args.mode), FocusPatch::new().reset_sticky(), t);
        if !activated
            && (args.activate || spec.config.activate.on_click)
            && let Some(call) = &spec.bound.activate
        {
            Self::push_call(t, call, &zone, Some(&args.id), std::slice::from_ref(&args.id));
        }
    }

    fn dismiss(&self, t: &mut Transition) {
        let Some((zone, spec, items, state)) = self.active() else {
            return;
        };
        match spec.config.dismiss.escape {
            EscapeBehavior::None => {}
            EscapeBehavior::Deselect => {
                if let Some(next) = selection::clear(&state, &spec.config.select) {
                    self.commit_selection(zone, spec, items, state.focused.as_ref(), next, t);
                }
            }
            EscapeBehavior::Close => {
                let parent = spec
                    .parent
                    .clone()
                    .filter(|p| self.registry.contains(p));
                t.activate = Some(parent);
            }
        }
    }

    fn expand(&self, args: ExpandArgs, t: &mut Transition) {
        let Some((zone, _, items, state)) = self.active() else {
            return;
        };
        let Some(target) = args.id.or_else(|| state.focused.clone()) else {
            return;
        };
        if !items.iter().any(|i| i.id == target && i.expandable) {
            return;
        }
        if let Some(open) = args.action.apply(state.expanded.contains(&target)) {
            let mut expanded = state.expanded.clone();
            if open {
                expanded.insert(target);
            } else {
                expanded.remove(&target);
            }
            t.commits.push((zone.clone(), FocusPatch::new().expanded(expanded)));
        }
    }

    fn delegate_role(
        &self,
        role: impl Fn(&crate::zone::BoundCommands) -> Option<&CommandCall>,
        t: &mut Transition,
    ) {
        let Some((zone, spec, items, state)) = self.active() else {
            return;
        };
        if let Some(call) = role(&spec.bound) {
            let ids = Self::role_ids(&state, items);
            Self::push_call(t, call, zone, state.focused.as_ref(), &ids);
        }
    }

    fn history(&self, op: HistoryOp, t: &mut Transition) {
        let bound = self.active().and_then(|(zone, spec, items, state)| {
            let call = match op {
                HistoryOp::Undo => spec.bound.undo.as_ref(),
                HistoryOp::Redo => spec.bound.redo.as_ref(),
            }?;
            let ids = Self::role_ids(&state, items);
            Some(Delegation {
                command: call.command.clone(),
                payload: call.payload_for(zone, state.focused.as_ref(), &ids),
            })
        });
        match bound {
            Some(d) => t.delegate.push(d),
            None => t.history = Some(op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;
    use crate::zone::{BoundCommands, SelectionMode, ZoneConfig};
    use keyzone_core::Rect;

    fn zid(s: &str) -> ZoneId {
        ZoneId::new(s)
    }

    fn list(reg: &mut ZoneRegistry, id: &str, config: ZoneConfig, items: &[&str]) {
        reg.register(ZoneSpec::new(id).parent("root").config(config)).unwrap();
        reg.set_items(&zid(id), items.iter().map(|i| ItemSpec::new(*i)).collect())
            .unwrap();
    }

    fn setup(config: ZoneConfig) -> ZoneRegistry {
        let mut reg = ZoneRegistry::new();
        reg.register(ZoneSpec::new("root")).unwrap();
        list(&mut reg, "list", config, &["a", "b", "c"]);
        reg.set_active_zone(Some(zid("list"))).unwrap();
        reg
    }

    fn run(reg: &ZoneRegistry, command: &str, payload: Value) -> Transition {
        plan(command, &payload, reg, &HeadlessHost::new()).unwrap()
    }

    fn focused(t: &Transition) -> Option<ItemId> {
        t.commits.last().and_then(|(_, p)| p.focused.clone().flatten())
    }

    #[test]
    fn keymap_parses_and_is_global() {
        let bindings = keymap();
        assert!(bindings.iter().all(|b| b.check().is_ok()));
        assert!(bindings.iter().all(|b| b.zone.is_none() && b.allow_in_input.is_none()));
        assert!(bindings.iter().all(|b| is_builtin(&b.command)));
    }

    #[test]
    fn navigate_down_without_focus_enters_first() {
        let reg = setup(ZoneConfig::list());
        let t = run(&reg, ids::NAVIGATE, json!({ "direction": "down" }));
        assert_eq!(focused(&t), Some(ItemId::new("a")));
    }

    #[test]
    fn bad_payload_is_an_error() {
        let reg = setup(ZoneConfig::list());
        let err = plan(ids::NAVIGATE, &json!({ "direction": "sideways" }), &reg, &HeadlessHost::new())
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidPayload { .. }));
        let err = plan("os.nope", &Value::Null, &reg, &HeadlessHost::new()).unwrap_err();
        assert!(matches!(err, CommandError::Unknown(_)));
    }

    #[test]
    fn seamless_boundary_hands_off_to_sibling() {
        let mut reg = ZoneRegistry::new();
        reg.register(ZoneSpec::new("root")).unwrap();
        list(&mut reg, "left", ZoneConfig::list().seamless(true), &["a", "b"]);
        list(&mut reg, "right", ZoneConfig::list(), &["x", "y"]);
        reg.set_active_zone(Some(zid("left"))).unwrap();
        reg.commit(&zid("left"), FocusPatch::new().focus(Some("b".into())));

        let t = run(&reg, ids::NAVIGATE, json!({ "direction": "down" }));
        assert_eq!(t.activate, Some(Some(zid("right"))));
        assert_eq!(t.commits, vec![(zid("right"), FocusPatch::new().focus(Some("x".into())).reset_sticky())]);

        let t = run(&reg, ids::NAVIGATE, json!({ "direction": "up" }));
        assert!(t.activate.is_none());
    }

    #[test]
    fn spatial_remembers_sticky_on_perpendicular_slot() {
        let mut reg = setup(ZoneConfig::spatial());
        let mut host = HeadlessHost::new();
        host.place("a", Rect::new(0, 0, 10, 10));
        host.place("b", Rect::new(0, 20, 10, 10));
        host.place("c", Rect::new(20, 0, 10, 10));
        reg.commit(&zid("list"), FocusPatch::new().focus(Some("a".into())));
        let t = plan(ids::NAVIGATE, &json!({ "direction": "down" }), &reg, &host).unwrap();
        let (_, patch) = &t.commits[0];
        assert_eq!(patch.focused, Some(Some("b".into())));
        assert_eq!(patch.sticky_x, Some(Some(10)));
        assert_eq!(patch.sticky_y, Some(None));
    }

    #[test]
    fn right_on_collapsed_node_expands_instead_of_moving() {
        let mut reg = ZoneRegistry::new();
        reg.register(ZoneSpec::new("tree")).unwrap();
        reg.set_items(&zid("tree"), vec![ItemSpec::expandable("n"), ItemSpec::new("m")])
            .unwrap();
        reg.set_active_zone(Some(zid("tree"))).unwrap();
        reg.commit(&zid("tree"), FocusPatch::new().focus(Some("n".into())));
        let t = run(&reg, ids::NAVIGATE, json!({ "direction": "right" }));
        assert_eq!(
            t.commits,
            vec![(zid("tree"), FocusPatch::new().expanded(BTreeSet::from(["n".into()])))]
        );
    }

    #[test]
    fn range_navigation_extends_selection() {
        let mut reg = setup(ZoneConfig::list().select(SelectionMode::Multiple));
        reg.commit(&zid("list"), FocusPatch::new().focus(Some("a".into())));
        let t = run(&reg, ids::NAVIGATE, json!({ "direction": "down", "select": "range" }));
        let (_, patch) = &t.commits[0];
        assert_eq!(patch.selection, Some(BTreeSet::from(["a".into(), "b".into()])));
        assert_eq!(patch.anchor, Some(Some("a".into())));
    }

    #[test]
    fn follow_focus_selects_on_move() {
        let mut reg = setup(ZoneConfig::list().select(SelectionMode::Single).follow_focus(true));
        reg.commit(&zid("list"), FocusPatch::new().focus(Some("a".into())));
        let t = run(&reg, ids::NAVIGATE, json!({ "direction": "down" }));
        assert_eq!(t.commits[0].1.selection, Some(BTreeSet::from(["b".into()])));
    }

    #[test]
    fn activate_delegates_to_bound_command() {
        let bound = BoundCommands {
            activate: Some(CommandCall::new("todo.open")),
            ..BoundCommands::default()
        };
        let mut reg = ZoneRegistry::new();
        reg.register(ZoneSpec::new("list").bound(bound)).unwrap();
        reg.set_items(&zid("list"), vec!["a".into()]).unwrap();
        reg.set_active_zone(Some(zid("list"))).unwrap();
        reg.commit(&zid("list"), FocusPatch::new().focus(Some("a".into())));
        let t = run(&reg, ids::ACTIVATE, Value::Null);
        assert_eq!(
            t.delegate,
            vec![Delegation {
                command: "todo.open".into(),
                payload: json!({ "id": "a", "ids": ["a"], "zone": "list" }),
            }]
        );
    }

    #[test]
    fn delete_passes_selection_in_item_order() {
        let bound = BoundCommands {
            delete: Some(CommandCall::new("todo.delete")),
            ..BoundCommands::default()
        };
        let mut reg = ZoneRegistry::new();
        reg.register(
            ZoneSpec::new("list")
                .bound(bound)
                .config(ZoneConfig::list().select(SelectionMode::Multiple)),
        )
        .unwrap();
        reg.set_items(&zid("list"), vec!["a".into(), "b".into(), "c".into()])
            .unwrap();
        reg.set_active_zone(Some(zid("list"))).unwrap();
        reg.commit(
            &zid("list"),
            FocusPatch::new()
                .focus(Some("c".into()))
                .select(BTreeSet::from(["c".into(), "a".into()]), Some("a".into())),
        );
        let t = run(&reg, ids::DELETE, Value::Null);
        assert_eq!(t.delegate[0].payload["ids"], json!(["a", "c"]));
    }

    #[test]
    fn undo_without_bound_command_uses_history() {
        let reg = setup(ZoneConfig::list());
        assert_eq!(run(&reg, ids::UNDO, Value::Null).history, Some(HistoryOp::Undo));
        assert_eq!(run(&reg, ids::REDO, Value::Null).history, Some(HistoryOp::Redo));
    }

    #[test]
    fn dismiss_close_returns_to_parent() {
        let reg = setup(ZoneConfig::list().escape(EscapeBehavior::Close));
        let t = run(&reg, ids::DISMISS, Value::Null);
        assert_eq!(t.activate, Some(Some(zid("root"))));
    }

    #[test]
    fn click_focuses_and_enters_zone() {
        let mut reg = setup(ZoneConfig::list());
        reg.set_active_zone(None).unwrap();
        let t = run(&reg, ids::CLICK, json!({ "id": "b" }));
        assert_eq!(t.activate, Some(Some(zid("list"))));
        assert_eq!(focused(&t), Some(ItemId::new("b")));
    }

    #[test]
    fn focus_on_foreign_zone_is_ignored() {
        let reg = setup(ZoneConfig::list());
        let t = run(&reg, ids::FOCUS, json!({ "id": "a", "zone": "root" }));
        assert!(t.is_empty());
    }

    #[test]
    fn focus_zone_uses_entry_strategy() {
        let mut reg = setup(ZoneConfig::list().entry(crate::zone::EntryStrategy::Last));
        reg.set_active_zone(None).unwrap();
        let t = run(&reg, ids::FOCUS_ZONE, json!({ "zone": "list" }));
        assert_eq!(focused(&t), Some(ItemId::new("c")));
    }
}
