#![forbid(unsafe_code)]

//! The event pipeline.
//!
//! Every input event runs through six phases, start to finish, before the
//! next event is looked at:
//!
//! ```text
//! Intercept -> Resolve -> Dispatch -> Commit -> Project -> Effect
//! ```
//!
//! - **Intercept** drops events that are already handled, still composing
//!   or key releases, and tags the rest with their origin.
//! - **Resolve** turns a key press into a binding through the bubble path,
//!   and a pointer event into a built-in focus/click command.
//! - **Dispatch** runs the command: the application's reducer when one is
//!   registered under the id, otherwise the engine built-in. Reducer errors
//!   and panics are contained here.
//! - **Commit** writes the changed fields to the zone stores and moves
//!   jurisdiction. Skipped when Dispatch failed.
//! - **Project** moves the host's active element to the committed focus.
//!   Skipped when Dispatch failed.
//! - **Effect** appends a telemetry record and, for loggable commands that
//!   changed state, a history entry.
//!
//! # Ordering
//!
//! [`Engine`] takes `&mut self` for every pass, so passes cannot interleave.
//! Work that must happen "after this event" goes through
//! [`Engine::enqueue`]; the queue is drained in order at the end of the
//! current pass and before the next event's Intercept. Debounced zone
//! removals are flushed at the same two points.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};

use keyzone_core::{
    Context, ExprCache, InputEvent, ItemId, KeyChord, KeyEventKind, Modifiers, PointerKind, ZoneId,
};
use serde_json::{Value, json};
use tracing::{debug, debug_span, warn};
use web_time::Instant;

use crate::builtin::{self, HistoryOp, Transition, ids};
use crate::command::{CommandDef, CommandRegistry, Environment};
use crate::config::{EngineConfig, KeymapConfig};
use crate::error::{CommandError, ConfigError};
use crate::history::{History, Snapshot};
use crate::host::{HeadlessHost, Host};
use crate::keymap::{self, BindingEntry, BindingTable, KeyIntent};
use crate::registry::ZoneRegistry;
use crate::selection::SelectOp;
use crate::telemetry::{Source, Telemetry, TelemetryRecord};

const TARGET: &str = "keyzone.pipeline";

/// Delegation chains longer than this are cut off.
const MAX_DELEGATION_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// Pipeline artifacts
// ---------------------------------------------------------------------------

/// A programmatic command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Command id.
    pub command: String,
    /// Payload.
    pub payload: Value,
    /// History coalescing tag.
    pub group_id: Option<String>,
}

impl Dispatch {
    /// A dispatch without payload.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: Value::Null,
            group_id: None,
        }
    }

    /// Set the payload.
    #[must_use]
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Tag for history coalescing.
    #[must_use]
    pub fn group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// What Intercept hands to Resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// A key press.
    Key(KeyIntent),
    /// A pointer interaction on a registered item.
    Pointer {
        /// Target item.
        item: ItemId,
        /// Interaction.
        kind: PointerKind,
        /// Held modifiers.
        modifiers: Modifiers,
    },
}

/// Outcome of one command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Command id.
    pub command: String,
    /// Owner.
    pub source: Source,
    /// Ran without error.
    pub success: bool,
    /// Something observable changed.
    pub changed: bool,
    /// Error message on failure.
    pub error: Option<String>,
}

impl ExecutionResult {
    fn ok(command: &str, source: Source, changed: bool) -> Self {
        Self {
            command: command.to_string(),
            source,
            success: true,
            changed,
            error: None,
        }
    }

    fn failed(command: &str, source: Source, error: &CommandError) -> Self {
        Self {
            command: command.to_string(),
            source,
            success: false,
            changed: false,
            error: Some(error.to_string()),
        }
    }
}

/// What [`Engine::handle`] reports back to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// The engine acted on the event; the host should suppress its default.
    pub handled: bool,
    /// The command the event resolved to, if any.
    pub command: Option<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The focus and command engine.
///
/// `S` is the application state the registered reducers operate on.
pub struct Engine<S, H = HeadlessHost> {
    state: S,
    registry: ZoneRegistry,
    commands: CommandRegistry<S>,
    keymaps: Vec<BindingEntry>,
    table: BindingTable,
    cache: ExprCache,
    context: Context,
    history: History<Snapshot<S>>,
    telemetry: Telemetry,
    host: H,
    config: EngineConfig,
    queue: VecDeque<Dispatch>,
    last: Option<ExecutionResult>,
}

impl<S: Clone + PartialEq> Engine<S, HeadlessHost> {
    /// An engine with default configuration and an in-memory host.
    pub fn new(state: S) -> Self {
        Self::with_host(state, HeadlessHost::new(), EngineConfig::default())
    }

    /// An engine with the given configuration and an in-memory host.
    pub fn with_config(state: S, config: EngineConfig) -> Self {
        Self::with_host(state, HeadlessHost::new(), config)
    }
}

impl<S: Clone + PartialEq, H: Host> Engine<S, H> {
    /// An engine on a custom host.
    pub fn with_host(state: S, host: H, config: EngineConfig) -> Self {
        let config = config.validated();
        let mut engine = Self {
            state,
            registry: ZoneRegistry::new()
                .with_focus_path_guard(config.focus_path_guard)
                .with_debounce(config.deregister_debounce),
            commands: CommandRegistry::new(),
            keymaps: Vec::new(),
            table: BindingTable::new(),
            cache: ExprCache::new(),
            context: Context::new(),
            history: History::new(config.history_depth),
            telemetry: Telemetry::new(config.telemetry_capacity),
            host,
            config,
            queue: VecDeque::new(),
            last: None,
        };
        engine.registry.init();
        engine.rebuild_table();
        engine
    }

    // --- Accessors ---------------------------------------------------------

    /// Application state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Zone registry.
    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Zone registry, for zone and item registration.
    pub fn registry_mut(&mut self) -> &mut ZoneRegistry {
        &mut self.registry
    }

    /// Registered commands.
    pub fn commands(&self) -> &CommandRegistry<S> {
        &self.commands
    }

    /// Effective binding table.
    pub fn bindings(&self) -> &BindingTable {
        &self.table
    }

    /// Undo/redo history.
    pub fn history(&self) -> &History<Snapshot<S>> {
        &self.history
    }

    /// Telemetry buffer.
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Host, for layout updates.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Effective configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Application context for `when` clauses.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Replace the application context.
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    /// Result of the most recent top-level execution.
    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last.as_ref()
    }

    // --- Configuration -----------------------------------------------------

    /// Register an application command and its default keybindings.
    pub fn register_command(&mut self, def: CommandDef<S>) -> Result<(), ConfigError> {
        self.commands.register(def)?;
        self.rebuild_table();
        Ok(())
    }

    /// Add a keymap. Nothing is loaded if any binding is malformed.
    pub fn load_keymap(&mut self, keymap: &KeymapConfig) -> Result<(), ConfigError> {
        let entries = keymap
            .bindings()
            .map(|b| {
                let zone = b.zone.clone();
                BindingEntry::from_binding(&b, zone)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(target: TARGET, bindings = entries.len(), "keymap loaded");
        self.keymaps.extend(entries);
        self.rebuild_table();
        Ok(())
    }

    /// Application keymaps first, then command defaults, then built-ins, so
    /// application bindings win within a layer.
    fn rebuild_table(&mut self) {
        let defaults = self.commands.get_keybindings().unwrap_or_else(|err| {
            warn!(target: TARGET, error = %err, "skipping command keybindings");
            Vec::new()
        });
        let builtins: Vec<BindingEntry> = if self.config.builtin_keymap {
            builtin::keymap()
                .iter()
                .filter_map(|b| BindingEntry::from_binding(b, None).ok())
                .collect()
        } else {
            Vec::new()
        };

        let mut table = BindingTable::new();
        for entry in self.keymaps.iter().cloned().chain(defaults).chain(builtins) {
            let when = self
                .commands
                .get(&entry.command)
                .and_then(|d| d.when.clone());
            table.push(entry, when.as_deref(), &mut self.cache);
        }
        self.table = table;
    }

    // --- Ambient values ----------------------------------------------------

    /// Active zone, its focused item and its selection.
    pub fn environment(&self) -> Environment {
        let active_zone = self.registry.active_zone().cloned();
        let state = active_zone.as_ref().and_then(|z| self.registry.state(z));
        let focused_item = state.and_then(|s| s.focused.clone());
        let selection = match (&active_zone, state) {
            (Some(z), Some(s)) => s.selection_in_order(self.registry.items(z)),
            _ => Vec::new(),
        };
        Environment {
            active_zone,
            focused_item,
            selection,
        }
    }

    /// Application context with the engine's ambient keys on top.
    pub fn resolver_context(&self) -> Context {
        let env = self.environment();
        let mut ctx = self.context.clone();
        ctx.set(
            "activeZone",
            env.active_zone.as_ref().map(|z| z.as_str().to_string()),
        );
        ctx.set(
            "focusedItem",
            env.focused_item.as_ref().map(|i| i.as_str().to_string()),
        );
        ctx.set("hasFocus", env.focused_item.is_some());
        ctx.set("hasSelection", !env.selection.is_empty());
        ctx.set("selectionCount", env.selection.len());
        ctx.set("canUndo", self.history.can_undo());
        ctx.set("canRedo", self.history.can_redo());
        ctx
    }

    /// Everything undo would restore, as of now.
    pub fn snapshot(&self) -> Snapshot<S> {
        Snapshot {
            app: self.state.clone(),
            stores: self.registry.states(),
            active: self.registry.active_zone().cloned(),
        }
    }

    // --- Passes ------------------------------------------------------------

    /// Run one input event through every phase.
    pub fn handle(&mut self, event: InputEvent) -> EventOutcome {
        self.flush();

        let span = debug_span!(
            "keyzone.pipeline",
            event_kind = event.kind_name(),
            command = tracing::field::Empty,
            outcome = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        )
        .entered();
        let start = Instant::now();

        let outcome = match self.intercept(&event) {
            None => {
                span.record("outcome", "ignored");
                EventOutcome::default()
            }
            Some(intent) => match self.resolve(&intent) {
                None => {
                    span.record("outcome", "unbound");
                    EventOutcome::default()
                }
                Some(dispatch) => {
                    span.record("command", dispatch.command.as_str());
                    let command = dispatch.command.clone();
                    let result = self.execute(dispatch, 0);
                    let label = match (result.success, result.changed) {
                        (false, _) => "failed",
                        (true, false) => "noop",
                        (true, true) => "handled",
                    };
                    span.record("outcome", label);
                    let handled = result.success && result.changed;
                    self.last = Some(result);
                    EventOutcome {
                        handled,
                        command: Some(command),
                    }
                }
            },
        };

        span.record(
            "duration_us",
            u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
        );
        drop(span);
        self.flush();
        outcome
    }

    /// Run a command programmatically: Dispatch through Effect.
    pub fn dispatch(&mut self, dispatch: Dispatch) -> ExecutionResult {
        self.flush();
        let span = debug_span!(
            "keyzone.pipeline",
            event_kind = "dispatch",
            command = dispatch.command.as_str(),
        )
        .entered();
        let result = self.execute(dispatch, 0);
        self.last = Some(result.clone());
        drop(span);
        self.flush();
        result
    }

    /// Defer a dispatch until the current pass is over.
    pub fn enqueue(&mut self, dispatch: Dispatch) {
        self.queue.push_back(dispatch);
    }

    /// Drain deferred dispatches in order and flush debounced zone
    /// removals. Returns the number of dispatches run.
    pub fn flush(&mut self) -> usize {
        self.registry.flush_pending();
        let mut ran = 0;
        while let Some(next) = self.queue.pop_front() {
            let result = self.execute(next, 0);
            self.last = Some(result);
            ran += 1;
        }
        self.registry.flush_pending();
        ran
    }

    /// Step history back. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.dispatch(Dispatch::new(ids::UNDO)).changed
    }

    /// Step history forward. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.dispatch(Dispatch::new(ids::REDO)).changed
    }

    // --- Intercept ---------------------------------------------------------

    fn intercept(&self, event: &InputEvent) -> Option<Intent> {
        if event.is_handled() {
            debug!(target: TARGET, phase = "intercept", "already handled");
            return None;
        }
        match event {
            InputEvent::Key(key) => {
                if key.composing || key.kind == KeyEventKind::Release {
                    return None;
                }
                Some(Intent::Key(KeyIntent {
                    chord: KeyChord::from_event(key),
                    is_input: key.target.editable,
                }))
            }
            InputEvent::Pointer(pointer) => {
                if pointer.target.editable {
                    return None;
                }
                pointer.target.item.clone().map(|item| Intent::Pointer {
                    item,
                    kind: pointer.kind,
                    modifiers: pointer.modifiers,
                })
            }
        }
    }

    // --- Resolve -----------------------------------------------------------

    fn resolve(&self, intent: &Intent) -> Option<Dispatch> {
        match intent {
            Intent::Key(key) => {
                let ctx = self.resolver_context();
                let bubble = self.registry.bubble_path();
                let env = self.environment();
                let hit = keymap::resolve(key, &self.table, &ctx, &bubble, &env)?;
                debug!(target: TARGET, phase = "resolve", key = %key.chord, command = %hit.command, layer = ?hit.zone, "binding matched");
                Some(Dispatch::new(hit.command).payload(hit.args))
            }
            Intent::Pointer {
                item,
                kind,
                modifiers,
            } => {
                let id = item.as_str();
                let mode = if modifiers.contains(Modifiers::SHIFT) {
                    SelectOp::Range
                } else if modifiers.intersects(Modifiers::primary()) {
                    SelectOp::Toggle
                } else {
                    SelectOp::Replace
                };
                let dispatch = match kind {
                    PointerKind::Down => Dispatch::new(ids::FOCUS).payload(json!({ "id": id })),
                    PointerKind::Click => {
                        Dispatch::new(ids::CLICK).payload(json!({ "id": id, "mode": mode }))
                    }
                    PointerKind::DoubleClick => Dispatch::new(ids::CLICK)
                        .payload(json!({ "id": id, "mode": mode, "activate": true })),
                };
                Some(dispatch)
            }
        }
    }

    // --- Dispatch, Commit, Project, Effect ---------------------------------

    fn execute(&mut self, dispatch: Dispatch, depth: usize) -> ExecutionResult {
        if let Some(def) = self.commands.get_shared(&dispatch.command) {
            return self.execute_app(&def, dispatch);
        }
        if builtin::is_builtin(&dispatch.command) {
            return self.execute_builtin(dispatch, depth);
        }
        let err = CommandError::Unknown(dispatch.command.clone());
        warn!(target: TARGET, phase = "dispatch", command = %dispatch.command, "unknown command dropped");
        self.effect(&dispatch, Source::App, false);
        ExecutionResult::failed(&dispatch.command, Source::App, &err)
    }

    fn execute_app(&mut self, def: &CommandDef<S>, dispatch: Dispatch) -> ExecutionResult {
        let env = self.environment();
        let run = AssertUnwindSafe(|| (def.run)(&self.state, &dispatch.payload, &env));
        let outcome = match catch_unwind(run) {
            Ok(result) => result,
            Err(panic) => Err(CommandError::Panicked {
                command: dispatch.command.clone(),
                message: panic_message(panic.as_ref()),
            }),
        };

        let next = match outcome {
            Ok(next) => next,
            Err(err) => {
                warn!(target: TARGET, phase = "dispatch", command = %dispatch.command, error = %err, "command failed");
                self.effect(&dispatch, Source::App, false);
                return ExecutionResult::failed(&dispatch.command, Source::App, &err);
            }
        };

        // Commit
        let changed = next != self.state;
        let before = changed.then(|| Snapshot {
            app: std::mem::replace(&mut self.state, next),
            stores: self.registry.states(),
            active: self.registry.active_zone().cloned(),
        });

        // Effect
        self.effect(&dispatch, Source::App, true);
        if let Some(before) = before
            && def.log
        {
            self.history
                .push(dispatch.command.as_str(), before, dispatch.group_id.clone());
        }
        debug!(target: TARGET, phase = "commit", command = %dispatch.command, changed, "app command");
        ExecutionResult::ok(&dispatch.command, Source::App, changed)
    }

    fn execute_builtin(&mut self, dispatch: Dispatch, depth: usize) -> ExecutionResult {
        let transition =
            match builtin::plan(&dispatch.command, &dispatch.payload, &self.registry, &self.host) {
                Ok(t) => t,
                Err(err) => {
                    warn!(target: TARGET, phase = "dispatch", command = %dispatch.command, error = %err, "built-in failed");
                    self.effect(&dispatch, Source::Engine, false);
                    return ExecutionResult::failed(&dispatch.command, Source::Engine, &err);
                }
            };

        let mut changed = self.commit(&transition);
        if changed {
            self.project();
        }
        self.effect(&dispatch, Source::Engine, true);

        if let Some(op) = transition.history {
            changed |= self.step_history(op);
        }

        for delegation in transition.delegate {
            if depth >= MAX_DELEGATION_DEPTH {
                warn!(target: TARGET, command = %delegation.command, "delegation depth exceeded");
                break;
            }
            let result = self.execute(
                Dispatch::new(delegation.command).payload(delegation.payload),
                depth + 1,
            );
            changed |= result.changed;
        }

        ExecutionResult::ok(&dispatch.command, Source::Engine, changed)
    }

    fn commit(&mut self, transition: &Transition) -> bool {
        let mut changed = false;
        if let Some(zone) = &transition.activate {
            let before = self.registry.active_zone().cloned();
            match self.registry.set_active_zone(zone.clone()) {
                Ok(()) => changed |= before != *zone,
                Err(err) => warn!(target: TARGET, phase = "commit", error = %err, "activation skipped"),
            }
        }
        for (zone, patch) in &transition.commits {
            changed |= self.registry.commit(zone, patch.clone());
        }
        debug!(target: TARGET, phase = "commit", changed, "transition applied");
        changed
    }

    fn project(&mut self) {
        let want = self
            .registry
            .active_zone()
            .and_then(|z| self.registry.state(z))
            .and_then(|s| s.focused.clone());
        if self.host.active_element() != want {
            debug!(target: TARGET, phase = "project", item = ?want, "active element moved");
            self.host.set_active_element(want.as_ref());
        }
    }

    fn effect(&mut self, dispatch: &Dispatch, source: Source, success: bool) {
        self.telemetry.record(TelemetryRecord::now(
            dispatch.command.as_str(),
            dispatch.payload.clone(),
            source,
            success,
        ));
    }

    fn step_history(&mut self, op: HistoryOp) -> bool {
        let current = self.snapshot();
        let restored = match op {
            HistoryOp::Undo => self.history.undo(current),
            HistoryOp::Redo => self.history.redo(current),
        };
        let Some(snapshot) = restored else {
            return false;
        };
        self.state = snapshot.app.clone();
        for (zone, state) in &snapshot.stores {
            self.registry.restore(zone, state);
        }
        let active: Option<ZoneId> = snapshot
            .active
            .clone()
            .filter(|z| self.registry.contains(z));
        if let Err(err) = self.registry.set_active_zone(active) {
            warn!(target: TARGET, error = %err, "restored zone vanished");
        }
        self.project();
        true
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
