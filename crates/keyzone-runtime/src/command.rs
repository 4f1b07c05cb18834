#![forbid(unsafe_code)]

//! Command registry.
//!
//! A command is an id plus a pure reducer `(state, payload, environment) ->
//! next state`. Definitions are registered once at startup and never mutated
//! afterwards; the registry hands out shared references.
//!
//! The [`Environment`] carries ambient values so a command can omit its
//! target and act on "whatever is focused".

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use keyzone_core::{ItemId, KeyChord, ZoneId};
use serde_json::Value;
use tracing::debug;

use crate::config::Binding;
use crate::error::{CommandError, ConfigError};
use crate::keymap::BindingEntry;

/// Ambient values available to every reducer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Zone holding jurisdiction.
    pub active_zone: Option<ZoneId>,
    /// Focused item of the active zone.
    pub focused_item: Option<ItemId>,
    /// Selection of the active zone, in item order.
    pub selection: Vec<ItemId>,
}

impl Environment {
    /// The explicit `id` in `payload`, else the focused item.
    #[must_use]
    pub fn target(&self, payload: &Value) -> Option<ItemId> {
        payload
            .get("id")
            .and_then(Value::as_str)
            .map(ItemId::new)
            .or_else(|| self.focused_item.clone())
    }
}

/// A reducer.
pub type Reducer<S> = Arc<dyn Fn(&S, &Value, &Environment) -> Result<S, CommandError> + Send + Sync>;

/// A command definition.
pub struct CommandDef<S> {
    /// Unique id.
    pub id: String,
    /// Reducer.
    pub run: Reducer<S>,
    /// Condition gating every keybinding of this command.
    pub when: Option<String>,
    /// Default keybindings.
    pub keybindings: Vec<Binding>,
    /// Default for bindings that do not say otherwise.
    pub allow_in_input: bool,
    /// Push a history entry when the command changes state.
    pub log: bool,
}

impl<S> Clone for CommandDef<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            run: Arc::clone(&self.run),
            when: self.when.clone(),
            keybindings: self.keybindings.clone(),
            allow_in_input: self.allow_in_input,
            log: self.log,
        }
    }
}

impl<S> fmt::Debug for CommandDef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDef")
            .field("id", &self.id)
            .field("when", &self.when)
            .field("keybindings", &self.keybindings)
            .field("allow_in_input", &self.allow_in_input)
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

impl<S> CommandDef<S> {
    /// Define a command from a fallible reducer.
    pub fn new<F>(id: impl Into<String>, run: F) -> Self
    where
        F: Fn(&S, &Value, &Environment) -> Result<S, CommandError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            run: Arc::new(run),
            when: None,
            keybindings: Vec::new(),
            allow_in_input: false,
            log: true,
        }
    }

    /// Define a command from an infallible reducer.
    pub fn pure<F>(id: impl Into<String>, run: F) -> Self
    where
        F: Fn(&S, &Value, &Environment) -> S + Send + Sync + 'static,
    {
        Self::new(id, move |s: &S, p: &Value, e: &Environment| Ok(run(s, p, e)))
    }

    /// Gate the command's bindings on a condition.
    #[must_use]
    pub fn when(mut self, when: impl Into<String>) -> Self {
        self.when = Some(when.into());
        self
    }

    /// Add a global default keybinding.
    #[must_use]
    pub fn keybinding(mut self, key: impl Into<String>) -> Self {
        self.keybindings.push(Binding::new(key, self.id.clone()));
        self
    }

    /// Add a fully specified default keybinding.
    #[must_use]
    pub fn binding(mut self, binding: Binding) -> Self {
        self.keybindings.push(binding);
        self
    }

    /// Let this command's bindings fire inside editable fields.
    #[must_use]
    pub fn allow_in_input(mut self, allow: bool) -> Self {
        self.allow_in_input = allow;
        self
    }

    /// Record history entries for this command.
    #[must_use]
    pub fn log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }
}

/// Registered commands, keyed by id.
pub struct CommandRegistry<S> {
    commands: AHashMap<String, Arc<CommandDef<S>>>,
    order: Vec<String>,
}

impl<S> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self {
            commands: AHashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<S> fmt::Debug for CommandRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.order)
            .finish()
    }
}

impl<S> CommandRegistry<S> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Every keybinding must parse. Re-registering an id
    /// replaces the earlier definition.
    pub fn register(&mut self, def: CommandDef<S>) -> Result<(), ConfigError> {
        for binding in &def.keybindings {
            KeyChord::parse(&binding.key).map_err(|source| ConfigError::InvalidChord {
                key: binding.key.clone(),
                command: def.id.clone(),
                source,
            })?;
        }
        debug!(target: "keyzone.registry", command = %def.id, bindings = def.keybindings.len(), "command registered");
        if !self.commands.contains_key(&def.id) {
            self.order.push(def.id.clone());
        }
        self.commands.insert(def.id.clone(), Arc::new(def));
        Ok(())
    }

    /// Look up a command.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CommandDef<S>> {
        self.commands.get(id).map(Arc::as_ref)
    }

    pub(crate) fn get_shared(&self, id: &str) -> Option<Arc<CommandDef<S>>> {
        self.commands.get(id).cloned()
    }

    /// Every command in registration order.
    pub fn get_all(&self) -> impl Iterator<Item = &CommandDef<S>> {
        self.order
            .iter()
            .filter_map(|id| self.commands.get(id).map(Arc::as_ref))
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every command's default keybindings, flattened in registration order.
    pub fn get_keybindings(&self) -> Result<Vec<BindingEntry>, ConfigError> {
        let mut out = Vec::new();
        for def in self.get_all() {
            for binding in &def.keybindings {
                let mut entry = BindingEntry::from_binding(binding, binding.zone.clone())?;
                if binding.allow_in_input.is_none() {
                    entry.allow_in_input = def.allow_in_input;
                }
                out.push(entry);
            }
        }
        Ok(out)
    }
}
