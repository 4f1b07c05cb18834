#![forbid(unsafe_code)]

//! Hierarchical keybinding resolution.
//!
//! # Algorithm
//!
//! 1. The key event is normalized into a [`KeyChord`] (sorted modifiers,
//!    canonical key name).
//! 2. The [`BindingTable`] indexes every binding by chord, so only exact
//!    matches are considered.
//! 3. The bubble path runs from the active zone outward through its
//!    ancestors and ends at the global layer.
//! 4. At each layer only bindings scoped to that layer take part; an
//!    unscoped binding only matches the global layer.
//! 5. A candidate must pass its condition, evaluated against the context
//!    with `isInput` set, and the input gate: inside an editable field only
//!    bindings flagged `allow_in_input` are eligible.
//! 6. The first eligible binding wins, in table order within a layer. Its
//!    argument placeholders are replaced with live values.
//!
//! No match leaves the event alone so the platform default can run.
//!
//! # Placeholders
//!
//! | Placeholder | Replaced with |
//! |---|---|
//! | `"$focused"` | focused item id of the active zone, or `null` |
//! | `"$selection"` | array of selected ids in item order |
//! | `"$zone"` | active zone id, or `null` |
//!
//! Replacement is recursive through arrays and objects. Strings that merely
//! contain a placeholder are left alone.

use std::sync::Arc;

use ahash::AHashMap;
use keyzone_core::{Context, Expr, ExprCache, KeyChord, ZoneId};
use serde_json::Value;
use tracing::trace;

use crate::command::Environment;
use crate::config::Binding;
use crate::error::ConfigError;

/// Context key set to whether the event came from an editable field.
pub const IS_INPUT: &str = "isInput";

/// A parsed keybinding.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingEntry {
    /// Normalized chord.
    pub key: KeyChord,
    /// Target command id.
    pub command: String,
    /// Static arguments, possibly holding placeholders.
    pub args: Option<Value>,
    /// Condition source.
    pub when: Option<String>,
    /// Zone scope; `None` is global.
    pub zone: Option<ZoneId>,
    /// Fires inside editable fields.
    pub allow_in_input: bool,
}

impl BindingEntry {
    /// Parse a configured binding under `zone`.
    pub fn from_binding(binding: &Binding, zone: Option<ZoneId>) -> Result<Self, ConfigError> {
        binding.check()?;
        let key = KeyChord::parse(&binding.key).map_err(|source| ConfigError::InvalidChord {
            key: binding.key.clone(),
            command: binding.command.clone(),
            source,
        })?;
        Ok(Self {
            key,
            command: binding.command.clone(),
            args: binding.args.clone(),
            when: binding.when.clone().filter(|w| !w.trim().is_empty()),
            zone,
            allow_in_input: binding.allow_in_input.unwrap_or(false),
        })
    }
}

/// Bindings indexed by chord, each with its compiled condition.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    entries: Vec<BindingEntry>,
    conditions: Vec<Arc<Expr>>,
    by_key: AHashMap<KeyChord, Vec<usize>>,
}

impl BindingTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding. Its condition is the conjunction of its own `when`
    /// and the command's `when`, both compiled through `cache`.
    pub fn push(&mut self, entry: BindingEntry, command_when: Option<&str>, cache: &mut ExprCache) {
        let own = entry.when.as_deref().map_or(Expr::Always, |w| (*cache.compile(w)).clone());
        let gate = command_when.map_or(Expr::Always, |w| (*cache.compile(w)).clone());
        let index = self.entries.len();
        self.by_key.entry(entry.key).or_default().push(index);
        self.entries.push(entry);
        self.conditions.push(Arc::new(own.and(gate)));
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table holds no binding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every binding in table order.
    pub fn entries(&self) -> impl Iterator<Item = &BindingEntry> {
        self.entries.iter()
    }

    /// Bindings for exactly this chord, in table order, with their
    /// effective conditions.
    pub fn candidates(&self, chord: &KeyChord) -> impl Iterator<Item = (&BindingEntry, &Expr)> {
        self.by_key
            .get(chord)
            .into_iter()
            .flatten()
            .map(|&i| (&self.entries[i], self.conditions[i].as_ref()))
    }
}

/// A key press ready for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyIntent {
    /// Normalized chord.
    pub chord: KeyChord,
    /// Came from an editable field.
    pub is_input: bool,
}

/// The winning binding with placeholders resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinding {
    /// Command id.
    pub command: String,
    /// Concrete arguments; `null` when the binding had none.
    pub args: Value,
    /// Layer the binding matched at, `None` for global.
    pub zone: Option<ZoneId>,
}

/// Resolve a key press against `table`, bubbling from the innermost zone of
/// `bubble_path` to the global layer.
#[must_use]
pub fn resolve(
    intent: &KeyIntent,
    table: &BindingTable,
    context: &Context,
    bubble_path: &[ZoneId],
    env: &Environment,
) -> Option<ResolvedBinding> {
    let mut ctx = context.clone();
    ctx.set(IS_INPUT, intent.is_input);

    let layers = bubble_path.iter().map(Some).chain(std::iter::once(None));
    for layer in layers {
        for (entry, condition) in table.candidates(&intent.chord) {
            if entry.zone.as_ref() != layer {
                continue;
            }
            if !condition.eval(&ctx) {
                trace!(target: "keyzone.keymap", key = %intent.chord, command = %entry.command, "condition failed");
                continue;
            }
            if intent.is_input && !entry.allow_in_input {
                trace!(target: "keyzone.keymap", key = %intent.chord, command = %entry.command, "input gate");
                continue;
            }
            return Some(ResolvedBinding {
                command: entry.command.clone(),
                args: entry
                    .args
                    .as_ref()
                    .map_or(Value::Null, |args| fill_placeholders(args, env)),
                zone: layer.cloned(),
            });
        }
    }
    None
}

/// Replace `$focused`, `$selection` and `$zone` anywhere in `args`.
#[must_use]
pub fn fill_placeholders(args: &Value, env: &Environment) -> Value {
    match args {
        Value::String(s) => match s.as_str() {
            "$focused" => env
                .focused_item
                .as_ref()
                .map_or(Value::Null, |id| Value::from(id.as_str())),
            "$selection" => Value::Array(
                env.selection
                    .iter()
                    .map(|id| Value::from(id.as_str()))
                    .collect(),
            ),
            "$zone" => env
                .active_zone
                .as_ref()
                .map_or(Value::Null, |z| Value::from(z.as_str())),
            _ => args.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| fill_placeholders(v, env)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), fill_placeholders(v, env)))
                .collect(),
        ),
        _ => args.clone(),
    }
}
