#![forbid(unsafe_code)]

//! Engine and keymap configuration.
//!
//! # Engine
//!
//! [`EngineConfig`] holds the few tunables of the engine. Every field has a
//! default; [`EngineConfig::from_env`] overrides them from the process
//! environment and [`EngineConfig::validated`] clamps them to safe ranges.
//!
//! | Variable | Field |
//! |---|---|
//! | `KEYZONE_HISTORY_DEPTH` | `history_depth` |
//! | `KEYZONE_TELEMETRY_CAPACITY` | `telemetry_capacity` |
//! | `KEYZONE_FOCUS_PATH_GUARD` | `focus_path_guard` |
//! | `KEYZONE_DISABLE_BUILTIN_KEYMAP` | `builtin_keymap` (`1`/`true` disables) |
//!
//! # Keymap
//!
//! [`KeymapConfig`] is the keymap as data:
//!
//! ```json
//! {
//!   "global": [{ "key": "Mod+S", "command": "doc.save", "allowInInput": true }],
//!   "zones": {
//!     "todo-list": [{ "key": "Enter", "command": "todo.edit", "when": "!isEditing" }]
//!   }
//! }
//! ```
//!
//! JSON loading is always available; TOML needs the `toml-config` feature.

use std::collections::BTreeMap;
use std::path::Path;

use keyzone_core::{Expr, KeyChord, ZoneId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Minimum history depth.
pub const MIN_HISTORY_DEPTH: usize = 1;
/// Maximum history depth.
pub const MAX_HISTORY_DEPTH: usize = 1000;
/// Minimum telemetry capacity.
pub const MIN_TELEMETRY_CAPACITY: usize = 1;
/// Maximum telemetry capacity.
pub const MAX_TELEMETRY_CAPACITY: usize = 10_000;
/// Minimum focus path guard.
pub const MIN_FOCUS_PATH_GUARD: usize = 1;
/// Maximum focus path guard.
pub const MAX_FOCUS_PATH_GUARD: usize = 1000;

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bound on both the undo and the redo stack.
    pub history_depth: usize,
    /// Telemetry ring buffer capacity.
    pub telemetry_capacity: usize,
    /// Hop limit for focus path walks.
    pub focus_path_guard: usize,
    /// Install the built-in keymap.
    pub builtin_keymap: bool,
    /// Defer zone removal to the next pipeline pass.
    pub deregister_debounce: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: 50,
            telemetry_capacity: 50,
            focus_path_guard: 100,
            builtin_keymap: true,
            deregister_debounce: true,
        }
    }
}

impl EngineConfig {
    /// Set the history depth.
    #[must_use]
    pub fn history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    /// Set the telemetry capacity.
    #[must_use]
    pub fn telemetry_capacity(mut self, capacity: usize) -> Self {
        self.telemetry_capacity = capacity;
        self
    }

    /// Set the focus path guard.
    #[must_use]
    pub fn focus_path_guard(mut self, guard: usize) -> Self {
        self.focus_path_guard = guard;
        self
    }

    /// Enable or disable the built-in keymap.
    #[must_use]
    pub fn builtin_keymap(mut self, on: bool) -> Self {
        self.builtin_keymap = on;
        self
    }

    /// Enable or disable debounced zone removal.
    #[must_use]
    pub fn deregister_debounce(mut self, on: bool) -> Self {
        self.deregister_debounce = on;
        self
    }

    /// Load from the process environment, then validate.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup, then validate.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("KEYZONE_HISTORY_DEPTH")
            && let Ok(n) = val.trim().parse::<usize>()
        {
            config.history_depth = n;
        }

        if let Some(val) = lookup("KEYZONE_TELEMETRY_CAPACITY")
            && let Ok(n) = val.trim().parse::<usize>()
        {
            config.telemetry_capacity = n;
        }

        if let Some(val) = lookup("KEYZONE_FOCUS_PATH_GUARD")
            && let Ok(n) = val.trim().parse::<usize>()
        {
            config.focus_path_guard = n;
        }

        if let Some(val) = lookup("KEYZONE_DISABLE_BUILTIN_KEYMAP") {
            let val = val.trim();
            config.builtin_keymap = !(val == "1" || val.eq_ignore_ascii_case("true"));
        }

        config.validated()
    }

    /// Clamp every field to its safe range.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.history_depth = self
            .history_depth
            .clamp(MIN_HISTORY_DEPTH, MAX_HISTORY_DEPTH);
        self.telemetry_capacity = self
            .telemetry_capacity
            .clamp(MIN_TELEMETRY_CAPACITY, MAX_TELEMETRY_CAPACITY);
        self.focus_path_guard = self
            .focus_path_guard
            .clamp(MIN_FOCUS_PATH_GUARD, MAX_FOCUS_PATH_GUARD);
        self
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// A keybinding as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Key chord, e.g. `"Mod+Shift+Z"`.
    pub key: String,
    /// Target command id.
    pub command: String,
    /// Static arguments; strings `"$focused"`, `"$selection"` and `"$zone"`
    /// are replaced at resolve time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// Condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// Fire inside editable fields. Unset inherits the command's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_in_input: Option<bool>,
    /// Zone scope; unset means global. Ignored in [`KeymapConfig`], where the
    /// scope comes from the section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneId>,
}

impl Binding {
    /// A global binding.
    pub fn new(key: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            command: command.into(),
            args: None,
            when: None,
            allow_in_input: None,
            zone: None,
        }
    }

    /// Set static arguments.
    #[must_use]
    pub fn args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    /// Set the condition.
    #[must_use]
    pub fn when(mut self, when: impl Into<String>) -> Self {
        self.when = Some(when.into());
        self
    }

    /// Allow or forbid firing inside editable fields.
    #[must_use]
    pub fn allow_in_input(mut self, allow: bool) -> Self {
        self.allow_in_input = Some(allow);
        self
    }

    /// Scope to a zone.
    #[must_use]
    pub fn zone(mut self, zone: impl Into<ZoneId>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Check the key chord and the condition.
    pub fn check(&self) -> Result<(), ConfigError> {
        KeyChord::parse(&self.key).map_err(|source| ConfigError::InvalidChord {
            key: self.key.clone(),
            command: self.command.clone(),
            source,
        })?;
        if let Some(when) = &self.when
            && has_empty_operand(&Expr::parse(when))
        {
            return Err(ConfigError::InvalidCondition {
                when: when.clone(),
                command: self.command.clone(),
            });
        }
        Ok(())
    }
}

/// `a &&`, `|| b`, a bare `!` or `== x` parse, but almost certainly are typos.
fn has_empty_operand(expr: &Expr) -> bool {
    match expr {
        Expr::Always | Expr::Key(_) => false,
        Expr::Eq(key, _) | Expr::Ne(key, _) => key.is_empty(),
        Expr::Not(inner) => inner.is_always() || has_empty_operand(inner),
        Expr::And(terms) | Expr::Or(terms) => terms
            .iter()
            .any(|t| t.is_always() || has_empty_operand(t)),
    }
}

// ---------------------------------------------------------------------------
// KeymapConfig
// ---------------------------------------------------------------------------

/// Keymap as data: global bindings plus per-zone sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeymapConfig {
    /// Bindings active everywhere.
    pub global: Vec<Binding>,
    /// Bindings scoped to one zone each.
    pub zones: BTreeMap<String, Vec<Binding>>,
}

impl KeymapConfig {
    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Load from a TOML string.
    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "toml-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Every binding with its effective scope, global section first.
    pub fn bindings(&self) -> impl Iterator<Item = Binding> + '_ {
        let global = self.global.iter().map(|b| Binding {
            zone: None,
            ..b.clone()
        });
        let scoped = self.zones.iter().flat_map(|(zone, list)| {
            list.iter().map(move |b| Binding {
                zone: Some(ZoneId::new(zone)),
                ..b.clone()
            })
        });
        global.chain(scoped)
    }

    /// Every binding whose key chord or condition is malformed.
    ///
    /// An empty list means the keymap is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigError> {
        self.bindings().filter_map(|b| b.check().err()).collect()
    }
}
