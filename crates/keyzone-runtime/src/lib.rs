#![forbid(unsafe_code)]

//! Keyzone Runtime
//!
//! Focus, selection and command handling for keyboard-driven interfaces.
//!
//! # Key Components
//!
//! - [`Engine`] - Runs every input event through the six-phase pipeline
//! - [`ZoneRegistry`] - Tree of focus zones, their items and focus stores
//! - [`CommandRegistry`] - Application commands with reducers and `when` gates
//! - [`KeymapConfig`] - Declarative keybindings loaded from JSON or TOML
//! - [`History`] - Snapshot undo/redo with grouped coalescing
//! - [`Telemetry`] - Ring buffer of dispatched commands
//! - [`Host`] - Geometry and active-element seam to the platform
//!
//! # Role in keyzone
//! `keyzone-runtime` is the orchestrator. It consumes events and conditions
//! from `keyzone-core`, resolves key presses to commands through the active
//! zone's bubble path, runs application reducers or engine built-ins, and
//! commits the result to per-zone focus stores before projecting focus back
//! onto the host.

pub mod builtin;
pub mod command;
pub mod config;
pub mod error;
pub mod history;
pub mod host;
pub mod keymap;
pub mod nav;
pub mod pipeline;
pub mod registry;
pub mod selection;
pub mod store;
pub mod telemetry;
pub mod zone;

pub use command::{CommandDef, CommandRegistry, Environment, Reducer};
pub use config::{Binding, EngineConfig, KeymapConfig};
pub use error::{CommandError, ConfigError, RegistryError};
pub use history::{History, HistoryEntry, Snapshot};
pub use host::{Geometry, HeadlessHost, Host};
pub use keymap::{BindingEntry, BindingTable, KeyIntent, ResolvedBinding};
pub use nav::{Direction, TabDirection};
pub use pipeline::{Dispatch, Engine, EventOutcome, ExecutionResult, Intent};
pub use registry::ZoneRegistry;
pub use selection::SelectOp;
pub use store::{FocusPatch, FocusState, FocusStore};
pub use telemetry::{Source, Telemetry, TelemetryRecord};
pub use zone::{
    BoundCommands, CommandCall, EntryStrategy, EscapeBehavior, ItemSpec, Orientation,
    SelectionMode, TabBehavior, ZoneConfig, ZoneSpec,
};

pub use keyzone_core as core;
