#![forbid(unsafe_code)]

//! Error types.
//!
//! Expected control flow (no binding, empty zone, no sibling) is never an
//! error; these types cover genuine failures that callers may want to report.

use keyzone_core::{ItemId, KeyParseError, ZoneId};
use thiserror::Error;

/// Failure while executing a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No command with this id is registered.
    #[error("unknown command {0:?}")]
    Unknown(String),

    /// The payload did not match the command's argument shape.
    #[error("invalid payload for {command}: {source}")]
    InvalidPayload {
        /// Command id.
        command: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The reducer panicked. The panic was contained at the dispatch boundary.
    #[error("command {command} panicked: {message}")]
    Panicked {
        /// Command id.
        command: String,
        /// Panic message, if it was a string.
        message: String,
    },

    /// The reducer reported a failure.
    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    /// Reducer failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Failure while mutating the zone registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Registering the zone under this parent would close a cycle.
    #[error("zone {zone} cannot be a descendant of itself via parent {parent}")]
    Cycle {
        /// Zone being registered.
        zone: ZoneId,
        /// Requested parent.
        parent: ZoneId,
    },

    /// The zone is not registered.
    #[error("unknown zone {0}")]
    UnknownZone(ZoneId),

    /// The item is not registered.
    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    /// The item already belongs to another zone.
    #[error("item {item} is already registered in zone {zone}")]
    DuplicateItem {
        /// Item id.
        item: ItemId,
        /// Zone that owns it.
        zone: ZoneId,
    },
}

/// Failure while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[cfg(feature = "toml-config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A binding's key chord could not be parsed.
    #[error("binding for {command}: invalid key {key:?}: {source}")]
    InvalidChord {
        /// Raw key text.
        key: String,
        /// Target command.
        command: String,
        /// Parser error.
        #[source]
        source: KeyParseError,
    },

    /// A binding's condition has an empty operand.
    #[error("binding for {command}: malformed condition {when:?}")]
    InvalidCondition {
        /// Raw condition text.
        when: String,
        /// Target command.
        command: String,
    },
}
