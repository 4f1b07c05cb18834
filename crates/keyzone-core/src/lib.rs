#![forbid(unsafe_code)]

//! Core: ids, geometry, key events, and the `when`-clause language.
//!
//! # Role in keyzone
//! `keyzone-core` is the input layer. It owns the canonical event types the
//! engine consumes, the normalization of raw key presses into comparable
//! [`KeyChord`](keychord::KeyChord)s, and the small boolean language used to
//! gate commands and keybindings on application context.
//!
//! # Primary responsibilities
//! - **Ids**: cheap-clone [`ZoneId`] and [`ItemId`] handles.
//! - **Geometry**: integer [`Rect`](geometry::Rect)s with beam projections for
//!   spatial navigation.
//! - **Events**: key and pointer events tagged with their origin.
//! - **Conditions**: [`Expr`](expr::Expr) AST, parser, evaluator and cache.
//!
//! # How it fits in the system
//! The runtime (`keyzone-runtime`) consumes these types to resolve bindings,
//! navigate zones and commit focus. Nothing here holds engine state.

pub mod context;
pub mod event;
pub mod expr;
pub mod geometry;
pub mod id;
pub mod keychord;
pub mod logging;

pub use context::{Context, Value};
pub use event::{
    EventTarget, InputEvent, KeyCode, KeyEvent, KeyEventKind, Modifiers, PointerEvent,
    PointerKind,
};
pub use expr::{Expr, ExprCache, Literal};
pub use geometry::{Axis, Rect, Span};
pub use id::{ItemId, ZoneId};
pub use keychord::{KeyChord, KeyParseError};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, warn};
