#![forbid(unsafe_code)]

//! Canonical input/event types.
//!
//! This module defines the events the engine pipeline consumes. A host (a
//! browser bridge, a GUI toolkit, a terminal runtime) translates its native
//! events into these before handing them to the engine.
//!
//! # Design Notes
//!
//! - `KeyEventKind` defaults to `Press` when not available from the host.
//! - `Modifiers` use bitflags for easy combination.
//! - Every event carries an [`EventTarget`] describing where it originated, so
//!   the pipeline can tell editable fields apart from plain items.
//! - `handled` mirrors the platform "default prevented" flag: an earlier
//!   listener (for instance a text field) already consumed the event.

use bitflags::bitflags;

use crate::id::ItemId;

/// Canonical input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A keyboard event.
    Key(KeyEvent),

    /// A pointer (mouse, pen, touch) event on an item.
    Pointer(PointerEvent),
}

impl InputEvent {
    /// Short label for logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Key(_) => "key",
            Self::Pointer(_) => "pointer",
        }
    }

    /// Whether an earlier listener already consumed the event.
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        match self {
            Self::Key(k) => k.handled,
            Self::Pointer(p) => p.handled,
        }
    }
}

/// Where an event originated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTarget {
    /// The registered item the event was delivered to, if any.
    pub item: Option<ItemId>,

    /// True if the target accepts text input (input, textarea,
    /// contenteditable and the like).
    pub editable: bool,
}

impl EventTarget {
    /// Target a registered item.
    #[must_use]
    pub fn item(id: impl Into<ItemId>) -> Self {
        Self {
            item: Some(id.into()),
            editable: false,
        }
    }

    /// Target an editable field.
    #[must_use]
    pub fn editable() -> Self {
        Self {
            item: None,
            editable: true,
        }
    }
}

/// A keyboard event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// The type of key event (press, repeat, or release).
    pub kind: KeyEventKind,

    /// An input method composition is in progress.
    pub composing: bool,

    /// An earlier listener already handled this event.
    pub handled: bool,

    /// Origin of the event.
    pub target: EventTarget,
}

impl KeyEvent {
    /// Create a new key event with default modifiers and Press kind.
    #[must_use]
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
            composing: false,
            handled: false,
            target: EventTarget::default(),
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the event origin.
    #[must_use]
    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.target = target;
        self
    }

    /// Mark the event as originating from an editable field.
    #[must_use]
    pub fn in_input(mut self) -> Self {
        self.target.editable = true;
        self
    }

    /// Mark an input method composition as in progress.
    #[must_use]
    pub fn composing(mut self) -> Self {
        self.composing = true;
        self
    }

    /// Mark the event as already handled.
    #[must_use]
    pub fn handled(mut self) -> Self {
        self.handled = true;
        self
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// Check if Ctrl modifier is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Check if Alt modifier is held.
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Check if Shift modifier is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Check if Super/Meta/Cmd modifier is held.
    #[must_use]
    pub const fn super_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SUPER)
    }
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    /// A regular character key. Space is `Char(' ')`.
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Escape key.
    Escape,

    /// Backspace key.
    Backspace,

    /// Tab key.
    Tab,

    /// Shift+Tab (back-tab), reported by some hosts as its own key.
    BackTab,

    /// Delete key.
    Delete,

    /// Insert key.
    Insert,

    /// Home key.
    Home,

    /// End key.
    End,

    /// Page Up key.
    PageUp,

    /// Page Down key.
    PageDown,

    /// Up arrow key.
    Up,

    /// Down arrow key.
    Down,

    /// Left arrow key.
    Left,

    /// Right arrow key.
    Right,

    /// Function key (F1-F24).
    F(u8),
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,

    /// Key is being held (repeat event).
    Repeat,

    /// Key was released.
    Release,
}

bitflags! {
    /// Modifier keys that can be held during an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

impl Modifiers {
    /// The platform's primary shortcut modifier: Command on macOS, Control
    /// everywhere else. Bindings spell it `Mod`.
    #[must_use]
    pub const fn primary() -> Self {
        if cfg!(target_os = "macos") {
            Self::SUPER
        } else {
            Self::CTRL
        }
    }
}

/// The kind of pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerKind {
    /// Button pressed on the item. Moves focus only.
    Down,

    /// Full click (press + release on the same item).
    #[default]
    Click,

    /// Double click.
    DoubleClick,
}

/// A pointer event delivered to a registered item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerEvent {
    /// The type of pointer event.
    pub kind: PointerKind,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// An earlier listener already handled this event.
    pub handled: bool,

    /// Origin of the event. `target.item` names the clicked item.
    pub target: EventTarget,
}

impl PointerEvent {
    /// A click on an item.
    #[must_use]
    pub fn click(item: impl Into<ItemId>) -> Self {
        Self {
            kind: PointerKind::Click,
            modifiers: Modifiers::NONE,
            handled: false,
            target: EventTarget::item(item),
        }
    }

    /// Create a pointer event with a specific kind.
    #[must_use]
    pub fn with_kind(mut self, kind: PointerKind) -> Self {
        self.kind = kind;
        self
    }

    /// Create a pointer event with modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark the event as already handled.
    #[must_use]
    pub fn handled(mut self) -> Self {
        self.handled = true;
        self
    }
}
