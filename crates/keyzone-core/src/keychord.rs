#![forbid(unsafe_code)]

//! Canonical key chords.
//!
//! A [`KeyChord`] is a key plus the modifiers held with it. Raw events are
//! normalized into chords and binding strings are parsed into chords, so
//! matching a key press against the keymap is plain equality.
//!
//! # Canonical form
//!
//! The `Display` form lists modifiers in alphabetical order followed by the
//! key name: `Alt+Ctrl+Meta+Shift+Key`. Letters are upper-cased, the space bar
//! is `Space`, arrows are `ArrowUp`/`ArrowDown`/`ArrowLeft`/`ArrowRight`.
//!
//! ```
//! use keyzone_core::keychord::KeyChord;
//!
//! let chord: KeyChord = "shift+ctrl+z".parse().unwrap();
//! assert_eq!(chord.to_string(), "Ctrl+Shift+Z");
//! ```
//!
//! # Normalization
//!
//! - `BackTab` becomes `Shift+Tab`.
//! - Letters are upper-cased; Shift stays as reported.
//! - For printable non-letter symbols (`?`, `!`, `+`) Shift is dropped, since
//!   it is already expressed by the symbol itself.
//! - `Mod` in a binding string means the platform primary modifier
//!   (see [`Modifiers::primary`]).

use std::fmt;
use std::str::FromStr;

use crate::event::{KeyCode, KeyEvent, Modifiers};

/// Errors produced while parsing a key chord string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    /// The string was empty or only whitespace.
    #[error("empty key chord")]
    Empty,
    /// Modifiers were given without a key.
    #[error("key chord {0:?} has no key")]
    MissingKey(String),
    /// The key segment is not a known key name.
    #[error("unknown key name {0:?}")]
    UnknownKey(String),
    /// A modifier segment is not a known modifier.
    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),
}

/// A normalized key plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyChord {
    /// Held modifiers.
    pub modifiers: Modifiers,
    /// The key.
    pub key: KeyCode,
}

impl KeyChord {
    /// Build a chord, normalizing the key/modifier combination.
    #[must_use]
    pub fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        let (key, modifiers) = match key {
            KeyCode::BackTab => (KeyCode::Tab, modifiers | Modifiers::SHIFT),
            KeyCode::Char(c) if c.is_alphabetic() => {
                let upper = c.to_uppercase().next().unwrap_or(c);
                (KeyCode::Char(upper), modifiers)
            }
            KeyCode::Char(c) if c != ' ' && !c.is_control() => {
                (KeyCode::Char(c), modifiers - Modifiers::SHIFT)
            }
            other => (other, modifiers),
        };
        Self { modifiers, key }
    }

    /// A chord without modifiers.
    #[must_use]
    pub fn plain(key: KeyCode) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Normalize a raw key event.
    #[must_use]
    pub fn from_event(event: &KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }

    /// Parse a binding string such as `"Mod+Shift+Z"` or `"ArrowDown"`.
    pub fn parse(s: &str) -> Result<Self, KeyParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let (mods_part, key_part) = if s == "+" {
            ("", "+")
        } else if let Some(rest) = s.strip_suffix("++") {
            (rest, "+")
        } else {
            match s.rsplit_once('+') {
                Some((mods, key)) => (mods, key.trim()),
                None => ("", s),
            }
        };

        if key_part.is_empty() {
            return Err(KeyParseError::MissingKey(s.to_string()));
        }

        let mut modifiers = Modifiers::NONE;
        for segment in mods_part.split('+').map(str::trim).filter(|m| !m.is_empty()) {
            modifiers |= parse_modifier(segment)
                .ok_or_else(|| KeyParseError::UnknownModifier(segment.to_string()))?;
        }

        let key =
            parse_key_name(key_part).ok_or_else(|| KeyParseError::UnknownKey(key_part.to_string()))?;
        Ok(Self::new(key, modifiers))
    }

    /// Whether the event normalizes to this chord.
    #[must_use]
    pub fn matches(&self, event: &KeyEvent) -> bool {
        *self == Self::from_event(event)
    }
}

impl FromStr for KeyChord {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyChord {
    type Error = KeyParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<KeyChord> for String {
    fn from(chord: KeyChord) -> Self {
        chord.to_string()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for KeyChord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for KeyChord {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Alphabetical: Alt, Ctrl, Meta, Shift.
        if self.modifiers.contains(Modifiers::ALT) {
            f.write_str("Alt+")?;
        }
        if self.modifiers.contains(Modifiers::CTRL) {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.contains(Modifiers::SUPER) {
            f.write_str("Meta+")?;
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            f.write_str("Shift+")?;
        }
        write_key_name(f, self.key)
    }
}

fn write_key_name(f: &mut fmt::Formatter<'_>, key: KeyCode) -> fmt::Result {
    match key {
        KeyCode::Char(' ') => f.write_str("Space"),
        KeyCode::Char(c) => write!(f, "{c}"),
        KeyCode::Enter => f.write_str("Enter"),
        KeyCode::Escape => f.write_str("Escape"),
        KeyCode::Backspace => f.write_str("Backspace"),
        KeyCode::Tab | KeyCode::BackTab => f.write_str("Tab"),
        KeyCode::Delete => f.write_str("Delete"),
        KeyCode::Insert => f.write_str("Insert"),
        KeyCode::Home => f.write_str("Home"),
        KeyCode::End => f.write_str("End"),
        KeyCode::PageUp => f.write_str("PageUp"),
        KeyCode::PageDown => f.write_str("PageDown"),
        KeyCode::Up => f.write_str("ArrowUp"),
        KeyCode::Down => f.write_str("ArrowDown"),
        KeyCode::Left => f.write_str("ArrowLeft"),
        KeyCode::Right => f.write_str("ArrowRight"),
        KeyCode::F(n) => write!(f, "F{n}"),
    }
}

fn parse_modifier(s: &str) -> Option<Modifiers> {
    match s.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some(Modifiers::CTRL),
        "alt" | "option" | "opt" => Some(Modifiers::ALT),
        "shift" => Some(Modifiers::SHIFT),
        "meta" | "cmd" | "command" | "super" | "win" => Some(Modifiers::SUPER),
        "mod" | "primary" => Some(Modifiers::primary()),
        _ => None,
    }
}

fn parse_key_name(s: &str) -> Option<KeyCode> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }

    let lower = s.to_ascii_lowercase();
    let code = match lower.as_str() {
        "arrowup" | "up" => KeyCode::Up,
        "arrowdown" | "down" => KeyCode::Down,
        "arrowleft" | "left" => KeyCode::Left,
        "arrowright" | "right" => KeyCode::Right,
        "enter" | "return" => KeyCode::Enter,
        "escape" | "esc" => KeyCode::Escape,
        "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "space" | "spacebar" => KeyCode::Char(' '),
        "plus" => KeyCode::Char('+'),
        _ => {
            let n = lower.strip_prefix('f')?.parse::<u8>().ok()?;
            if (1..=24).contains(&n) {
                KeyCode::F(n)
            } else {
                return None;
            }
        }
    };
    Some(code)
}
