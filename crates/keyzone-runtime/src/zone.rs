#![forbid(unsafe_code)]

//! Zone declarations.
//!
//! A zone is a jurisdiction owning one focus cursor and one selection set.
//! Everything here is plain data: zones can be declared in code with the
//! builders or loaded from JSON/TOML, since every section is
//! `#[serde(default)]`.

use keyzone_core::{ItemId, ZoneId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Configuration sections
// ---------------------------------------------------------------------------

/// Which navigation strategy a zone uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Up/Down step through the item list.
    #[default]
    Vertical,
    /// Left/Right step through the item list.
    Horizontal,
    /// Free 2D layout scored by beam overlap and distance.
    Spatial,
    /// Irregular grid resolved through a virtual cell grid.
    Corner,
}

/// Which item receives focus when a zone is entered without a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStrategy {
    /// First item.
    #[default]
    First,
    /// Last item.
    Last,
    /// The zone's previous cursor, else the first item.
    Restore,
    /// The first selected item, else the previous cursor, else the first item.
    Selected,
}

/// Arrow-key behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigateConfig {
    /// Strategy selector.
    pub orientation: Orientation,
    /// Wrap at the ends of a linear list.
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Entry strategy.
    pub entry: EntryStrategy,
    /// Hand focus to the adjacent sibling zone at a boundary.
    pub seamless: bool,
}

/// What Tab does inside a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabBehavior {
    /// Cycle within the zone.
    Trap,
    /// Leave the zone immediately for the next zone.
    #[default]
    Escape,
    /// Walk the items, then continue into the next zone.
    Flow,
}

/// Tab configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TabConfig {
    /// Behavior.
    pub behavior: TabBehavior,
}

/// Selection cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Selection is disabled.
    #[default]
    None,
    /// At most one selected item.
    Single,
    /// Any number of selected items.
    Multiple,
}

/// Selection configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectConfig {
    /// Cardinality.
    pub mode: SelectionMode,
    /// Selection replaces itself with the focused item on every move.
    pub follow_focus: bool,
    /// Operations that would empty a non-empty selection are refused.
    pub disallow_empty: bool,
}

/// Activation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivateConfig {
    /// A click also activates.
    pub on_click: bool,
    /// Moving focus onto an item activates it.
    pub on_focus: bool,
}

/// What Escape does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeBehavior {
    /// Nothing; the key passes through.
    #[default]
    None,
    /// Clear the selection.
    Deselect,
    /// Return jurisdiction to the parent zone.
    Close,
}

/// Dismiss configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DismissConfig {
    /// Escape behavior.
    pub escape: EscapeBehavior,
}

/// Full zone configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Arrow keys.
    pub navigate: NavigateConfig,
    /// Tab key.
    pub tab: TabConfig,
    /// Selection.
    pub select: SelectConfig,
    /// Activation.
    pub activate: ActivateConfig,
    /// Escape.
    pub dismiss: DismissConfig,
}

impl ZoneConfig {
    /// A vertical list.
    #[must_use]
    pub fn list() -> Self {
        Self::default()
    }

    /// A horizontal toolbar.
    #[must_use]
    pub fn toolbar() -> Self {
        Self::default().orientation(Orientation::Horizontal)
    }

    /// A free 2D layout.
    #[must_use]
    pub fn spatial() -> Self {
        Self::default().orientation(Orientation::Spatial)
    }

    /// An irregular tiled grid.
    #[must_use]
    pub fn corner() -> Self {
        Self::default().orientation(Orientation::Corner)
    }

    /// Set the navigation strategy.
    #[must_use]
    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.navigate.orientation = orientation;
        self
    }

    /// Wrap at list ends.
    #[must_use]
    pub fn looping(mut self, looping: bool) -> Self {
        self.navigate.looping = looping;
        self
    }

    /// Set the entry strategy.
    #[must_use]
    pub fn entry(mut self, entry: EntryStrategy) -> Self {
        self.navigate.entry = entry;
        self
    }

    /// Hand off to sibling zones at boundaries.
    #[must_use]
    pub fn seamless(mut self, seamless: bool) -> Self {
        self.navigate.seamless = seamless;
        self
    }

    /// Set the Tab behavior.
    #[must_use]
    pub fn tab(mut self, behavior: TabBehavior) -> Self {
        self.tab.behavior = behavior;
        self
    }

    /// Set the selection mode.
    #[must_use]
    pub fn select(mut self, mode: SelectionMode) -> Self {
        self.select.mode = mode;
        self
    }

    /// Selection follows focus.
    #[must_use]
    pub fn follow_focus(mut self, on: bool) -> Self {
        self.select.follow_focus = on;
        self
    }

    /// Refuse to empty the selection.
    #[must_use]
    pub fn disallow_empty(mut self, on: bool) -> Self {
        self.select.disallow_empty = on;
        self
    }

    /// Activate on click.
    #[must_use]
    pub fn activate_on_click(mut self, on: bool) -> Self {
        self.activate.on_click = on;
        self
    }

    /// Activate on focus.
    #[must_use]
    pub fn activate_on_focus(mut self, on: bool) -> Self {
        self.activate.on_focus = on;
        self
    }

    /// Set the Escape behavior.
    #[must_use]
    pub fn escape(mut self, escape: EscapeBehavior) -> Self {
        self.dismiss.escape = escape;
        self
    }
}

// ---------------------------------------------------------------------------
// Bound commands
// ---------------------------------------------------------------------------

/// An application command bound to a zone role.
///
/// When invoked, `payload` is merged with `{ id, ids, zone }`: the target
/// item, the selection in item order, and the zone id. Keys already present
/// in `payload` are overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandCall {
    /// Command id.
    pub command: String,
    /// Static payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl CommandCall {
    /// A call with no static payload.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: Value::Null,
        }
    }

    /// A call with a static payload.
    pub fn with_payload(command: impl Into<String>, payload: Value) -> Self {
        Self {
            command: command.into(),
            payload,
        }
    }

    /// The payload sent to the command for a target item.
    #[must_use]
    pub fn payload_for(&self, zone: &ZoneId, id: Option<&ItemId>, ids: &[ItemId]) -> Value {
        let mut map = match &self.payload {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        map.insert(
            "id".to_string(),
            id.map_or(Value::Null, |id| Value::from(id.as_str())),
        );
        map.insert(
            "ids".to_string(),
            Value::Array(ids.iter().map(|id| Value::from(id.as_str())).collect()),
        );
        map.insert("zone".to_string(), Value::from(zone.as_str()));
        Value::Object(map)
    }
}

/// Application commands a zone delegates its roles to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundCommands {
    /// Enter / activation click.
    pub activate: Option<CommandCall>,
    /// Invoked after the selection changes.
    pub select: Option<CommandCall>,
    /// Space; replaces toggle-selection when present.
    pub toggle: Option<CommandCall>,
    /// Copy.
    pub copy: Option<CommandCall>,
    /// Cut.
    pub cut: Option<CommandCall>,
    /// Paste.
    pub paste: Option<CommandCall>,
    /// Delete / Backspace.
    pub delete: Option<CommandCall>,
    /// Zone-local undo; replaces engine history when present.
    pub undo: Option<CommandCall>,
    /// Zone-local redo; replaces engine history when present.
    pub redo: Option<CommandCall>,
}

// ---------------------------------------------------------------------------
// Zone and item specs
// ---------------------------------------------------------------------------

/// A zone registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    /// Zone id.
    pub id: ZoneId,
    /// Parent zone, `None` for a root.
    #[serde(default)]
    pub parent: Option<ZoneId>,
    /// Configuration.
    #[serde(default)]
    pub config: ZoneConfig,
    /// Delegated commands.
    #[serde(default)]
    pub bound: BoundCommands,
    /// Rendered position among siblings; ties fall back to registration order.
    #[serde(default)]
    pub order: i64,
}

impl ZoneSpec {
    /// A root zone with default configuration.
    pub fn new(id: impl Into<ZoneId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            config: ZoneConfig::default(),
            bound: BoundCommands::default(),
            order: 0,
        }
    }

    /// Set the parent zone.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<ZoneId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: ZoneConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bound commands.
    #[must_use]
    pub fn bound(mut self, bound: BoundCommands) -> Self {
        self.bound = bound;
        self
    }

    /// Set the rendered position among siblings.
    #[must_use]
    pub fn order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }
}

/// An item registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Item id.
    pub id: ItemId,
    /// The item owns a collapsible subtree.
    #[serde(default)]
    pub expandable: bool,
}

impl ItemSpec {
    /// A plain item.
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            expandable: false,
        }
    }

    /// An expandable tree node.
    pub fn expandable(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            expandable: true,
        }
    }
}

impl From<&str> for ItemSpec {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<ItemId> for ItemSpec {
    fn from(id: ItemId) -> Self {
        Self::new(id)
    }
}
