//! Payload types for push notifications
//!
//! Optional fields are omitted from the wire when unset. `None` on a
//! [`PluginStatus`] field means "leave unchanged"; an empty list clears.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry in the visible result list or the search index
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stable id, echoed back as `item_id` on `action`
    pub id: String,
    /// Primary text
    pub name: String,
    /// Secondary text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon name or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Label for the default action ("Open", "Copy", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    /// Small status markers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<Badge>,
    /// Text tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chips: Vec<Chip>,
    /// Secondary actions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ResultAction>,
}

impl SearchResult {
    /// Create a result with id and name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the icon
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the default action label
    #[must_use]
    pub fn verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(verb.into());
        self
    }

    /// Add a badge
    #[must_use]
    pub fn badge(mut self, badge: Badge) -> Self {
        self.badges.push(badge);
        self
    }

    /// Add a chip
    #[must_use]
    pub fn chip(mut self, chip: Chip) -> Self {
        self.chips.push(chip);
        self
    }

    /// Add a secondary action
    #[must_use]
    pub fn action(mut self, action: ResultAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Secondary action offered on a result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAction {
    /// Sent back as `action` on `action`
    pub id: String,
    /// Label
    pub name: String,
    /// Icon name or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ResultAction {
    /// Create an action without an icon
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: None,
        }
    }
}

/// Compact marker: short text and/or icon
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Icon name or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// CSS-style colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Badge {
    /// Text badge
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Icon badge
    pub fn icon(icon: impl Into<String>) -> Self {
        Self {
            icon: Some(icon.into()),
            ..Default::default()
        }
    }

    /// Set the colour
    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Text tag with optional icon
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chip {
    /// Display text
    pub text: String,
    /// Icon name or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Chip {
    /// Chip without an icon
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon: None,
        }
    }
}

/// Persistent item shown in the launcher's ambient bar
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AmbientItem {
    /// Sent back as `item_id` with `source = "ambient"` on activation
    pub id: String,
    /// Display name
    pub name: String,
    /// Secondary text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon name or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Badges to show
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<Badge>,
}

/// Plugin-level status shown next to the plugin's entry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginStatus {
    /// Badges to show
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<Badge>>,
    /// Chips to show
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chips: Option<Vec<Chip>>,
    /// Replaces the manifest description while set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ambient bar items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient: Option<Vec<AmbientItem>>,
}

impl PluginStatus {
    /// Status that changes nothing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the badges
    #[must_use]
    pub fn badges(mut self, badges: Vec<Badge>) -> Self {
        self.badges = Some(badges);
        self
    }

    /// Replace the chips
    #[must_use]
    pub fn chips(mut self, chips: Vec<Chip>) -> Self {
        self.chips = Some(chips);
        self
    }

    /// Replace the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the ambient items
    #[must_use]
    pub fn ambient(mut self, items: Vec<AmbientItem>) -> Self {
        self.ambient = Some(items);
        self
    }
}

/// Additions and removals for the host's search index
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexUpdate {
    /// Entries to add or replace, keyed by `id`
    pub items: Vec<SearchResult>,
    /// Ids to drop
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

/// Privileged action the host performs on the plugin's behalf
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecuteAction {
    /// Start an application from its desktop entry
    Launch {
        /// Desktop entry id or path
        desktop_file: String,
    },
    /// Put text on the clipboard
    Copy {
        /// Display text
        text: String,
    },
    /// Open a URL in the default browser
    OpenUrl {
        /// Target URL
        url: String,
    },
    /// Open a file or directory with its default handler
    Open {
        /// Filesystem path
        path: String,
    },
    /// Show a desktop notification
    Notify {
        /// Notification body
        message: String,
    },
    /// Close the launcher window
    Close,
}

/// In-place change to one visible result
///
/// Only the listed fields change; everything else on the result is kept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultPatch {
    /// Id of the result to patch
    pub id: String,
    /// Fields to overwrite
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResultPatch {
    /// Patch with no fields yet
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Overwrite `key` with `value`
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}
