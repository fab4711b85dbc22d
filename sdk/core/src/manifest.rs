//! Plugin identity sent once at registration

use serde::{Deserialize, Serialize};

/// Static plugin identity
///
/// Immutable once the runtime starts; the host keys all state for this
/// connection on `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Stable identifier, unique across installed plugins
    pub id: String,
    /// Display name
    pub name: String,
    /// One-line description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon name or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Query prefix that routes input straight to this plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Ordering hint; higher sorts first
    #[serde(default)]
    pub priority: i32,
}

impl Manifest {
    /// Create a manifest with the required fields
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            icon: None,
            prefix: None,
            priority: 0,
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

    /// Set the query prefix
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the priority
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Role a client claims when it registers with the host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRole {
    /// A plugin worker process
    Plugin {
        /// Plugin id (same as `manifest.id`)
        id: String,
        /// Full identity
        manifest: Manifest,
    },
}

/// Params of the `register` request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParams {
    /// Claimed role
    pub role: ClientRole,
}

impl RegisterParams {
    /// Registration params for a plugin
    #[must_use]
    pub fn plugin(manifest: &Manifest) -> Self {
        Self {
            role: ClientRole::Plugin {
                id: manifest.id.clone(),
                manifest: manifest.clone(),
            },
        }
    }
}
