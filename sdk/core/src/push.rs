//! Push API
//!
//! Unsolicited notifications from plugin to host. Safe to call from
//! handlers, background tasks and anywhere else holding a
//! [`PluginContext`]; each call writes exactly one frame.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::context::PluginContext;
use crate::error::Result;
use crate::protocol::methods::{
    PLUGIN_EXECUTE, PLUGIN_INDEX, PLUGIN_RESULTS, PLUGIN_STATUS, PLUGIN_UPDATE,
};
use crate::types::{ExecuteAction, IndexUpdate, PluginStatus, ResultPatch, SearchResult};

/// Params of `plugin_results`
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResultsUpdate {
    results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_mode: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    clear_input: bool,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ResultsUpdate {
    /// Replace the visible list with `results`
    #[must_use]
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    /// Set the search field placeholder
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Switch how the host treats typed input (e.g. `"realtime"`, `"submit"`)
    #[must_use]
    pub fn input_mode(mut self, mode: impl Into<String>) -> Self {
        self.input_mode = Some(mode.into());
        self
    }

    /// Clear the search field
    #[must_use]
    pub fn clear_input(mut self) -> Self {
        self.clear_input = true;
        self
    }

    /// Attach a key the host understands but this type does not model
    ///
    /// Keys named like the modelled fields are ignored.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !matches!(
            key.as_str(),
            "results" | "placeholder" | "input_mode" | "clear_input"
        ) {
            self.extra.insert(key, value.into());
        }
        self
    }
}

impl From<Vec<SearchResult>> for ResultsUpdate {
    fn from(results: Vec<SearchResult>) -> Self {
        Self::new(results)
    }
}

impl PluginContext {
    /// Replace the visible result list (`plugin_results`)
    pub async fn push_results(&self, update: impl Into<ResultsUpdate>) -> Result<()> {
        self.notify(PLUGIN_RESULTS, update.into()).await
    }

    /// Update plugin-level badges, chips and ambient items (`plugin_status`)
    pub async fn push_status(&self, status: &PluginStatus) -> Result<()> {
        self.notify(PLUGIN_STATUS, json!({ "status": status })).await
    }

    /// Add or remove search index entries (`plugin_index`)
    pub async fn push_index(&self, update: &IndexUpdate) -> Result<()> {
        self.notify(PLUGIN_INDEX, update).await
    }

    /// Ask the host to perform an action (`plugin_execute`)
    pub async fn execute(&self, action: &ExecuteAction) -> Result<()> {
        self.notify(PLUGIN_EXECUTE, json!({ "action": action })).await
    }

    /// Patch visible results in place (`plugin_update`)
    pub async fn push_update(&self, patches: &[ResultPatch]) -> Result<()> {
        self.notify(PLUGIN_UPDATE, json!({ "patches": patches })).await
    }
}
