//! Typed params for the inbound methods
//!
//! Every struct is `#[serde(default)]` and ignores unknown keys, so the host
//! can add trailing parameters without breaking older plugins, and a plugin
//! may declare only the prefix it cares about.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Params of `initial`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialRequest {
    /// Opaque host context for this session
    pub context: Option<Value>,
}

/// Params of `search`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Current query text, without the plugin prefix
    pub query: String,
    /// Opaque host context for this session
    pub context: Option<Value>,
}

/// Params of `action`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionRequest {
    /// Id of the activated item
    #[serde(alias = "itemId")]
    pub item_id: String,
    /// Secondary action id; `None` for the default action
    pub action: Option<String>,
    /// Opaque host context for this session
    pub context: Option<Value>,
    /// Where the activation came from (results list, ambient bar, ...)
    pub source: Option<String>,
}

/// Params of `form_submitted`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSubmitted {
    /// Field id to submitted value
    #[serde(alias = "formData")]
    pub form_data: Map<String, Value>,
    /// Opaque host context for this session
    pub context: Option<Value>,
}

/// Params of `slider_changed`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderChanged {
    /// Id of the slider item
    pub id: String,
    /// New slider position
    pub value: f64,
}

/// Params of `switch_toggled`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchToggled {
    /// Id of the switch item
    pub id: String,
    /// New switch state
    pub value: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_action_accepts_both_key_spellings() {
        let snake: ActionRequest =
            serde_json::from_value(json!({"item_id": "a", "action": "copy"})).unwrap();
        let camel: ActionRequest =
            serde_json::from_value(json!({"itemId": "a", "action": "copy"})).unwrap();
        assert_eq!(snake, camel);
        assert_eq!(snake.item_id, "a");
    }

    #[test]
    fn test_missing_trailing_params_take_defaults() {
        let req: SearchRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req, SearchRequest::default());

        let req: ActionRequest = serde_json::from_value(json!({"itemId": "x"})).unwrap();
        assert_eq!(req.action, None);
        assert_eq!(req.source, None);
    }

    #[test]
    fn test_unknown_params_are_ignored() {
        let req: SwitchToggled = serde_json::from_value(json!({
            "id": "wifi",
            "value": true,
            "added_in_a_later_host": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(
            req,
            SwitchToggled {
                id: "wifi".into(),
                value: true
            }
        );
    }

    #[test]
    fn test_form_data_alias() {
        let req: FormSubmitted =
            serde_json::from_value(json!({"formData": {"name": "kim"}})).unwrap();
        assert_eq!(req.form_data.get("name"), Some(&json!("kim")));
    }
}
