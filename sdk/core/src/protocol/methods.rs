//! Method names and error codes shared with the host

/// Registration request sent once after connecting
pub const REGISTER: &str = "register";

// Inbound methods dispatched to plugin handlers

/// Plugin opened with an empty query
pub const INITIAL: &str = "initial";
/// Query text changed
pub const SEARCH: &str = "search";
/// User activated an item or one of its actions
pub const ACTION: &str = "action";
/// User submitted a form shown by the plugin
pub const FORM_SUBMITTED: &str = "form_submitted";
/// User moved a slider item
pub const SLIDER_CHANGED: &str = "slider_changed";
/// User flipped a switch item
pub const SWITCH_TOGGLED: &str = "switch_toggled";

// Outbound push notifications

/// Replace the visible result list
pub const PLUGIN_RESULTS: &str = "plugin_results";
/// Update badges, chips and ambient items
pub const PLUGIN_STATUS: &str = "plugin_status";
/// Add or remove searchable index entries
pub const PLUGIN_INDEX: &str = "plugin_index";
/// Ask the host to perform a privileged action
pub const PLUGIN_EXECUTE: &str = "plugin_execute";
/// Patch individual visible results in place
pub const PLUGIN_UPDATE: &str = "plugin_update";

// Error codes (JSON-RPC 2.0 numbering)

/// Invalid JSON was received
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid envelope
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters
pub const INVALID_PARAMS: i64 = -32602;
/// Fault inside a handler
pub const INTERNAL_ERROR: i64 = -32603;
