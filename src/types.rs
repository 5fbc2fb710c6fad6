use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// App installed on a TV
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct App {
    /// App identifier (`appId` in the installed list, `id` in the eden list)
    #[serde(rename = "appId", alias = "id")]
    pub app_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub app_type: Option<i64>,

    /// Icon path, lock flag and other fields the TV reports
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl App {
    pub fn new(app_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            name: name.into(),
            app_type: None,
            extra: BTreeMap::new(),
        }
    }
}
