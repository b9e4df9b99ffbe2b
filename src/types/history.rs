use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::types::message::CanonicalMessage;

const DEFAULT_TITLE: &str = "New notification";
const DEFAULT_KIND: &str = "general";

/// One received notification as persisted in the local history list. The
/// JSON field names match what earlier app releases wrote, so decoding old
/// stores keeps working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: HashMap<String, Value>,
    pub timestamp: i64,
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}

impl NotificationRecord {
    pub fn from_message(message: &CanonicalMessage, id: String, timestamp: i64) -> Self {
        let (title, body) = match &message.notification {
            Some(content) => (
                content
                    .title
                    .clone()
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                content.body.clone().unwrap_or_default(),
            ),
            None => (DEFAULT_TITLE.to_string(), String::new()),
        };
        let kind = message
            .data_str("type")
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(default_kind);

        Self {
            id,
            title,
            body,
            data: message.data.clone(),
            timestamp,
            read: false,
            kind,
        }
    }
}
