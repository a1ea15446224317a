//! Notification data structure.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::text::{strip_markup, truncate_graphemes};

/// A popup notification as returned by the LMS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Unique identifier (assumed to grow with creation time)
    pub id: i64,

    #[serde(default)]
    pub subject: Option<String>,

    /// Sender display name
    #[serde(rename = "userfromfullname", default)]
    pub sender: Option<String>,

    /// Short message body, possibly HTML
    #[serde(rename = "smallmessage", default)]
    pub small_message: Option<String>,

    /// Unix timestamp of creation
    #[serde(rename = "timecreated", default)]
    pub time_created: Option<i64>,

    #[serde(default)]
    pub read: bool,
}

impl Notification {
    /// Build a notification from a raw mapping.
    ///
    /// Returns `None` when the item carries no integer `id`; such items
    /// cannot be tracked between runs.
    pub fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let id = map.get("id")?.as_i64()?;
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            id,
            subject: text("subject"),
            sender: text("userfromfullname"),
            small_message: text("smallmessage"),
            time_created: map.get("timecreated").and_then(Value::as_i64),
            read: map.get("read").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("No Subject")
    }

    pub fn sender(&self) -> &str {
        self.sender.as_deref().unwrap_or("System")
    }

    /// Plain-text preview of the message, cut to `max_len` graphemes.
    pub fn preview(&self, max_len: usize) -> String {
        let text = strip_markup(self.small_message.as_deref().unwrap_or_default());
        truncate_graphemes(&text, max_len)
    }

    pub fn created_at(&self) -> Option<DateTime<Local>> {
        self.time_created
            .and_then(|ts| Local.timestamp_opt(ts, 0).single())
    }
}

/// Extract the notification list from a stored payload.
///
/// The raw API response wraps the list as `{"notifications": [...]}`;
/// a bare list is returned as-is. Any other shape yields an empty list.
pub fn notification_list(payload: Value) -> Value {
    match payload {
        Value::Array(_) => payload,
        Value::Object(mut map) => match map.remove("notifications") {
            Some(list @ Value::Array(_)) => list,
            _ => Value::Array(Vec::new()),
        },
        _ => Value::Array(Vec::new()),
    }
}
