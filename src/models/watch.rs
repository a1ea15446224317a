//! Watch list entries.

use serde::{Deserialize, Serialize};

/// A course the monitor may follow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchEntry {
    /// Course identifier
    pub id: i64,

    #[serde(default)]
    pub name: Option<String>,

    /// Only active entries are monitored
    #[serde(default)]
    pub active: bool,
}

impl WatchEntry {
    pub fn new(id: i64, name: impl Into<String>, active: bool) -> Self {
        Self {
            id,
            name: Some(name.into()),
            active,
        }
    }

    /// Display name, falling back to `Course <id>`.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Course {}", self.id))
    }
}

/// Active entries, in watch-list order.
pub fn active_entries(watchlist: &[WatchEntry]) -> Vec<&WatchEntry> {
    watchlist.iter().filter(|entry| entry.active).collect()
}
