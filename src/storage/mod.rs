//! Storage abstractions for snapshot persistence.
//!
//! Every monitored entity keeps two snapshots side by side: the current one
//! and the `_OLD` copy archived right before a fresh fetch overwrites it.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml
//! ├── watchlist.json
//! ├── log.json                          # Bounded run history
//! └── resources/
//!     ├── notifications.json
//!     ├── notifications_OLD.json
//!     ├── course_48736_full_data.json   # Raw fetch
//!     ├── course_48736_clean.json
//!     └── course_48736_clean_OLD.json
//! ```

pub mod history;
pub mod local;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// Re-export for convenience
pub use history::LogHistory;
pub use local::{LocalStorage, load_json_file};

/// A monitored unit with its own pair of snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    Notifications,
    Course(i64),
}

impl Entity {
    fn stem(&self) -> String {
        match self {
            Entity::Notifications => "notifications".to_string(),
            Entity::Course(id) => format!("course_{}_clean", id),
        }
    }

    /// Storage key of a snapshot slot.
    pub fn key(&self, slot: Slot) -> String {
        match slot {
            Slot::Current => format!("{}.json", self.stem()),
            Slot::Previous => format!("{}_OLD.json", self.stem()),
        }
    }

    /// Key used for this entity in the run log.
    pub fn log_key(&self) -> String {
        match self {
            Entity::Notifications => "notifications".to_string(),
            Entity::Course(id) => id.to_string(),
        }
    }

    /// Key of the serialized change records for this entity.
    pub fn diff_key(&self) -> String {
        match self {
            Entity::Notifications => "notifications_diff.json".to_string(),
            Entity::Course(id) => format!("course_{}_diff.json", id),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Notifications => f.write_str("notifications"),
            Entity::Course(id) => write!(f, "course {}", id),
        }
    }
}

/// Which of an entity's two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Current,
    Previous,
}

/// Key of the raw, uncleaned fetch for a course.
pub fn raw_course_key(course_id: i64) -> String {
    format!("course_{}_full_data.json", course_id)
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Copy the current snapshot over the previous one.
    ///
    /// Returns `false` when no current snapshot exists yet (first run).
    async fn archive(&self, entity: &Entity) -> Result<bool>;

    /// Replace the current snapshot.
    async fn write_snapshot(&self, entity: &Entity, value: &Value) -> Result<()>;

    /// Load a snapshot; a missing or unparsable file is an `InvalidSnapshot` error.
    async fn load_snapshot(&self, entity: &Entity, slot: Slot) -> Result<Value>;

    /// Content digest of a stored snapshot, `None` if it does not exist.
    async fn fingerprint(&self, entity: &Entity, slot: Slot) -> Result<Option<String>>;

    /// Write an auxiliary JSON artifact.
    async fn write_artifact(&self, key: &str, value: &Value) -> Result<()>;
}
