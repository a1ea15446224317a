//! Bounded run history (`log.json`).

use serde_json::Value;

use crate::error::Result;
use crate::models::LogEntry;
use crate::storage::LocalStorage;

/// Append-only history of run entries, trimmed to a fixed capacity.
#[derive(Debug, Clone)]
pub struct LogHistory {
    storage: LocalStorage,
    key: String,
    capacity: usize,
}

impl LogHistory {
    pub fn new(storage: LocalStorage, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            storage,
            key: key.into(),
            capacity: capacity.max(1),
        }
    }

    /// Raw entries, oldest first. Missing, unparsable, or non-list files
    /// count as an empty history.
    pub async fn load(&self) -> Vec<Value> {
        match self.storage.read_json_or_default::<Value>(&self.key).await {
            Value::Array(entries) => entries,
            Value::Null => Vec::new(),
            _ => {
                log::warn!("{} is not a list; starting a fresh history", self.key);
                Vec::new()
            }
        }
    }

    /// Append an entry, evicting the oldest beyond capacity.
    ///
    /// Returns the number of entries kept.
    pub async fn append(&self, entry: &LogEntry) -> Result<usize> {
        let mut entries = self.load().await;
        entries.push(serde_json::to_value(entry)?);

        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }

        self.storage.write_json(&self.key, &entries).await?;
        log::info!("Log updated: {}", self.storage.path(&self.key).display());
        Ok(entries.len())
    }

    /// The `limit` most recent entries that parse as [`LogEntry`], newest first.
    pub async fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.load()
            .await
            .into_iter()
            .rev()
            .filter_map(|v| serde_json::from_value(v).ok())
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use chrono::Local;
    use tempfile::TempDir;

    fn entry(n: usize) -> LogEntry {
        LogEntry::new(
            Local::now(),
            Duration::from_secs(n as u64),
            vec![format!("line {}", n)],
            BTreeMap::new(),
        )
    }

    #[tokio::test]
    async fn test_append_creates_file() {
        let tmp = TempDir::new().unwrap();
        let history = LogHistory::new(LocalStorage::new(tmp.path()), "log.json", 100);

        assert_eq!(history.append(&entry(1)).await.unwrap(), 1);
        assert!(tmp.path().join("log.json").exists());
        assert_eq!(history.recent(10).await.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_first() {
        let tmp = TempDir::new().unwrap();
        let history = LogHistory::new(LocalStorage::new(tmp.path()), "log.json", 3);

        for n in 1..=5 {
            history.append(&entry(n)).await.unwrap();
        }

        let kept = history.load().await;
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0]["notifications_diff"][0], "line 3");
        assert_eq!(kept[2]["notifications_diff"][0], "line 5");

        let recent = history.recent(2).await;
        assert_eq!(recent[0].notifications_diff, vec!["line 5"]);
        assert_eq!(recent[1].notifications_diff, vec!["line 4"]);
    }

    #[tokio::test]
    async fn test_corrupt_history_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.write_bytes("log.json", b"{\"oops\": 1}").await.unwrap();

        let history = LogHistory::new(storage, "log.json", 100);
        assert_eq!(history.append(&entry(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_foreign_entries_are_kept_but_skipped_by_recent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage
            .write_json("log.json", &serde_json::json!([{"legacy": true}]))
            .await
            .unwrap();

        let history = LogHistory::new(storage, "log.json", 100);
        assert_eq!(history.append(&entry(1)).await.unwrap(), 2);
        assert_eq!(history.recent(10).await.len(), 1);
    }
}
