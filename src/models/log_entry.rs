//! Run history records.

use std::collections::BTreeMap;

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Outcome of one monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// ISO-8601 start time of the run
    pub timestamp: String,

    /// Wall time of the run, rounded to hundredths
    pub duration_seconds: f64,

    /// Description lines for new notifications
    #[serde(default)]
    pub notifications_diff: Vec<String>,

    /// Description lines per course id; courses without changes are absent
    #[serde(default)]
    pub courses_diff: BTreeMap<String, Vec<String>>,
}

impl LogEntry {
    pub fn new(
        started_at: chrono::DateTime<Local>,
        duration: std::time::Duration,
        notifications_diff: Vec<String>,
        courses_diff: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            timestamp: started_at.to_rfc3339_opts(SecondsFormat::Micros, false),
            duration_seconds: (duration.as_secs_f64() * 100.0).round() / 100.0,
            notifications_diff,
            courses_diff,
        }
    }

    pub fn change_count(&self) -> usize {
        self.notifications_diff.len() + self.courses_diff.values().map(Vec::len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_duration_is_rounded() {
        let entry = LogEntry::new(
            Local::now(),
            Duration::from_millis(12_345),
            vec![],
            BTreeMap::new(),
        );
        assert_eq!(entry.duration_seconds, 12.35);
    }

    #[test]
    fn test_serialized_shape() {
        let mut courses = BTreeMap::new();
        courses.insert("48736".to_string(), vec!["Added Item at root['x']".to_string()]);
        let entry = LogEntry::new(
            Local::now(),
            Duration::from_secs(1),
            vec!["New Notification [ID: 1] From: System | Subject: No Subject".into()],
            courses,
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value["timestamp"].is_string());
        assert_eq!(value["duration_seconds"], serde_json::json!(1.0));
        assert_eq!(value["courses_diff"]["48736"][0], "Added Item at root['x']");
        assert_eq!(entry.change_count(), 2);
    }
}
