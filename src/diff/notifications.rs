// src/diff/notifications.rs

//! Identity-keyed diff over notification lists.
//!
//! Two lists are compared by identifier membership, never by position.
//! New notifications are ordered by descending identifier, which tracks
//! recency only as far as the LMS hands out increasing ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Notification;

/// Notifications that appeared since the previous snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationDiff {
    /// Newly seen notifications, highest id first
    pub added: Vec<Notification>,
}

impl NotificationDiff {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.added.iter().map(|n| n.id).collect()
    }
}

/// Index a raw notification list by id.
///
/// Items without an integer `id` are skipped; a later item with a repeated
/// id replaces the earlier one.
fn index_by_id(list: &Value, side: &str) -> Result<BTreeMap<i64, Notification>> {
    let items = list
        .as_array()
        .ok_or_else(|| AppError::malformed(format!("{} notifications are not a list", side)))?;

    let mut indexed = BTreeMap::new();
    for (position, item) in items.iter().enumerate() {
        let map = item.as_object().ok_or_else(|| {
            AppError::malformed(format!(
                "{} notification at position {} is not a mapping",
                side, position
            ))
        })?;
        match Notification::from_map(map) {
            Some(notification) => {
                indexed.insert(notification.id, notification);
            }
            None => log::debug!(
                "Skipping untrackable {} notification at position {}",
                side,
                position
            ),
        }
    }
    Ok(indexed)
}

/// Calculate which notifications in `new` were absent from `old`.
pub fn diff_notifications(old: &Value, new: &Value) -> Result<NotificationDiff> {
    let previous = index_by_id(old, "old")?;
    let current = index_by_id(new, "new")?;

    let added = current
        .into_iter()
        .rev()
        .filter(|(id, _)| !previous.contains_key(id))
        .map(|(_, notification)| notification)
        .collect();

    Ok(NotificationDiff { added })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_changes() {
        let list = json!([{"id": 1, "subject": "A"}, {"id": 2, "subject": "B"}]);
        let result = diff_notifications(&list, &list).unwrap();
        assert!(!result.has_changes());
    }

    #[test]
    fn test_single_new_notification() {
        let old = json!([{"id": 5, "subject": "X"}]);
        let new = json!([{"id": 5, "subject": "X"}, {"id": 7, "subject": "Y"}]);
        let result = diff_notifications(&old, &new).unwrap();
        assert_eq!(result.ids(), vec![7]);
        assert_eq!(result.added[0].subject(), "Y");
    }

    #[test]
    fn test_order_independent_and_descending() {
        let old = json!([{"id": 3}, {"id": 1}]);
        let new = json!([{"id": 10}, {"id": 1}, {"id": 4}, {"id": 3}, {"id": 12}]);
        let result = diff_notifications(&old, &new).unwrap();
        assert_eq!(result.ids(), vec![12, 10, 4]);
    }

    #[test]
    fn test_removed_notifications_are_not_reported() {
        let old = json!([{"id": 1}, {"id": 2}]);
        let new = json!([{"id": 2}]);
        assert!(!diff_notifications(&old, &new).unwrap().has_changes());
    }

    #[test]
    fn test_items_without_id_are_ignored_on_both_sides() {
        let old = json!([{"subject": "no id"}]);
        let new = json!([{"subject": "still no id"}, {"id": 2}]);
        let result = diff_notifications(&old, &new).unwrap();
        assert_eq!(result.ids(), vec![2]);
    }

    #[test]
    fn test_empty_to_full() {
        let result = diff_notifications(&json!([]), &json!([{"id": 1}])).unwrap();
        assert_eq!(result.ids(), vec![1]);
    }

    #[test]
    fn test_malformed_input() {
        let err = diff_notifications(&json!({"id": 1}), &json!([])).unwrap_err();
        assert!(matches!(err, AppError::MalformedInput(_)));

        let err = diff_notifications(&json!([]), &json!([1, 2])).unwrap_err();
        assert!(matches!(err, AppError::MalformedInput(_)));
    }
}
