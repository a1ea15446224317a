// src/report.rs

//! Change report rendering.
//!
//! A report is a list of [`ChangeRecord`]s. Each record renders to exactly
//! one description line, so the serialized records and the printed lines
//! always carry the same information.

use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::{DiffResult, NotificationDiff, Path};
use crate::error::Result;
use crate::utils::console::Printer;

/// Preview length for notification messages on the console.
const PREVIEW_GRAPHEMES: usize = 100;

/// One reportable change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeRecord {
    Added {
        path: Path,
    },
    Removed {
        path: Path,
    },
    Changed {
        path: Path,
        old: Value,
        new: Value,
    },
    /// `path` addresses the sequence, not a position in it.
    ListItemAdded {
        path: Path,
        value: Value,
    },
    ListItemRemoved {
        path: Path,
        value: Value,
    },
    NewNotification {
        id: i64,
        sender: String,
        subject: String,
    },
}

/// Render a value the way it appears in description lines: strings bare,
/// everything else as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeRecord::Added { path } => write!(f, "Added Item at {}", path),
            ChangeRecord::Removed { path } => write!(f, "Removed Item at {}", path),
            ChangeRecord::Changed { path, old, new } => write!(
                f,
                "Changed Value at {}: OLD={} -> NEW={}",
                path,
                render_value(old),
                render_value(new)
            ),
            ChangeRecord::ListItemAdded { path, value } => {
                write!(f, "List Item Added at {}: {}", path, render_value(value))
            }
            ChangeRecord::ListItemRemoved { path, value } => {
                write!(f, "List Item Removed at {}: {}", path, render_value(value))
            }
            ChangeRecord::NewNotification {
                id,
                sender,
                subject,
            } => write!(
                f,
                "New Notification [ID: {}] From: {} | Subject: {}",
                id, sender, subject
            ),
        }
    }
}

/// An ordered list of change records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeReport {
    records: Vec<ChangeRecord>,
}

impl ChangeReport {
    /// Project a structural diff: additions, removals, value changes, then
    /// list additions and list removals.
    pub fn from_diff(diff: &DiffResult) -> Self {
        let mut records = Vec::with_capacity(diff.change_count());
        records.extend(
            diff.added
                .iter()
                .map(|path| ChangeRecord::Added { path: path.clone() }),
        );
        records.extend(
            diff.removed
                .iter()
                .map(|path| ChangeRecord::Removed { path: path.clone() }),
        );
        records.extend(diff.changed.iter().map(|c| ChangeRecord::Changed {
            path: c.path.clone(),
            old: c.old.clone(),
            new: c.new.clone(),
        }));
        records.extend(diff.sequence_added.iter().map(|c| ChangeRecord::ListItemAdded {
            path: c.path.clone(),
            value: c.value.clone(),
        }));
        records.extend(
            diff.sequence_removed
                .iter()
                .map(|c| ChangeRecord::ListItemRemoved {
                    path: c.path.clone(),
                    value: c.value.clone(),
                }),
        );
        Self { records }
    }

    /// Project a notification diff, newest first.
    pub fn from_notifications(diff: &NotificationDiff) -> Self {
        let records = diff
            .added
            .iter()
            .map(|n| ChangeRecord::NewNotification {
                id: n.id,
                sender: n.sender().to_string(),
                subject: n.subject().to_string(),
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// One description line per record.
    pub fn lines(&self) -> Vec<String> {
        self.records.iter().map(ToString::to_string).collect()
    }

    /// Tagged records, for callers that need more than the lines.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.records)?)
    }

    /// Description lines as a JSON list, the format of saved diff files.
    pub fn to_json_lines(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.lines())?)
    }
}

/// Print a structural diff report grouped by change kind.
pub fn print_diff<W: Write>(printer: &mut Printer<W>, report: &ChangeReport) {
    if report.is_empty() {
        printer.success("No differences found (filtered).");
        return;
    }

    printer.info("Differences found:");
    let sections: [(&str, fn(&ChangeRecord) -> bool); 5] = [
        ("Added Items", |r| matches!(r, ChangeRecord::Added { .. })),
        ("Removed Items", |r| matches!(r, ChangeRecord::Removed { .. })),
        ("Changed Values", |r| matches!(r, ChangeRecord::Changed { .. })),
        ("List Item Added", |r| {
            matches!(r, ChangeRecord::ListItemAdded { .. })
        }),
        ("List Item Removed", |r| {
            matches!(r, ChangeRecord::ListItemRemoved { .. })
        }),
    ];

    for (title, belongs) in sections {
        let mut records = report.records().iter().filter(|r| belongs(r)).peekable();
        if records.peek().is_none() {
            continue;
        }
        printer.section(title);
        for record in records {
            print_record(printer, record);
        }
    }
}

fn print_record<W: Write>(printer: &mut Printer<W>, record: &ChangeRecord) {
    match record {
        ChangeRecord::Changed { path, old, new } => {
            printer.item(&format!("path: {}", path));
            printer.field("OLD", &render_value(old));
            printer.field("NEW", &render_value(new));
            printer.rule();
        }
        ChangeRecord::ListItemAdded { path, value }
        | ChangeRecord::ListItemRemoved { path, value } => {
            printer.item(&format!("path: {}", path));
            printer.field("VALUE", &render_value(value));
        }
        other => printer.item(&other.to_string()),
    }
}

/// Print new notifications with a plain-text preview.
pub fn print_notifications<W: Write>(printer: &mut Printer<W>, diff: &NotificationDiff) {
    if !diff.has_changes() {
        printer.success("No new notifications.");
        return;
    }

    printer.info(&format!("{} new notification(s)", diff.added.len()));
    for notification in &diff.added {
        let status = if notification.read { "read" } else { "unread" };
        printer.item(&format!(
            "[ID: {}] From: {} ({})",
            notification.id,
            notification.sender(),
            status
        ));
        if let Some(created) = notification.created_at() {
            printer.field("Created", &created.format("%Y-%m-%d %H:%M").to_string());
        }
        printer.field("Subject", notification.subject());
        printer.field("Preview", &notification.preview(PREVIEW_GRAPHEMES));
        printer.rule();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff_notifications, diff_values};
    use serde_json::json;

    #[test]
    fn test_line_formats() {
        let old = json!({"a": 1, "gone": true, "b": [1, 2], "name": "Week 1"});
        let new = json!({"a": 2, "fresh": null, "b": [2, 3], "name": "Week 2"});
        let report = ChangeReport::from_diff(&diff_values(&old, &new).unwrap());

        assert_eq!(
            report.lines(),
            vec![
                "Added Item at root['fresh']",
                "Removed Item at root['gone']",
                "Changed Value at root['a']: OLD=1 -> NEW=2",
                "Changed Value at root['name']: OLD=Week 1 -> NEW=Week 2",
                "List Item Added at root['b']: 3",
                "List Item Removed at root['b']: 1",
            ]
        );
    }

    #[test]
    fn test_structured_values_render_as_json() {
        let report = ChangeReport::from_diff(
            &diff_values(&json!({"g": []}), &json!({"g": [{"item": "HW1"}]})).unwrap(),
        );
        assert_eq!(
            report.lines(),
            vec!["List Item Added at root['g']: {\"item\":\"HW1\"}"]
        );
    }

    #[test]
    fn test_notification_lines() {
        let old = json!([{"id": 5, "subject": "X"}]);
        let new = json!([
            {"id": 5, "subject": "X"},
            {"id": 7, "subject": "Y", "userfromfullname": "Prof. Lin"},
            {"id": 6}
        ]);
        let report = ChangeReport::from_notifications(&diff_notifications(&old, &new).unwrap());
        assert_eq!(
            report.lines(),
            vec![
                "New Notification [ID: 7] From: Prof. Lin | Subject: Y",
                "New Notification [ID: 6] From: System | Subject: No Subject",
            ]
        );
    }

    #[test]
    fn test_records_reconstruct_every_line() {
        let old = json!({"a": {"x": 1}, "l": ["p", "q"]});
        let new = json!({"a": {"x": "1", "y": 2}, "l": ["q", "r"]});
        let report = ChangeReport::from_diff(&diff_values(&old, &new).unwrap());

        let serialized = report.to_value().unwrap();
        let restored: Vec<ChangeRecord> = serde_json::from_value(serialized).unwrap();
        let restored_lines: Vec<String> = restored.iter().map(ToString::to_string).collect();
        assert_eq!(restored_lines, report.lines());
    }

    #[test]
    fn test_record_serialization_shape() {
        let record = ChangeRecord::ListItemAdded {
            path: Path::root().key("b"),
            value: json!(4),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"kind": "list_item_added", "path": ["b"], "value": 4})
        );
    }

    #[test]
    fn test_empty_report() {
        let report = ChangeReport::from_diff(&DiffResult::default());
        assert!(report.is_empty());
        assert!(report.lines().is_empty());
        assert_eq!(report.to_value().unwrap(), json!([]));
        assert_eq!(report.to_json_lines().unwrap(), b"[]");
    }

    #[test]
    fn test_json_lines_are_description_strings() {
        let report = ChangeReport::from_diff(
            &diff_values(&json!({"a": 1, "l": [1]}), &json!({"a": 2, "l": [1, 2]})).unwrap(),
        );
        let saved: Vec<String> = serde_json::from_slice(&report.to_json_lines().unwrap()).unwrap();
        assert_eq!(saved, report.lines());
        assert_eq!(saved[1], "List Item Added at root['l']: 2");
    }

    #[test]
    fn test_print_diff_sections() {
        let report = ChangeReport::from_diff(
            &diff_values(&json!({"a": 1, "l": ["x"]}), &json!({"a": 2, "l": ["y", "x"]}))
                .unwrap(),
        );
        let mut printer = Printer::new(Vec::new(), false);
        print_diff(&mut printer, &report);
        let out = String::from_utf8(printer.into_inner()).unwrap();

        let rule = "─".repeat(40);
        let expected = [
            "Differences found:",
            "[Changed Values]",
            "    path: root['a']",
            "      OLD: 1",
            "      NEW: 2",
            rule.as_str(),
            "[List Item Added]",
            "    path: root['l']",
            "      VALUE: y",
        ];
        assert_eq!(out.lines().collect::<Vec<_>>(), expected);
    }
}
