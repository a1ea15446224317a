// src/pipeline/monitor.rs

//! One monitoring pass over notifications and watched courses.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use chrono::Local;
use serde_json::json;

use crate::diff::{StructuralDiffer, diff_notifications};
use crate::error::{AppError, Result};
use crate::models::{Config, LogEntry, MonitorConfig, WatchEntry, active_entries};
use crate::report::{self, ChangeReport};
use crate::services::{CourseSource, MoodleClient, NotificationSource, clean_course};
use crate::storage::{Entity, LocalStorage, LogHistory, SnapshotStorage, Slot, raw_course_key};
use crate::utils::console::{Printer, Tone};

/// Something the operator should know about a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// First run for an entity; nothing to compare against yet.
    NoPriorData { entity: String },
    /// Fetching or diffing an entity failed; it contributes no changes.
    ComparisonFailed { entity: String, reason: String },
    /// No active course in the watch list.
    EmptyWatchlist,
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        !matches!(self, Diagnostic::NoPriorData { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoPriorData { entity } => {
                write!(f, "[no-prior-data] {}: first run, nothing to compare", entity)
            }
            Diagnostic::ComparisonFailed { entity, reason } => {
                write!(f, "[comparison-failed] {}: {}", entity, reason)
            }
            Diagnostic::EmptyWatchlist => {
                f.write_str("[watchlist] no active courses to monitor")
            }
        }
    }
}

/// Result of one pass: the history entry plus everything worth reporting.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub entry: LogEntry,
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of comparing one entity.
enum Outcome {
    FirstRun,
    Unchanged,
    Changed(ChangeReport),
}

/// Runs monitoring passes against a storage backend and two sources.
pub struct Monitor<'a> {
    storage: &'a dyn SnapshotStorage,
    notifications: &'a dyn NotificationSource,
    courses: &'a dyn CourseSource,
    differ: StructuralDiffer,
    write_diff_artifacts: bool,
}

impl<'a> Monitor<'a> {
    pub fn new(
        config: &MonitorConfig,
        storage: &'a dyn SnapshotStorage,
        notifications: &'a dyn NotificationSource,
        courses: &'a dyn CourseSource,
    ) -> Self {
        Self {
            storage,
            notifications,
            courses,
            differ: config.differ(),
            write_diff_artifacts: config.write_diff_artifacts,
        }
    }

    /// Run one pass. Failures are isolated per entity and never abort the run.
    pub async fn run(&self, watchlist: &[WatchEntry]) -> RunReport {
        let started_at = Local::now();
        let timer = Instant::now();
        let mut diagnostics = Vec::new();

        Printer::stdout().info("Checking notifications...");
        let notifications_diff = match self.check_notifications().await {
            Ok(Outcome::Changed(report)) => report.lines(),
            Ok(Outcome::FirstRun) => {
                note(&mut diagnostics, no_prior(&Entity::Notifications));
                Vec::new()
            }
            Ok(Outcome::Unchanged) => Vec::new(),
            Err(e) => {
                note(&mut diagnostics, failed(&Entity::Notifications, &e));
                Vec::new()
            }
        };

        let active = active_entries(watchlist);
        if active.is_empty() {
            note(&mut diagnostics, Diagnostic::EmptyWatchlist);
        }

        let mut courses_diff = BTreeMap::new();
        for watch in active {
            let entity = Entity::Course(watch.id);
            Printer::stdout().info(&format!("Checking {} ({})...", watch.display_name(), watch.id));

            match self.check_course(&entity, watch.id).await {
                Ok(Outcome::Changed(report)) => {
                    courses_diff.insert(entity.log_key(), report.lines());
                }
                Ok(Outcome::Unchanged) => {}
                Ok(Outcome::FirstRun) => note(&mut diagnostics, no_prior(&entity)),
                Err(e) => note(&mut diagnostics, failed(&entity, &e)),
            }
        }

        let entry = LogEntry::new(
            started_at,
            timer.elapsed(),
            notifications_diff,
            courses_diff,
        );
        RunReport { entry, diagnostics }
    }

    async fn check_notifications(&self) -> Result<Outcome> {
        let entity = Entity::Notifications;
        let had_prior = self.storage.archive(&entity).await?;

        let current = self.notifications.fetch_notifications().await?;
        self.storage.write_snapshot(&entity, &current).await?;

        if !had_prior || self.unchanged(&entity).await? {
            return Ok(if had_prior { Outcome::Unchanged } else { Outcome::FirstRun });
        }

        let previous = match self.storage.load_snapshot(&entity, Slot::Previous).await {
            Ok(previous) => previous,
            Err(e) => {
                log::warn!("Treating previous notifications as empty: {}", e);
                json!([])
            }
        };
        let diff = diff_notifications(&previous, &current)?;
        report::print_notifications(&mut Printer::stdout(), &diff);

        let report = ChangeReport::from_notifications(&diff);
        self.finish(&entity, report).await
    }

    async fn check_course(&self, entity: &Entity, course_id: i64) -> Result<Outcome> {
        let had_prior = self.storage.archive(entity).await?;

        let raw = self.courses.fetch_course(course_id).await?;
        self.storage
            .write_artifact(&raw_course_key(course_id), &raw)
            .await?;
        self.storage.write_snapshot(entity, &clean_course(&raw)).await?;

        if !had_prior {
            return Ok(Outcome::FirstRun);
        }
        if self.unchanged(entity).await? {
            return Ok(Outcome::Unchanged);
        }

        let previous = self.storage.load_snapshot(entity, Slot::Previous).await?;
        let current = self.storage.load_snapshot(entity, Slot::Current).await?;
        let diff = self.differ.diff(&previous, &current)?;

        let report = ChangeReport::from_diff(&diff);
        report::print_diff(&mut Printer::stdout(), &report);
        self.finish(entity, report).await
    }

    /// Both snapshots hold identical bytes.
    async fn unchanged(&self, entity: &Entity) -> Result<bool> {
        let previous = self.storage.fingerprint(entity, Slot::Previous).await?;
        let current = self.storage.fingerprint(entity, Slot::Current).await?;
        Ok(previous.is_some() && previous == current)
    }

    async fn finish(&self, entity: &Entity, report: ChangeReport) -> Result<Outcome> {
        if report.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        if self.write_diff_artifacts {
            let lines = serde_json::Value::from(report.lines());
            self.storage.write_artifact(&entity.diff_key(), &lines).await?;
        }
        Ok(Outcome::Changed(report))
    }
}

fn no_prior(entity: &Entity) -> Diagnostic {
    Diagnostic::NoPriorData {
        entity: entity.to_string(),
    }
}

fn failed(entity: &Entity, error: &AppError) -> Diagnostic {
    Diagnostic::ComparisonFailed {
        entity: entity.to_string(),
        reason: error.to_string(),
    }
}

fn note(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    if diagnostic.is_warning() {
        log::warn!("{}", diagnostic);
    } else {
        log::info!("{}", diagnostic);
    }
    diagnostics.push(diagnostic);
}

/// Run a full monitoring pass against the live API and record it in history.
pub async fn run_monitor(config: &Config, storage_dir: &Path) -> Result<RunReport> {
    let mut console = Printer::stdout();
    console.header("Course Monitor");

    let root = LocalStorage::new(storage_dir);
    let resources = LocalStorage::new(storage_dir.join(&config.paths.resources_dir));

    let watchlist: Vec<WatchEntry> = root.read_json_or_default(&config.paths.watchlist_file).await;
    if watchlist.is_empty() {
        console.warn(&format!(
            "Watch list {} is missing or empty; run `coursewatch courses --write-watchlist`",
            root.path(&config.paths.watchlist_file).display()
        ));
    }

    let client = MoodleClient::new(&config.api)?;
    let monitor = Monitor::new(&config.monitor, &resources, &client, &client);
    let report = monitor.run(&watchlist).await;

    let history = LogHistory::new(
        root,
        config.paths.log_file.clone(),
        config.monitor.history_capacity,
    );
    let kept = history.append(&report.entry).await?;

    let notes: Vec<(Tone, String)> = report
        .diagnostics
        .iter()
        .map(|d| {
            let tone = if d.is_warning() { Tone::Warning } else { Tone::Plain };
            (tone, d.to_string())
        })
        .collect();
    console.summary(
        "Run complete",
        &[
            ("Duration", format!("{:.2}s", report.entry.duration_seconds)),
            (
                "New notifications",
                report.entry.notifications_diff.len().to_string(),
            ),
            ("Changed courses", report.entry.courses_diff.len().to_string()),
            ("Diagnostics", report.diagnostics.len().to_string()),
            ("History entries", kept.to_string()),
        ],
        &notes,
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;
    use tempfile::TempDir;

    use crate::diff::ExclusionPattern;

    struct FakeNotifications(Mutex<Value>);

    impl FakeNotifications {
        fn new(value: Value) -> Self {
            Self(Mutex::new(value))
        }

        fn set(&self, value: Value) {
            *self.0.lock().unwrap() = value;
        }
    }

    #[async_trait]
    impl NotificationSource for FakeNotifications {
        async fn fetch_notifications(&self) -> Result<Value> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    /// Courses mapped to `None` fail to fetch.
    struct FakeCourses(Mutex<HashMap<i64, Option<Value>>>);

    impl FakeCourses {
        fn new(courses: impl IntoIterator<Item = (i64, Option<Value>)>) -> Self {
            Self(Mutex::new(courses.into_iter().collect()))
        }

        fn set(&self, id: i64, raw: Option<Value>) {
            self.0.lock().unwrap().insert(id, raw);
        }
    }

    #[async_trait]
    impl CourseSource for FakeCourses {
        async fn fetch_course(&self, course_id: i64) -> Result<Value> {
            self.0
                .lock()
                .unwrap()
                .get(&course_id)
                .cloned()
                .flatten()
                .ok_or_else(|| AppError::fetch(format!("course {}", course_id), "connection reset"))
        }
    }

    fn raw_course(id: i64, fetched_at: &str, section: &str) -> Value {
        json!({
            "course_id": id,
            "fetched_at": fetched_at,
            "contents": [{"name": section, "modules": []}],
        })
    }

    fn watchlist(ids: &[i64]) -> Vec<WatchEntry> {
        ids.iter()
            .map(|id| WatchEntry::new(*id, format!("Course {}", id), true))
            .collect()
    }

    fn no_exclusions() -> MonitorConfig {
        MonitorConfig {
            exclude_paths: Vec::new(),
            ..MonitorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_first_run_reports_no_prior_data() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let notifications = FakeNotifications::new(json!([{"id": 1}]));
        let courses = FakeCourses::new([(10, Some(raw_course(10, "t0", "Week 1")))]);
        let config = MonitorConfig::default();
        let monitor = Monitor::new(&config, &storage, &notifications, &courses);

        let report = monitor.run(&watchlist(&[10])).await;

        assert!(report.entry.notifications_diff.is_empty());
        assert!(report.entry.courses_diff.is_empty());
        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::NoPriorData {
                    entity: "notifications".to_string()
                },
                Diagnostic::NoPriorData {
                    entity: "course 10".to_string()
                },
            ]
        );
        assert!(storage.path("course_10_full_data.json").exists());
        assert!(storage.path("course_10_clean.json").exists());
        assert!(!storage.path("course_10_clean_OLD.json").exists());
    }

    #[tokio::test]
    async fn test_failed_course_is_isolated() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let notifications = FakeNotifications::new(json!([]));
        let courses = FakeCourses::new([(1, None), (2, Some(raw_course(2, "t1", "Week 1")))]);

        // Seed a previous pass for course 2.
        storage
            .write_snapshot(&Entity::Course(2), &clean_course(&raw_course(2, "t0", "Week 1")))
            .await
            .unwrap();
        storage
            .write_snapshot(&Entity::Notifications, &json!([]))
            .await
            .unwrap();

        let config = no_exclusions();
        let monitor = Monitor::new(&config, &storage, &notifications, &courses);
        let report = monitor.run(&watchlist(&[1, 2])).await;

        let keys: Vec<&String> = report.entry.courses_diff.keys().collect();
        assert_eq!(keys, vec!["2"]);
        assert_eq!(
            report.entry.courses_diff["2"],
            vec!["Changed Value at root['fetched_at']: OLD=t0 -> NEW=t1"]
        );
        assert!(report.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::ComparisonFailed { entity, .. } if entity == "course 1"
        )));
        assert!(
            report
                .diagnostics
                .iter()
                .all(|d| d.to_string().starts_with('['))
        );
    }

    #[tokio::test]
    async fn test_default_exclusions_hide_fetch_time() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let notifications = FakeNotifications::new(json!([]));
        let courses = FakeCourses::new([(5, Some(raw_course(5, "t0", "Week 1")))]);
        let config = MonitorConfig::default();
        let monitor = Monitor::new(&config, &storage, &notifications, &courses);

        monitor.run(&watchlist(&[5])).await;
        courses.set(5, Some(raw_course(5, "t1", "Week 1")));
        let second = monitor.run(&watchlist(&[5])).await;
        assert!(second.entry.courses_diff.is_empty());

        courses.set(5, Some(raw_course(5, "t2", "Midterm")));
        let third = monitor.run(&watchlist(&[5])).await;
        assert_eq!(
            third.entry.courses_diff["5"],
            vec![
                "List Item Added at root['contents']: {\"modules\":[],\"name\":\"Midterm\"}",
                "List Item Removed at root['contents']: {\"modules\":[],\"name\":\"Week 1\"}",
            ]
        );
    }

    #[tokio::test]
    async fn test_new_notifications_and_artifacts() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let notifications = FakeNotifications::new(json!([{"id": 5, "subject": "X"}]));
        let courses = FakeCourses::new([]);
        let config = MonitorConfig {
            write_diff_artifacts: true,
            ..MonitorConfig::default()
        };
        let monitor = Monitor::new(&config, &storage, &notifications, &courses);

        monitor.run(&[]).await;
        notifications.set(json!([
            {"id": 5, "subject": "X"},
            {"id": 7, "subject": "Y", "userfromfullname": "Prof"}
        ]));
        let report = monitor.run(&[]).await;

        assert_eq!(
            report.entry.notifications_diff,
            vec!["New Notification [ID: 7] From: Prof | Subject: Y"]
        );
        assert!(report.diagnostics.contains(&Diagnostic::EmptyWatchlist));
        let saved: Vec<String> = serde_json::from_slice(
            &tokio::fs::read(storage.path("notifications_diff.json"))
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(saved, report.entry.notifications_diff);
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_skips_diff() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let notifications = FakeNotifications::new(json!([{"id": 1}]));
        let courses = FakeCourses::new([]);
        let config = MonitorConfig::default();
        let monitor = Monitor::new(&config, &storage, &notifications, &courses);

        monitor.run(&[]).await;
        let report = monitor.run(&[]).await;
        assert!(report.entry.notifications_diff.is_empty());
        assert_eq!(report.diagnostics, vec![Diagnostic::EmptyWatchlist]);
    }

    #[tokio::test]
    async fn test_malformed_notifications_fail_comparison() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let notifications = FakeNotifications::new(json!([]));
        let courses = FakeCourses::new([]);
        let config = MonitorConfig::default();
        let monitor = Monitor::new(&config, &storage, &notifications, &courses);

        monitor.run(&[]).await;
        notifications.set(json!({"unexpected": true}));
        let report = monitor.run(&[]).await;

        assert!(report.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::ComparisonFailed { entity, .. } if entity == "notifications"
        )));
    }

    #[tokio::test]
    async fn test_corrupt_previous_snapshot_fails_comparison() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage
            .write_bytes("course_3_clean.json", b"{truncated")
            .await
            .unwrap();
        let notifications = FakeNotifications::new(json!([]));
        let courses = FakeCourses::new([(3, Some(raw_course(3, "t0", "Week 1")))]);
        let config = MonitorConfig::default();
        let monitor = Monitor::new(&config, &storage, &notifications, &courses);

        let report = monitor.run(&watchlist(&[3])).await;

        assert!(report.entry.courses_diff.is_empty());
        assert!(report.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::ComparisonFailed { reason, .. } if reason.contains("Invalid snapshot")
        )));
    }

    #[tokio::test]
    async fn test_inactive_courses_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let notifications = FakeNotifications::new(json!([]));
        let courses = FakeCourses::new([(9, None)]);
        let config = MonitorConfig {
            exclude_paths: vec![ExclusionPattern::parse("fetched_at").unwrap()],
            ..MonitorConfig::default()
        };
        let monitor = Monitor::new(&config, &storage, &notifications, &courses);

        let list = vec![WatchEntry::new(9, "Dropped", false)];
        let report = monitor.run(&list).await;

        assert!(report.diagnostics.contains(&Diagnostic::EmptyWatchlist));
        assert!(!report.diagnostics.iter().any(|d| d.is_warning() && *d != Diagnostic::EmptyWatchlist));
    }

    #[test]
    fn test_diagnostic_prefixes() {
        let no_prior = Diagnostic::NoPriorData {
            entity: "course 1".to_string(),
        };
        assert!(no_prior.to_string().starts_with("[no-prior-data] course 1"));
        assert!(!no_prior.is_warning());

        let failed = Diagnostic::ComparisonFailed {
            entity: "course 1".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(failed.to_string(), "[comparison-failed] course 1: boom");
        assert!(Diagnostic::EmptyWatchlist.to_string().starts_with("[watchlist]"));
    }
}
