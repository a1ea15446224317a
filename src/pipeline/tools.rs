// src/pipeline/tools.rs

//! One-off operations over files on disk.

use std::path::Path;

use serde_json::Value;

use crate::diff::{ExclusionSet, StructuralDiffer, diff_notifications};
use crate::error::Result;
use crate::models::{Config, WatchEntry, notification_list};
use crate::report::{self, ChangeReport};
use crate::services::{MoodleClient, clean_course};
use crate::storage::{LocalStorage, load_json_file};
use crate::utils::console::Printer;

/// Save the report's description lines, if an output was requested.
async fn write_output(output: Option<&Path>, report: &ChangeReport) -> Result<()> {
    if let Some(output) = output {
        let bytes = report.to_json_lines()?;
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, bytes).await?;
        Printer::stdout().success(&format!("Diff saved to {}", output.display()));
    }
    Ok(())
}

/// Structurally diff two JSON files.
///
/// `extra_excludes` are added to the configured exclusions.
pub async fn diff_files(
    config: &Config,
    old: &Path,
    new: &Path,
    extra_excludes: &[String],
    output: Option<&Path>,
) -> Result<ChangeReport> {
    let old_value = load_json_file(old).await?;
    let new_value = load_json_file(new).await?;

    let mut patterns = config.monitor.exclude_paths.clone();
    patterns.extend(ExclusionSet::parse(extra_excludes)?.patterns().iter().cloned());
    let differ = StructuralDiffer::new(ExclusionSet::new(patterns))
        .with_max_depth(config.monitor.max_depth);

    let mut console = Printer::stdout();
    console.info(&format!("Comparing {} -> {}", old.display(), new.display()));
    let report = ChangeReport::from_diff(&differ.diff(&old_value, &new_value)?);
    report::print_diff(&mut console, &report);

    write_output(output, &report).await?;
    Ok(report)
}

/// Diff two notification files; missing or unparsable files count as empty.
pub async fn diff_notification_files(
    old: &Path,
    new: &Path,
    output: Option<&Path>,
) -> Result<ChangeReport> {
    let old_value = load_notifications(old).await;
    let new_value = load_notifications(new).await;

    let diff = diff_notifications(&old_value, &new_value)?;
    report::print_notifications(&mut Printer::stdout(), &diff);

    let report = ChangeReport::from_notifications(&diff);
    write_output(output, &report).await?;
    Ok(report)
}

async fn load_notifications(path: &Path) -> Value {
    match load_json_file(path).await {
        Ok(value) => notification_list(value),
        Err(e) => {
            Printer::stdout().warn(&format!("{}; treating as no notifications", e));
            Value::Array(Vec::new())
        }
    }
}

/// Clean a raw course fetch file into a snapshot file.
pub async fn clean_file(input: &Path, output: &Path) -> Result<Value> {
    let raw = load_json_file(input).await?;
    let clean = clean_course(&raw);

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, serde_json::to_vec_pretty(&clean)?).await?;
    Printer::stdout().success(&format!("Cleaned data saved to {}", output.display()));
    Ok(clean)
}

/// List enrolled courses, optionally saving them as the watch list.
pub async fn list_courses(
    config: &Config,
    storage_dir: &Path,
    write_watchlist: bool,
) -> Result<Vec<WatchEntry>> {
    let mut console = Printer::stdout();
    let client = MoodleClient::new(&config.api)?;
    let site = client.site_info().await?;
    console.info(&format!("Logged in as {} ({})", site.fullname, site.user_id));

    let courses = client.enrolled_courses(site.user_id).await?;
    console.section(&format!("{} enrolled course(s)", courses.len()));
    for course in &courses {
        console.item(&format!("[{}] {} ({})", course.id, course.fullname, course.shortname));
    }

    let entries: Vec<WatchEntry> = courses.iter().map(WatchEntry::from).collect();
    if write_watchlist {
        let storage = LocalStorage::new(storage_dir);
        storage
            .write_json(&config.paths.watchlist_file, &entries)
            .await?;
        console.success(&format!(
            "Watch list saved to {}",
            storage.path(&config.paths.watchlist_file).display()
        ));
    }
    Ok(entries)
}
