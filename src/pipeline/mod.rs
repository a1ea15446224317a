//! Pipeline entry points.
//!
//! - `run_monitor`: One monitoring pass over notifications and watched courses
//! - `diff_files` / `diff_notification_files`: Compare snapshot files on disk
//! - `clean_file`: Clean a raw course fetch
//! - `list_courses`: List enrolled courses, optionally as the watch list

pub mod monitor;
pub mod tools;

pub use monitor::{Diagnostic, Monitor, RunReport, run_monitor};
pub use tools::{clean_file, diff_files, diff_notification_files, list_courses};
