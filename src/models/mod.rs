// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod log_entry;
mod notification;
mod watch;

// Re-export all public types
pub use config::{
    ApiConfig, Config, LoggingConfig, MonitorConfig, PathsConfig, TOKEN_ENV,
};
pub use log_entry::LogEntry;
pub use notification::{Notification, notification_list};
pub use watch::{WatchEntry, active_entries};
