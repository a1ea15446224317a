//! Service layer for the monitor.
//!
//! This module contains the collaborators around the diff engine:
//! - LMS web service client (`MoodleClient`)
//! - Snapshot sources used by the monitor (`NotificationSource`, `CourseSource`)
//! - Course cleaner (`clean_course`)

pub mod clean;
pub mod fetch;
pub mod moodle;

pub use clean::clean_course;
pub use fetch::{CourseSource, NotificationSource, parse_grades_table};
pub use moodle::{EnrolledCourse, MoodleClient, SiteInfo};
