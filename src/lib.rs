// src/lib.rs

//! coursewatch library: snapshot diffing and change monitoring for a Moodle LMS.

pub mod diff;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod services;
pub mod storage;
pub mod utils;
