//! Snapshot sources for the monitor.
//!
//! The monitor only sees these traits; [`MoodleClient`] is the live
//! implementation and tests plug in fakes.

use async_trait::async_trait;
use chrono::Local;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::notification_list;
use crate::services::moodle::MoodleClient;
use crate::utils::text::strip_markup;

/// Source of the current notification list.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Current notifications as a JSON list.
    async fn fetch_notifications(&self) -> Result<Value>;
}

/// Source of raw course data.
#[async_trait]
pub trait CourseSource: Send + Sync {
    /// Raw, uncleaned course data.
    async fn fetch_course(&self, course_id: i64) -> Result<Value>;
}

#[async_trait]
impl NotificationSource for MoodleClient {
    async fn fetch_notifications(&self) -> Result<Value> {
        let site = self.site_info().await?;
        let payload = self
            .popup_notifications(site.user_id, self.notification_limit())
            .await?;
        Ok(notification_list(payload))
    }
}

#[async_trait]
impl CourseSource for MoodleClient {
    async fn fetch_course(&self, course_id: i64) -> Result<Value> {
        let id = course_id.to_string();
        let site = self.site_info().await?;

        let contents = self
            .call("core_course_get_contents", &[("courseid", id.clone())])
            .await
            .map_err(|e| AppError::fetch(format!("course {} contents", course_id), e))?;
        if !contents.is_array() {
            return Err(AppError::fetch(
                format!("course {} contents", course_id),
                "response is not a list",
            ));
        }
        log::debug!(
            "Course {}: {} sections",
            course_id,
            contents.as_array().map_or(0, Vec::len)
        );

        let assignments = self.fetch_assignments(&id).await;
        let grades = optional(
            course_id,
            "grades",
            self.call(
                "gradereport_user_get_grades_table",
                &[("userid", site.user_id.to_string()), ("courseid", id.clone())],
            )
            .await
            .map(|table| parse_grades_table(&table)),
        );
        let forums = self.fetch_forums(&id).await;
        let pages = optional(
            course_id,
            "pages",
            self.call("mod_page_get_pages_by_courses", &[("courseids[0]", id.clone())])
                .await
                .map(|v| v.get("pages").and_then(Value::as_array).cloned().unwrap_or_default()),
        );

        Ok(json!({
            "course_id": course_id,
            "fetched_at": Local::now().to_rfc3339(),
            "contents": contents,
            "assignments": assignments,
            "grades": grades,
            "forums": forums,
            "pages": pages,
        }))
    }
}

impl MoodleClient {
    /// Assignments of a course, each with its `submission_details`.
    async fn fetch_assignments(&self, course_id: &str) -> Vec<Value> {
        let response = match self
            .call("mod_assign_get_assignments", &[("courseids[0]", course_id.to_string())])
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Course {}: assignments unavailable: {}", course_id, e);
                return Vec::new();
            }
        };

        let mut assignments = response
            .pointer("/courses/0/assignments")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for assign in assignments.iter_mut() {
            let Some(assign_id) = assign.get("id").and_then(Value::as_i64) else {
                continue;
            };
            let details = match self
                .call("mod_assign_get_submission_status", &[("assignid", assign_id.to_string())])
                .await
            {
                Ok(details) => details,
                Err(e) => {
                    log::warn!("Assignment {}: submission status unavailable: {}", assign_id, e);
                    json!({"error": "Could not fetch status"})
                }
            };
            if let Some(map) = assign.as_object_mut() {
                map.insert("submission_details".into(), details);
            }
        }

        assignments
    }

    /// Forums of a course, each with its discussions.
    async fn fetch_forums(&self, course_id: &str) -> Vec<Value> {
        let forums = match self
            .call("mod_forum_get_forums_by_courses", &[("courseids[0]", course_id.to_string())])
            .await
        {
            Ok(Value::Array(forums)) => forums,
            Ok(_) => Vec::new(),
            Err(e) => {
                log::warn!("Course {}: forums unavailable: {}", course_id, e);
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(forums.len());
        for forum in forums {
            let Some(forum_id) = forum.get("id").and_then(Value::as_i64) else {
                continue;
            };
            let discussions = match self
                .call(
                    "mod_forum_get_forum_discussions_paginated",
                    &[("forumid", forum_id.to_string())],
                )
                .await
            {
                Ok(v) => v.get("discussions").cloned().unwrap_or_else(|| json!([])),
                Err(e) => {
                    log::warn!("Forum {}: discussions unavailable: {}", forum_id, e);
                    json!([])
                }
            };
            out.push(json!({
                "id": forum_id,
                "name": forum.get("name").cloned().unwrap_or(Value::Null),
                "type": forum.get("type").cloned().unwrap_or_else(|| json!("unknown")),
                "discussions": discussions,
            }));
        }
        out
    }
}

/// Log a failed optional section and fall back to an empty list.
fn optional(course_id: i64, section: &str, result: Result<Vec<Value>>) -> Vec<Value> {
    result.unwrap_or_else(|e| {
        log::warn!("Course {}: {} unavailable: {}", course_id, section, e);
        Vec::new()
    })
}

/// Flatten a grade report table response into `{item, grade}` rows.
///
/// Rows without a named item are skipped; missing grades show as `-`.
pub fn parse_grades_table(response: &Value) -> Vec<Value> {
    let Some(tables) = response.get("tables").and_then(Value::as_array) else {
        return Vec::new();
    };

    tables
        .iter()
        .filter_map(|table| table.get("tabledata").and_then(Value::as_array))
        .flatten()
        .filter_map(|row| {
            let row = row.as_object()?;
            let item = row
                .get("itemname")
                .and_then(|cell| cell.get("content"))
                .and_then(Value::as_str)
                .map(strip_markup)
                .filter(|name| !name.is_empty())?;
            let grade = row
                .get("grade")
                .and_then(|cell| cell.get("content"))
                .cloned()
                .unwrap_or_else(|| json!("-"));
            Some(json!({"item": item, "grade": grade}))
        })
        .collect()
}
