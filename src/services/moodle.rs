// src/services/moodle.rs

//! Moodle web service client.
//!
//! Every call is a form POST to `webservice/rest/server.php` carrying the
//! token, the function name, and the JSON response format.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, WatchEntry};

const REST_ENDPOINT: &str = "webservice/rest/server.php";

/// Identity of the token owner.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfo {
    #[serde(rename = "userid")]
    pub user_id: i64,
    #[serde(default)]
    pub fullname: String,
}

/// A course the user is enrolled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledCourse {
    pub id: i64,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub shortname: String,
    #[serde(default)]
    pub startdate: Option<i64>,
}

impl From<&EnrolledCourse> for WatchEntry {
    fn from(course: &EnrolledCourse) -> Self {
        WatchEntry::new(course.id, course.fullname.clone(), true)
    }
}

/// Client for the LMS REST web service.
#[derive(Debug, Clone)]
pub struct MoodleClient {
    client: Client,
    endpoint: Url,
    token: String,
    notification_limit: u32,
}

impl MoodleClient {
    /// Create a client from the API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(AppError::config(
                "api.token is empty; set it in config.toml or COURSEWATCH_TOKEN",
            ));
        }

        let base = Url::parse(config.base_url.trim_end_matches('/'))?;
        let endpoint = base.join(REST_ENDPOINT)?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
            notification_limit: config.notification_limit,
        })
    }

    pub fn notification_limit(&self) -> u32 {
        self.notification_limit
    }

    /// Call a web service function and return its JSON response.
    pub async fn call(&self, function: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut form: Vec<(&str, String)> = vec![
            ("wstoken", self.token.clone()),
            ("wsfunction", function.to_string()),
            ("moodlewsrestformat", "json".to_string()),
        ];
        form.extend(params.iter().cloned());

        log::debug!("Calling {}", function);
        let body = self
            .client
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let value: Value = serde_json::from_str(&body)?;
        check_exception(function, value)
    }

    pub async fn site_info(&self) -> Result<SiteInfo> {
        let value = self.call("core_webservice_get_site_info", &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn enrolled_courses(&self, user_id: i64) -> Result<Vec<EnrolledCourse>> {
        let value = self
            .call("core_enrol_get_users_courses", &[("userid", user_id.to_string())])
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Raw popup notification payload (`{"notifications": [...], "unreadcount": n}`).
    pub async fn popup_notifications(&self, user_id: i64, limit: u32) -> Result<Value> {
        self.call(
            "message_popup_get_popup_notifications",
            &[
                ("useridto", user_id.to_string()),
                ("limit", limit.to_string()),
                ("offset", "0".to_string()),
            ],
        )
        .await
    }
}

/// Turn an exception payload into an error.
fn check_exception(function: &str, value: Value) -> Result<Value> {
    let message = value
        .as_object()
        .filter(|map| map.contains_key("exception"))
        .map(|map| {
            map.get("message")
                .and_then(Value::as_str)
                .or_else(|| map.get("errorcode").and_then(Value::as_str))
                .unwrap_or("unknown exception")
                .to_string()
        });

    match message {
        Some(message) => Err(AppError::api(function, message)),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_requires_token() {
        let config = ApiConfig::default();
        assert!(matches!(
            MoodleClient::new(&config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_join() {
        let config = ApiConfig {
            base_url: "https://lms.example.edu/".to_string(),
            token: "t".to_string(),
            ..ApiConfig::default()
        };
        let client = MoodleClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint.as_str(),
            "https://lms.example.edu/webservice/rest/server.php"
        );
        assert_eq!(client.notification_limit(), 20);
    }

    #[test]
    fn test_check_exception() {
        let err = check_exception(
            "core_course_get_contents",
            json!({"exception": "moodle_exception", "errorcode": "invalidtoken", "message": "Invalid token"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid token"));

        let ok = check_exception("f", json!([{"id": 1}])).unwrap();
        assert_eq!(ok, json!([{"id": 1}]));

        let ok = check_exception("f", json!({"courses": []})).unwrap();
        assert_eq!(ok, json!({"courses": []}));
    }

    #[test]
    fn test_enrolled_course_to_watch_entry() {
        let course: EnrolledCourse =
            serde_json::from_value(json!({"id": 48736, "fullname": "Electronics (1)", "shortname": "E1"}))
                .unwrap();
        let entry = WatchEntry::from(&course);
        assert_eq!(entry.id, 48736);
        assert!(entry.active);
        assert_eq!(entry.display_name(), "Electronics (1)");
    }
}
