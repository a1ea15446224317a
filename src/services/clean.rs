//! Reduce a raw course fetch to the stable shape that gets diffed.
//!
//! Volatile fields (ids, context ids, nested API metadata) are dropped so
//! only content a student cares about is compared between runs.

use serde_json::{Map, Value, json};

/// Produce the cleaned snapshot of a raw course fetch.
pub fn clean_course(raw: &Value) -> Value {
    json!({
        "course_id": field(raw, "course_id"),
        "fetched_at": field(raw, "fetched_at"),
        "contents": list(raw, "contents").iter().map(clean_section).collect::<Vec<_>>(),
        "assignments": list(raw, "assignments").iter().map(clean_assignment).collect::<Vec<_>>(),
        "grades": list(raw, "grades").to_vec(),
        "forums": list(raw, "forums").iter().map(clean_forum).collect::<Vec<_>>(),
        "pages": list(raw, "pages")
            .iter()
            .map(|p| json!({"name": field(p, "name"), "content": field(p, "content")}))
            .collect::<Vec<_>>(),
    })
}

fn field(value: &Value, key: &str) -> Value {
    value.get(key).cloned().unwrap_or(Value::Null)
}

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn clean_section(section: &Value) -> Value {
    let name = section
        .get("name")
        .cloned()
        .unwrap_or_else(|| Value::from("Unknown Section"));
    let modules: Vec<Value> = list(section, "modules").iter().map(clean_module).collect();
    json!({ "name": name, "modules": modules })
}

fn clean_module(module: &Value) -> Value {
    let mut out = Map::new();
    out.insert("name".into(), field(module, "name"));
    out.insert("type".into(), field(module, "modname"));
    out.insert("url".into(), field(module, "url"));

    let files: Vec<Value> = list(module, "contents")
        .iter()
        .filter(|f| f.get("type").and_then(Value::as_str) == Some("file"))
        .map(|f| json!({"filename": field(f, "filename"), "fileurl": field(f, "fileurl")}))
        .collect();
    if !files.is_empty() {
        out.insert("files".into(), Value::Array(files));
    }

    Value::Object(out)
}

fn clean_assignment(assign: &Value) -> Value {
    let mut out = Map::new();
    out.insert("name".into(), field(assign, "name"));
    out.insert("duedate".into(), field(assign, "duedate"));
    out.insert("intro".into(), field(assign, "intro"));

    let details = assign.get("submission_details").unwrap_or(&Value::Null);
    if let Some(attempt) = details.get("lastattempt") {
        out.insert("submission".into(), clean_submission(attempt));

        // Grading only counts once there is an attempt.
        if let Some(evaluation) = details.get("feedback").and_then(clean_evaluation) {
            out.insert("evaluation".into(), evaluation);
        }
    }

    Value::Object(out)
}

fn clean_submission(attempt: &Value) -> Value {
    let submission = attempt.get("submission").unwrap_or(&Value::Null);

    let submitted_files: Vec<Value> = list(submission, "plugins")
        .iter()
        .filter(|p| p.get("type").and_then(Value::as_str) == Some("file"))
        .flat_map(|p| list(p, "fileareas"))
        .flat_map(|area| list(area, "files"))
        .map(|f| {
            json!({
                "filename": field(f, "filename"),
                "fileurl": field(f, "fileurl"),
                "timemodified": field(f, "timemodified"),
            })
        })
        .collect();

    json!({
        "status": field(submission, "status"),
        "timecreated": field(submission, "timecreated"),
        "timemodified": field(submission, "timemodified"),
        "submitted_files": submitted_files,
    })
}

fn clean_evaluation(feedback: &Value) -> Option<Value> {
    let grade = feedback.get("grade")?;

    let mut out = Map::new();
    out.insert("grade".into(), field(grade, "grade"));
    out.insert("gradeddate".into(), field(feedback, "gradeddate"));
    out.insert("gradefordisplay".into(), field(feedback, "gradefordisplay"));

    // Last non-empty comment wins.
    let comment = list(feedback, "plugins")
        .iter()
        .filter(|p| p.get("type").and_then(Value::as_str) == Some("comments"))
        .flat_map(|p| list(p, "editorfields"))
        .filter_map(|f| f.get("text").filter(|t| is_truthy(t)))
        .last();
    if let Some(comment) = comment {
        out.insert("comment".into(), comment.clone());
    }

    Some(Value::Object(out))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn clean_forum(forum: &Value) -> Value {
    let discussions: Vec<Value> = list(forum, "discussions")
        .iter()
        .map(|d| {
            json!({
                "subject": field(d, "subject"),
                "author": field(d, "userfullname"),
                "created": field(d, "created"),
                "message": field(d, "message"),
            })
        })
        .collect();

    json!({
        "name": field(forum, "name"),
        "type": field(forum, "type"),
        "discussions": discussions,
    })
}
