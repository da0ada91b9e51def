//! Request shortcuts for building timelines, items and uploads through the API

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use bytes::Bytes;
use serde_json::{json, Value};

use super::TestApp;

pub fn file_form(name: &str, mime: &str, data: &[u8]) -> MultipartForm {
    let part = Part::bytes(Bytes::copy_from_slice(data))
        .file_name(name)
        .mime_type(mime);
    MultipartForm::new().add_part("file", part)
}

async fn post_created(app: &TestApp, bearer: &str, path: &str, body: Value) -> Value {
    let response = app
        .server
        .post(path)
        .add_header("Authorization", bearer)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED, "POST {path}: {}", response.text());
    response.json()
}

pub async fn create_timeline(app: &TestApp, bearer: &str, title: &str) -> i64 {
    let body = post_created(app, bearer, "/timelines", json!({ "title": title })).await;
    body["id"].as_i64().expect("timeline id")
}

pub async fn create_occurrence(
    app: &TestApp,
    bearer: &str,
    timeline_id: i64,
    title: &str,
    date: Option<&str>,
) -> i64 {
    let body = post_created(
        app,
        bearer,
        "/occurrences",
        json!({ "timeline_id": timeline_id, "title": title, "date": date }),
    )
    .await;
    body["id"].as_i64().expect("occurrence id")
}

pub async fn create_span(
    app: &TestApp,
    bearer: &str,
    timeline_id: i64,
    title: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> i64 {
    let body = post_created(
        app,
        bearer,
        "/occurrences",
        json!({
            "timeline_id": timeline_id,
            "title": title,
            "is_span": true,
            "start_date": start_date,
            "end_date": end_date,
        }),
    )
    .await;
    body["id"].as_i64().expect("span id")
}

/// Upload a file and return the JSON describing the stored result
pub async fn upload(app: &TestApp, bearer: &str, name: &str, mime: &str, data: &[u8]) -> Value {
    let response = app
        .server
        .post("/upload")
        .add_header("Authorization", bearer)
        .multipart(file_form(name, mime, data))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
    response.json()
}

/// Attach uploaded files to an item as a new instance
pub async fn create_instance(
    app: &TestApp,
    bearer: &str,
    item_id: i64,
    message: Option<&str>,
    files: &[&Value],
) -> Value {
    let files: Vec<Value> = files
        .iter()
        .map(|f| json!({ "url": f["url"], "type": f["type"], "name": f["name"], "size": f["size"] }))
        .collect();
    post_created(
        app,
        bearer,
        &format!("/occurrences/{item_id}/instances"),
        json!({ "message": message, "files": files }),
    )
    .await
}
