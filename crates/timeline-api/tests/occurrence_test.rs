//! Occurrences and spans against Postgres (needs Docker for the test container).
//!
//! Run with: `cargo test -p timeline-api --test occurrence_test`

mod helpers;

use axum::http::StatusCode;
use helpers::fixtures::{create_instance, create_occurrence, create_span, create_timeline};
use helpers::setup_db_app;
use serde_json::{json, Value};
use timeline_core::models::AttachmentTarget;
use timeline_processing::testing::FakeMediaTools;

#[tokio::test]
async fn test_list_merges_items_chronologically() {
    let app = setup_db_app(FakeMediaTools::new()).await;
    let bearer = app.admin_bearer().await;
    let timeline_id = create_timeline(&app, &bearer, "Life").await;
    let other_timeline = create_timeline(&app, &bearer, "Other").await;

    let undated = create_occurrence(&app, &bearer, timeline_id, "Someday", None).await;
    let late = create_occurrence(&app, &bearer, timeline_id, "Move", Some("2022-03-01")).await;
    let span = create_span(
        &app,
        &bearer,
        timeline_id,
        "University",
        Some("2015-09-01"),
        Some("2019-06-30"),
    )
    .await;
    let early = create_occurrence(&app, &bearer, timeline_id, "Birth", Some("1995-05-05")).await;
    create_occurrence(&app, &bearer, other_timeline, "Elsewhere", Some("2000-01-01")).await;

    let response = app
        .server
        .get("/occurrences")
        .add_query_param("timeline_id", timeline_id)
        .add_header("Authorization", &bearer)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let items: Vec<Value> = response.json();

    let ids: Vec<i64> = items.iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![early, span, late, undated]);
    assert_eq!(items[1]["type"], "span");
    assert_eq!(items[1]["is_span"], true);
    assert_eq!(items[1]["span"], true);
    assert_eq!(items[0]["is_span"], false);
    assert!(items[0].get("span").is_none());

    let response = app
        .server
        .get("/occurrences")
        .add_header("Authorization", &bearer)
        .await;
    assert_eq!(response.json::<Vec<Value>>().len(), 5);
}

#[tokio::test]
async fn test_item_ids_resolve_to_their_kind() {
    let app = setup_db_app(FakeMediaTools::new()).await;
    let bearer = app.admin_bearer().await;
    let timeline_id = create_timeline(&app, &bearer, "Life").await;

    let occurrence_id = create_occurrence(&app, &bearer, timeline_id, "Party", None).await;
    let span_id = create_span(&app, &bearer, timeline_id, "Job", None, None).await;
    assert_ne!(occurrence_id, span_id);

    let items = &app.state.db.items;
    assert_eq!(
        items.resolve(occurrence_id).await.unwrap(),
        Some(AttachmentTarget::Occurrence(occurrence_id))
    );
    assert_eq!(
        items.resolve(span_id).await.unwrap(),
        Some(AttachmentTarget::Span(span_id))
    );
    assert_eq!(items.resolve(span_id + 1000).await.unwrap(), None);

    create_instance(&app, &bearer, span_id, Some("first day"), &[]).await;
    create_instance(&app, &bearer, occurrence_id, Some("cake"), &[]).await;

    let response = app
        .server
        .get(&format!("/occurrences/{span_id}/instances"))
        .add_header("Authorization", &bearer)
        .await;
    let instances: Vec<Value> = response.json();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0]["target_kind"], "span");
    assert_eq!(instances[0]["message"], "first day");

    let response = app
        .server
        .get(&format!("/occurrences/{occurrence_id}/instances"))
        .add_header("Authorization", &bearer)
        .await;
    let instances: Vec<Value> = response.json();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0]["target_kind"], "occurrence");

    let response = app
        .server
        .get(&format!("/occurrences/{}/instances", span_id + 1000))
        .add_header("Authorization", &bearer)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_applies_fields_of_the_resolved_kind() {
    let app = setup_db_app(FakeMediaTools::new()).await;
    let bearer = app.admin_bearer().await;
    let timeline_id = create_timeline(&app, &bearer, "Life").await;
    let occurrence_id =
        create_occurrence(&app, &bearer, timeline_id, "Party", Some("2020-02-02")).await;
    let span_id = create_span(
        &app,
        &bearer,
        timeline_id,
        "Job",
        Some("2018-01-01"),
        Some("2019-01-01"),
    )
    .await;

    // a date-only patch means nothing to a span
    let response = app
        .server
        .patch(&format!("/occurrences/{span_id}"))
        .add_header("Authorization", &bearer)
        .json(&json!({ "date": "2020-01-01" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .patch(&format!("/occurrences/{span_id}"))
        .add_header("Authorization", &bearer)
        .json(&json!({ "end_date": null, "title": "Career" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let span: Value = response.json();
    assert_eq!(span["title"], "Career");
    assert_eq!(span["start_date"], "2018-01-01");
    assert_eq!(span["end_date"], Value::Null);

    let response = app
        .server
        .patch(&format!("/occurrences/{occurrence_id}"))
        .add_header("Authorization", &bearer)
        .json(&json!({ "date": null }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let occurrence: Value = response.json();
    assert_eq!(occurrence["date"], Value::Null);
    assert_eq!(occurrence["title"], "Party");
}

#[tokio::test]
async fn test_span_end_before_stored_start_is_rejected() {
    let app = setup_db_app(FakeMediaTools::new()).await;
    let bearer = app.admin_bearer().await;
    let timeline_id = create_timeline(&app, &bearer, "Life").await;
    let span_id = create_span(&app, &bearer, timeline_id, "Job", Some("2018-01-01"), None).await;

    let response = app
        .server
        .patch(&format!("/occurrences/{span_id}"))
        .add_header("Authorization", &bearer)
        .json(&json!({ "end_date": "2017-12-31" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/occurrences")
        .add_header("Authorization", &bearer)
        .json(&json!({
            "timeline_id": timeline_id,
            "title": "Backwards",
            "is_span": true,
            "start_date": "2020-01-02",
            "end_date": "2020-01-01"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_item_on_missing_timeline_is_not_found() {
    let app = setup_db_app(FakeMediaTools::new()).await;
    let bearer = app.admin_bearer().await;

    let response = app
        .server
        .post("/occurrences")
        .add_header("Authorization", &bearer)
        .json(&json!({ "timeline_id": 999, "title": "Orphan" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_item_removes_its_instances() {
    let app = setup_db_app(FakeMediaTools::new()).await;
    let bearer = app.admin_bearer().await;
    let timeline_id = create_timeline(&app, &bearer, "Life").await;
    let occurrence_id = create_occurrence(&app, &bearer, timeline_id, "Party", None).await;
    let span_id = create_span(&app, &bearer, timeline_id, "Job", None, None).await;
    create_instance(&app, &bearer, occurrence_id, Some("cake"), &[]).await;
    create_instance(&app, &bearer, span_id, Some("desk"), &[]).await;

    let response = app
        .server
        .delete(&format!("/occurrences/{occurrence_id}"))
        .add_header("Authorization", &bearer)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let kinds: Vec<String> = sqlx::query_scalar("SELECT target_kind FROM instances")
        .fetch_all(&app.pool)
        .await
        .unwrap();
    assert_eq!(kinds, vec!["span".to_string()]);

    let response = app
        .server
        .delete(&format!("/occurrences/{occurrence_id}"))
        .add_header("Authorization", &bearer)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
