mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{parse_body, TestApp};
use serde_json::json;

// A slot whose session already ended, with one confirmed booking.
async fn setup_past_booking(app: &TestApp) -> (String, String) {
    let event_id = app.create_event("Strategy Review").await;
    let start = Utc::now() - Duration::hours(3);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 5).await;
    let body = parse_body(app.import_booking(&slot_id, "Alice", "alice@example.com").await).await;
    (slot_id, body["booking"]["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_mark_attended_sets_timestamp_exclusively() {
    let app = TestApp::new().await;
    let (_, booking_id) = setup_past_booking(&app).await;

    let res = app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "attended" }),
    ).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = parse_body(res).await;
    assert!(!body["attended_at"].is_null());
    assert!(body["no_show_at"].is_null());
}

#[tokio::test]
async fn test_marking_future_session_rejected() {
    let app = TestApp::new().await;
    let event_id = app.create_event("Upcoming").await;
    let start = Utc::now() + Duration::hours(2);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 5).await;
    let body = parse_body(app.book(&slot_id, "Alice", "alice@example.com").await).await;
    let booking_id = body["booking"]["id"].as_str().unwrap();

    let res = app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "attended" }),
    ).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_cannot_overwrite_manual_mark_without_force() {
    let app = TestApp::new().await;
    let (_, booking_id) = setup_past_booking(&app).await;

    app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "attended", "source": "ui" }),
    ).await;

    // the automated sync loses the race and must not clobber the manual mark
    let res = app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "no_show", "source": "meet_sync" }),
    ).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let booking = app.state.slot_store.find_booking(&booking_id).await.unwrap().unwrap();
    assert!(booking.attended_at.is_some());
    assert!(booking.no_show_at.is_none());
}

#[tokio::test]
async fn test_force_overrides_existing_mark() {
    let app = TestApp::new().await;
    let (_, booking_id) = setup_past_booking(&app).await;

    app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "attended" }),
    ).await;

    let res = app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "no_show", "force": true }),
    ).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = parse_body(res).await;
    assert!(body["attended_at"].is_null());
    assert!(!body["no_show_at"].is_null());
}

#[tokio::test]
async fn test_clear_then_remark() {
    let app = TestApp::new().await;
    let (_, booking_id) = setup_past_booking(&app).await;

    app.post(&format!("/api/v1/bookings/{}/attendance", booking_id), json!({ "status": "attended" })).await;

    let res = app.post(&format!("/api/v1/bookings/{}/attendance", booking_id), json!({ "status": "clear" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert!(body["attended_at"].is_null());
    assert!(body["no_show_at"].is_null());

    let res = app.post(&format!("/api/v1/bookings/{}/attendance", booking_id), json!({ "status": "no_show" })).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cancelled_booking_cannot_be_marked() {
    let app = TestApp::new().await;
    let (_, booking_id) = setup_past_booking(&app).await;

    app.post(&format!("/api/v1/bookings/{}/cancel", booking_id), json!({})).await;

    let res = app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "attended" }),
    ).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancelled_slot_blocks_attendance_writes() {
    let app = TestApp::new().await;
    let (slot_id, booking_id) = setup_past_booking(&app).await;

    app.post(&format!("/api/v1/slots/{}/cancel", slot_id), json!({})).await;

    let res = app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "attended" }),
    ).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let booking = app.state.slot_store.find_booking(&booking_id).await.unwrap().unwrap();
    assert!(booking.attended_at.is_none());
}

#[tokio::test]
async fn test_mark_emits_crm_sync_intent() {
    let app = TestApp::new().await;
    let (_, booking_id) = setup_past_booking(&app).await;

    app.post(&format!("/api/v1/bookings/{}/attendance", booking_id), json!({ "status": "attended" })).await;

    let intents = app.state.side_effect_repo.list_by_booking(&booking_id).await.unwrap();
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].intent_type, "crm_sync");
    assert_eq!(intents[0].payload.0.detail["status"], "attended");
}

#[tokio::test]
async fn test_no_show_with_email_option_emits_both_intents() {
    let app = TestApp::new().await;
    let (_, booking_id) = setup_past_booking(&app).await;

    app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "no_show", "send_no_show_email": true }),
    ).await;

    let intents = app.state.side_effect_repo.list_by_booking(&booking_id).await.unwrap();
    let mut types: Vec<&str> = intents.iter().map(|i| i.intent_type.as_str()).collect();
    types.sort();
    assert_eq!(types, vec!["crm_sync", "no_show_email"]);
}

#[tokio::test]
async fn test_bulk_mark_reports_partial_failures() {
    let app = TestApp::new().await;
    let event_id = app.create_event("Cohort Session").await;
    let start = Utc::now() - Duration::hours(3);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 10).await;

    let mut ids = Vec::new();
    for i in 0..10 {
        let body = parse_body(
            app.import_booking(&slot_id, &format!("P{}", i), &format!("p{}@example.com", i)).await
        ).await;
        ids.push(body["booking"]["id"].as_str().unwrap().to_string());
    }

    // cancel two of them up front
    for id in &ids[0..2] {
        app.post(&format!("/api/v1/bookings/{}/cancel", id), json!({})).await;
    }

    let res = app.post(
        "/api/v1/bookings/attendance/bulk",
        json!({ "booking_ids": ids, "status": "attended" }),
    ).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = parse_body(res).await;
    assert_eq!(body["updated"], 8);
    assert_eq!(body["failed"], 2);

    let failed: Vec<&str> = body["results"].as_array().unwrap().iter()
        .filter(|r| r["status"] == "failed")
        .map(|r| r["booking_id"].as_str().unwrap())
        .collect();
    assert_eq!(failed.len(), 2);

    // the other eight are marked, untouched by the two failures
    let summary = parse_body(
        app.get(&format!("/api/v1/events/{}/attendance-summary", event_id)).await
    ).await;
    assert_eq!(summary["attended"], 8);
    assert_eq!(summary["cancelled"], 2);
}

#[tokio::test]
async fn test_feedback_is_write_once_after_session() {
    let app = TestApp::new().await;
    let (_, booking_id) = setup_past_booking(&app).await;

    let res = app.post(
        &format!("/api/v1/bookings/{}/feedback", booking_id),
        json!({ "rating": 5, "comments": "Great session" }),
    ).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["rating"], 5);

    let res = app.post(
        &format!("/api/v1/bookings/{}/feedback", booking_id),
        json!({ "rating": 1 }),
    ).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let booking = app.state.slot_store.find_booking(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.rating, Some(5));
}

#[tokio::test]
async fn test_feedback_before_session_end_rejected() {
    let app = TestApp::new().await;
    let event_id = app.create_event("Future Session").await;
    let start = Utc::now() + Duration::hours(2);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 5).await;
    let body = parse_body(app.book(&slot_id, "Alice", "alice@example.com").await).await;
    let booking_id = body["booking"]["id"].as_str().unwrap();

    let res = app.post(
        &format!("/api/v1/bookings/{}/feedback", booking_id),
        json!({ "rating": 4 }),
    ).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
