mod common;

use chrono::{Duration, Utc};
use common::{parse_body, TestApp};
use serde_json::json;
use slot_engine::domain::models::side_effect::{IntentPayload, SideEffect, INTENT_CRM_SYNC};

async fn setup_no_show_intents(app: &TestApp) -> String {
    let event_id = app.create_event("Dispatch Session").await;
    let start = Utc::now() - Duration::hours(3);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 5).await;
    let body = parse_body(app.import_booking(&slot_id, "Alice", "alice@example.com").await).await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    app.post(
        &format!("/api/v1/bookings/{}/attendance", booking_id),
        json!({ "status": "no_show", "send_no_show_email": true }),
    ).await;
    booking_id
}

#[tokio::test]
async fn test_sink_outage_reschedules_without_touching_state() {
    let app = TestApp::new().await;
    let booking_id = setup_no_show_intents(&app).await;

    app.sink.set_failing(true);
    let delivered = app.state.dispatcher.run_once(10).await.unwrap();
    assert_eq!(delivered, 0);

    // the booking's no-show mark survives the outage untouched
    let booking = app.state.slot_store.find_booking(&booking_id).await.unwrap().unwrap();
    assert!(booking.no_show_at.is_some());

    // both intents are queued again with the failure recorded
    let intents = app.state.side_effect_repo.list_by_booking(&booking_id).await.unwrap();
    assert_eq!(intents.len(), 2);
    for intent in &intents {
        assert_eq!(intent.status, "PENDING");
        assert_eq!(intent.attempts, 1);
        assert!(intent.last_error.is_some());
    }

    // sink recovers, retry drains the queue
    app.sink.set_failing(false);
    let delivered = app.state.dispatcher.run_once(10).await.unwrap();
    assert_eq!(delivered, 2);

    let intents = app.state.side_effect_repo.list_by_booking(&booking_id).await.unwrap();
    for intent in &intents {
        assert_eq!(intent.status, "COMPLETED");
    }
    assert_eq!(app.sink.delivered_ids().len(), 2);
}

#[tokio::test]
async fn test_intent_fails_permanently_after_max_attempts() {
    let app = TestApp::new().await;
    let booking_id = setup_no_show_intents(&app).await;

    app.sink.set_failing(true);
    // max_attempts is 3 in the test config, retry delay 0
    for _ in 0..3 {
        app.state.dispatcher.run_once(10).await.unwrap();
    }

    let intents = app.state.side_effect_repo.list_by_booking(&booking_id).await.unwrap();
    for intent in &intents {
        assert_eq!(intent.status, "FAILED");
        assert_eq!(intent.attempts, 3);
    }
}

#[tokio::test]
async fn test_duplicate_intent_skipped_after_completion() {
    let app = TestApp::new().await;
    let event_id = app.create_event("Dup Check").await;
    let start = Utc::now() - Duration::hours(3);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 5).await;
    let body = parse_body(app.import_booking(&slot_id, "Alice", "alice@example.com").await).await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    let payload = IntentPayload {
        booking_id: booking_id.clone(),
        slot_id: slot_id.clone(),
        attendee_email: "alice@example.com".to_string(),
        attendee_name: "Alice".to_string(),
        detail: json!({ "status": "attended" }),
    };

    // identical payloads hash to the same dedup key
    let first = SideEffect::new(INTENT_CRM_SYNC, payload.clone());
    let second = SideEffect::new(INTENT_CRM_SYNC, payload);
    assert_eq!(first.dedup_hash, second.dedup_hash);

    app.state.dispatcher.enqueue(first).await.unwrap();
    app.state.dispatcher.enqueue(second).await.unwrap();

    let delivered = app.state.dispatcher.run_once(10).await.unwrap();
    assert_eq!(delivered, 1);

    let intents = app.state.side_effect_repo.list_by_booking(&booking_id).await.unwrap();
    let mut statuses: Vec<&str> = intents.iter().map(|i| i.status.as_str()).collect();
    statuses.sort();
    assert_eq!(statuses, vec!["COMPLETED", "SKIPPED_DUPLICATE"]);
}

#[tokio::test]
async fn test_distinct_transitions_are_not_deduped() {
    let app = TestApp::new().await;
    let booking_id = setup_no_show_intents(&app).await;

    // correct the mark: clear, then attended - each transition is its own
    // intent because the payload detail differs
    app.post(&format!("/api/v1/bookings/{}/attendance", booking_id), json!({ "status": "clear" })).await;
    app.post(&format!("/api/v1/bookings/{}/attendance", booking_id), json!({ "status": "attended" })).await;

    let delivered = app.state.dispatcher.run_once(10).await.unwrap();
    let intents = app.state.side_effect_repo.list_by_booking(&booking_id).await.unwrap();
    let completed = intents.iter().filter(|i| i.status == "COMPLETED").count();
    assert_eq!(delivered, completed);
    assert!(intents.iter().all(|i| i.status != "SKIPPED_DUPLICATE"));
}
