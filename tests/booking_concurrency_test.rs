mod common;

use chrono::{Duration, Utc};
use common::{parse_body, TestApp};
use slot_engine::domain::models::booking::{AttendeeInfo, Placement};
use std::collections::HashSet;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_concurrent_requests_never_oversell_last_seat() {
    let app = TestApp::new().await;
    let event_id = app.create_event("Hot Ticket").await;
    let start = Utc::now() + Duration::hours(2);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 1).await;

    let worker_count = 6;
    let mut set = JoinSet::new();

    for i in 0..worker_count {
        let allocator = app.state.allocator.clone();
        let slot_id = slot_id.clone();
        set.spawn(async move {
            let attendee = AttendeeInfo {
                name: format!("Racer {}", i),
                email: format!("racer{}@example.com", i),
            };
            allocator.request_booking(&slot_id, &attendee, false).await
        });
    }

    let mut confirmed = 0;
    let mut positions = Vec::new();
    while let Some(res) = set.join_next().await {
        let (booking, placement) = res.unwrap().expect("booking request failed");
        match placement {
            Placement::Confirmed => confirmed += 1,
            Placement::Waitlisted => positions.push(booking.waitlist_position.unwrap()),
        }
    }

    assert_eq!(confirmed, 1, "exactly one request may take the last seat");
    assert_eq!(positions.len(), worker_count - 1);

    // positions are unique and contiguous from 1
    let unique: HashSet<i64> = positions.iter().cloned().collect();
    assert_eq!(unique.len(), positions.len());
    let max = *positions.iter().max().unwrap();
    assert_eq!(max, (worker_count - 1) as i64);
    let min = *positions.iter().min().unwrap();
    assert_eq!(min, 1);

    let db_confirmed = app.state.slot_store.confirmed_count(&slot_id).await.unwrap();
    assert_eq!(db_confirmed, 1);
}

#[tokio::test]
async fn test_single_free_seat_race_between_two_requests() {
    let app = TestApp::new().await;
    let event_id = app.create_event("Almost Full").await;
    let start = Utc::now() + Duration::hours(2);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 2).await;

    // occupy one of the two seats
    let res = app.book(&slot_id, "Early Bird", "early@example.com").await;
    assert_eq!(parse_body(res).await["placement"], "confirmed");

    let mut set = JoinSet::new();
    for (name, email) in [("Dana", "dana@example.com"), ("Evan", "evan@example.com")] {
        let allocator = app.state.allocator.clone();
        let slot_id = slot_id.clone();
        let attendee = AttendeeInfo { name: name.to_string(), email: email.to_string() };
        set.spawn(async move { allocator.request_booking(&slot_id, &attendee, false).await });
    }

    let mut placements = Vec::new();
    while let Some(res) = set.join_next().await {
        let (_, placement) = res.unwrap().expect("booking request failed");
        placements.push(placement);
    }

    let confirmed = placements.iter().filter(|p| **p == Placement::Confirmed).count();
    let waitlisted = placements.iter().filter(|p| **p == Placement::Waitlisted).count();
    assert_eq!(confirmed, 1);
    assert_eq!(waitlisted, 1);

    let db_confirmed = app.state.slot_store.confirmed_count(&slot_id).await.unwrap();
    assert_eq!(db_confirmed, 2, "capacity ceiling must hold under the race");
}

#[tokio::test]
async fn test_concurrent_marks_on_same_booking_keep_one_state() {
    let app = TestApp::new().await;
    let event_id = app.create_event("Contended Mark").await;
    let start = Utc::now() - Duration::hours(3);
    let slot_id = app.create_slot(&event_id, start, start + Duration::hours(1), 2).await;
    let body = parse_body(app.import_booking(&slot_id, "Alice", "alice@example.com").await).await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    use slot_engine::domain::models::booking::AttendanceMark;
    use slot_engine::domain::services::attendance::{MarkOptions, MarkSource};

    let mut set = JoinSet::new();
    for (mark, source) in [
        (AttendanceMark::Attended, MarkSource::Ui),
        (AttendanceMark::NoShow, MarkSource::MeetSync),
    ] {
        let attendance = app.state.attendance.clone();
        let booking_id = booking_id.clone();
        set.spawn(async move {
            let opts = MarkOptions { force: false, send_no_show_email: false, source };
            attendance.mark(&booking_id, mark, &opts).await
        });
    }

    let mut ok = 0;
    while let Some(res) = set.join_next().await {
        if res.unwrap().is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 1, "only one writer may mark an unmarked booking");

    let booking = app.state.slot_store.find_booking(&booking_id).await.unwrap().unwrap();
    let both_set = booking.attended_at.is_some() && booking.no_show_at.is_some();
    assert!(!both_set, "attended_at and no_show_at must stay mutually exclusive");
    assert!(booking.attended_at.is_some() || booking.no_show_at.is_some());
}
