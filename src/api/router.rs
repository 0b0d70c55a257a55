use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, event, slot, booking, attendance, attendee, side_effect};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Events
        .route("/api/v1/events", post(event::create_event).get(event::list_events))
        .route("/api/v1/events/{event_id}/slots", post(slot::create_slot).get(slot::list_slots))
        .route("/api/v1/events/{event_id}/attendance-summary", get(event::attendance_summary))

        // Slots
        .route("/api/v1/slots/{slot_id}", get(slot::get_slot))
        .route("/api/v1/slots/{slot_id}/cancel", post(slot::cancel_slot))
        .route("/api/v1/slots/{slot_id}/capacity", put(slot::set_capacity))
        .route("/api/v1/slots/{slot_id}/recording", put(slot::set_recording))
        .route("/api/v1/slots/{slot_id}/summary", get(slot::slot_summary))

        // Booking intake
        .route("/api/v1/slots/{slot_id}/bookings", post(booking::request_booking).get(booking::list_bookings))
        .route("/api/v1/slots/{slot_id}/bookings/import", post(booking::import_booking))

        // Bookings
        .route("/api/v1/bookings/{booking_id}", get(booking::get_booking))
        .route("/api/v1/bookings/{booking_id}/cancel", post(booking::cancel_booking))
        .route("/api/v1/bookings/{booking_id}/attendance", post(attendance::mark_attendance))
        .route("/api/v1/bookings/{booking_id}/feedback", post(attendance::submit_feedback))
        .route("/api/v1/bookings/{booking_id}/side-effects", get(side_effect::list_booking_side_effects))
        .route("/api/v1/bookings/attendance/bulk", post(attendance::bulk_mark_attendance))

        // Dashboards
        .route("/api/v1/attendees/context", post(attendee::attendee_context))
        .route("/api/v1/side-effects", get(side_effect::list_side_effects))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
