use axum::{extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::dtos::requests::CreateBookingRequest;
use crate::api::dtos::responses::PlacementResponse;
use crate::domain::models::booking::AttendeeInfo;
use crate::error::AppError;
use crate::state::AppState;

pub async fn request_booking(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attendee = AttendeeInfo { name: payload.name, email: payload.email };
    let (booking, placement) = state.allocator.request_booking(&slot_id, &attendee, false).await?;
    Ok(Json(PlacementResponse { placement, booking }))
}

// Backfill/import path for seeding tools; the only caller allowed to create
// bookings against slots that already started.
pub async fn import_booking(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attendee = AttendeeInfo { name: payload.name, email: payload.email };
    let (booking, placement) = state.allocator.request_booking(&slot_id, &attendee, true).await?;
    info!("Booking imported: {} on slot {}", booking.id, slot_id);
    Ok(Json(PlacementResponse { placement, booking }))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.slot_store.find_booking(&booking_id).await?
        .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))?;
    Ok(Json(booking))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.slot_store.find_slot(&slot_id).await?
        .ok_or(AppError::NotFound(format!("Slot {} not found", slot_id)))?;

    let bookings = state.slot_store.list_bookings_by_slot(&slot_id).await?;
    Ok(Json(bookings))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (booking, freed_confirmed) = state.slot_store.cancel_booking(&booking_id).await?;
    info!("Booking cancelled: {}", booking_id);

    if freed_confirmed {
        // The seat is already free in storage; if promotion fails now the
        // reconciliation sweep completes it.
        if let Err(e) = state.promoter.on_capacity_freed(&booking.slot_id).await {
            error!("Promotion after cancellation failed: {:?}", e);
        }
    }

    Ok(Json(booking))
}
