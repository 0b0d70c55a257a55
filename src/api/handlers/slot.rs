use axum::{extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::dtos::requests::{CreateSlotRequest, SetCapacityRequest, SetRecordingRequest};
use crate::api::dtos::responses::SlotSummaryResponse;
use crate::domain::models::slot::{NewSlotParams, Slot};
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound(format!("Event {} not found", event_id)))?;

    if payload.capacity < 0 {
        return Err(AppError::Validation("Capacity must not be negative".into()));
    }
    if payload.end_time <= payload.start_time {
        return Err(AppError::Validation("Slot end time must be after start time".into()));
    }

    let slot = Slot::new(NewSlotParams {
        event_id,
        start: payload.start_time,
        end: payload.end_time,
        capacity: payload.capacity,
        meeting_link: payload.meeting_link,
    });

    let created = state.slot_store.create_slot(&slot).await?;
    info!("Slot published: {} (capacity {})", created.id, created.capacity);
    Ok(Json(created))
}

pub async fn get_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let slot = state.slot_store.find_slot(&slot_id).await?
        .ok_or(AppError::NotFound(format!("Slot {} not found", slot_id)))?;
    Ok(Json(slot))
}

pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound(format!("Event {} not found", event_id)))?;

    let slots = state.slot_store.list_slots_by_event(&event_id).await?;
    Ok(Json(slots))
}

pub async fn cancel_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cancelled = state.slot_store.cancel_slot(&slot_id).await?;
    info!("Slot cancelled: {}", slot_id);
    Ok(Json(cancelled))
}

pub async fn set_capacity(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
    Json(payload): Json<SetCapacityRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.capacity < 0 {
        return Err(AppError::Validation("Capacity must not be negative".into()));
    }

    let previous = state.slot_store.find_slot(&slot_id).await?
        .ok_or(AppError::NotFound(format!("Slot {} not found", slot_id)))?;

    let updated = state.slot_store.set_capacity(&slot_id, payload.capacity).await?;
    info!("Slot {} capacity changed: {} -> {}", slot_id, previous.capacity, updated.capacity);

    if updated.capacity > previous.capacity {
        // Freed seats go to the waitlist; a failure here is picked up by the
        // reconciliation sweep, the capacity change itself stands.
        if let Err(e) = state.promoter.on_capacity_freed(&slot_id).await {
            error!("Promotion after capacity increase failed: {:?}", e);
        }
    }

    Ok(Json(updated))
}

pub async fn set_recording(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
    Json(payload): Json<SetRecordingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.slot_store.set_recording_link(&slot_id, &payload.recording_link).await?;
    Ok(Json(updated))
}

pub async fn slot_summary(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (occupancy, waitlisted) = state.allocator.slot_occupancy(&slot_id).await?;
    Ok(Json(SlotSummaryResponse { slot_id, occupancy, waitlisted }))
}
