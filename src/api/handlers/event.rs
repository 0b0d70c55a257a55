use axum::{extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::CreateEventRequest;
use crate::domain::models::event::Event;
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Event title must not be empty".into()));
    }

    let event = Event::new(payload.title.trim().to_string());
    let created = state.event_repo.create(&event).await?;
    info!("Event created: {}", created.id);
    Ok(Json(created))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let events = state.event_repo.list().await?;
    Ok(Json(events))
}

pub async fn attendance_summary(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound(format!("Event {} not found", event_id)))?;

    let summary = state.slot_store.event_attendance_summary(&event_id).await?;
    Ok(Json(summary))
}
