use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::dtos::requests::AttendeeContextRequest;
use crate::error::AppError;
use crate::state::AppState;

const MAX_BATCH: usize = 100;

pub async fn attendee_context(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AttendeeContextRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.emails.is_empty() {
        return Err(AppError::Validation("emails must not be empty".into()));
    }
    if payload.emails.len() > MAX_BATCH {
        return Err(AppError::Validation(format!("At most {} emails per request", MAX_BATCH)));
    }

    let contexts = state.context.context_for(&payload.emails).await?;
    Ok(Json(contexts))
}
