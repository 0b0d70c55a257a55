use axum::{extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;

use crate::error::AppError;
use crate::state::AppState;

pub async fn list_side_effects(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let intents = state.side_effect_repo.list_recent(100).await?;
    Ok(Json(intents))
}

pub async fn list_booking_side_effects(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let intents = state.side_effect_repo.list_by_booking(&booking_id).await?;
    Ok(Json(intents))
}
