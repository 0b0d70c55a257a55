use axum::{extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::dtos::requests::{BulkMarkAttendanceRequest, FeedbackRequest, MarkAttendanceRequest};
use crate::api::dtos::responses::{BulkMarkEntry, BulkMarkResponse};
use crate::domain::services::attendance::{MarkOptions, MarkSource};
use crate::error::AppError;
use crate::state::AppState;

pub async fn mark_attendance(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(payload): Json<MarkAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let opts = MarkOptions {
        force: payload.force.unwrap_or(false),
        send_no_show_email: payload.send_no_show_email.unwrap_or(false),
        source: payload.source.unwrap_or(MarkSource::Ui),
    };

    let updated = state.attendance.mark(&booking_id, payload.status, &opts).await?;
    Ok(Json(updated))
}

pub async fn bulk_mark_attendance(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkMarkAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.booking_ids.is_empty() {
        return Err(AppError::Validation("booking_ids must not be empty".into()));
    }

    let opts = MarkOptions {
        force: payload.force.unwrap_or(false),
        send_no_show_email: payload.send_no_show_email.unwrap_or(false),
        source: payload.source.unwrap_or(MarkSource::Ui),
    };

    let outcomes = state.attendance.bulk_mark(&payload.booking_ids, payload.status, &opts).await;

    let mut updated = 0;
    let mut failed = 0;
    let results = outcomes.into_iter().map(|o| match o.result {
        Ok(_) => {
            updated += 1;
            BulkMarkEntry { booking_id: o.booking_id, status: "updated".to_string(), error: None }
        }
        Err(e) => {
            failed += 1;
            BulkMarkEntry { booking_id: o.booking_id, status: "failed".to_string(), error: Some(e.to_string()) }
        }
    }).collect();

    Ok(Json(BulkMarkResponse { updated, failed, results }))
}

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.attendance
        .submit_feedback(&booking_id, payload.rating, payload.comments.as_deref())
        .await?;
    Ok(Json(updated))
}
