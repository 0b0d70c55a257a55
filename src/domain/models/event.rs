use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            created_at: Utc::now(),
        }
    }
}

/// Per-event attendance rollup for dashboard reads.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AttendanceSummary {
    pub event_id: String,
    pub total_bookings: i64,
    pub confirmed: i64,
    pub waitlisted: i64,
    pub attended: i64,
    pub no_shows: i64,
    pub cancelled: i64,
    pub unmarked: i64,
}
