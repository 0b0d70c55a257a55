use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Slot {
    pub id: String,
    pub event_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i64,
    pub cancelled: bool,
    pub meeting_link: Option<String>,
    pub recording_link: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

pub struct NewSlotParams {
    pub event_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub capacity: i64,
    pub meeting_link: Option<String>,
}

impl Slot {
    pub fn new(params: NewSlotParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: params.event_id,
            start_time: params.start,
            end_time: params.end,
            capacity: params.capacity,
            cancelled: false,
            meeting_link: params.meeting_link,
            recording_link: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }
}

/// Seat usage for a slot, derived once from (confirmed count, capacity).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Occupancy {
    pub confirmed: i64,
    pub capacity: i64,
    pub free_seats: i64,
    pub utilization_pct: f64,
}
