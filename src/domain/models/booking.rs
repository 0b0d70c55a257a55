use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub slot_id: String,
    pub attendee_name: String,
    pub attendee_email: String,
    pub waitlisted: bool,
    pub waitlist_position: Option<i64>,
    pub attended_at: Option<DateTime<Utc>>,
    pub no_show_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rating: Option<i64>,
    pub feedback_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AttendeeInfo {
    pub name: String,
    pub email: String,
}

/// Attendee identity is matched on the normalized form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Confirmed,
    Waitlisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceState {
    Unmarked,
    Attended,
    NoShow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceMark {
    Attended,
    NoShow,
    Clear,
}

impl Booking {
    pub fn new(slot_id: &str, attendee: &AttendeeInfo, waitlisted: bool, position: Option<i64>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            slot_id: slot_id.to_string(),
            attendee_name: attendee.name.trim().to_string(),
            attendee_email: normalize_email(&attendee.email),
            waitlisted,
            waitlist_position: position,
            attended_at: None,
            no_show_at: None,
            cancelled_at: None,
            rating: None,
            feedback_comment: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    pub fn attendance_state(&self) -> AttendanceState {
        if self.attended_at.is_some() {
            AttendanceState::Attended
        } else if self.no_show_at.is_some() {
            AttendanceState::NoShow
        } else {
            AttendanceState::Unmarked
        }
    }

    pub fn placement(&self) -> Placement {
        if self.waitlisted {
            Placement::Waitlisted
        } else {
            Placement::Confirmed
        }
    }
}
