use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::models::booking::AttendanceMark;
use crate::domain::services::attendance::MarkSource;

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
}

#[derive(Deserialize)]
pub struct CreateSlotRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i64,
    pub meeting_link: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct SetCapacityRequest {
    pub capacity: i64,
}

#[derive(Deserialize)]
pub struct SetRecordingRequest {
    pub recording_link: String,
}

#[derive(Deserialize)]
pub struct MarkAttendanceRequest {
    pub status: AttendanceMark,
    pub force: Option<bool>,
    pub send_no_show_email: Option<bool>,
    pub source: Option<MarkSource>,
}

#[derive(Deserialize)]
pub struct BulkMarkAttendanceRequest {
    pub booking_ids: Vec<String>,
    pub status: AttendanceMark,
    pub force: Option<bool>,
    pub send_no_show_email: Option<bool>,
    pub source: Option<MarkSource>,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub rating: i64,
    pub comments: Option<String>,
}

#[derive(Deserialize)]
pub struct AttendeeContextRequest {
    pub emails: Vec<String>,
}
