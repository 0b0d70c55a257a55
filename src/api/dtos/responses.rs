use serde::Serialize;

use crate::domain::models::booking::{Booking, Placement};
use crate::domain::models::slot::Occupancy;

#[derive(Serialize)]
pub struct PlacementResponse {
    pub placement: Placement,
    pub booking: Booking,
}

#[derive(Serialize)]
pub struct SlotSummaryResponse {
    pub slot_id: String,
    pub occupancy: Occupancy,
    pub waitlisted: i64,
}

#[derive(Serialize)]
pub struct BulkMarkEntry {
    pub booking_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct BulkMarkResponse {
    pub updated: usize,
    pub failed: usize,
    pub results: Vec<BulkMarkEntry>,
}
