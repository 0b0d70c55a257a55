use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::models::booking::Booking;
use crate::domain::models::slot::Slot;

pub const INTENT_NO_SHOW_EMAIL: &str = "no_show_email";
pub const INTENT_CRM_SYNC: &str = "crm_sync";
pub const INTENT_WAITLIST_PROMOTED: &str = "waitlist_promoted";

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_PROCESSING: &str = "PROCESSING";
pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_FAILED: &str = "FAILED";
pub const STATUS_SKIPPED_DUPLICATE: &str = "SKIPPED_DUPLICATE";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IntentPayload {
    pub booking_id: String,
    pub slot_id: String,
    pub attendee_email: String,
    pub attendee_name: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

/// Outbound intent row. Written in the same transaction as the state change
/// that caused it; delivered later by the background worker.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct SideEffect {
    pub id: String,
    pub intent_type: String, // "no_show_email" | "crm_sync" | "waitlist_promoted"
    pub booking_id: String,
    pub payload: Json<IntentPayload>,
    pub dedup_hash: String,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub execute_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SideEffect {
    pub fn new(intent_type: &str, payload: IntentPayload) -> Self {
        let payload_json = serde_json::to_string(&payload).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(intent_type.as_bytes());
        hasher.update(payload.booking_id.as_bytes());
        hasher.update(payload_json.as_bytes());
        let dedup_hash = hex::encode(hasher.finalize());

        Self {
            id: Uuid::new_v4().to_string(),
            intent_type: intent_type.to_string(),
            booking_id: payload.booking_id.clone(),
            payload: Json(payload),
            dedup_hash,
            status: STATUS_PENDING.to_string(),
            attempts: 0,
            last_error: None,
            execute_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    pub fn crm_sync(booking: &Booking, slot: &Slot, detail: serde_json::Value) -> Self {
        Self::new(INTENT_CRM_SYNC, IntentPayload {
            booking_id: booking.id.clone(),
            slot_id: slot.id.clone(),
            attendee_email: booking.attendee_email.clone(),
            attendee_name: booking.attendee_name.clone(),
            detail,
        })
    }

    pub fn no_show_email(booking: &Booking, slot: &Slot, detail: serde_json::Value) -> Self {
        Self::new(INTENT_NO_SHOW_EMAIL, IntentPayload {
            booking_id: booking.id.clone(),
            slot_id: slot.id.clone(),
            attendee_email: booking.attendee_email.clone(),
            attendee_name: booking.attendee_name.clone(),
            detail,
        })
    }

    pub fn waitlist_promoted(booking: &Booking, slot: &Slot) -> Self {
        Self::new(INTENT_WAITLIST_PROMOTED, IntentPayload {
            booking_id: booking.id.clone(),
            slot_id: slot.id.clone(),
            attendee_email: booking.attendee_email.clone(),
            attendee_name: booking.attendee_name.clone(),
            detail: serde_json::json!({
                "slot_start": slot.start_time,
                "meeting_link": slot.meeting_link,
            }),
        })
    }
}
