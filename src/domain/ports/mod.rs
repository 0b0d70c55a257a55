use crate::domain::models::{
    event::{Event, AttendanceSummary},
    slot::Slot,
    booking::{AttendanceMark, AttendeeInfo, Booking, Placement},
    side_effect::SideEffect,
    attendee_context::{AttendeeContext, EnrichmentProfile, SessionHistory},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    async fn list(&self) -> Result<Vec<Event>, AppError>;
}

/// Sole owner of slot and booking rows. Every capacity, waitlist and
/// attendance mutation goes through a transaction here; callers never touch
/// rows directly.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn create_slot(&self, slot: &Slot) -> Result<Slot, AppError>;
    async fn find_slot(&self, id: &str) -> Result<Option<Slot>, AppError>;
    async fn list_slots_by_event(&self, event_id: &str) -> Result<Vec<Slot>, AppError>;
    async fn cancel_slot(&self, id: &str) -> Result<Slot, AppError>;
    async fn set_capacity(&self, id: &str, capacity: i64) -> Result<Slot, AppError>;
    async fn set_recording_link(&self, id: &str, link: &str) -> Result<Slot, AppError>;

    /// Linearizable count-then-insert under the slot's write lock. Decides
    /// confirmed vs. waitlisted placement.
    async fn place_booking(&self, slot_id: &str, attendee: &AttendeeInfo, allow_past: bool) -> Result<(Booking, Placement), AppError>;
    async fn find_booking(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn find_booking_with_slot(&self, id: &str) -> Result<Option<(Booking, Slot)>, AppError>;
    async fn list_bookings_by_slot(&self, slot_id: &str) -> Result<Vec<Booking>, AppError>;
    /// Returns the cancelled booking and whether a confirmed seat was freed.
    async fn cancel_booking(&self, id: &str) -> Result<(Booking, bool), AppError>;
    /// Fills free seats from the waitlist in arrival order, queueing a
    /// promotion intent per filled seat. No-op when nothing is free.
    async fn promote_waitlisted(&self, slot_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn apply_attendance(&self, booking_id: &str, mark: AttendanceMark, force: bool, intents: Vec<SideEffect>) -> Result<Booking, AppError>;
    async fn record_feedback(&self, booking_id: &str, rating: i64, comments: Option<&str>) -> Result<Booking, AppError>;

    async fn confirmed_count(&self, slot_id: &str) -> Result<i64, AppError>;
    async fn waitlist_count(&self, slot_id: &str) -> Result<i64, AppError>;
    async fn event_attendance_summary(&self, event_id: &str) -> Result<AttendanceSummary, AppError>;
    async fn attendee_history(&self, email: &str, recent_limit: i64) -> Result<SessionHistory, AppError>;
    /// Slots with free seats and a non-empty waitlist, for the
    /// reconciliation sweep.
    async fn slots_awaiting_promotion(&self, limit: i64) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait SideEffectRepository: Send + Sync {
    async fn enqueue(&self, intent: &SideEffect) -> Result<SideEffect, AppError>;
    async fn claim_due(&self, limit: i64) -> Result<Vec<SideEffect>, AppError>;
    async fn mark_completed(&self, id: &str) -> Result<(), AppError>;
    async fn mark_skipped(&self, id: &str) -> Result<(), AppError>;
    async fn mark_failed(&self, id: &str, error: &str, max_attempts: i64, retry_at: DateTime<Utc>) -> Result<(), AppError>;
    async fn has_completed_with_hash(&self, dedup_hash: &str) -> Result<bool, AppError>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<SideEffect>, AppError>;
    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<SideEffect>, AppError>;
}

/// Outbound boundary for notification/CRM workers.
#[async_trait]
pub trait IntentSink: Send + Sync {
    async fn deliver(&self, intent: &SideEffect) -> Result<(), AppError>;
}

#[async_trait]
pub trait EnrichmentService: Send + Sync {
    async fn lookup(&self, email: &str) -> Result<Option<EnrichmentProfile>, AppError>;
}

/// Snapshot storage behind the attendee context cache. In-process map for a
/// single instance; a shared backend can be swapped in without touching the
/// cache logic.
#[async_trait]
pub trait ContextCacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<AttendeeContext>;
    async fn put(&self, key: &str, ctx: AttendeeContext);
    async fn invalidate(&self, key: &str);
}
