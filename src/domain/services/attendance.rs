use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::domain::clock::Clock;
use crate::domain::models::booking::{AttendanceMark, AttendanceState, Booking};
use crate::domain::models::side_effect::SideEffect;
use crate::domain::ports::SlotStore;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkSource {
    Ui,
    MeetSync,
    Import,
}

impl MarkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkSource::Ui => "ui",
            MarkSource::MeetSync => "meet_sync",
            MarkSource::Import => "import",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MarkOptions {
    pub force: bool,
    pub send_no_show_email: bool,
    pub source: MarkSource,
}

impl Default for MarkOptions {
    fn default() -> Self {
        Self { force: false, send_no_show_email: false, source: MarkSource::Ui }
    }
}

pub struct BulkOutcome {
    pub booking_id: String,
    pub result: Result<Booking, AppError>,
}

/// Guards the unmarked → attended/no_show → (clear) → unmarked lifecycle.
///
/// A booking already marked one way is never silently flipped to the other:
/// the caller either clears first or passes `force`, which is reserved for a
/// human correcting state they have just looked at. The automated Meet-sync
/// path never forces, so it cannot clobber a manual mark it lost a race to.
pub struct AttendanceService {
    store: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn SlotStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn mark(
        &self,
        booking_id: &str,
        mark: AttendanceMark,
        opts: &MarkOptions,
    ) -> Result<Booking, AppError> {
        let (booking, slot) = self.store.find_booking_with_slot(booking_id).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))?;

        if booking.is_cancelled() {
            return Err(AppError::BookingCancelled);
        }
        if slot.cancelled {
            return Err(AppError::SlotCancelled);
        }

        let now = self.clock.now_utc();
        let state = booking.attendance_state();

        match mark {
            AttendanceMark::Attended | AttendanceMark::NoShow => {
                if !slot.has_ended(now) {
                    return Err(AppError::SessionNotEnded);
                }
                if state != AttendanceState::Unmarked && !opts.force {
                    return Err(AppError::AlreadyMarked);
                }
            }
            // Clear is always a permitted correction.
            AttendanceMark::Clear => {
                if state == AttendanceState::Unmarked {
                    return Ok(booking);
                }
            }
        }

        let status_label = match mark {
            AttendanceMark::Attended => "attended",
            AttendanceMark::NoShow => "no_show",
            AttendanceMark::Clear => "cleared",
        };

        let detail = json!({
            "status": status_label,
            "source": opts.source.as_str(),
            "forced": opts.force,
            "marked_at": now,
        });

        let mut intents = vec![SideEffect::crm_sync(&booking, &slot, detail)];
        if mark == AttendanceMark::NoShow && opts.send_no_show_email {
            intents.push(SideEffect::no_show_email(&booking, &slot, json!({
                "slot_start": slot.start_time,
                "event_id": slot.event_id,
            })));
        }

        let updated = self.store.apply_attendance(booking_id, mark, opts.force, intents).await?;
        info!(
            booking_id = %booking_id,
            status = status_label,
            source = opts.source.as_str(),
            forced = opts.force,
            "Attendance updated"
        );
        Ok(updated)
    }

    /// Applies the single-booking rule per entry. Failures are reported per
    /// id; the other entries go through untouched.
    pub async fn bulk_mark(
        &self,
        booking_ids: &[String],
        mark: AttendanceMark,
        opts: &MarkOptions,
    ) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(booking_ids.len());
        for id in booking_ids {
            let result = self.mark(id, mark, opts).await;
            outcomes.push(BulkOutcome { booking_id: id.clone(), result });
        }
        outcomes
    }

    /// Write-once attendee feedback, accepted only after the session ended.
    pub async fn submit_feedback(
        &self,
        booking_id: &str,
        rating: i64,
        comments: Option<&str>,
    ) -> Result<Booking, AppError> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation("Rating must be between 1 and 5".into()));
        }

        let (booking, slot) = self.store.find_booking_with_slot(booking_id).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))?;

        if booking.is_cancelled() {
            return Err(AppError::BookingCancelled);
        }
        if !slot.has_ended(self.clock.now_utc()) {
            return Err(AppError::SessionNotEnded);
        }

        let updated = self.store.record_feedback(booking_id, rating, comments).await?;
        info!(booking_id = %booking_id, rating = rating, "Feedback recorded");
        Ok(updated)
    }
}
