use crate::domain::models::{
    attendee_context::SessionHistory,
    booking::{normalize_email, AttendanceMark, AttendeeInfo, Booking, Placement},
    event::AttendanceSummary,
    side_effect::SideEffect,
    slot::Slot,
};
use crate::domain::ports::SlotStore;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

pub struct SqliteSlotStore {
    pool: SqlitePool,
}

impl SqliteSlotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// The version bump acquires the write lock before any capacity read, so all
// capacity/waitlist transactions against a slot serialize at the storage
// layer. Returns the locked slot snapshot.
async fn lock_slot(tx: &mut Transaction<'_, Sqlite>, slot_id: &str) -> Result<Option<Slot>, AppError> {
    sqlx::query_as::<_, Slot>("UPDATE slots SET version = version + 1 WHERE id = ? RETURNING *")
        .bind(slot_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)
}

async fn insert_intent(tx: &mut Transaction<'_, Sqlite>, intent: &SideEffect) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO side_effects (id, intent_type, booking_id, payload, dedup_hash, status, attempts, last_error, execute_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
        .bind(&intent.id).bind(&intent.intent_type).bind(&intent.booking_id).bind(&intent.payload)
        .bind(&intent.dedup_hash).bind(&intent.status).bind(intent.attempts).bind(&intent.last_error)
        .bind(intent.execute_at).bind(intent.created_at)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

#[async_trait]
impl SlotStore for SqliteSlotStore {
    async fn create_slot(&self, slot: &Slot) -> Result<Slot, AppError> {
        sqlx::query_as::<_, Slot>(
            "INSERT INTO slots (id, event_id, start_time, end_time, capacity, cancelled, meeting_link, recording_link, version, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&slot.id).bind(&slot.event_id).bind(slot.start_time).bind(slot.end_time)
            .bind(slot.capacity).bind(slot.cancelled).bind(&slot.meeting_link).bind(&slot.recording_link)
            .bind(slot.version).bind(slot.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_slot(&self, id: &str) -> Result<Option<Slot>, AppError> {
        sqlx::query_as::<_, Slot>("SELECT * FROM slots WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_slots_by_event(&self, event_id: &str) -> Result<Vec<Slot>, AppError> {
        sqlx::query_as::<_, Slot>("SELECT * FROM slots WHERE event_id = ? ORDER BY start_time ASC")
            .bind(event_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn cancel_slot(&self, id: &str) -> Result<Slot, AppError> {
        sqlx::query_as::<_, Slot>("UPDATE slots SET cancelled = 1, version = version + 1 WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound(format!("Slot {} not found", id)))
    }

    async fn set_capacity(&self, id: &str, capacity: i64) -> Result<Slot, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let slot = lock_slot(&mut tx, id).await?
            .ok_or(AppError::NotFound(format!("Slot {} not found", id)))?;
        if slot.cancelled {
            return Err(AppError::SlotCancelled);
        }
        let updated = sqlx::query_as::<_, Slot>("UPDATE slots SET capacity = ? WHERE id = ? RETURNING *")
            .bind(capacity).bind(id)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn set_recording_link(&self, id: &str, link: &str) -> Result<Slot, AppError> {
        sqlx::query_as::<_, Slot>("UPDATE slots SET recording_link = ? WHERE id = ? RETURNING *")
            .bind(link).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound(format!("Slot {} not found", id)))
    }

    async fn place_booking(&self, slot_id: &str, attendee: &AttendeeInfo, allow_past: bool) -> Result<(Booking, Placement), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let slot = lock_slot(&mut tx, slot_id).await?
            .ok_or(AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        if slot.cancelled {
            return Err(AppError::SlotCancelled);
        }
        if !allow_past && slot.has_started(Utc::now()) {
            return Err(AppError::SlotInPast);
        }

        let email = normalize_email(&attendee.email);
        let duplicates: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE slot_id = ? AND attendee_email = ? AND cancelled_at IS NULL"
        )
            .bind(slot_id).bind(&email)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        if duplicates > 0 {
            return Err(AppError::DuplicateBooking);
        }

        let confirmed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE slot_id = ? AND waitlisted = 0 AND cancelled_at IS NULL"
        )
            .bind(slot_id)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        let (booking, placement) = if confirmed < slot.capacity {
            (Booking::new(slot_id, attendee, false, None), Placement::Confirmed)
        } else {
            let max_pos: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(waitlist_position), 0) FROM bookings WHERE slot_id = ? AND waitlisted = 1 AND cancelled_at IS NULL"
            )
                .bind(slot_id)
                .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
            (Booking::new(slot_id, attendee, true, Some(max_pos + 1)), Placement::Waitlisted)
        };

        let created = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, slot_id, attendee_name, attendee_email, waitlisted, waitlist_position, attended_at, no_show_at, cancelled_at, rating, feedback_comment, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.slot_id).bind(&booking.attendee_name).bind(&booking.attendee_email)
            .bind(booking.waitlisted).bind(booking.waitlist_position).bind(booking.attended_at).bind(booking.no_show_at)
            .bind(booking.cancelled_at).bind(booking.rating).bind(&booking.feedback_comment).bind(booking.created_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok((created, placement))
    }

    async fn find_booking(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_booking_with_slot(&self, id: &str) -> Result<Option<(Booking, Slot)>, AppError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)?;
        let Some(booking) = booking else { return Ok(None) };
        let slot = sqlx::query_as::<_, Slot>("SELECT * FROM slots WHERE id = ?")
            .bind(&booking.slot_id).fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(Some((booking, slot)))
    }

    async fn list_bookings_by_slot(&self, slot_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE slot_id = ? ORDER BY waitlisted ASC, waitlist_position ASC, created_at ASC"
        )
            .bind(slot_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn cancel_booking(&self, id: &str) -> Result<(Booking, bool), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let existing = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id).fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound(format!("Booking {} not found", id)))?;
        if existing.cancelled_at.is_some() {
            return Err(AppError::BookingCancelled);
        }

        let slot = lock_slot(&mut tx, &existing.slot_id).await?
            .ok_or(AppError::InternalWithMsg(format!("Slot {} missing for booking {}", existing.slot_id, id)))?;

        let cancelled = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET cancelled_at = ? WHERE id = ? AND cancelled_at IS NULL RETURNING *"
        )
            .bind(Utc::now()).bind(id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::BookingCancelled)?;

        // Keep remaining waitlist positions contiguous.
        if cancelled.waitlisted {
            if let Some(pos) = cancelled.waitlist_position {
                sqlx::query(
                    "UPDATE bookings SET waitlist_position = waitlist_position - 1
                     WHERE slot_id = ? AND waitlisted = 1 AND cancelled_at IS NULL AND waitlist_position > ?"
                )
                    .bind(&cancelled.slot_id).bind(pos)
                    .execute(&mut *tx).await.map_err(AppError::Database)?;
            }
        }

        let freed_confirmed = !cancelled.waitlisted && !slot.cancelled;
        tx.commit().await.map_err(AppError::Database)?;
        Ok((cancelled, freed_confirmed))
    }

    async fn promote_waitlisted(&self, slot_id: &str) -> Result<Vec<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let slot = lock_slot(&mut tx, slot_id).await?
            .ok_or(AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        if slot.cancelled {
            return Ok(Vec::new());
        }

        let confirmed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE slot_id = ? AND waitlisted = 0 AND cancelled_at IS NULL"
        )
            .bind(slot_id)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        let mut free = slot.capacity - confirmed;
        let mut promoted = Vec::new();

        while free > 0 {
            let next = sqlx::query_as::<_, Booking>(
                "SELECT * FROM bookings WHERE slot_id = ? AND waitlisted = 1 AND cancelled_at IS NULL
                 ORDER BY waitlist_position ASC LIMIT 1"
            )
                .bind(slot_id)
                .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
            let Some(next) = next else { break };
            let pos = next.waitlist_position.unwrap_or(0);

            let updated = sqlx::query_as::<_, Booking>(
                "UPDATE bookings SET waitlisted = 0, waitlist_position = NULL WHERE id = ? RETURNING *"
            )
                .bind(&next.id)
                .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

            sqlx::query(
                "UPDATE bookings SET waitlist_position = waitlist_position - 1
                 WHERE slot_id = ? AND waitlisted = 1 AND cancelled_at IS NULL AND waitlist_position > ?"
            )
                .bind(slot_id).bind(pos)
                .execute(&mut *tx).await.map_err(AppError::Database)?;

            let intent = SideEffect::waitlist_promoted(&updated, &slot);
            insert_intent(&mut tx, &intent).await?;

            promoted.push(updated);
            free -= 1;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(promoted)
    }

    async fn apply_attendance(&self, booking_id: &str, mark: AttendanceMark, force: bool, intents: Vec<SideEffect>) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let now = Utc::now();

        // The slot check rides inside the guarded update so a slot cancelled
        // after the caller's validation read still blocks the write.
        let updated = match mark {
            AttendanceMark::Attended => sqlx::query_as::<_, Booking>(
                "UPDATE bookings SET attended_at = ?, no_show_at = NULL
                 WHERE id = ? AND cancelled_at IS NULL AND (? OR (attended_at IS NULL AND no_show_at IS NULL))
                 AND EXISTS (SELECT 1 FROM slots s WHERE s.id = bookings.slot_id AND s.cancelled = 0)
                 RETURNING *"
            )
                .bind(now).bind(booking_id).bind(force)
                .fetch_optional(&mut *tx).await.map_err(AppError::Database)?,
            AttendanceMark::NoShow => sqlx::query_as::<_, Booking>(
                "UPDATE bookings SET no_show_at = ?, attended_at = NULL
                 WHERE id = ? AND cancelled_at IS NULL AND (? OR (attended_at IS NULL AND no_show_at IS NULL))
                 AND EXISTS (SELECT 1 FROM slots s WHERE s.id = bookings.slot_id AND s.cancelled = 0)
                 RETURNING *"
            )
                .bind(now).bind(booking_id).bind(force)
                .fetch_optional(&mut *tx).await.map_err(AppError::Database)?,
            AttendanceMark::Clear => sqlx::query_as::<_, Booking>(
                "UPDATE bookings SET attended_at = NULL, no_show_at = NULL
                 WHERE id = ? AND cancelled_at IS NULL
                 AND EXISTS (SELECT 1 FROM slots s WHERE s.id = bookings.slot_id AND s.cancelled = 0)
                 RETURNING *"
            )
                .bind(booking_id)
                .fetch_optional(&mut *tx).await.map_err(AppError::Database)?,
        };

        let Some(updated) = updated else {
            let existing = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
                .bind(booking_id)
                .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
            return Err(match existing {
                None => AppError::NotFound(format!("Booking {} not found", booking_id)),
                Some(b) if b.cancelled_at.is_some() => AppError::BookingCancelled,
                Some(b) => {
                    let slot_cancelled: bool = sqlx::query_scalar(
                        "SELECT cancelled FROM slots WHERE id = ?"
                    )
                        .bind(&b.slot_id)
                        .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
                    if slot_cancelled { AppError::SlotCancelled } else { AppError::AlreadyMarked }
                }
            });
        };

        for intent in &intents {
            insert_intent(&mut tx, intent).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn record_feedback(&self, booking_id: &str, rating: i64, comments: Option<&str>) -> Result<Booking, AppError> {
        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET rating = ?, feedback_comment = ?
             WHERE id = ? AND cancelled_at IS NULL AND rating IS NULL
             RETURNING *"
        )
            .bind(rating).bind(comments).bind(booking_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?;

        match updated {
            Some(b) => Ok(b),
            None => {
                let existing = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
                    .bind(booking_id)
                    .fetch_optional(&self.pool).await.map_err(AppError::Database)?;
                Err(match existing {
                    None => AppError::NotFound(format!("Booking {} not found", booking_id)),
                    Some(b) if b.cancelled_at.is_some() => AppError::BookingCancelled,
                    Some(_) => AppError::FeedbackAlreadyRecorded,
                })
            }
        }
    }

    async fn confirmed_count(&self, slot_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE slot_id = ? AND waitlisted = 0 AND cancelled_at IS NULL"
        )
            .bind(slot_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn waitlist_count(&self, slot_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE slot_id = ? AND waitlisted = 1 AND cancelled_at IS NULL"
        )
            .bind(slot_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn event_attendance_summary(&self, event_id: &str) -> Result<AttendanceSummary, AppError> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN b.cancelled_at IS NULL AND b.waitlisted = 0 THEN 1 ELSE 0 END), 0) AS confirmed,
                COALESCE(SUM(CASE WHEN b.cancelled_at IS NULL AND b.waitlisted = 1 THEN 1 ELSE 0 END), 0) AS waitlisted,
                COALESCE(SUM(CASE WHEN b.attended_at IS NOT NULL THEN 1 ELSE 0 END), 0) AS attended,
                COALESCE(SUM(CASE WHEN b.no_show_at IS NOT NULL THEN 1 ELSE 0 END), 0) AS no_shows,
                COALESCE(SUM(CASE WHEN b.cancelled_at IS NOT NULL THEN 1 ELSE 0 END), 0) AS cancelled
             FROM bookings b
             JOIN slots s ON s.id = b.slot_id
             WHERE s.event_id = ?"
        )
            .bind(event_id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;

        let confirmed: i64 = row.get("confirmed");
        let attended: i64 = row.get("attended");
        let no_shows: i64 = row.get("no_shows");
        Ok(AttendanceSummary {
            event_id: event_id.to_string(),
            total_bookings: row.get("total"),
            confirmed,
            waitlisted: row.get("waitlisted"),
            attended,
            no_shows,
            cancelled: row.get("cancelled"),
            unmarked: (confirmed - attended - no_shows).max(0),
        })
    }

    async fn attendee_history(&self, email: &str, recent_limit: i64) -> Result<SessionHistory, AppError> {
        let now = Utc::now();
        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN b.attended_at IS NOT NULL THEN 1 ELSE 0 END), 0) AS attended,
                COALESCE(SUM(CASE WHEN b.no_show_at IS NOT NULL THEN 1 ELSE 0 END), 0) AS no_shows,
                MAX(s.end_time) AS last_session_at
             FROM bookings b
             JOIN slots s ON s.id = b.slot_id
             WHERE b.attendee_email = ? AND b.cancelled_at IS NULL AND s.end_time <= ?"
        )
            .bind(email).bind(now)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;

        let titles: Vec<String> = sqlx::query_scalar(
            "SELECT e.title
             FROM bookings b
             JOIN slots s ON s.id = b.slot_id
             JOIN events e ON e.id = s.event_id
             WHERE b.attendee_email = ? AND b.cancelled_at IS NULL AND s.end_time <= ?
             ORDER BY s.end_time DESC LIMIT ?"
        )
            .bind(email).bind(now).bind(recent_limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;

        let mut recent_topics = Vec::new();
        for title in titles {
            if !recent_topics.contains(&title) {
                recent_topics.push(title);
            }
        }

        Ok(SessionHistory {
            total_sessions: row.get("total"),
            attended: row.get("attended"),
            no_shows: row.get("no_shows"),
            last_session_at: row.try_get("last_session_at").ok().flatten(),
            recent_topics,
        })
    }

    async fn slots_awaiting_promotion(&self, limit: i64) -> Result<Vec<String>, AppError> {
        sqlx::query_scalar(
            "SELECT s.id FROM slots s
             WHERE s.cancelled = 0
             AND EXISTS (
                 SELECT 1 FROM bookings b
                 WHERE b.slot_id = s.id AND b.waitlisted = 1 AND b.cancelled_at IS NULL
             )
             AND (
                 SELECT COUNT(*) FROM bookings b
                 WHERE b.slot_id = s.id AND b.waitlisted = 0 AND b.cancelled_at IS NULL
             ) < s.capacity
             LIMIT ?"
        )
            .bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
