use std::sync::Arc;
use tracing::info;

use crate::domain::models::booking::{AttendeeInfo, Booking, Placement};
use crate::domain::models::slot::Occupancy;
use crate::domain::ports::SlotStore;
use crate::error::AppError;

/// Single source of seat math. Every consumer of booked/capacity numbers
/// goes through this instead of recomputing percentages locally.
pub fn occupancy(confirmed: i64, capacity: i64) -> Occupancy {
    let free_seats = (capacity - confirmed).max(0);
    let utilization_pct = if capacity <= 0 {
        100.0
    } else {
        ((confirmed as f64 / capacity as f64) * 100.0).clamp(0.0, 100.0)
    };
    Occupancy { confirmed, capacity, free_seats, utilization_pct }
}

pub struct CapacityAllocator {
    store: Arc<dyn SlotStore>,
}

impl CapacityAllocator {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Places a booking request: confirmed while seats remain, waitlisted
    /// after that. The count-then-insert runs under the slot's write lock in
    /// the store, so two racing requests can never both take the last seat.
    pub async fn request_booking(
        &self,
        slot_id: &str,
        attendee: &AttendeeInfo,
        allow_past: bool,
    ) -> Result<(Booking, Placement), AppError> {
        if attendee.name.trim().is_empty() {
            return Err(AppError::Validation("Attendee name must not be empty".into()));
        }
        let email = attendee.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("Attendee email is not valid".into()));
        }

        let (booking, placement) = self.store.place_booking(slot_id, attendee, allow_past).await?;
        info!(
            booking_id = %booking.id,
            slot_id = %slot_id,
            placement = ?placement,
            "Booking placed"
        );
        Ok((booking, placement))
    }

    pub async fn slot_occupancy(&self, slot_id: &str) -> Result<(Occupancy, i64), AppError> {
        let slot = self.store.find_slot(slot_id).await?
            .ok_or(AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        let confirmed = self.store.confirmed_count(slot_id).await?;
        let waitlisted = self.store.waitlist_count(slot_id).await?;
        Ok((occupancy(confirmed, slot.capacity), waitlisted))
    }
}
