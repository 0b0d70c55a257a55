use std::sync::Arc;
use tracing::info;

use crate::domain::models::booking::Booking;
use crate::domain::ports::SlotStore;
use crate::error::AppError;

pub struct WaitlistPromoter {
    store: Arc<dyn SlotStore>,
}

impl WaitlistPromoter {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Invoked after anything that can free a confirmed seat (booking
    /// cancellation, capacity increase). Safe to call redundantly: with zero
    /// free seats the store returns an empty batch and nothing changes.
    /// Promotion state lives entirely in stored rows, so a partially applied
    /// batch is finished by the next invocation or the reconciliation sweep.
    pub async fn on_capacity_freed(&self, slot_id: &str) -> Result<Vec<Booking>, AppError> {
        let promoted = self.store.promote_waitlisted(slot_id).await?;
        for booking in &promoted {
            info!(
                booking_id = %booking.id,
                slot_id = %slot_id,
                "Waitlisted booking promoted to confirmed"
            );
        }
        Ok(promoted)
    }
}
