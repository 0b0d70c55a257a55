use std::sync::Arc;
use chrono::Duration;
use tracing::{error, info, info_span, warn, Instrument};

use crate::domain::clock::Clock;
use crate::domain::models::side_effect::SideEffect;
use crate::domain::ports::{IntentSink, SideEffectRepository};
use crate::error::AppError;

/// Drains the outbox. Delivery is best-effort: a sink outage reschedules the
/// intent and never touches the booking state that produced it.
pub struct SideEffectDispatcher {
    repo: Arc<dyn SideEffectRepository>,
    sink: Arc<dyn IntentSink>,
    clock: Arc<dyn Clock>,
    max_attempts: i64,
    retry_delay_secs: i64,
}

impl SideEffectDispatcher {
    pub fn new(
        repo: Arc<dyn SideEffectRepository>,
        sink: Arc<dyn IntentSink>,
        clock: Arc<dyn Clock>,
        max_attempts: i64,
        retry_delay_secs: i64,
    ) -> Self {
        Self { repo, sink, clock, max_attempts, retry_delay_secs }
    }

    /// For callers outside a store transaction (transition intents are
    /// written by the store itself, atomically with the transition).
    pub async fn enqueue(&self, intent: SideEffect) -> Result<SideEffect, AppError> {
        self.repo.enqueue(&intent).await
    }

    /// Claims one batch of due intents and delivers them. Returns how many
    /// were handed to the sink successfully.
    pub async fn run_once(&self, batch_size: i64) -> Result<usize, AppError> {
        let due = self.repo.claim_due(batch_size).await?;
        let mut delivered = 0;

        for intent in due {
            let span = info_span!(
                "side_effect",
                intent_id = %intent.id,
                intent_type = %intent.intent_type,
                booking_id = %intent.booking_id,
            );
            if self.deliver(&intent).instrument(span).await {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    async fn deliver(&self, intent: &SideEffect) -> bool {
        match self.repo.has_completed_with_hash(&intent.dedup_hash).await {
            Ok(true) => {
                info!("Intent skipped (duplicate of a completed delivery)");
                if let Err(e) = self.repo.mark_skipped(&intent.id).await {
                    error!("Failed to mark intent as skipped: {:?}", e);
                }
                return false;
            }
            Ok(false) => {}
            Err(e) => {
                error!("Dedup check failed: {:?}", e);
                // fall through and attempt delivery anyway
            }
        }

        match self.sink.deliver(intent).await {
            Ok(_) => {
                info!("Intent delivered");
                if let Err(e) = self.repo.mark_completed(&intent.id).await {
                    error!("Failed to mark intent as completed: {:?}", e);
                }
                true
            }
            Err(e) => {
                let err_msg = format!("{}", e);
                warn!("Intent delivery failed: {}", err_msg);
                let backoff = self.retry_delay_secs * (intent.attempts + 1);
                let retry_at = self.clock.now_utc() + Duration::seconds(backoff);
                if let Err(up_err) = self.repo
                    .mark_failed(&intent.id, &err_msg, self.max_attempts, retry_at)
                    .await
                {
                    error!("Failed to record intent failure: {:?}", up_err);
                }
                false
            }
        }
    }
}
