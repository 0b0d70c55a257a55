use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};
use crate::state::AppState;

/// Drains the side-effect outbox and periodically reconciles waitlists.
///
/// The sweep re-runs promotion for any slot that has free seats and a
/// non-empty waitlist, which finishes promotions that were cut short by a
/// fault and catches capacity freed outside the usual call paths.
pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting side-effect dispatcher worker...");

    let mut tick: u64 = 0;

    loop {
        match state.dispatcher.run_once(state.config.dispatch_batch_size).await {
            Ok(delivered) if delivered > 0 => {
                info!("Dispatched {} side-effect intent(s)", delivered);
            }
            Ok(_) => {}
            Err(e) => error!("Side-effect dispatch cycle failed: {:?}", e),
        }

        tick += 1;
        if state.config.promotion_sweep_every > 0 && tick % state.config.promotion_sweep_every == 0 {
            match state.slot_store.slots_awaiting_promotion(20).await {
                Ok(slot_ids) => {
                    for slot_id in slot_ids {
                        if let Err(e) = state.promoter.on_capacity_freed(&slot_id).await {
                            error!("Reconciliation promotion failed for slot {}: {:?}", slot_id, e);
                        }
                    }
                }
                Err(e) => error!("Reconciliation sweep query failed: {:?}", e),
            }
        }

        sleep(Duration::from_secs(state.config.dispatch_interval_secs)).await;
    }
}
