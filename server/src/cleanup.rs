//! Scheduled age-based cleanup.
//!
//! Runs [`TicketService::cleanup_expired`] with the configured threshold on a
//! fixed period. The first run happens immediately. A failed run is logged and
//! retried at the next tick.

use std::sync::Arc;
use std::time::Duration;
use take_a_number_core::TicketService;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the cleanup loop. It stops when `shutdown` fires or its sender is dropped.
pub fn spawn_cleanup_task(
    service: Arc<TicketService>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = every.as_secs(), "Cleanup task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => run_once(&service).await,
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Cleanup task stopped");
    })
}

async fn run_once(service: &TicketService) {
    match service.cleanup_expired(None).await {
        Ok(deleted) => {
            tracing::debug!(deleted, "Scheduled cleanup finished");
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!("take_a_number_cleanup_last_run_timestamp_seconds")
                .set(service.now().timestamp() as f64);
        }
        Err(e) => tracing::warn!(error = %e, "Scheduled cleanup failed"),
    }
}
