//! Stall-recovery sweep: periodically reclaims jobs reserved longer than
//! their own kind's stall threshold (`maxStaleness(kind) * 2`), mirroring a
//! background self-healer loop in spirit — a fixed-interval background task
//! that runs until cancelled and never treats one failed sweep as fatal.

use super::SiteRuntime;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs until `shutdown` is cancelled, calling `queue.recover_stalled` every
/// `sweep_interval` with the configured retry policy. The per-job stall
/// threshold is derived inside `recover_stalled` from each job's own kind,
/// not a single duration passed in here.
pub async fn run_stall_sweep(runtime: Arc<SiteRuntime>, sweep_interval: Duration, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(sweep_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("stall sweep shutting down");
                return;
            }
            _ = interval.tick() => {
                let policy = crate::config::get().retry_policy();
                match runtime.queue.recover_stalled(&policy).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(reclaimed = n, "stall sweep reclaimed jobs"),
                    Err(err) => tracing::warn!(error = %err, "stall sweep failed"),
                }
            }
        }
    }
}
