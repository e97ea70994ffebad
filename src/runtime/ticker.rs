//! One ticker task per unit: ticks at the unit's configured
//! period, calls the Gate, and enqueues on acceptance.

use super::SiteRuntime;
use crate::types::{EquipmentUnit, Job, JobKey};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Runs until `shutdown` is cancelled. Ticker errors never kill the task —
/// each tick's failure is logged and the ticker moves on to its next tick;
/// a ticker never dies silently. In `dry_run`, the Gate still runs and
/// every decision is logged, but nothing is ever enqueued.
pub async fn run_ticker(
    runtime: Arc<SiteRuntime>,
    unit: EquipmentUnit,
    shutdown: CancellationToken,
    dry_run: bool,
) {
    let mut interval = tokio::time::interval(unit.tick_period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(unit_id = %unit.id, "ticker shutting down");
                return;
            }
            _ = interval.tick() => {
                tick_once(&runtime, &unit, dry_run).await;
            }
        }
    }
}

async fn tick_once(runtime: &Arc<SiteRuntime>, unit: &EquipmentUnit, dry_run: bool) {
    let decision = runtime.gate.evaluate(&unit.id).await;
    tracing::debug!(
        unit_id = %unit.id,
        process = decision.process,
        reason = %decision.reason,
        priority = decision.priority,
        "gate decision"
    );

    if !decision.process {
        return;
    }

    if dry_run {
        tracing::info!(
            unit_id = %unit.id,
            reason = %decision.reason,
            priority = decision.priority,
            "dry run: would enqueue"
        );
        return;
    }

    let key = JobKey::new(unit.site_id, &unit.id, unit.kind);
    let job = Job {
        id: Uuid::new_v4().to_string(),
        key: key.clone(),
        site_id: unit.site_id,
        unit_id: unit.id.clone(),
        kind: unit.kind,
        enqueued_at: now_unix(),
        reason: decision.reason,
        priority: decision.priority,
        attempt: 0,
    };

    match runtime.queue.enqueue(job).await {
        Ok(outcome) if outcome.duplicate => {
            tracing::debug!(unit_id = %unit.id, "queue reports duplicate, skipping");
        }
        Ok(_) => {
            runtime.gate.mark_in_flight(key, unit.gate_timeout);
            runtime.gate.record_enqueue(&unit.id);
        }
        Err(err) => {
            tracing::warn!(unit_id = %unit.id, error = %err, "queue unavailable, not advancing lastEnqueueInstant");
        }
    }
}
