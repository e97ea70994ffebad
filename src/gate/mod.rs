//! Gate — the Smart Queue Scheduler's decision engine.
//!
//! Seven ordered rules, first match wins. Every fallible step returns
//! `Result`; the outer [`Gate::evaluate`] maps any `Err` to the mandated
//! `{true, "gate error: ...", 1}` fallback rather than ever skipping a unit.

use crate::config::{self, SafetyPredicate};
use crate::registry::EquipmentRegistry;
use crate::stores::{MetricsStore, UiCommandStore};
use crate::types::{EquipmentKind, GateDecision, GateSnapshot, JobKey, MetricSnapshot};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("unit {0} not found in registry")]
    UnknownUnit(String),
    #[error("metrics store error: {0}")]
    Metrics(#[from] crate::stores::StoreError),
}

struct UiCheckCache {
    checked_at: Instant,
    result: bool,
}

/// Owns the Gate's process-local state: the in-flight dedup set and the
/// UI-command-check throttle cache. Both are process-local concurrent
/// collections.
pub struct Gate {
    registry: Arc<EquipmentRegistry>,
    metrics_store: Arc<dyn MetricsStore>,
    ui_command_store: Arc<dyn UiCommandStore>,
    in_flight: DashMap<JobKey, Instant>,
    last_ui_check: DashMap<String, UiCheckCache>,
    last_enqueued_at: DashMap<String, Instant>,
    snapshots: DashMap<String, GateSnapshot>,
}

impl Gate {
    pub fn new(
        registry: Arc<EquipmentRegistry>,
        metrics_store: Arc<dyn MetricsStore>,
        ui_command_store: Arc<dyn UiCommandStore>,
    ) -> Self {
        Self {
            registry,
            metrics_store,
            ui_command_store,
            in_flight: DashMap::new(),
            last_ui_check: DashMap::new(),
            last_enqueued_at: DashMap::new(),
            snapshots: DashMap::new(),
        }
    }

    /// Mark a job as in-flight and schedule its self-healing cleanup:
    /// whichever of {ack, fail, timeout} fires first wins, idempotent removal.
    pub fn mark_in_flight(self: &Arc<Self>, key: JobKey, cleanup_timeout: Duration) {
        self.in_flight.insert(key.clone(), Instant::now());
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(cleanup_timeout).await;
            gate.clear_in_flight(&key);
        });
    }

    pub fn clear_in_flight(&self, key: &JobKey) {
        self.in_flight.remove(key);
    }

    pub fn record_enqueue(&self, unit_id: &str) {
        self.last_enqueued_at
            .insert(unit_id.to_string(), Instant::now());
    }

    /// Run the seven ordered rules for one unit. Never returns `Err` to the
    /// caller: internal failures become the mandated gate-error fallback.
    pub async fn evaluate(&self, unit_id: &str) -> GateDecision {
        match self.evaluate_inner(unit_id).await {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(unit_id, error = %err, "gate evaluation failed, falling back");
                GateDecision::process(format!("gate error: {err}"), config::GATE_ERROR_PRIORITY)
            }
        }
    }

    async fn evaluate_inner(&self, unit_id: &str) -> Result<GateDecision, GateError> {
        let unit = self
            .registry
            .lookup(unit_id)
            .ok_or_else(|| GateError::UnknownUnit(unit_id.to_string()))?
            .clone();
        let key = JobKey::new(unit.site_id, unit_id, unit.kind);

        // Rule 1 — deduplication.
        if self.in_flight.contains_key(&key) {
            return Ok(GateDecision::skip("already queued"));
        }

        // Rule 2 — UI-command recency, throttled to one store query per
        // unit per 30s; a throttled check reuses the cached result.
        if self.recent_ui_command(unit_id).await? {
            return Ok(GateDecision::process(
                "recent UI commands",
                config::UI_COMMAND_PRIORITY,
            ));
        }

        let metrics = self.metrics_store.recent_metrics(unit_id, unit.site_id).await?;

        // Rule 3 — safety.
        if let Some(predicate) = fired_safety_predicate(unit.kind, &metrics) {
            return Ok(GateDecision::process(
                format!("safety: {}", predicate.description()),
                config::SAFETY_PRIORITY,
            ));
        }

        // Rule 4 — temperature deviation.
        if let Some(reason) = temperature_deviation(unit.kind, unit_id, &metrics) {
            return Ok(GateDecision::process(reason, config::TEMP_DEVIATION_PRIORITY));
        }

        // Rule 5 — change vs last snapshot. Always updates the stored
        // snapshot regardless of which branch fires.
        let changed_field = self.check_and_store_snapshot(unit_id, &metrics);
        if let Some(field) = changed_field {
            return Ok(GateDecision::process(
                format!("significant deviation: {field}"),
                config::CHANGE_DEVIATION_PRIORITY,
            ));
        }

        // Rule 6 — maximum staleness.
        if self.is_stale(unit_id, unit.max_staleness) {
            return Ok(GateDecision::process(
                "max staleness exceeded",
                config::STALENESS_PRIORITY,
            ));
        }

        // Rule 7 — default.
        Ok(GateDecision::skip("no significant changes"))
    }

    async fn recent_ui_command(&self, unit_id: &str) -> Result<bool, GateError> {
        if let Some(cached) = self.last_ui_check.get(unit_id) {
            if cached.checked_at.elapsed() < config::UI_CHECK_THROTTLE {
                return Ok(cached.result);
            }
        }
        let result = self.ui_command_store.has_recent(unit_id).await?;
        self.last_ui_check.insert(
            unit_id.to_string(),
            UiCheckCache {
                checked_at: Instant::now(),
                result,
            },
        );
        Ok(result)
    }

    /// Returns the name of the first field whose deviation from the
    /// previously stored snapshot exceeds its tolerance, after
    /// unconditionally replacing the stored snapshot with `metrics`.
    fn check_and_store_snapshot(&self, unit_id: &str, metrics: &MetricSnapshot) -> Option<String> {
        let unit = self.registry.lookup(unit_id)?;
        let previous = self.snapshots.get(unit_id).map(|entry| entry.value().clone());
        self.snapshots
            .insert(unit_id.to_string(), GateSnapshot::new(metrics.clone()));

        let previous = previous?;
        let factor = config::get().deviation_factor_for(unit_id);
        for tolerance in config::deviation_tolerances(unit.kind) {
            let current = metrics.get(tolerance.field);
            let prior = previous.metrics.get(tolerance.field);
            if let (Some(current), Some(prior)) = (current, prior) {
                let threshold = tolerance.tolerance * factor;
                if (current - prior).abs() > threshold {
                    return Some(tolerance.field.to_string());
                }
            }
        }
        None
    }

    fn is_stale(&self, unit_id: &str, max_staleness: Duration) -> bool {
        match self.last_enqueued_at.get(unit_id) {
            Some(entry) => entry.value().elapsed() > max_staleness,
            None => true,
        }
    }
}

const PUMP_OVERLOAD_DESCRIPTION: &str = "motor current > overload limit";

fn fired_safety_predicate(
    kind: EquipmentKind,
    metrics: &MetricSnapshot,
) -> Option<&'static SafetyPredicate> {
    // The pump's motor-overload bound is site-configurable (nameplate current
    // varies by motor), so the catalogue's stored bound is a 0.0 placeholder
    // and is checked directly against the configured limit instead of via
    // the generic `fires` path.
    config::safety_predicates(kind).iter().find(|predicate| {
        if kind == EquipmentKind::Pump && predicate.description() == PUMP_OVERLOAD_DESCRIPTION {
            let overload_amps = config::get().pump_motor_overload_amps;
            metrics.get("motorCurrentAmps").is_some_and(|v| v > overload_amps)
        } else {
            predicate.fires(|field| metrics.get(field))
        }
    })
}

fn temperature_deviation(kind: EquipmentKind, unit_id: &str, metrics: &MetricSnapshot) -> Option<String> {
    let rule = config::temp_deviation_rule(kind)?;
    let control_temp = crate::logic::control_temperature(kind, metrics)?;
    let setpoint = metrics.get(rule.setpoint_field)?;
    let factor = config::get().deviation_factor_for(unit_id);
    let threshold = rule.threshold_f * factor;
    let delta = (control_temp - setpoint).abs();
    if delta >= threshold {
        Some(format!("{delta:.1}F from setpoint (threshold {threshold:.1}F)"))
    } else {
        None
    }
}
