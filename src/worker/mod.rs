//! Worker Pool: bounded-concurrency consumers that reserve
//! jobs, invoke the Logic Host, write commands, and clear the Gate's
//! in-flight entry on completion either way.

use crate::runtime::SiteRuntime;
use crate::types::{CommandValuePair, SettingsBundle};
use crate::writer::extract_commands;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Spawns `concurrency` worker tasks, each looping reserve → run → ack/fail
/// until `shutdown` is cancelled. Each task finishes its current job
/// (bounded by the kind's gate timeout) before exiting.
pub async fn run_worker_pool(
    runtime: Arc<SiteRuntime>,
    consumer_prefix: &str,
    concurrency: usize,
    shutdown: CancellationToken,
) {
    let mut handles = Vec::with_capacity(concurrency);
    for i in 0..concurrency {
        let runtime = Arc::clone(&runtime);
        let consumer_id = format!("{consumer_prefix}-{i}");
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            run_worker_loop(runtime, consumer_id, shutdown).await;
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

async fn run_worker_loop(runtime: Arc<SiteRuntime>, consumer_id: String, shutdown: CancellationToken) {
    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let reserved = tokio::select! {
            _ = shutdown.cancelled() => return,
            result = runtime.queue.reserve(&consumer_id) => result,
        };

        let job = match reserved {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                continue;
            }
            Err(err) => {
                tracing::warn!(consumer_id, error = %err, "queue reserve failed");
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                continue;
            }
        };

        if job.site_id != runtime.site_id {
            tracing::warn!(
                job_id = %job.id, job_site = job.site_id, pool_site = runtime.site_id,
                "job site mismatch, acking as no-op"
            );
            if let Err(err) = runtime.queue.ack(&job.id).await {
                tracing::warn!(job_id = %job.id, error = %err, "failed to ack mismatched job");
            }
            continue;
        }

        let Some(unit) = runtime.registry.lookup(&job.unit_id).cloned() else {
            tracing::warn!(job_id = %job.id, unit_id = %job.unit_id, "unit not in registry, failing job");
            let policy = crate::config::get().retry_policy();
            let _ = runtime.queue.fail(&job.id, "unit not in registry", &policy).await;
            runtime.gate.clear_in_flight(&job.key);
            continue;
        };

        let outcome = invoke(&runtime, &unit).await;
        let key = job.key.clone();

        match outcome {
            Ok(()) => {
                if let Err(err) = runtime.queue.ack(&job.id).await {
                    tracing::warn!(job_id = %job.id, error = %err, "ack failed");
                }
            }
            Err(reason) => {
                tracing::warn!(job_id = %job.id, unit_id = %unit.id, reason, "job failed");
                let policy = crate::config::get().retry_policy();
                if let Err(err) = runtime.queue.fail(&job.id, &reason, &policy).await {
                    tracing::warn!(job_id = %job.id, error = %err, "fail() itself failed");
                }
            }
        }
        runtime.gate.clear_in_flight(&key);
    }
}

/// Assemble the four-argument contract, invoke the algorithm under a
/// timeout, write commands on success, update `UnitState`.
async fn invoke(runtime: &Arc<SiteRuntime>, unit: &crate::types::EquipmentUnit) -> Result<(), String> {
    let metrics = runtime
        .metrics_store
        .recent_metrics(&unit.id, unit.site_id)
        .await
        .map_err(|e| format!("metrics read failed: {e}"))?;

    let settings = SettingsBundle::assemble(
        unit.site_id,
        &crate::config::get().site_name,
        &unit.id,
        unit.kind,
        None,
    );

    let control_temp = crate::logic::control_temperature(unit.kind, &metrics)
        .ok_or_else(|| "no control temperature available".to_string())?;

    let mut state = runtime
        .state_store
        .load(&unit.id)
        .map_err(|e| format!("state load failed: {e}"))?;

    // Runs on a blocking-pool thread so a slow algorithm can't stall this
    // worker's async loop; the timeout wraps the join handle, running the
    // algorithm on a dedicated thread bounded by the kind's timeout.
    let algorithms = Arc::clone(&runtime.algorithms);
    let kind = unit.kind;
    let metrics_for_logic = metrics.clone();
    let settings_for_logic = settings.clone();
    let state_for_logic = state.clone();
    let join = tokio::task::spawn_blocking(move || {
        let algorithm = algorithms
            .resolve(kind)
            .ok_or_else(|| format!("no control algorithm registered for {kind}"))?;
        algorithm
            .run(&metrics_for_logic, &settings_for_logic, control_temp, &state_for_logic)
            .map_err(|e| e.to_string())
    });

    let results = tokio::time::timeout(unit.gate_timeout, join)
        .await
        .map_err(|_| "logic timeout".to_string())?
        .map_err(|e| format!("logic task panicked: {e}"))??;

    let records = extract_commands(&unit.id, unit.site_id, unit.kind, &results);
    if !records.is_empty() {
        runtime
            .command_writer
            .write_batch(&records)
            .await
            .map_err(|e| format!("writer failed: {e}"))?;
    }

    state.record_invocation(now_unix());
    state.last_outputs = results
        .into_iter()
        .map(|r| CommandValuePair {
            name: r.command_name,
            value: r.value,
        })
        .collect();
    runtime
        .state_store
        .store(&state)
        .map_err(|e| format!("state store failed: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Gate;
    use crate::logic::{ControlAlgorithm, ControlAlgorithmRegistry, LogicError, ResultRecord};
    use crate::queue::InMemoryJobQueue;
    use crate::registry::EquipmentRegistry;
    use crate::runtime::StateStore;
    use crate::stores::{InMemoryMetricsStore, InMemoryUiCommandStore};
    use crate::types::{CommandValue, EquipmentKind, EquipmentUnit, MetricSnapshot, UnitState};
    use crate::writer::InMemoryCommandWriter;
    use std::time::Duration;

    fn unit(id: &str, kind: EquipmentKind, gate_timeout: Duration) -> EquipmentUnit {
        EquipmentUnit {
            id: id.to_string(),
            kind,
            logic_module: kind.logic_module_name().to_string(),
            tick_period: Duration::from_secs(30),
            max_staleness: Duration::from_secs(45),
            gate_timeout,
            base_priority: 0,
            site_id: 1,
        }
    }

    /// Returns the runtime plus its backing tempdir; the caller must keep
    /// the tempdir alive for as long as the runtime's state store is used.
    fn test_runtime(
        units: Vec<EquipmentUnit>,
        algorithms: ControlAlgorithmRegistry,
    ) -> (
        Arc<SiteRuntime>,
        Arc<InMemoryMetricsStore>,
        Arc<InMemoryCommandWriter>,
        tempfile::TempDir,
    ) {
        let _ = crate::config::set_for_test(crate::config::SiteConfig::default());
        let registry = Arc::new(EquipmentRegistry::new(units).unwrap());
        let metrics = Arc::new(InMemoryMetricsStore::new());
        let ui = Arc::new(InMemoryUiCommandStore::new());
        let gate = Arc::new(Gate::new(Arc::clone(&registry), metrics.clone(), ui));
        let queue: Arc<dyn crate::queue::JobQueue> = Arc::new(InMemoryJobQueue::new());
        let writer = Arc::new(InMemoryCommandWriter::new());
        let dir = tempfile::tempdir().unwrap();
        let state_store = Arc::new(StateStore::open(dir.path()).unwrap());
        let runtime = Arc::new(SiteRuntime::new(
            1,
            registry,
            gate,
            queue,
            metrics.clone(),
            writer.clone(),
            state_store,
            Arc::new(algorithms),
        ));
        (runtime, metrics, writer, dir)
    }

    struct FixedLogic(Vec<ResultRecord>);

    impl ControlAlgorithm for FixedLogic {
        fn kind(&self) -> EquipmentKind {
            EquipmentKind::FanCoil
        }

        fn run(
            &self,
            _metrics: &MetricSnapshot,
            _settings: &SettingsBundle,
            _control_temp: f64,
            _state: &UnitState,
        ) -> Result<Vec<ResultRecord>, LogicError> {
            Ok(self.0.clone())
        }
    }

    struct SlowLogic;

    impl ControlAlgorithm for SlowLogic {
        fn kind(&self) -> EquipmentKind {
            EquipmentKind::FanCoil
        }

        fn run(
            &self,
            _metrics: &MetricSnapshot,
            _settings: &SettingsBundle,
            _control_temp: f64,
            _state: &UnitState,
        ) -> Result<Vec<ResultRecord>, LogicError> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn successful_invocation_writes_commands_and_advances_state() {
        let mut algorithms = ControlAlgorithmRegistry::empty();
        algorithms.register(
            EquipmentKind::FanCoil,
            Box::new(FixedLogic(vec![ResultRecord::new(
                "coolingValvePosition",
                CommandValue::Number(55.0),
            )])),
        );
        let unit = unit("fc-1", EquipmentKind::FanCoil, Duration::from_secs(5));
        let (runtime, _metrics, writer, _dir) = test_runtime(vec![unit.clone()], algorithms);

        invoke(&runtime, &unit).await.expect("invocation should succeed");

        let batches = writer.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].command_type, "coolingValvePosition");

        let state = runtime.state_store.load("fc-1").unwrap();
        assert!(state.last_invocation_instant.is_some());
        assert_eq!(state.last_outputs.len(), 1);
    }

    #[tokio::test]
    async fn non_actionable_results_are_dropped_before_writing() {
        let mut algorithms = ControlAlgorithmRegistry::empty();
        algorithms.register(
            EquipmentKind::FanCoil,
            Box::new(FixedLogic(vec![ResultRecord::new(
                "notActionable",
                CommandValue::Number(1.0),
            )])),
        );
        let unit = unit("fc-1", EquipmentKind::FanCoil, Duration::from_secs(5));
        let (runtime, _metrics, writer, _dir) = test_runtime(vec![unit.clone()], algorithms);

        invoke(&runtime, &unit).await.expect("invocation should succeed");

        assert!(writer.batches().is_empty());
    }

    #[tokio::test]
    async fn missing_algorithm_fails_the_invocation() {
        let unit = unit("fc-1", EquipmentKind::FanCoil, Duration::from_secs(5));
        let (runtime, _metrics, writer, _dir) = test_runtime(vec![unit.clone()], ControlAlgorithmRegistry::empty());

        let result = invoke(&runtime, &unit).await;
        assert!(result.is_err());
        assert!(writer.batches().is_empty());
    }

    #[tokio::test]
    async fn logic_exceeding_the_gate_timeout_fails_as_a_timeout() {
        let mut algorithms = ControlAlgorithmRegistry::empty();
        algorithms.register(EquipmentKind::FanCoil, Box::new(SlowLogic));
        let unit = unit("fc-1", EquipmentKind::FanCoil, Duration::from_millis(20));
        let (runtime, _metrics, _writer, _dir) = test_runtime(vec![unit.clone()], algorithms);

        let result = invoke(&runtime, &unit).await;
        assert_eq!(result, Err("logic timeout".to_string()));
    }
}
