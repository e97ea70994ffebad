//! End-to-end scenarios exercising the full Tickers -> Gate -> Queue ->
//! Worker -> Logic Host -> Writer pipeline through the crate's public
//! surface, using the same in-memory fakes the unit tests use for the
//! external stores.

use bms_scheduler::config::{self, SiteConfig};
use bms_scheduler::gate::Gate;
use bms_scheduler::logic::{ControlAlgorithm, ControlAlgorithmRegistry, LogicError, ResultRecord};
use bms_scheduler::queue::{InMemoryJobQueue, JobQueue};
use bms_scheduler::registry::EquipmentRegistry;
use bms_scheduler::runtime::{run_ticker, SiteRuntime, StateStore};
use bms_scheduler::stores::{InMemoryMetricsStore, InMemoryUiCommandStore};
use bms_scheduler::types::{CommandValue, EquipmentKind, EquipmentUnit, MetricSnapshot, SettingsBundle, UnitState};
use bms_scheduler::worker::run_worker_pool;
use bms_scheduler::writer::InMemoryCommandWriter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fan_coil_unit(id: &str) -> EquipmentUnit {
    EquipmentUnit {
        id: id.to_string(),
        kind: EquipmentKind::FanCoil,
        logic_module: EquipmentKind::FanCoil.logic_module_name().to_string(),
        tick_period: Duration::from_millis(20),
        max_staleness: Duration::from_secs(3600),
        gate_timeout: Duration::from_secs(5),
        base_priority: 0,
        site_id: 1,
    }
}

struct EchoLogic;

impl ControlAlgorithm for EchoLogic {
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
        Ok(vec![ResultRecord::new(
            "coolingValvePosition",
            CommandValue::Number(42.0),
        )])
    }
}

struct Harness {
    runtime: Arc<SiteRuntime>,
    metrics: Arc<InMemoryMetricsStore>,
    ui_commands: Arc<InMemoryUiCommandStore>,
    writer: Arc<InMemoryCommandWriter>,
    _state_dir: tempfile::TempDir,
}

/// The config every scenario in this file installs via `set_for_test`.
/// `config::set_for_test` only takes effect on the first caller to win the
/// process-wide `OnceLock` race, so every test must pass identical content —
/// the FanCoil override here (zero max staleness, so its stall threshold is
/// `0 * 2 = 0`) must be present regardless of which test happens to run
/// first, or the stall-sweep scenario below would need to wait out the real
/// 45s-default staleness window to see a job go stale.
fn test_site_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.kind_overrides.insert(
        EquipmentKind::FanCoil.tag().to_string(),
        bms_scheduler::config::KindOverride {
            max_staleness_secs: Some(0),
            ..Default::default()
        },
    );
    config
}

fn build_harness(units: Vec<EquipmentUnit>) -> Harness {
    let _ = config::set_for_test(test_site_config());
    let registry = Arc::new(EquipmentRegistry::new(units).unwrap());
    let metrics = Arc::new(InMemoryMetricsStore::new());
    let ui_commands = Arc::new(InMemoryUiCommandStore::new());
    let gate = Arc::new(Gate::new(
        Arc::clone(&registry),
        metrics.clone(),
        ui_commands.clone(),
    ));
    let queue: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::new());
    let writer = Arc::new(InMemoryCommandWriter::new());
    let state_dir = tempfile::tempdir().unwrap();
    let state_store = Arc::new(StateStore::open(state_dir.path()).unwrap());

    let mut algorithms = ControlAlgorithmRegistry::empty();
    algorithms.register(EquipmentKind::FanCoil, Box::new(EchoLogic));

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

    Harness {
        runtime,
        metrics,
        ui_commands,
        writer,
        _state_dir: state_dir,
    }
}

fn idle_snapshot(unit_id: &str) -> MetricSnapshot {
    let mut snap = MetricSnapshot::empty(unit_id);
    snap.fields.insert("roomTemp".to_string(), 72.0);
    snap.fields.insert("setpoint".to_string(), 72.0);
    snap
}

#[tokio::test]
async fn idle_unit_never_gets_a_job() {
    let unit = fan_coil_unit("fc-1");
    let h = build_harness(vec![unit.clone()]);
    h.metrics.seed("fc-1", idle_snapshot("fc-1"));
    h.runtime.gate.record_enqueue("fc-1");

    let shutdown = CancellationToken::new();
    let ticker = tokio::spawn(run_ticker(Arc::clone(&h.runtime), unit, shutdown.clone(), false));
    tokio::time::sleep(Duration::from_millis(80)).await;
    shutdown.cancel();
    let _ = ticker.await;

    let stats = h.runtime.queue.stats().await.unwrap();
    assert_eq!(stats.waiting, 0);
    assert_eq!(stats.active, 0);
}

#[tokio::test]
async fn temperature_deviation_drives_a_command_through_the_full_pipeline() {
    let unit = fan_coil_unit("fc-1");
    let h = build_harness(vec![unit.clone()]);
    let mut snap = idle_snapshot("fc-1");
    snap.fields.insert("roomTemp".to_string(), 76.0);
    h.metrics.seed("fc-1", snap);

    let shutdown = CancellationToken::new();
    let ticker = tokio::spawn(run_ticker(Arc::clone(&h.runtime), unit, shutdown.clone(), false));
    let workers = tokio::spawn(run_worker_pool(
        Arc::clone(&h.runtime),
        "test-worker",
        2,
        shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown.cancel();
    let _ = ticker.await;
    let _ = workers.await;

    let batches = h.writer.batches();
    assert!(!batches.is_empty(), "expected at least one written command batch");
    assert_eq!(batches[0][0].command_type, "coolingValvePosition");
}

#[tokio::test]
async fn safety_condition_overrides_temperature_deviation() {
    let unit = fan_coil_unit("fc-1");
    let h = build_harness(vec![unit]);
    let mut snap = idle_snapshot("fc-1");
    // 50F room temp both trips the "room temp < 60F" safety predicate and
    // is far enough from the 72F setpoint to also trip temp deviation;
    // safety must win because it is evaluated first.
    snap.fields.insert("roomTemp".to_string(), 50.0);
    h.metrics.seed("fc-1", snap);

    let decision = h.runtime.gate.evaluate("fc-1").await;
    assert!(decision.process);
    assert_eq!(decision.priority, config::SAFETY_PRIORITY);
    assert!(decision.reason.contains("room temp"));
}

#[tokio::test]
async fn repeated_ticks_during_a_storm_enqueue_at_most_one_job() {
    let unit = fan_coil_unit("fc-1");
    let h = build_harness(vec![unit.clone()]);
    let mut snap = idle_snapshot("fc-1");
    snap.fields.insert("roomTemp".to_string(), 76.0);
    h.metrics.seed("fc-1", snap);

    let shutdown = CancellationToken::new();
    let ticker = tokio::spawn(run_ticker(Arc::clone(&h.runtime), unit, shutdown.clone(), false));
    tokio::time::sleep(Duration::from_millis(120)).await;
    shutdown.cancel();
    let _ = ticker.await;

    let stats = h.runtime.queue.stats().await.unwrap();
    assert_eq!(stats.waiting + stats.active, 1, "dedup must collapse a tick storm into one job");
}

#[tokio::test]
async fn a_worker_that_never_acks_or_fails_its_job_is_reclaimed_by_the_stall_sweep() {
    let unit = fan_coil_unit("fc-1");
    let h = build_harness(vec![unit]);
    let mut snap = idle_snapshot("fc-1");
    snap.fields.insert("roomTemp".to_string(), 76.0);
    h.metrics.seed("fc-1", snap.clone());

    let decision = h.runtime.gate.evaluate("fc-1").await;
    assert!(decision.process);
    let key = bms_scheduler::types::JobKey::new(1, "fc-1", EquipmentKind::FanCoil);
    let job = bms_scheduler::types::Job {
        id: "job-1".to_string(),
        key: key.clone(),
        site_id: 1,
        unit_id: "fc-1".to_string(),
        kind: EquipmentKind::FanCoil,
        enqueued_at: 0,
        reason: decision.reason,
        priority: decision.priority,
        attempt: 0,
    };
    h.runtime.queue.enqueue(job).await.unwrap();

    // Simulate a worker that reserved the job and then vanished.
    let reserved = h.runtime.queue.reserve("dead-worker").await.unwrap();
    assert!(reserved.is_some());

    // FanCoil's stall threshold is overridden to 0 in `test_site_config`, so
    // the job above is already past its per-kind threshold the instant it's
    // checked, exercising the per-kind rule rather than a fixed duration.
    let policy = config::get().retry_policy();
    let recovered = h.runtime.queue.recover_stalled(&policy).await.unwrap();
    assert_eq!(recovered, 1);

    let stats = h.runtime.queue.stats().await.unwrap();
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.active, 0);
}

#[tokio::test]
async fn a_recent_ui_command_wins_over_an_idle_snapshot() {
    let unit = fan_coil_unit("fc-1");
    let h = build_harness(vec![unit]);
    h.metrics.seed("fc-1", idle_snapshot("fc-1"));
    h.runtime.gate.record_enqueue("fc-1");
    h.ui_commands.mark_recent("fc-1");

    let decision = h.runtime.gate.evaluate("fc-1").await;
    assert!(decision.process);
    assert_eq!(decision.priority, config::UI_COMMAND_PRIORITY);
}
