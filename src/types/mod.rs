//! Shared data structures for the building-management scheduler.
//!
//! - [`equipment`]: the tagged `EquipmentKind` and the static `EquipmentUnit` registry entry
//! - [`metrics`]: `MetricSnapshot`, the flattened per-tick telemetry view
//! - [`settings`]: `SettingsBundle`, the per-invocation settings merge
//! - [`state`]: `UnitState`, durable per-unit state
//! - [`command`]: `CommandValue` / `CommandRecord`, the Writer's output shape
//! - [`job`]: `JobKey`, `Job`, `GateDecision`
//! - [`gate_snapshot`]: `GateSnapshot`, used only for change detection

mod command;
mod equipment;
mod gate_snapshot;
mod job;
mod metrics;
mod settings;
mod state;

pub use command::{CommandRecord, CommandValue, CommandValuePair};
pub use equipment::{EquipmentKind, EquipmentUnit, UnknownKind};
pub use gate_snapshot::GateSnapshot;
pub use job::{GateDecision, Job, JobKey};
pub use metrics::{MetricSnapshot, RESERVED_FIELD_NAMES};
pub use settings::{SettingValue, SettingsBundle};
pub use state::{LeadLagRole, PidAccumulator, UnitState};
