//! Logic Host — marshals the four-argument control-algorithm contract and
//! dispatches to a trait-object registry keyed by [`EquipmentKind`].
//!
//! Uses a build-time
//! registry: a missing kind is a compile-time enum-exhaustiveness fact, not
//! a runtime lookup miss, and no path traversal is possible.

mod air_handler;
mod boiler;
mod chiller;
mod control_temp;
mod fan_coil;
mod pump;
mod steam_bundle;

pub use control_temp::control_temperature;

use crate::types::{CommandValue, EquipmentKind, MetricSnapshot, SettingsBundle, UnitState};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogicError {
    #[error("required setting '{0}' missing or wrong type")]
    MissingSetting(&'static str),
    #[error("logic timeout")]
    Timeout,
}

/// One `(commandName, value)` pair emitted by a control algorithm, before
/// the Writer filters it through the kind's actionable-command allowlist.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub command_name: String,
    pub value: CommandValue,
}

impl ResultRecord {
    pub fn new(command_name: impl Into<String>, value: CommandValue) -> Self {
        Self {
            command_name: command_name.into(),
            value,
        }
    }
}

/// The fixed four-argument contract every control algorithm implements.
pub trait ControlAlgorithm: Send + Sync {
    fn kind(&self) -> EquipmentKind;

    fn run(
        &self,
        metrics: &MetricSnapshot,
        settings: &SettingsBundle,
        control_temp: f64,
        state: &UnitState,
    ) -> Result<Vec<ResultRecord>, LogicError>;
}

/// Build-time registry of one algorithm per kind.
pub struct ControlAlgorithmRegistry {
    algorithms: HashMap<EquipmentKind, Box<dyn ControlAlgorithm>>,
}

impl ControlAlgorithmRegistry {
    /// An empty registry; used by tests that need to substitute a fake
    /// algorithm for one kind without pulling in the real placeholders.
    pub fn empty() -> Self {
        Self {
            algorithms: HashMap::new(),
        }
    }

    /// The registry populated with the placeholder algorithm for every
    /// kind; these exist only to exercise the pipeline end-to-end, not as
    /// new control physics.
    pub fn with_defaults() -> Self {
        let mut algorithms: HashMap<EquipmentKind, Box<dyn ControlAlgorithm>> = HashMap::new();
        algorithms.insert(EquipmentKind::AirHandler, Box::new(air_handler::AirHandlerLogic));
        algorithms.insert(EquipmentKind::FanCoil, Box::new(fan_coil::FanCoilLogic));
        algorithms.insert(EquipmentKind::Boiler, Box::new(boiler::BoilerLogic));
        algorithms.insert(EquipmentKind::Pump, Box::new(pump::PumpLogic));
        algorithms.insert(EquipmentKind::Chiller, Box::new(chiller::ChillerLogic));
        algorithms.insert(EquipmentKind::SteamBundle, Box::new(steam_bundle::SteamBundleLogic));
        Self { algorithms }
    }

    /// Registers (or replaces) the algorithm for one kind.
    pub fn register(&mut self, kind: EquipmentKind, algorithm: Box<dyn ControlAlgorithm>) {
        self.algorithms.insert(kind, algorithm);
    }

    /// Dispatch is by enum variant rather than by resolving a named entry
    /// point at runtime, so there is exactly one lookup.
    pub fn resolve(&self, kind: EquipmentKind) -> Option<&dyn ControlAlgorithm> {
        self.algorithms.get(&kind).map(|boxed| boxed.as_ref())
    }
}

impl Default for ControlAlgorithmRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Shared helper: a simple proportional response clamped to `[min, max]`,
/// used by every placeholder algorithm to turn a temperature error into an
/// actuator position.
pub(crate) fn proportional_response(error: f64, gain: f64, min: f64, max: f64) -> f64 {
    (50.0 + error * gain).clamp(min, max)
}
