//! `UnitState` — durable per-unit state carried across invocations.

use serde::{Deserialize, Serialize};

/// Durable per-unit mapping: last-invocation instant, PID accumulators,
/// lead/lag role, last-actionable-output snapshot.
///
/// Created lazily on first use and updated after each successful worker
/// invocation; survives process restarts via the sled-backed store in
/// [`crate::runtime::state_store`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub unit_id: String,
    /// Unix timestamp (seconds) of the last successful invocation. `None`
    /// before the unit has ever been invoked.
    pub last_invocation_instant: Option<u64>,
    pub pid: PidAccumulator,
    pub lead_lag: LeadLagRole,
    pub last_outputs: Vec<super::command::CommandValuePair>,
}

impl UnitState {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            last_invocation_instant: None,
            pid: PidAccumulator::default(),
            lead_lag: LeadLagRole::default(),
            last_outputs: Vec::new(),
        }
    }

    /// Advance `last_invocation_instant`. This must be monotonic for a
    /// given unit; a regression is ignored rather
    /// than applied, since it would indicate clock skew or a replayed
    /// invocation rather than real progress.
    pub fn record_invocation(&mut self, now: u64) {
        if self.last_invocation_instant.map(|t| now >= t).unwrap_or(true) {
            self.last_invocation_instant = Some(now);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PidAccumulator {
    pub integral: f64,
    pub derivative: f64,
    pub last_error: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadLagRole {
    pub is_lead: bool,
    pub group_id: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_invocation_is_monotonic() {
        let mut state = UnitState::new("fc-1");
        state.record_invocation(100);
        state.record_invocation(50);
        assert_eq!(state.last_invocation_instant, Some(100));
        state.record_invocation(150);
        assert_eq!(state.last_invocation_instant, Some(150));
    }
}
