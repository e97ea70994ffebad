//! Job and Gate-decision types shared between the Gate, Queue, and Worker.

use super::equipment::EquipmentKind;
use serde::{Deserialize, Serialize};

/// Deterministic job key: `"{site}-{unitId}-{kind}"`.
///
/// At most one live job may exist per key at any moment; the Queue and
/// the Gate's in-flight set both index on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(site_id: u32, unit_id: &str, kind: EquipmentKind) -> Self {
        Self(format!("{site_id}-{unit_id}-{}", kind.tag()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The Gate's verdict for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub process: bool,
    pub reason: String,
    pub priority: u8,
}

impl GateDecision {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            process: false,
            reason: reason.into(),
            priority: 0,
        }
    }

    pub fn process(reason: impl Into<String>, priority: u8) -> Self {
        Self {
            process: true,
            reason: reason.into(),
            priority,
        }
    }
}

/// A unit of work in the Queue: "recompute control outputs for this unit
/// now".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub key: JobKey,
    pub site_id: u32,
    pub unit_id: String,
    pub kind: EquipmentKind,
    /// Unix timestamp (seconds) the job was enqueued.
    pub enqueued_at: u64,
    pub reason: String,
    pub priority: u8,
    pub attempt: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_key_format_is_site_unit_kind() {
        let key = JobKey::new(3, "fc-17", EquipmentKind::FanCoil);
        assert_eq!(key.as_str(), "3-fc-17-fan-coil");
    }
}
