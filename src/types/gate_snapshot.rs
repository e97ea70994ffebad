//! `GateSnapshot` — the per-unit copy of metrics observed at the previous
//! Gate evaluation, used only for change detection.

use super::metrics::MetricSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub unit_id: String,
    pub metrics: MetricSnapshot,
}

impl GateSnapshot {
    pub fn new(metrics: MetricSnapshot) -> Self {
        Self {
            unit_id: metrics.unit_id.clone(),
            metrics,
        }
    }
}
