//! `MetricSnapshot` — the flattened view of a unit's most recent telemetry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Field names the metrics store always includes but which are not
/// themselves metrics; stripped when flattening a query result.
pub const RESERVED_FIELD_NAMES: &[&str] = &[
    "equipmentId",
    "locationId",
    "siteId",
    "time",
    "equipmentType",
    "system",
    "zone",
];

/// A flat mapping from metric name to last-observed scalar, plus
/// provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub unit_id: String,
    /// Unix timestamp (seconds) this snapshot was captured.
    pub captured_at: u64,
    pub fields: HashMap<String, f64>,
}

impl MetricSnapshot {
    pub fn empty(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            captured_at: now_unix(),
            fields: HashMap::new(),
        }
    }

    /// Build a snapshot from raw rows (newest-first) the way the metrics
    /// store query returns them: for each field name, keep the first
    /// (i.e. newest) non-null numeric value seen, and drop reserved names.
    pub fn flatten(unit_id: impl Into<String>, rows_newest_first: &[HashMap<String, f64>]) -> Self {
        let mut fields = HashMap::new();
        for row in rows_newest_first {
            for (name, value) in row {
                if RESERVED_FIELD_NAMES.contains(&name.as_str()) {
                    continue;
                }
                fields.entry(name.clone()).or_insert(*value);
            }
        }
        Self {
            unit_id: unit_id.into(),
            captured_at: now_unix(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_keeps_newest_non_null_value_per_field() {
        let rows = vec![
            HashMap::from([("roomTemp".to_string(), 74.5)]),
            HashMap::from([("roomTemp".to_string(), 72.0), ("setpoint".to_string(), 72.0)]),
        ];
        let snap = MetricSnapshot::flatten("fc-1", &rows);
        assert_eq!(snap.get("roomTemp"), Some(74.5));
        assert_eq!(snap.get("setpoint"), Some(72.0));
    }

    #[test]
    fn flatten_strips_reserved_field_names() {
        let rows = vec![HashMap::from([
            ("equipmentId".to_string(), 1.0),
            ("roomTemp".to_string(), 72.0),
        ])];
        let snap = MetricSnapshot::flatten("fc-1", &rows);
        assert_eq!(snap.fields.len(), 1);
        assert!(snap.get("equipmentId").is_none());
    }
}
