//! Equipment registry — the static list of controlled units per site.

use crate::types::{EquipmentKind, EquipmentUnit};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate unit id: {0}")]
    DuplicateUnitId(String),
    #[error("unit {unit_id}: tick period ({tick_secs}s) exceeds max staleness ({stale_secs}s)")]
    TickExceedsStaleness {
        unit_id: String,
        tick_secs: u64,
        stale_secs: u64,
    },
    #[error("unit {unit_id}: tick period must be positive")]
    NonPositiveTickPeriod { unit_id: String },
    #[error("unit {unit_id}: logic module name is empty")]
    EmptyLogicModule { unit_id: String },
}

/// The site's fixed set of controlled equipment units.
///
/// Loaded once at startup and never mutated: adding or removing equipment
/// is a deploy-time operation. `enumerate()` walks units in the order they
/// were passed to `new`, not hash order, so two processes loading the same
/// equipment list always enumerate it the same way.
#[derive(Debug, Clone)]
pub struct EquipmentRegistry {
    /// Insertion order of unit ids, kept alongside `units` so enumeration is
    /// deterministic while `lookup` stays O(1).
    order: Vec<String>,
    units: HashMap<String, EquipmentUnit>,
}

impl EquipmentRegistry {
    pub fn new(units: Vec<EquipmentUnit>) -> Result<Self, RegistryError> {
        let mut order = Vec::with_capacity(units.len());
        let mut map = HashMap::with_capacity(units.len());
        for unit in units {
            validate_unit(&unit)?;
            let id = unit.id.clone();
            if map.insert(id.clone(), unit).is_some() {
                return Err(RegistryError::DuplicateUnitId(id));
            }
            order.push(id);
        }
        Ok(Self { order, units: map })
    }

    pub fn lookup(&self, unit_id: &str) -> Option<&EquipmentUnit> {
        self.units.get(unit_id)
    }

    pub fn enumerate(&self) -> impl Iterator<Item = &EquipmentUnit> {
        self.order.iter().map(move |id| &self.units[id])
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn by_kind(&self, kind: EquipmentKind) -> impl Iterator<Item = &EquipmentUnit> {
        self.enumerate().filter(move |u| u.kind == kind)
    }
}

fn validate_unit(unit: &EquipmentUnit) -> Result<(), RegistryError> {
    if unit.tick_period.is_zero() {
        return Err(RegistryError::NonPositiveTickPeriod {
            unit_id: unit.id.clone(),
        });
    }
    if unit.tick_period > unit.max_staleness {
        return Err(RegistryError::TickExceedsStaleness {
            unit_id: unit.id.clone(),
            tick_secs: unit.tick_period.as_secs(),
            stale_secs: unit.max_staleness.as_secs(),
        });
    }
    if unit.logic_module.trim().is_empty() {
        return Err(RegistryError::EmptyLogicModule {
            unit_id: unit.id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unit(id: &str, kind: EquipmentKind) -> EquipmentUnit {
        EquipmentUnit {
            id: id.to_string(),
            kind,
            logic_module: kind.logic_module_name().to_string(),
            tick_period: Duration::from_secs(30),
            max_staleness: Duration::from_secs(45),
            gate_timeout: Duration::from_secs(45),
            base_priority: 0,
            site_id: 1,
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let units = vec![unit("fc-1", EquipmentKind::FanCoil), unit("fc-1", EquipmentKind::FanCoil)];
        assert!(matches!(
            EquipmentRegistry::new(units),
            Err(RegistryError::DuplicateUnitId(_))
        ));
    }

    #[test]
    fn rejects_tick_period_exceeding_staleness() {
        let mut bad = unit("ah-1", EquipmentKind::AirHandler);
        bad.tick_period = Duration::from_secs(100);
        bad.max_staleness = Duration::from_secs(50);
        assert!(matches!(
            EquipmentRegistry::new(vec![bad]),
            Err(RegistryError::TickExceedsStaleness { .. })
        ));
    }

    #[test]
    fn lookup_and_by_kind_work() {
        let units = vec![unit("fc-1", EquipmentKind::FanCoil), unit("ah-1", EquipmentKind::AirHandler)];
        let registry = EquipmentRegistry::new(units).unwrap();
        assert!(registry.lookup("fc-1").is_some());
        assert!(registry.lookup("missing").is_none());
        assert_eq!(registry.by_kind(EquipmentKind::FanCoil).count(), 1);
    }

    #[test]
    fn enumerate_preserves_insertion_order() {
        let ids = ["fc-3", "fc-1", "ah-2", "fc-2"];
        let units: Vec<_> = ids.iter().map(|id| unit(id, EquipmentKind::FanCoil)).collect();
        let registry = EquipmentRegistry::new(units).unwrap();
        let enumerated: Vec<&str> = registry.enumerate().map(|u| u.id.as_str()).collect();
        assert_eq!(enumerated, ids);
    }
}
