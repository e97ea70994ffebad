//! `SettingsBundle` — per-invocation merge of site, unit, and kind defaults.

use super::equipment::EquipmentKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from setting name to value, assembled fresh for every Logic
/// Host invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsBundle {
    pub site_id: u32,
    pub site_name: String,
    pub unit_id: String,
    pub kind: EquipmentKind,
    pub enabled: bool,
    pub values: HashMap<String, SettingValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl SettingsBundle {
    /// Assemble a settings bundle from (a) hard-coded per-kind defaults,
    /// (b) site id/name, (c) unit id/kind, (d) enable flag (default true).
    pub fn assemble(
        site_id: u32,
        site_name: &str,
        unit_id: &str,
        kind: EquipmentKind,
        enabled: Option<bool>,
    ) -> Self {
        Self {
            site_id,
            site_name: site_name.to_string(),
            unit_id: unit_id.to_string(),
            kind,
            enabled: enabled.unwrap_or(true),
            values: default_values_for(kind),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }
}

fn default_values_for(kind: EquipmentKind) -> HashMap<String, SettingValue> {
    let mut values = HashMap::new();
    match kind {
        EquipmentKind::AirHandler => {
            values.insert("minOutdoorDamperPercent".into(), SettingValue::Number(10.0));
            values.insert("maxOutdoorDamperPercent".into(), SettingValue::Number(100.0));
            values.insert("economizerEnabled".into(), SettingValue::Bool(true));
        }
        EquipmentKind::FanCoil => {
            values.insert("minFanSpeedPercent".into(), SettingValue::Number(20.0));
            values.insert("maxFanSpeedPercent".into(), SettingValue::Number(100.0));
        }
        EquipmentKind::Boiler => {
            values.insert("maxFiringRatePercent".into(), SettingValue::Number(100.0));
            values.insert("waterTempSetpointF".into(), SettingValue::Number(180.0));
        }
        EquipmentKind::Pump => {
            values.insert("leadLagEnabled".into(), SettingValue::Bool(true));
            values.insert("minSpeedPercent".into(), SettingValue::Number(20.0));
        }
        EquipmentKind::Chiller => {
            values.insert("chilledWaterSetpointF".into(), SettingValue::Number(44.0));
            values.insert("maxCompressorStage".into(), SettingValue::Number(4.0));
        }
        EquipmentKind::SteamBundle => {
            values.insert("steamTempSetpointF".into(), SettingValue::Number(210.0));
            values.insert("maxSteamPressurePsi".into(), SettingValue::Number(15.0));
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_flag_defaults_true() {
        let bundle = SettingsBundle::assemble(1, "Site A", "fc-1", EquipmentKind::FanCoil, None);
        assert!(bundle.enabled);
    }

    #[test]
    fn per_kind_defaults_are_populated() {
        let bundle = SettingsBundle::assemble(1, "Site A", "b-1", EquipmentKind::Boiler, Some(false));
        assert!(!bundle.enabled);
        assert!(bundle.get("waterTempSetpointF").is_some());
    }
}
