//! Per-kind actionable-command allowlists — a closed
//! vocabulary, kept as data rather than branching logic.

use crate::types::EquipmentKind;

pub fn actionable_commands(kind: EquipmentKind) -> &'static [&'static str] {
    match kind {
        EquipmentKind::AirHandler => &[
            "fanEnable",
            "fanSpeed",
            "heatingValve",
            "coolingValve",
            "outdoorDamper",
            "returnDamper",
            "mixedAirDamper",
            "supplyTempSetpoint",
            "economizer",
            "unitEnable",
            "temperatureSetpoint",
        ],
        EquipmentKind::FanCoil => &[
            "fanEnabled",
            "heatingValvePosition",
            "coolingValvePosition",
            "heatingEnable",
            "coolingEnable",
        ],
        EquipmentKind::Pump => &[
            "pumpEnable",
            "pumpSpeed",
            "pumpCommand",
            "leadLagStatus",
            "isLead",
            "leadLagGroupId",
            "leadEquipmentId",
            "leadLagReason",
        ],
        EquipmentKind::Boiler => &["boilerEnable", "firingRate", "waterTempSetpoint"],
        EquipmentKind::SteamBundle => &[
            "steamValve",
            "steamEnable",
            "steamTempSetpoint",
            "steamPressure",
        ],
        EquipmentKind::Chiller => &["chillerEnable", "chilledWaterSetpoint", "compressorStage"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_non_empty_allowlist() {
        for kind in EquipmentKind::ALL {
            assert!(!actionable_commands(kind).is_empty());
        }
    }
}
