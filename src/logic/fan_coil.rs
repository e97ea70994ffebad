use super::{proportional_response, ControlAlgorithm, LogicError, ResultRecord};
use crate::types::{CommandValue, EquipmentKind, MetricSnapshot, SettingsBundle, UnitState};

pub struct FanCoilLogic;

impl ControlAlgorithm for FanCoilLogic {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::FanCoil
    }

    fn run(
        &self,
        _metrics: &MetricSnapshot,
        settings: &SettingsBundle,
        control_temp: f64,
        _state: &UnitState,
    ) -> Result<Vec<ResultRecord>, LogicError> {
        if !settings.enabled {
            return Ok(vec![ResultRecord::new("fanEnabled", CommandValue::Bool(false))]);
        }

        let min_fan = settings
            .get("minFanSpeedPercent")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("minFanSpeedPercent"))?;
        let max_fan = settings
            .get("maxFanSpeedPercent")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("maxFanSpeedPercent"))?;

        let setpoint = 72.0;
        let error = control_temp - setpoint;
        let cooling_valve = proportional_response(error, 8.0, 0.0, 100.0);
        let heating_valve = proportional_response(-error, 8.0, 0.0, 100.0);
        let fan_speed = proportional_response(error.abs(), 4.0, min_fan, max_fan);

        Ok(vec![
            ResultRecord::new("fanEnabled", CommandValue::Bool(true)),
            ResultRecord::new("coolingValvePosition", CommandValue::Number(cooling_valve)),
            ResultRecord::new("heatingValvePosition", CommandValue::Number(heating_valve)),
            ResultRecord::new("heatingEnable", CommandValue::Bool(error < -0.5)),
            ResultRecord::new("coolingEnable", CommandValue::Bool(error > 0.5)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_unit_only_emits_fan_off() {
        let settings = SettingsBundle::assemble(1, "Site A", "fc-1", EquipmentKind::FanCoil, Some(false));
        let metrics = MetricSnapshot::empty("fc-1");
        let state = UnitState::new("fc-1");
        let out = FanCoilLogic.run(&metrics, &settings, 72.0, &state).unwrap();
        assert_eq!(out, vec![ResultRecord::new("fanEnabled", CommandValue::Bool(false))]);
    }

    #[test]
    fn warm_room_enables_cooling() {
        let settings = SettingsBundle::assemble(1, "Site A", "fc-1", EquipmentKind::FanCoil, None);
        let metrics = MetricSnapshot::empty("fc-1");
        let state = UnitState::new("fc-1");
        let out = FanCoilLogic.run(&metrics, &settings, 76.0, &state).unwrap();
        let cooling_enable = out
            .iter()
            .find(|r| r.command_name == "coolingEnable")
            .unwrap();
        assert_eq!(cooling_enable.value, CommandValue::Bool(true));
    }
}
