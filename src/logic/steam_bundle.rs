use super::{proportional_response, ControlAlgorithm, LogicError, ResultRecord};
use crate::types::{CommandValue, EquipmentKind, MetricSnapshot, SettingsBundle, UnitState};

pub struct SteamBundleLogic;

impl ControlAlgorithm for SteamBundleLogic {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::SteamBundle
    }

    fn run(
        &self,
        metrics: &MetricSnapshot,
        settings: &SettingsBundle,
        control_temp: f64,
        _state: &UnitState,
    ) -> Result<Vec<ResultRecord>, LogicError> {
        if !settings.enabled {
            return Ok(vec![ResultRecord::new("steamEnable", CommandValue::Bool(false))]);
        }

        let setpoint = settings
            .get("steamTempSetpointF")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("steamTempSetpointF"))?;
        let max_pressure = settings
            .get("maxSteamPressurePsi")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("maxSteamPressurePsi"))?;

        let error = setpoint - control_temp;
        let steam_valve = proportional_response(error, 10.0, 0.0, 100.0);
        let pressure = metrics.get("headerPressurePsi").unwrap_or(0.0).min(max_pressure);

        Ok(vec![
            ResultRecord::new("steamEnable", CommandValue::Bool(true)),
            ResultRecord::new("steamValve", CommandValue::Number(steam_valve)),
            ResultRecord::new("steamTempSetpoint", CommandValue::Number(setpoint)),
            ResultRecord::new("steamPressure", CommandValue::Number(pressure)),
        ])
    }
}
