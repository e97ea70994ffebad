use super::{proportional_response, ControlAlgorithm, LogicError, ResultRecord};
use crate::types::{CommandValue, EquipmentKind, MetricSnapshot, SettingsBundle, UnitState};

pub struct AirHandlerLogic;

impl ControlAlgorithm for AirHandlerLogic {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::AirHandler
    }

    fn run(
        &self,
        metrics: &MetricSnapshot,
        settings: &SettingsBundle,
        control_temp: f64,
        _state: &UnitState,
    ) -> Result<Vec<ResultRecord>, LogicError> {
        if !settings.enabled {
            return Ok(vec![ResultRecord::new("unitEnable", CommandValue::Bool(false))]);
        }

        let min_damper = settings
            .get("minOutdoorDamperPercent")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("minOutdoorDamperPercent"))?;
        let max_damper = settings
            .get("maxOutdoorDamperPercent")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("maxOutdoorDamperPercent"))?;
        let economizer_enabled = settings
            .get("economizerEnabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let setpoint = 72.0;
        let error = control_temp - setpoint;
        let cooling_valve = proportional_response(error, 6.0, 0.0, 100.0);
        let heating_valve = proportional_response(-error, 6.0, 0.0, 100.0);

        let outdoor_air_temp = metrics.get("outdoorAirTemp").unwrap_or(55.0);
        let economizer_favorable = economizer_enabled && outdoor_air_temp < control_temp;
        let outdoor_damper = if economizer_favorable {
            max_damper
        } else {
            min_damper
        };

        Ok(vec![
            ResultRecord::new("unitEnable", CommandValue::Bool(true)),
            ResultRecord::new("fanEnable", CommandValue::Bool(true)),
            ResultRecord::new("fanSpeed", CommandValue::Number(proportional_response(error.abs(), 3.0, 30.0, 100.0))),
            ResultRecord::new("coolingValve", CommandValue::Number(cooling_valve)),
            ResultRecord::new("heatingValve", CommandValue::Number(heating_valve)),
            ResultRecord::new("outdoorDamper", CommandValue::Number(outdoor_damper)),
            ResultRecord::new("economizer", CommandValue::Bool(economizer_favorable)),
            ResultRecord::new("supplyTempSetpoint", CommandValue::Number(setpoint)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn economizer_opens_damper_when_outdoor_air_is_cooler() {
        let settings = SettingsBundle::assemble(1, "Site A", "ah-1", EquipmentKind::AirHandler, None);
        let mut metrics = MetricSnapshot::empty("ah-1");
        metrics.fields.insert("outdoorAirTemp".to_string(), 50.0);
        let state = UnitState::new("ah-1");
        let out = AirHandlerLogic.run(&metrics, &settings, 74.0, &state).unwrap();
        let damper = out.iter().find(|r| r.command_name == "outdoorDamper").unwrap();
        assert_eq!(damper.value, CommandValue::Number(100.0));
    }
}
