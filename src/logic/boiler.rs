use super::{proportional_response, ControlAlgorithm, LogicError, ResultRecord};
use crate::types::{CommandValue, EquipmentKind, MetricSnapshot, SettingsBundle, UnitState};

pub struct BoilerLogic;

impl ControlAlgorithm for BoilerLogic {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Boiler
    }

    fn run(
        &self,
        _metrics: &MetricSnapshot,
        settings: &SettingsBundle,
        control_temp: f64,
        _state: &UnitState,
    ) -> Result<Vec<ResultRecord>, LogicError> {
        if !settings.enabled {
            return Ok(vec![ResultRecord::new("boilerEnable", CommandValue::Bool(false))]);
        }

        let setpoint = settings
            .get("waterTempSetpointF")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("waterTempSetpointF"))?;
        let max_firing_rate = settings
            .get("maxFiringRatePercent")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("maxFiringRatePercent"))?;

        let error = setpoint - control_temp;
        let firing_rate = proportional_response(error, 10.0, 0.0, max_firing_rate);

        Ok(vec![
            ResultRecord::new("boilerEnable", CommandValue::Bool(true)),
            ResultRecord::new("firingRate", CommandValue::Number(firing_rate)),
            ResultRecord::new("waterTempSetpoint", CommandValue::Number(setpoint)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firing_rate_rises_when_below_setpoint() {
        let settings = SettingsBundle::assemble(1, "Site A", "b-1", EquipmentKind::Boiler, None);
        let metrics = MetricSnapshot::empty("b-1");
        let state = UnitState::new("b-1");
        let cold = BoilerLogic.run(&metrics, &settings, 150.0, &state).unwrap();
        let warm = BoilerLogic.run(&metrics, &settings, 175.0, &state).unwrap();
        let rate = |out: &[ResultRecord]| match &out.iter().find(|r| r.command_name == "firingRate").unwrap().value {
            CommandValue::Number(n) => *n,
            _ => panic!("expected number"),
        };
        assert!(rate(&cold) > rate(&warm));
    }
}
