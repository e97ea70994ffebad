use super::{proportional_response, ControlAlgorithm, LogicError, ResultRecord};
use crate::types::{CommandValue, EquipmentKind, MetricSnapshot, SettingsBundle, UnitState};

pub struct ChillerLogic;

impl ControlAlgorithm for ChillerLogic {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Chiller
    }

    fn run(
        &self,
        _metrics: &MetricSnapshot,
        settings: &SettingsBundle,
        control_temp: f64,
        _state: &UnitState,
    ) -> Result<Vec<ResultRecord>, LogicError> {
        if !settings.enabled {
            return Ok(vec![ResultRecord::new("chillerEnable", CommandValue::Bool(false))]);
        }

        let setpoint = settings
            .get("chilledWaterSetpointF")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("chilledWaterSetpointF"))?;
        let max_stage = settings
            .get("maxCompressorStage")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("maxCompressorStage"))?;

        let error = control_temp - setpoint;
        let stage = proportional_response(error, 1.0, 0.0, max_stage).round();

        Ok(vec![
            ResultRecord::new("chillerEnable", CommandValue::Bool(true)),
            ResultRecord::new("chilledWaterSetpoint", CommandValue::Number(setpoint)),
            ResultRecord::new("compressorStage", CommandValue::Number(stage)),
        ])
    }
}
