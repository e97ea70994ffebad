use super::{proportional_response, ControlAlgorithm, LogicError, ResultRecord};
use crate::types::{CommandValue, EquipmentKind, MetricSnapshot, SettingsBundle, UnitState};

pub struct PumpLogic;

impl ControlAlgorithm for PumpLogic {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Pump
    }

    fn run(
        &self,
        _metrics: &MetricSnapshot,
        settings: &SettingsBundle,
        control_temp: f64,
        state: &UnitState,
    ) -> Result<Vec<ResultRecord>, LogicError> {
        if !settings.enabled {
            return Ok(vec![ResultRecord::new("pumpEnable", CommandValue::Bool(false))]);
        }

        let min_speed = settings
            .get("minSpeedPercent")
            .and_then(|v| v.as_number())
            .ok_or(LogicError::MissingSetting("minSpeedPercent"))?;
        let lead_lag_enabled = settings
            .get("leadLagEnabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        // Outdoor air temperature is the lead/lag control driver: colder
        // outside air raises demand, so more pumps lead.
        let demand_error = 60.0 - control_temp;
        let speed = proportional_response(demand_error, 5.0, min_speed, 100.0);

        let is_lead = if lead_lag_enabled {
            state.lead_lag.is_lead
        } else {
            true
        };
        let reason = if lead_lag_enabled {
            "lead/lag rotation"
        } else {
            "lead/lag disabled, running as lead"
        };

        Ok(vec![
            ResultRecord::new("pumpEnable", CommandValue::Bool(true)),
            ResultRecord::new("pumpSpeed", CommandValue::Number(speed)),
            ResultRecord::new("pumpCommand", CommandValue::Text(if is_lead { "run".to_string() } else { "standby".to_string() })),
            ResultRecord::new("leadLagStatus", CommandValue::Text(if is_lead { "lead".to_string() } else { "lag".to_string() })),
            ResultRecord::new("isLead", CommandValue::Bool(is_lead)),
            ResultRecord::new(
                "leadLagGroupId",
                match state.lead_lag.group_id {
                    Some(id) => CommandValue::Number(id as f64),
                    None => CommandValue::Text("none".to_string()),
                },
            ),
            ResultRecord::new("leadLagReason", CommandValue::Text(reason.to_string())),
        ])
    }
}
