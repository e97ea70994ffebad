//! Command values and records — the Writer's output shape.
//!
//! The command store's value column is string-typed, but we carry values
//! internally as a tagged union and stringify only at the writer boundary.

use super::equipment::EquipmentKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl std::fmt::Display for CommandValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandValue::Bool(b) => write!(f, "{b}"),
            CommandValue::Number(n) => write!(f, "{n}"),
            CommandValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One `(commandName, value)` pair, as produced by a [`crate::logic::ControlAlgorithm`]
/// and as remembered in [`super::state::UnitState::last_outputs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandValuePair {
    pub name: String,
    pub value: CommandValue,
}

/// A single durable, append-only command record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub equipment_id: String,
    pub site_id: u32,
    pub equipment_type: EquipmentKind,
    pub command_type: String,
    pub value: CommandValue,
    pub source: &'static str,
    pub status: &'static str,
    /// Emit instant, nanosecond precision.
    pub emitted_at_nanos: u128,
}

impl CommandRecord {
    pub fn new(
        equipment_id: &str,
        site_id: u32,
        equipment_type: EquipmentKind,
        command_type: &str,
        value: CommandValue,
        emitted_at_nanos: u128,
    ) -> Self {
        Self {
            equipment_id: equipment_id.to_string(),
            site_id,
            equipment_type,
            command_type: command_type.to_string(),
            value,
            source: "worker",
            status: "active",
            emitted_at_nanos,
        }
    }

    /// The stringified value as it would be written to the string-typed
    /// store column.
    pub fn stringified_value(&self) -> String {
        self.value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringifies_each_variant_without_quoting() {
        assert_eq!(CommandValue::Bool(true).to_string(), "true");
        assert_eq!(CommandValue::Number(72.5).to_string(), "72.5");
        assert_eq!(CommandValue::Text("lead".into()).to_string(), "lead");
    }
}
