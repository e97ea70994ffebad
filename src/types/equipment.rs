//! Equipment identity: the tagged `Kind` variant and the static per-unit
//! registry entry.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tagged variant naming the class of managed HVAC unit.
///
/// Selects the control algorithm and the Gate's threshold tables. Kept as
/// a closed enum rather than a free-form string so an unregistered kind is
/// a compile error, not a runtime lookup miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EquipmentKind {
    AirHandler,
    FanCoil,
    Boiler,
    Pump,
    Chiller,
    SteamBundle,
}

impl EquipmentKind {
    /// All kinds, in a stable order — used to build per-kind default tables.
    pub const ALL: [EquipmentKind; 6] = [
        EquipmentKind::AirHandler,
        EquipmentKind::FanCoil,
        EquipmentKind::Boiler,
        EquipmentKind::Pump,
        EquipmentKind::Chiller,
        EquipmentKind::SteamBundle,
    ];

    /// Short tag used in job keys, log fields, and command records.
    pub fn tag(self) -> &'static str {
        match self {
            EquipmentKind::AirHandler => "air-handler",
            EquipmentKind::FanCoil => "fan-coil",
            EquipmentKind::Boiler => "boiler",
            EquipmentKind::Pump => "pump",
            EquipmentKind::Chiller => "chiller",
            EquipmentKind::SteamBundle => "steam-bundle",
        }
    }

    /// The logic-module filename this kind resolves to.
    pub fn logic_module_name(self) -> &'static str {
        match self {
            EquipmentKind::AirHandler => "air-handler",
            EquipmentKind::FanCoil => "fan-coil",
            EquipmentKind::Boiler => "boiler",
            EquipmentKind::Pump => "pumps",
            EquipmentKind::Chiller => "chiller",
            EquipmentKind::SteamBundle => "steam-bundle",
        }
    }
}

impl std::fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl std::str::FromStr for EquipmentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EquipmentKind::ALL
            .into_iter()
            .find(|k| k.tag() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown equipment kind: {0}")]
pub struct UnknownKind(pub String);

/// Static per-unit description, loaded once from `SiteConfig` at startup
/// and never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentUnit {
    /// Opaque, site-unique identifier.
    pub id: String,
    pub kind: EquipmentKind,
    /// Name used to resolve the control algorithm (normally matches
    /// `kind.logic_module_name()`, but kept distinct so a site config can
    /// alias a unit onto a different module if ever required).
    pub logic_module: String,
    #[serde(with = "duration_secs")]
    pub tick_period: Duration,
    #[serde(with = "duration_secs")]
    pub max_staleness: Duration,
    #[serde(with = "duration_secs")]
    pub gate_timeout: Duration,
    pub base_priority: u8,
    pub site_id: u32,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_from_str() {
        for kind in EquipmentKind::ALL {
            let parsed: EquipmentKind = kind.tag().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!("radiator".parse::<EquipmentKind>().is_err());
    }
}
