//! `SiteConfig` — TOML-backed, env-overridable site configuration.
//!
//! Loaded in layers: defaults first, then a TOML
//! file (if present), then environment variables, each layer only
//! overriding keys it actually sets (`#[serde(default)]` everywhere).

use crate::config::defaults::{self, KindPolicy, RetryPolicy};
use crate::types::{EquipmentKind, EquipmentUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid environment override {key}: {reason}")]
    BadEnvOverride { key: String, reason: String },
}

/// Per-kind overrides a site may apply on top of [`defaults::kind_policy`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindOverride {
    pub tick_period_secs: Option<u64>,
    pub max_staleness_secs: Option<u64>,
    pub gate_timeout_secs: Option<u64>,
    pub base_priority: Option<u8>,
}

/// A tighter-than-default deviation threshold for sensitive spaces,
/// e.g. operating
/// rooms or data halls that want a smaller band before a job is raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviationOverlay {
    /// Multiplies every tight-control and change-tolerance threshold for
    /// units tagged in `unit_ids`. `0.5` halves the band (tighter control).
    pub factor: f64,
    #[serde(default)]
    pub unit_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site_id: u32,
    pub site_name: String,

    /// The site's fixed equipment list. Deploy-time data:
    /// adding or removing units is not a runtime operation.
    #[serde(default)]
    pub equipment_units: Vec<EquipmentUnit>,

    pub metrics_store_url: String,
    pub ui_command_store_url: String,
    pub command_writer_url: String,

    pub redis_url: String,

    pub state_db_path: String,

    /// Keyed by [`EquipmentKind::tag`] rather than the enum itself: TOML and
    /// JSON map keys must be strings, and the tag is already the kind's
    /// canonical string form.
    #[serde(default)]
    pub kind_overrides: HashMap<String, KindOverride>,

    #[serde(default)]
    pub deviation_overlays: Vec<DeviationOverlay>,

    pub pump_motor_overload_amps: f64,

    pub retry_max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub retry_stall_limit: u32,

    /// How often the stall-recovery sweep runs (mirrors the
    /// 30-second self-healer cadence). The per-job stall threshold itself
    /// is not configured here: it's derived from each job's own kind as
    /// `kind_policy(kind).max_staleness * 2`.
    pub stall_sweep_interval_secs: u64,

    pub worker_concurrency: usize,

    pub dry_run: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            site_id: 0,
            site_name: "unnamed-site".to_string(),
            equipment_units: Vec::new(),
            metrics_store_url: "http://localhost:8080/metrics".to_string(),
            ui_command_store_url: "http://localhost:8080/ui-commands".to_string(),
            command_writer_url: "http://localhost:8080/commands".to_string(),
            redis_url: "redis://127.0.0.1/".to_string(),
            state_db_path: "./data/unit-state".to_string(),
            kind_overrides: HashMap::new(),
            deviation_overlays: Vec::new(),
            pump_motor_overload_amps: defaults::PUMP_MOTOR_OVERLOAD_AMPS_DEFAULT,
            retry_max_retries: retry.max_retries,
            retry_backoff_base_secs: retry.backoff_base.as_secs(),
            retry_stall_limit: retry.stall_limit,
            stall_sweep_interval_secs: 30,
            worker_concurrency: 3,
            dry_run: false,
        }
    }
}

impl SiteConfig {
    /// Load defaults, then overlay a TOML file (if it exists), then
    /// environment variables, in that layered order.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = path {
            if path.exists() {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            } else {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("BMS_SITE_ID") {
            self.site_id = v
                .parse()
                .map_err(|_| ConfigError::BadEnvOverride {
                    key: "BMS_SITE_ID".to_string(),
                    reason: "expected u32".to_string(),
                })?;
        }
        if let Ok(v) = std::env::var("BMS_REDIS_URL") {
            self.redis_url = v;
        }
        if let Ok(v) = std::env::var("BMS_METRICS_STORE_URL") {
            self.metrics_store_url = v;
        }
        if let Ok(v) = std::env::var("BMS_UI_COMMAND_STORE_URL") {
            self.ui_command_store_url = v;
        }
        if let Ok(v) = std::env::var("BMS_COMMAND_WRITER_URL") {
            self.command_writer_url = v;
        }
        if let Ok(v) = std::env::var("BMS_STATE_DB_PATH") {
            self.state_db_path = v;
        }
        if let Ok(v) = std::env::var("BMS_DRY_RUN") {
            self.dry_run = matches!(v.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// Resolved tick/staleness/timeout/priority policy for a kind, with any
    /// site override applied field-by-field.
    pub fn kind_policy(&self, kind: EquipmentKind) -> KindPolicy {
        let base = defaults::kind_policy(kind);
        let Some(o) = self.kind_overrides.get(kind.tag()) else {
            return base;
        };
        KindPolicy {
            tick_period: o
                .tick_period_secs
                .map(std::time::Duration::from_secs)
                .unwrap_or(base.tick_period),
            max_staleness: o
                .max_staleness_secs
                .map(std::time::Duration::from_secs)
                .unwrap_or(base.max_staleness),
            gate_timeout: o
                .gate_timeout_secs
                .map(std::time::Duration::from_secs)
                .unwrap_or(base.gate_timeout),
            base_priority: o.base_priority.unwrap_or(base.base_priority),
        }
    }

    /// The deviation-tightening factor in effect for a given unit, from the
    /// first matching overlay, or `1.0` if none match.
    pub fn deviation_factor_for(&self, unit_id: &str) -> f64 {
        self.deviation_overlays
            .iter()
            .find(|overlay| overlay.unit_ids.iter().any(|id| id == unit_id))
            .map(|overlay| overlay.factor)
            .unwrap_or(1.0)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max_retries,
            backoff_base: std::time::Duration::from_secs(self.retry_backoff_base_secs),
            stall_limit: self.retry_stall_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_file() {
        let config = SiteConfig::load(None).unwrap();
        assert_eq!(config.site_id, 0);
        assert_eq!(config.worker_concurrency, 3);
    }

    #[test]
    fn unmatched_unit_gets_neutral_deviation_factor() {
        let config = SiteConfig::default();
        assert_eq!(config.deviation_factor_for("fc-1"), 1.0);
    }

    #[test]
    fn overlay_applies_only_to_listed_units() {
        let mut config = SiteConfig::default();
        config.deviation_overlays.push(DeviationOverlay {
            factor: 0.5,
            unit_ids: vec!["fc-or-1".to_string()],
        });
        assert_eq!(config.deviation_factor_for("fc-or-1"), 0.5);
        assert_eq!(config.deviation_factor_for("fc-2"), 1.0);
    }

    #[test]
    fn kind_override_replaces_only_the_set_fields() {
        let mut config = SiteConfig::default();
        config.kind_overrides.insert(
            EquipmentKind::FanCoil.tag().to_string(),
            KindOverride {
                tick_period_secs: Some(10),
                ..Default::default()
            },
        );
        let policy = config.kind_policy(EquipmentKind::FanCoil);
        assert_eq!(policy.tick_period.as_secs(), 10);
        assert_eq!(
            policy.max_staleness,
            defaults::kind_policy(EquipmentKind::FanCoil).max_staleness
        );
    }
}
