//! Process-global configuration, loaded once at startup and read from
//! everywhere else behind a [`OnceLock`], the usual pattern for a process-wide
//! module.

mod defaults;
mod site_config;

pub use defaults::{
    kind_policy, safety_predicates, temp_deviation_rule, BoundCheck, Comparison,
    DeviationTolerance, KindPolicy, RetryPolicy, SafetyPredicate, TempDeviationRule,
    COMPLETED_RETENTION, FAILED_RETENTION, GATE_ERROR_PRIORITY, PUMP_MOTOR_OVERLOAD_AMPS_DEFAULT,
    SAFETY_PRIORITY, STALENESS_PRIORITY, TEMP_DEVIATION_PRIORITY, UI_CHECK_THROTTLE,
    UI_COMMAND_PRIORITY, UI_COMMAND_WINDOW,
};
pub use site_config::{ConfigError, DeviationOverlay, KindOverride, SiteConfig};

use std::path::Path;
use std::sync::OnceLock;

static CONFIG: OnceLock<SiteConfig> = OnceLock::new();

/// Load and install the global config. Must be called exactly once, early
/// in `main`; later calls are a programming error and panic.
pub fn init(path: Option<&Path>) -> Result<(), ConfigError> {
    init_with_site_override(path, None)
}

/// Same as [`init`], additionally applying a `--site` CLI override on top
/// of whatever the file/env layers resolved.
pub fn init_with_site_override(path: Option<&Path>, site_override: Option<u32>) -> Result<(), ConfigError> {
    let mut config = SiteConfig::load(path)?;
    if let Some(site_id) = site_override {
        config.site_id = site_id;
    }
    CONFIG
        .set(config)
        .unwrap_or_else(|_| panic!("config::init called more than once"));
    Ok(())
}

/// The global config. Panics if [`init`] has not run yet.
pub fn get() -> &'static SiteConfig {
    CONFIG
        .get()
        .expect("config::get called before config::init")
}

pub fn is_initialized() -> bool {
    CONFIG.get().is_some()
}

/// Test-only helper: install an explicit config, ignoring a prior `init`.
/// Not gated behind `cfg(test)` so integration test binaries (which link
/// the library without the crate's own test cfg) can call it too.
pub fn set_for_test(config: SiteConfig) {
    let _ = CONFIG.set(config);
}
