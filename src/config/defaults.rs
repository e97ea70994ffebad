//! System-wide default constants and per-kind policy tables.
//!
//! Centralises the per-kind policy numbers as tables so the
//! Gate and Registry consult data, not branching logic. All of these are *defaults*: a
//! [`super::SiteConfig`] may override the tick-period/staleness/priority
//! table, the deviation tolerances, and the retry policy per site.

use crate::types::EquipmentKind;
use std::time::Duration;

// ============================================================================
// Tick period / max staleness / gate timeout / base priority
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindPolicy {
    pub tick_period: Duration,
    pub max_staleness: Duration,
    pub gate_timeout: Duration,
    pub base_priority: u8,
}

/// Default policy table.
pub fn kind_policy(kind: EquipmentKind) -> KindPolicy {
    let (tick, stale, timeout) = match kind {
        EquipmentKind::FanCoil => (30, 45, 45),
        EquipmentKind::AirHandler => (30, 45, 90),
        EquipmentKind::Boiler => (60, 180, 90),
        EquipmentKind::Pump => (30, 120, 60),
        EquipmentKind::Chiller => (300, 480, 180),
        EquipmentKind::SteamBundle => (20, 30, 45),
    };
    KindPolicy {
        tick_period: Duration::from_secs(tick),
        max_staleness: Duration::from_secs(stale),
        gate_timeout: Duration::from_secs(timeout),
        base_priority: 0,
    }
}

// ============================================================================
// Dedup / UI-command recency
// ============================================================================

/// How far back a UI command counts as "recent".
pub const UI_COMMAND_WINDOW: Duration = Duration::from_secs(5 * 60);

/// How often the UI-command store may be queried per unit (throttles repeated checks).
pub const UI_CHECK_THROTTLE: Duration = Duration::from_secs(30);

pub const UI_COMMAND_PRIORITY: u8 = 10;
pub const SAFETY_PRIORITY: u8 = 20;
pub const TEMP_DEVIATION_PRIORITY: u8 = 15;
pub const CHANGE_DEVIATION_PRIORITY: u8 = 5;
pub const STALENESS_PRIORITY: u8 = 1;
pub const GATE_ERROR_PRIORITY: u8 = 1;

// ============================================================================
// Safety predicate catalogue
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    GreaterThan,
    LessThan,
}

/// A single bound check against one metric field.
#[derive(Debug, Clone, Copy)]
pub struct BoundCheck {
    pub field: &'static str,
    pub cmp: Comparison,
    pub bound: f64,
}

impl BoundCheck {
    fn fires(&self, value: f64) -> bool {
        match self.cmp {
            Comparison::GreaterThan => value > self.bound,
            Comparison::LessThan => value < self.bound,
        }
    }
}

/// One safety predicate: either a single bound check, or an AND of several
/// (e.g. "outdoor damper > 95% while outdoor < 32F"), or a boolean flag
/// metric (freezestat) being asserted (non-zero).
#[derive(Debug, Clone)]
pub enum SafetyPredicate {
    Bound {
        check: BoundCheck,
        description: &'static str,
    },
    AllOf {
        checks: &'static [BoundCheck],
        description: &'static str,
    },
    FlagAsserted {
        field: &'static str,
        description: &'static str,
    },
}

impl SafetyPredicate {
    pub fn description(&self) -> &'static str {
        match self {
            SafetyPredicate::Bound { description, .. }
            | SafetyPredicate::AllOf { description, .. }
            | SafetyPredicate::FlagAsserted { description, .. } => description,
        }
    }

    /// Evaluate against a metric lookup function. Missing fields never
    /// fire a predicate (absence is not itself unsafe).
    pub fn fires(&self, get: impl Fn(&str) -> Option<f64>) -> bool {
        match self {
            SafetyPredicate::Bound { check, .. } => {
                get(check.field).map(|v| check.fires(v)).unwrap_or(false)
            }
            SafetyPredicate::AllOf { checks, .. } => checks
                .iter()
                .all(|c| get(c.field).map(|v| c.fires(v)).unwrap_or(false)),
            SafetyPredicate::FlagAsserted { field, .. } => {
                get(field).map(|v| v != 0.0).unwrap_or(false)
            }
        }
    }
}

/// Safety predicate catalogue, per kind.
pub fn safety_predicates(kind: EquipmentKind) -> &'static [SafetyPredicate] {
    use Comparison::{GreaterThan, LessThan};

    match kind {
        EquipmentKind::Boiler => {
            const PREDS: &[SafetyPredicate] = &[
                SafetyPredicate::Bound {
                    check: BoundCheck {
                        field: "supplyWaterTemp",
                        cmp: GreaterThan,
                        bound: 170.0,
                    },
                    description: "supply water temp > 170F",
                },
                SafetyPredicate::FlagAsserted {
                    field: "freezestat",
                    description: "freezestat asserted",
                },
            ];
            PREDS
        }
        EquipmentKind::FanCoil => {
            const PREDS: &[SafetyPredicate] = &[
                SafetyPredicate::Bound {
                    check: BoundCheck {
                        field: "roomTemp",
                        cmp: LessThan,
                        bound: 60.0,
                    },
                    description: "room temp < 60F",
                },
                SafetyPredicate::Bound {
                    check: BoundCheck {
                        field: "roomTemp",
                        cmp: GreaterThan,
                        bound: 85.0,
                    },
                    description: "room temp > 85F",
                },
            ];
            PREDS
        }
        EquipmentKind::AirHandler => {
            const COLD_OUTDOOR_OPEN_DAMPER: &[BoundCheck] = &[
                BoundCheck {
                    field: "outdoorDamperPercent",
                    cmp: GreaterThan,
                    bound: 95.0,
                },
                BoundCheck {
                    field: "outdoorAirTemp",
                    cmp: LessThan,
                    bound: 32.0,
                },
            ];
            const PREDS: &[SafetyPredicate] = &[
                SafetyPredicate::Bound {
                    check: BoundCheck {
                        field: "supplyAirTemp",
                        cmp: GreaterThan,
                        bound: 85.0,
                    },
                    description: "supply air > 85F",
                },
                SafetyPredicate::Bound {
                    check: BoundCheck {
                        field: "mixedAirTemp",
                        cmp: LessThan,
                        bound: 35.0,
                    },
                    description: "mixed air < 35F",
                },
                SafetyPredicate::AllOf {
                    checks: COLD_OUTDOOR_OPEN_DAMPER,
                    description: "outdoor damper open in cold",
                },
                SafetyPredicate::FlagAsserted {
                    field: "freezestat",
                    description: "freezestat asserted",
                },
            ];
            PREDS
        }
        EquipmentKind::Pump => {
            const PREDS: &[SafetyPredicate] = &[
                SafetyPredicate::Bound {
                    check: BoundCheck {
                        field: "motorCurrentAmps",
                        cmp: GreaterThan,
                        bound: 0.0, // overridden per-site via motor-overload limit; see note below
                    },
                    description: "motor current > overload limit",
                },
                SafetyPredicate::Bound {
                    check: BoundCheck {
                        field: "vibrationInPerSec",
                        cmp: GreaterThan,
                        bound: 0.5,
                    },
                    description: "vibration > limit",
                },
            ];
            PREDS
        }
        EquipmentKind::SteamBundle => {
            const PREDS: &[SafetyPredicate] = &[SafetyPredicate::Bound {
                check: BoundCheck {
                    field: "headerPressurePsi",
                    cmp: GreaterThan,
                    bound: 15.0,
                },
                description: "header pressure > 15 psi",
            }];
            PREDS
        }
        EquipmentKind::Chiller => {
            const PREDS: &[SafetyPredicate] = &[SafetyPredicate::Bound {
                check: BoundCheck {
                    field: "dischargePressurePsi",
                    cmp: GreaterThan,
                    bound: 200.0,
                },
                description: "discharge pressure > 200 psi",
            }];
            PREDS
        }
    }
}

/// Pump's motor-overload current bound is equipment-specific (nameplate
/// current varies by motor), so unlike the other fixed bounds it is a
/// per-site-configurable default rather than a spec-mandated literal.
/// Keeping the predicate-table entry above at a 0.0 placeholder would be
/// wrong on its own, so the Gate substitutes this default unless a site
/// overrides it.
pub const PUMP_MOTOR_OVERLOAD_AMPS_DEFAULT: f64 = 40.0;

// ============================================================================
// Temperature deviation (tight-control threshold)
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct TempDeviationRule {
    /// Metric field holding the setpoint to compare the control
    /// temperature against.
    pub setpoint_field: &'static str,
    /// Threshold in °F; exceeding it (inclusive-above) triggers.
    pub threshold_f: f64,
}

/// `None` for kinds whose defining control variable is not itself a
/// setpoint-tracked temperature (pump: OAT drives lead/lag, not a PID loop).
pub fn temp_deviation_rule(kind: EquipmentKind) -> Option<TempDeviationRule> {
    match kind {
        EquipmentKind::FanCoil => Some(TempDeviationRule {
            setpoint_field: "setpoint",
            threshold_f: 2.0,
        }),
        EquipmentKind::AirHandler => Some(TempDeviationRule {
            setpoint_field: "setpoint",
            threshold_f: 2.5,
        }),
        EquipmentKind::Boiler => Some(TempDeviationRule {
            setpoint_field: "setpoint",
            threshold_f: 4.0,
        }),
        EquipmentKind::SteamBundle => Some(TempDeviationRule {
            setpoint_field: "setpoint",
            threshold_f: 5.0,
        }),
        EquipmentKind::Chiller => Some(TempDeviationRule {
            setpoint_field: "setpoint",
            threshold_f: 2.0,
        }),
        EquipmentKind::Pump => None,
    }
}

// ============================================================================
// Change-vs-last-snapshot tolerances
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct DeviationTolerance {
    pub field: &'static str,
    pub tolerance: f64,
}

/// Per-kind, per-field tolerance table.
pub fn deviation_tolerances(kind: EquipmentKind) -> &'static [DeviationTolerance] {
    match kind {
        EquipmentKind::AirHandler => &[
            DeviationTolerance { field: "zoneTemp", tolerance: 2.0 },
            DeviationTolerance { field: "outdoorDamperPercent", tolerance: 20.0 },
        ],
        EquipmentKind::FanCoil => &[
            DeviationTolerance { field: "roomTemp", tolerance: 1.5 },
            DeviationTolerance { field: "coolingValvePosition", tolerance: 20.0 },
        ],
        EquipmentKind::Pump => &[
            DeviationTolerance { field: "pumpSpeedPercent", tolerance: 15.0 },
            DeviationTolerance { field: "dischargePressurePsi", tolerance: 5.0 },
        ],
        EquipmentKind::Boiler => &[
            DeviationTolerance { field: "supplyWaterTemp", tolerance: 4.0 },
            DeviationTolerance { field: "firingRatePercent", tolerance: 8.0 },
        ],
        EquipmentKind::Chiller => &[
            DeviationTolerance { field: "chilledWaterSupplyTemp", tolerance: 2.0 },
            DeviationTolerance { field: "dischargePressurePsi", tolerance: 8.0 },
        ],
        EquipmentKind::SteamBundle => &[
            DeviationTolerance { field: "steamTemp", tolerance: 5.0 },
            DeviationTolerance { field: "steamValvePosition", tolerance: 25.0 },
        ],
    }
}

// ============================================================================
// Queue retry / retention / stall policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub stall_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
            stall_limit: 3,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for the given attempt number, with up to 20%
    /// jitter so retries across many simultaneously-failing jobs don't
    /// all wake up in the same instant.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;
        let base = self.backoff_base * 2u32.pow(attempt.saturating_sub(1));
        let jitter_fraction = rand::thread_rng().gen_range(0.0..0.2);
        base + base.mul_f64(jitter_fraction)
    }
}

pub const COMPLETED_RETENTION: usize = 10;
pub const FAILED_RETENTION: usize = 25;
