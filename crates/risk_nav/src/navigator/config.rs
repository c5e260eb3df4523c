//! Engine configuration and the errors raised while loading or validating it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::engine::{EscapeTarget, NavigationConfig};
use super::panic::{PanicConfig, RescueRule};
use super::risk::RiskConfig;
use super::stress::StressConfig;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub risk: RiskConfig,
    /// Present only for variants that run the LPI monitor.
    pub stress: Option<StressConfig>,
    pub panic: PanicConfig,
    pub navigation: NavigationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::snake()
    }
}

impl EngineConfig {
    /// Snake: body-shape risk, hunger-only pricing, tail chasing, no burst.
    pub fn snake() -> Self {
        Self {
            risk: RiskConfig::default(),
            stress: None,
            panic: PanicConfig::default(),
            navigation: NavigationConfig::default(),
        }
    }

    /// Cleaning robot: trajectory-window risk, LPI stress, escape bursts with
    /// cooldown, budgeted open-space escapes.
    pub fn vacuum() -> Self {
        Self {
            risk: RiskConfig::windowed(),
            stress: Some(StressConfig::default()),
            panic: PanicConfig::bursty(),
            navigation: NavigationConfig {
                escape_target: EscapeTarget::OpenSpace,
                reach_budget: Some(30),
            },
        }
    }

    /// The same agent without self-monitoring: risk is still measured but
    /// never opens a panic, and the LPI monitor is off. The resource alarm
    /// still applies.
    pub fn baseline(mut self) -> Self {
        self.panic.risk_gate = false;
        self.stress = None;
        self
    }

    pub fn is_baseline(&self) -> bool {
        !self.panic.risk_gate
    }

    pub fn sanitized(mut self) -> Self {
        self.risk = self.risk.sanitized();
        self.stress = self.stress.map(StressConfig::sanitized);
        self.panic = self.panic.sanitized();
        self
    }

    /// Rejects settings that cannot be repaired by clamping.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let risk = &self.risk;
        for (field, value) in [
            ("risk.topo_weight", risk.topo_weight),
            ("risk.geom_weight", risk.geom_weight),
            ("risk.entropy_scale", risk.entropy_scale),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: format!("expected a finite non-negative number, got {value}"),
                });
            }
        }
        let sum = risk.topo_weight + risk.geom_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidRiskWeights {
                topo: risk.topo_weight,
                geom: risk.geom_weight,
            });
        }
        if risk.window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "risk.window",
                message: "trajectory window must hold at least one point".to_string(),
            });
        }
        if let Some(stress) = &self.stress {
            if !stress.rho.is_finite() || !(0.0..=1.0).contains(&stress.rho) {
                return Err(ConfigError::InvalidValue {
                    field: "stress.rho",
                    message: format!("expected a value in [0, 1], got {}", stress.rho),
                });
            }
        }
        if !self.panic.risk_drop_margin.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "panic.risk_drop_margin",
                message: format!("expected a finite margin, got {}", self.panic.risk_drop_margin),
            });
        }
        if let RescueRule::RiskDrop { margin } = self.panic.rescue_rule {
            if !margin.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: "panic.rescue_rule.margin",
                    message: format!("expected a finite margin, got {margin}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidRiskWeights { topo: f64, geom: f64 },
    InvalidValue { field: &'static str, message: String },
    ReadConfigFile { path: String, message: String },
    ParseConfigFile { path: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRiskWeights { topo, geom } => {
                write!(f, "risk weights must sum to 1, got topo {topo} + geom {geom}")
            }
            ConfigError::InvalidValue { field, message } => write!(f, "invalid {field}: {message}"),
            ConfigError::ReadConfigFile { path, message } => {
                write!(f, "failed to read config file {path}: {message}")
            }
            ConfigError::ParseConfigFile { path, message } => {
                write!(f, "failed to parse config file {path}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
