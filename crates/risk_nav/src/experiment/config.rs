use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::run::DEFAULT_DEADLOCK_WINDOW;
use crate::geometry::GridError;
use crate::navigator::{
    ConfigError, EngineConfig, HungerPricingConfig, SnapshotError, StressPricingConfig,
};
use crate::world::{SnakeWorldConfig, VacuumWorldConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Snake,
    Vacuum,
}

impl Variant {
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Snake => "snake",
            Variant::Vacuum => "vacuum",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "snake" => Some(Variant::Snake),
            "vacuum" | "robot" => Some(Variant::Vacuum),
            _ => None,
        }
    }
}

/// Which controller drives a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agent {
    /// Risk gate, stress monitor and α-priced thresholds.
    #[default]
    Gated,
    /// Goal seeking with the resource alarm only; never panics.
    Baseline,
}

impl Agent {
    pub fn label(&self) -> &'static str {
        match self {
            Agent::Gated => "gated",
            Agent::Baseline => "baseline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First world seed.
    pub seed_start: u64,
    /// Number of consecutive seeds per α.
    pub seeds: u64,
    /// Sensitivities to sweep, in run order.
    pub alphas: Vec<f64>,
    /// Step limit per run.
    pub max_steps: u64,
    /// A step counts as deadlocked when none of the last this-many steps moved.
    pub deadlock_window: usize,
    /// Also run the baseline agent once per seed, ahead of the α runs.
    pub baseline: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            seed_start: 1000,
            seeds: 50,
            alphas: vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0],
            max_steps: 2000,
            deadlock_window: DEFAULT_DEADLOCK_WINDOW,
            baseline: false,
        }
    }
}

impl SweepConfig {
    pub fn sanitized(mut self) -> Self {
        self.alphas.retain(|alpha| alpha.is_finite() && *alpha >= 0.0);
        if self.alphas.is_empty() {
            self.alphas.push(0.0);
        }
        if self.deadlock_window == 0 {
            self.deadlock_window = 1;
        }
        self
    }
}

/// Everything a sweep needs.
///
/// A TOML file is layered over [`ExperimentConfig::default`]: any table or
/// field it leaves out keeps the preset value, at every nesting level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// World the sweep runs.
    pub variant: Variant,
    pub engine_snake: EngineConfig,
    pub engine_vacuum: EngineConfig,
    pub snake_pricing: HungerPricingConfig,
    /// `None` derives the robot pricing from the battery capacity.
    pub vacuum_pricing: Option<StressPricingConfig>,
    pub snake: SnakeWorldConfig,
    pub vacuum: VacuumWorldConfig,
    pub sweep: SweepConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Snake,
            engine_snake: EngineConfig::snake(),
            engine_vacuum: EngineConfig::vacuum(),
            snake_pricing: HungerPricingConfig::default(),
            vacuum_pricing: None,
            snake: SnakeWorldConfig::default(),
            vacuum: VacuumWorldConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_toml(content, "<inline>")
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::ReadConfigFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::parse_toml(&content, &path.display().to_string())
    }

    fn parse_toml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let parse_error = |message: String| ConfigError::ParseConfigFile {
            path: origin.to_string(),
            message,
        };
        let overrides: toml::Table =
            toml::from_str(content).map_err(|err| parse_error(err.to_string()))?;
        let mut merged = toml::Value::try_from(ExperimentConfig::default())
            .map_err(|err| parse_error(err.to_string()))?;
        layer(&mut merged, toml::Value::Table(overrides));
        let config: ExperimentConfig = merged
            .try_into()
            .map_err(|err: toml::de::Error| parse_error(err.to_string()))?;
        config.engine_snake.validate()?;
        config.engine_vacuum.validate()?;
        Ok(config.sanitized())
    }

    pub fn sanitized(mut self) -> Self {
        self.engine_snake = self.engine_snake.sanitized();
        self.engine_vacuum = self.engine_vacuum.sanitized();
        self.vacuum = self.vacuum.sanitized();
        self.sweep = self.sweep.sanitized();
        self
    }
}

/// Lays `overrides` over `base`. Tables merge key by key; a table carrying
/// a `type` tag selects an enum variant and replaces the base entry whole,
/// as does every other value.
fn layer(base: &mut toml::Value, overrides: toml::Value) {
    match (base, overrides) {
        (toml::Value::Table(base), toml::Value::Table(overrides))
            if !overrides.contains_key("type") =>
        {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => layer(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentError {
    Config(ConfigError),
    Grid(GridError),
    Snapshot(SnapshotError),
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::Config(err) => write!(f, "config error: {err}"),
            ExperimentError::Grid(err) => write!(f, "world setup failed: {err}"),
            ExperimentError::Snapshot(err) => write!(f, "invalid world snapshot: {err}"),
        }
    }
}

impl std::error::Error for ExperimentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExperimentError::Config(err) => Some(err),
            ExperimentError::Grid(err) => Some(err),
            ExperimentError::Snapshot(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ExperimentError {
    fn from(err: ConfigError) -> Self {
        ExperimentError::Config(err)
    }
}

impl From<GridError> for ExperimentError {
    fn from(err: GridError) -> Self {
        ExperimentError::Grid(err)
    }
}

impl From<SnapshotError> for ExperimentError {
    fn from(err: SnapshotError) -> Self {
        ExperimentError::Snapshot(err)
    }
}
