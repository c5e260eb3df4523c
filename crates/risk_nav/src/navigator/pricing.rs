//! Coasean pricing: dynamic thresholds driven by scarcity, stress and α.
//!
//! The engine only sees the [`ThresholdPolicy`] trait, so the experimental
//! variable α lives in exactly one place and strategies can be swapped
//! without touching navigation.

use serde::{Deserialize, Serialize};

/// Inputs to one pricing evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingInput {
    /// Resource scarcity in [0, 1]: hunger ratio or battery pressure.
    pub scarcity: f64,
    /// Smoothed stress from the LPI monitor, 0 when no monitor runs.
    pub stress: f64,
    /// Raw resource level, compared against the alarm threshold.
    pub resource_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Risk at or above which the agent panics.
    pub risk: f64,
    /// Resource level below which the agent switches to survival; `None`
    /// for variants without a survival mode.
    pub resource_alarm: Option<f64>,
}

pub trait ThresholdPolicy {
    /// Sensitivity coefficient α.
    fn alpha(&self) -> f64;

    fn thresholds(&self, input: &PricingInput) -> Thresholds;
}

impl<P: ThresholdPolicy + ?Sized> ThresholdPolicy for Box<P> {
    fn alpha(&self) -> f64 {
        (**self).alpha()
    }

    fn thresholds(&self, input: &PricingInput) -> Thresholds {
        (**self).thresholds(input)
    }
}

/// Inclusive clamp range applied to every risk threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ThresholdRange {
    fn default() -> Self {
        Self {
            min: 0.2,
            max: 0.95,
        }
    }
}

impl ThresholdRange {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn sanitized(mut self) -> Self {
        self.min = self.min.clamp(0.0, 1.0);
        self.max = self.max.clamp(self.min, 1.0);
        self
    }
}

fn sanitize_alpha(alpha: f64) -> f64 {
    if alpha.is_finite() {
        alpha.max(0.0)
    } else {
        0.0
    }
}

// ============================================================================
// Hunger Pricing (snake)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HungerPricingConfig {
    pub base_risk_threshold: f64,
    pub hunger_gain: f64,
    pub risk_range: ThresholdRange,
}

impl Default for HungerPricingConfig {
    fn default() -> Self {
        Self {
            base_risk_threshold: 0.35,
            hunger_gain: 0.50,
            risk_range: ThresholdRange::default(),
        }
    }
}

/// `risk = base + scarcity * hunger_gain * α`: the hungrier the agent, the
/// more risk it accepts before detouring. No survival alarm.
#[derive(Debug, Clone, PartialEq)]
pub struct HungerPricing {
    config: HungerPricingConfig,
    alpha: f64,
}

impl HungerPricing {
    pub fn new(config: HungerPricingConfig, alpha: f64) -> Self {
        let risk_range = config.risk_range.sanitized();
        Self {
            config: HungerPricingConfig {
                risk_range,
                ..config
            },
            alpha: sanitize_alpha(alpha),
        }
    }

    /// The unclamped α-dependent term of the risk threshold.
    pub fn sensitivity(&self, scarcity: f64) -> f64 {
        scarcity.clamp(0.0, 1.0) * (self.config.hunger_gain * self.alpha)
    }
}

impl ThresholdPolicy for HungerPricing {
    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn thresholds(&self, input: &PricingInput) -> Thresholds {
        let raw = self.config.base_risk_threshold + self.sensitivity(input.scarcity);
        Thresholds {
            risk: self.config.risk_range.clamp(raw),
            resource_alarm: None,
        }
    }
}

// ============================================================================
// Stress Pricing (robot)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressPricingConfig {
    pub base_risk_threshold: f64,
    /// How strongly stress lowers the risk threshold (scaled by α).
    pub panic_gain: f64,
    /// How strongly battery pressure lowers the risk threshold.
    pub pressure_gain: f64,
    pub base_low_resource: f64,
    /// How strongly stress raises the low-resource alarm (scaled by α).
    pub resource_gain: f64,
    pub alarm_min: f64,
    pub alarm_max: f64,
    pub risk_range: ThresholdRange,
}

impl Default for StressPricingConfig {
    fn default() -> Self {
        Self {
            base_risk_threshold: 0.80,
            panic_gain: 0.40,
            pressure_gain: 0.25,
            base_low_resource: 20.0,
            resource_gain: 20.0,
            alarm_min: 5.0,
            alarm_max: 59.0,
            risk_range: ThresholdRange::default(),
        }
    }
}

/// Stress makes the agent more risk-averse: it lowers the panic threshold and
/// raises the point at which it heads home. Battery pressure lowers the panic
/// threshold on its own, independent of α.
#[derive(Debug, Clone, PartialEq)]
pub struct StressPricing {
    config: StressPricingConfig,
    alpha: f64,
}

impl StressPricing {
    pub fn new(config: StressPricingConfig, alpha: f64) -> Self {
        let risk_range = config.risk_range.sanitized();
        let alarm_max = config.alarm_max.max(config.alarm_min);
        Self {
            config: StressPricingConfig {
                risk_range,
                alarm_max,
                ..config
            },
            alpha: sanitize_alpha(alpha),
        }
    }

    /// Builds the default robot pricing with the alarm capped just below a
    /// full battery.
    pub fn for_battery(battery_max: f64, alpha: f64) -> Self {
        let config = StressPricingConfig {
            alarm_max: (battery_max - 1.0).max(0.0),
            ..StressPricingConfig::default()
        };
        Self::new(config, alpha)
    }
}

impl ThresholdPolicy for StressPricing {
    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn thresholds(&self, input: &PricingInput) -> Thresholds {
        let config = &self.config;
        let stress = input.stress.max(0.0);
        let scarcity = input.scarcity.clamp(0.0, 1.0);

        let risk = config.base_risk_threshold
            - self.alpha * config.panic_gain * stress
            - config.pressure_gain * scarcity;
        let alarm = config.base_low_resource + stress * config.resource_gain * self.alpha;

        Thresholds {
            risk: config.risk_range.clamp(risk),
            resource_alarm: Some(alarm.clamp(config.alarm_min, config.alarm_max)),
        }
    }
}
