//! `CoreConfig` — environment tunables captured once at construction.
//!
//! The source this spec is distilled from reads trust-weighting environment
//! variables at every step; here they are read exactly once when the
//! config is built, and the engine treats the result as immutable for the
//! rest of the run (spec §5, §9 open question 2).

use std::collections::HashSet;
use std::env;

use serde::{Deserialize, Serialize};

/// Trusted-drift composition weights and threshold (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrustConfig {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub tau: f64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            beta: 0.2,
            gamma: 0.2,
            delta: 0.2,
            tau: 0.6,
        }
    }
}

impl TrustConfig {
    fn from_env() -> Self {
        let d = Self::default();
        Self {
            alpha: env_f64("AXIOM_TRUST_ALPHA", d.alpha),
            beta: env_f64("AXIOM_TRUST_BETA", d.beta),
            gamma: env_f64("AXIOM_TRUST_GAMMA", d.gamma),
            delta: env_f64("AXIOM_TRUST_DELTA", d.delta),
            tau: env_f64("AXIOM_TRUST_TAU", d.tau),
        }
    }
}

/// Domain-specific node-weight scale overrides (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeightScaleConfig {
    pub weight_scale: f64,
    pub resource_w_scale: f64,
    pub lecture_w_scale: f64,
    pub pset_w_scale: f64,
    /// Course ids the resource-feature augmentation applies to; `["*"]`
    /// means all courses.
    pub resource_feature_courses: Vec<String>,
}

impl Default for WeightScaleConfig {
    fn default() -> Self {
        Self {
            weight_scale: 1.0,
            resource_w_scale: 1.0,
            lecture_w_scale: 1.0,
            pset_w_scale: 1.0,
            resource_feature_courses: vec!["*".to_string()],
        }
    }
}

impl WeightScaleConfig {
    fn from_env() -> Self {
        let d = Self::default();
        let courses = env::var("AXIOM_RESOURCE_FEATURE_COURSES")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.split(',').map(|c| c.trim().to_string()).collect())
            .unwrap_or(d.resource_feature_courses.clone());
        Self {
            weight_scale: env_f64("AXIOM_WEIGHT_SCALE", d.weight_scale),
            resource_w_scale: env_f64("AXIOM_RESOURCE_W_SCALE", d.resource_w_scale),
            lecture_w_scale: env_f64("AXIOM_LECTURE_W_SCALE", d.lecture_w_scale),
            pset_w_scale: env_f64("AXIOM_PSET_W_SCALE", d.pset_w_scale),
            resource_feature_courses: courses,
        }
    }

    pub fn applies_to(&self, course_id: &str) -> bool {
        let all: HashSet<&str> = self
            .resource_feature_courses
            .iter()
            .map(|s| s.as_str())
            .collect();
        all.contains("*") || all.contains(course_id)
    }
}

/// `CapacityPolicy` parameters (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CapacityConfig {
    pub max_edges: Option<usize>,
    pub sticky_fraction: f64,
    pub max_nodes: Option<usize>,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            max_edges: None,
            sticky_fraction: 0.5,
            max_nodes: None,
        }
    }
}

/// Signal computer toggles (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SignalConfig {
    pub compute_spread: bool,
    pub compute_locality: bool,
}

/// `MonteCarloHead` parameters (spec §4.7.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub num_samples: usize,
    pub edge_dropout: f64,
    pub weight_jitter: f64,
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_samples: 16,
            edge_dropout: 0.1,
            weight_jitter: 0.1,
            seed: None,
        }
    }
}

/// `ForecastHead` parameters (spec §4.7.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastConfig {
    pub window_size: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { window_size: 3 }
    }
}

/// `RegimeChangeHead` parameters (spec §4.7.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegimeChangeConfig {
    pub window: usize,
    pub threshold: f64,
}

impl Default for RegimeChangeConfig {
    fn default() -> Self {
        Self {
            window: 3,
            threshold: 0.25,
        }
    }
}

/// Aggregate engine configuration (spec §6 "Engine configuration object").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub trust: TrustConfig,
    pub weight_scale: WeightScaleConfig,
    pub capacity: CapacityConfig,
    pub signal: SignalConfig,
    pub monte_carlo: MonteCarloConfig,
    pub forecast: ForecastConfig,
    pub regime_change: RegimeChangeConfig,
    /// Ordered list of enabled head names; heads run and dispatch in this
    /// order (spec §4.4 "Ordering guarantee").
    pub heads: Vec<String>,
}

impl CoreConfig {
    /// Build a config by reading the documented environment variables once.
    /// Engines built from the result MUST NOT re-read the environment
    /// mid-run (spec §5).
    pub fn from_env() -> Self {
        Self {
            trust: TrustConfig::from_env(),
            weight_scale: WeightScaleConfig::from_env(),
            capacity: CapacityConfig::default(),
            signal: SignalConfig::default(),
            monte_carlo: MonteCarloConfig::default(),
            forecast: ForecastConfig::default(),
            regime_change: RegimeChangeConfig::default(),
            heads: Vec::new(),
        }
    }

    /// Validate capacity/fraction invariants (spec §7 `InvalidConfig`).
    pub fn validate(&self) -> Result<(), crate::errors::AxiomError> {
        if !(0.0..=1.0).contains(&self.capacity.sticky_fraction) {
            return Err(crate::errors::AxiomError::InvalidConfig(format!(
                "capacity.sticky_fraction must be in [0,1], got {}",
                self.capacity.sticky_fraction
            )));
        }
        if let Some(max_edges) = self.capacity.max_edges {
            if (max_edges as i64) < 0 {
                return Err(crate::errors::AxiomError::InvalidConfig(
                    "capacity.max_edges must be non-negative".to_string(),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.monte_carlo.edge_dropout) {
            return Err(crate::errors::AxiomError::InvalidConfig(format!(
                "monte_carlo.edge_dropout must be in [0,1], got {}",
                self.monte_carlo.edge_dropout
            )));
        }
        if !(0.0..=1.0).contains(&self.monte_carlo.weight_jitter) {
            return Err(crate::errors::AxiomError::InvalidConfig(format!(
                "monte_carlo.weight_jitter must be in [0,1], got {}",
                self.monte_carlo.weight_jitter
            )));
        }
        Ok(())
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.trust.tau, 0.6);
        assert_eq!(cfg.capacity.sticky_fraction, 0.5);
        assert_eq!(cfg.monte_carlo.num_samples, 16);
        assert_eq!(cfg.forecast.window_size, 3);
        assert_eq!(cfg.regime_change.window, 3);
        assert_eq!(cfg.regime_change.threshold, 0.25);
    }

    #[test]
    fn rejects_out_of_range_sticky_fraction() {
        let mut cfg = CoreConfig::default();
        cfg.capacity.sticky_fraction = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn resource_feature_courses_wildcard_matches_anything() {
        let wsc = WeightScaleConfig::default();
        assert!(wsc.applies_to("6.001"));
    }

    #[test]
    fn resource_feature_courses_explicit_list() {
        let wsc = WeightScaleConfig {
            resource_feature_courses: vec!["6.001".to_string()],
            ..Default::default()
        };
        assert!(wsc.applies_to("6.001"));
        assert!(!wsc.applies_to("6.002"));
    }
}
