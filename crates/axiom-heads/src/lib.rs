//! Signal heads: Monte-Carlo robustness, forecast, regime-change (spec §4.7).
//!
//! [`SignalHead`] resolves the closed registry name set (spec §6:
//! `monte_carlo`, `forecast`, `regime_change`) to a concrete head by
//! exhaustive match, then forwards `Head` calls to it — the same
//! no-duck-typing contract `axiom-preprocess::DomainPreprocessor` uses for
//! domain names.

pub mod forecast;
pub mod monte_carlo;
pub mod regime_change;

use serde_json::{Map, Value};

use axiom_core::config::CoreConfig;
use axiom_core::errors::AxiomError;
use axiom_core::traits::{Head, StepFrame};

pub use forecast::ForecastHead;
pub use monte_carlo::MonteCarloHead;
pub use regime_change::RegimeChangeHead;

/// A fully-resolved signal head. One variant per registry name.
pub enum SignalHead {
    MonteCarlo(MonteCarloHead),
    Forecast(ForecastHead),
    RegimeChange(RegimeChangeHead),
}

impl SignalHead {
    pub fn for_name(name: &str, core: &CoreConfig) -> Result<Self, AxiomError> {
        match name {
            "monte_carlo" => Ok(Self::MonteCarlo(MonteCarloHead::new(core.monte_carlo.clone()))),
            "forecast" => Ok(Self::Forecast(ForecastHead::new(core.forecast.clone()))),
            "regime_change" => Ok(Self::RegimeChange(RegimeChangeHead::new(core.regime_change.clone()))),
            other => Err(AxiomError::UnknownHead(other.to_string())),
        }
    }
}

impl Head for SignalHead {
    fn name(&self) -> &'static str {
        match self {
            Self::MonteCarlo(h) => h.name(),
            Self::Forecast(h) => h.name(),
            Self::RegimeChange(h) => h.name(),
        }
    }

    fn init_course(&mut self, course_id: &str, meta: &Map<String, Value>) {
        match self {
            Self::MonteCarlo(h) => h.init_course(course_id, meta),
            Self::Forecast(h) => h.init_course(course_id, meta),
            Self::RegimeChange(h) => h.init_course(course_id, meta),
        }
    }

    fn per_step(&mut self, frame: &StepFrame, signals: &Map<String, Value>) -> Map<String, Value> {
        match self {
            Self::MonteCarlo(h) => h.per_step(frame, signals),
            Self::Forecast(h) => h.per_step(frame, signals),
            Self::RegimeChange(h) => h.per_step(frame, signals),
        }
    }

    fn finalize(&mut self) -> Map<String, Value> {
        match self {
            Self::MonteCarlo(h) => h.finalize(),
            Self::Forecast(h) => h.finalize(),
            Self::RegimeChange(h) => h.finalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_head_is_rejected() {
        let err = SignalHead::for_name("not_a_head", &CoreConfig::default());
        assert!(matches!(err, Err(AxiomError::UnknownHead(_))));
    }

    #[test]
    fn every_registry_head_resolves() {
        let core = CoreConfig::default();
        for name in ["monte_carlo", "forecast", "regime_change"] {
            assert!(SignalHead::for_name(name, &core).is_ok());
        }
    }
}
