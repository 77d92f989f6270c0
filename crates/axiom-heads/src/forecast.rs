//! `ForecastHead` (spec §4.7.2). Grounded in `core/forecast_head.py`: a
//! sliding window of recent step-type labels, trend slopes over q/ted, and
//! a step-type classification rule used only when the preprocessor didn't
//! supply one.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use axiom_core::config::ForecastConfig;
use axiom_core::traits::{Head, StepFrame};

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[derive(Clone, Copy)]
struct FeaturePoint {
    t: f64,
    q: f64,
    ted: f64,
}

pub struct ForecastHead {
    config: ForecastConfig,
    points: Vec<FeaturePoint>,
    labels: Vec<String>,
}

impl ForecastHead {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            config,
            points: Vec::new(),
            labels: Vec::new(),
        }
    }

    fn classify(&self, q: f64, ted: f64, concept: f64, assessment: f64, reading: f64) -> &'static str {
        if q <= 0.0 {
            return "empty";
        }
        if assessment > 0.4 && concept > 0.2 {
            return "checkpoint";
        }
        if concept > 0.55 && assessment < 0.25 {
            return "concept_dense";
        }
        if reading > 0.45 && assessment < 0.2 {
            return "reading_heavy";
        }
        if ted > 0.35 {
            return "transition";
        }
        "mixed"
    }

    fn mode_of_recent(&self) -> String {
        let window = self.config.window_size.min(self.labels.len());
        if window == 0 {
            return "unknown".to_string();
        }
        let recent = &self.labels[self.labels.len() - window..];
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for label in recent {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by_key(|&(_, count)| count)
            .map(|(label, _)| label.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl Head for ForecastHead {
    fn name(&self) -> &'static str {
        "forecast"
    }

    fn per_step(&mut self, frame: &StepFrame, signals: &Map<String, Value>) -> Map<String, Value> {
        let q = signals.get("q").and_then(Value::as_f64).unwrap_or(0.0);
        let ted = signals.get("ted").and_then(Value::as_f64).unwrap_or(0.0);
        let concept = frame.step_features.concept_fraction.unwrap_or(0.0);
        let assessment = frame.step_features.assessment_fraction.unwrap_or(0.0);
        let reading = frame.step_features.reading_fraction.unwrap_or(0.0);

        self.points.push(FeaturePoint { t: frame.t as f64, q, ted });

        let label = frame
            .step_features
            .step_type
            .clone()
            .unwrap_or_else(|| self.classify(q, ted, concept, assessment, reading).to_string());
        self.labels.push(label.clone());

        let next_pred = self.mode_of_recent();

        let mut out = Map::new();
        out.insert("step_type_inferred".to_string(), Value::String(label));
        out.insert("next_step_type_pred".to_string(), Value::String(next_pred));
        out
    }

    fn finalize(&mut self) -> Map<String, Value> {
        let q_slope = least_squares_slope(&self.points, |p| p.q);
        let ted_slope = least_squares_slope(&self.points, |p| p.ted);

        let mut out = Map::new();
        out.insert("q_slope".to_string(), Value::from(round3(q_slope)));
        out.insert("ted_slope".to_string(), Value::from(round3(ted_slope)));
        out.insert(
            "step_types".to_string(),
            Value::Array(self.labels.iter().cloned().map(Value::String).collect()),
        );
        out
    }
}

fn least_squares_slope(points: &[FeaturePoint], y_of: impl Fn(&FeaturePoint) -> f64) -> f64 {
    let n = points.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let t_mean = points.iter().map(|p| p.t).sum::<f64>() / n;
    let y_mean = points.iter().map(|p| y_of(p)).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for p in points {
        let dt = p.t - t_mean;
        numerator += dt * (y_of(p) - y_mean);
        denominator += dt * dt;
    }
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(t: u64, concept: f64, assessment: f64, reading: f64) -> StepFrame {
        let mut features = axiom_core::model::StepFeatures::default();
        features.concept_fraction = Some(concept);
        features.assessment_fraction = Some(assessment);
        features.reading_fraction = Some(reading);
        StepFrame {
            t,
            step_id: t,
            obs_edges: Default::default(),
            cumulative_edges: Default::default(),
            prev_cumulative: None,
            node_weights: Default::default(),
            step_features: features,
        }
    }

    fn signals(q: f64, ted: f64) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("q".to_string(), Value::from(q));
        m.insert("ted".to_string(), Value::from(ted));
        m
    }

    #[test]
    fn classifies_checkpoint() {
        let mut head = ForecastHead::new(ForecastConfig::default());
        let out = head.per_step(&frame_with(0, 0.3, 0.5, 0.0), &signals(0.5, 0.1));
        assert_eq!(out["step_type_inferred"], Value::String("checkpoint".to_string()));
    }

    #[test]
    fn empty_q_is_empty_step_type() {
        let mut head = ForecastHead::new(ForecastConfig::default());
        let out = head.per_step(&frame_with(0, 0.0, 0.0, 0.0), &signals(0.0, 0.0));
        assert_eq!(out["step_type_inferred"], Value::String("empty".to_string()));
    }

    #[test]
    fn increasing_q_has_positive_slope() {
        let mut head = ForecastHead::new(ForecastConfig::default());
        for (t, q) in [(0u64, 0.1), (1, 0.2), (2, 0.3), (3, 0.4)] {
            head.per_step(&frame_with(t, 0.0, 0.0, 0.0), &signals(q, 0.0));
        }
        let summary = head.finalize();
        assert!(summary["q_slope"].as_f64().unwrap() > 0.0);
    }
}
