//! `RegimeChangeHead` (spec §4.7.3). Grounded in `core/regime_head.py`: a
//! windowed change-point detector comparing the mean feature vector just
//! before a candidate center against the mean just after it.

use serde_json::{Map, Value};

use axiom_core::config::RegimeChangeConfig;
use axiom_core::traits::{Head, StepFrame};

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

type FeatureVec = [f64; 5];

pub struct RegimeChangeHead {
    config: RegimeChangeConfig,
    history: Vec<FeatureVec>,
    change_points: Vec<u64>,
    /// Whether the previously evaluated center exceeded the threshold. A
    /// sustained divergence across several consecutive centers is one
    /// regime change, not one per step — only the rising edge is recorded.
    in_change: bool,
}

impl RegimeChangeHead {
    pub fn new(config: RegimeChangeConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
            change_points: Vec::new(),
            in_change: false,
        }
    }
}

fn mean_vec(points: &[FeatureVec]) -> FeatureVec {
    let n = points.len() as f64;
    let mut out = [0.0; 5];
    for point in points {
        for i in 0..5 {
            out[i] += point[i];
        }
    }
    for v in &mut out {
        *v /= n;
    }
    out
}

fn euclidean(a: FeatureVec, b: FeatureVec) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

impl Head for RegimeChangeHead {
    fn name(&self) -> &'static str {
        "regime_change"
    }

    fn per_step(&mut self, frame: &StepFrame, signals: &Map<String, Value>) -> Map<String, Value> {
        let q = signals.get("q").and_then(Value::as_f64).unwrap_or(0.0);
        let ted = signals.get("ted").and_then(Value::as_f64).unwrap_or(0.0);
        let concept = frame.step_features.concept_fraction.unwrap_or(0.0);
        let assessment = frame.step_features.assessment_fraction.unwrap_or(0.0);
        let reading = frame.step_features.reading_fraction.unwrap_or(0.0);
        self.history.push([q, ted, concept, assessment, reading]);

        let window = self.config.window;
        let len = self.history.len();

        let mut out = Map::new();
        if len >= 2 * window + 1 {
            let center = len - 1 - window;
            let prev_mean = mean_vec(&self.history[center - window..center]);
            let next_mean = mean_vec(&self.history[center + 1..center + 1 + window]);
            let change_score = euclidean(prev_mean, next_mean);
            out.insert("change_score".to_string(), Value::from(round3(change_score)));
            let exceeds = change_score > self.config.threshold;
            if exceeds && !self.in_change {
                tracing::info!(center, change_score, "regime change detected");
                self.change_points.push(center as u64);
            }
            self.in_change = exceeds;
        }
        out
    }

    fn finalize(&mut self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(
            "change_points".to_string(),
            Value::Array(self.change_points.iter().map(|&c| Value::from(c)).collect()),
        );
        out.insert("num_change_points".to_string(), Value::from(self.change_points.len() as u64));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: u64, concept: f64) -> StepFrame {
        let mut features = axiom_core::model::StepFeatures::default();
        features.concept_fraction = Some(concept);
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
    fn scenario_f_regime_change_trigger() {
        let config = RegimeChangeConfig { window: 1, threshold: 0.05 };
        let mut head = RegimeChangeHead::new(config);
        let steps = [(0.3, 0.1, 0.4), (0.3, 0.1, 0.4), (0.9, 0.4, 0.8), (0.9, 0.4, 0.8)];
        for (t, &(q, ted, concept)) in steps.iter().enumerate() {
            head.per_step(&frame(t as u64, concept), &signals(q, ted));
        }
        let summary = head.finalize();
        let change_points = summary["change_points"].as_array().unwrap();
        assert_eq!(change_points, &vec![Value::from(1u64)]);
        assert_eq!(summary["num_change_points"], Value::from(1u64));
    }

    #[test]
    fn no_change_point_before_window_or_after_last_valid_center() {
        let config = RegimeChangeConfig { window: 2, threshold: 0.01 };
        let mut head = RegimeChangeHead::new(config);
        for t in 0..4u64 {
            let out = head.per_step(&frame(t, 0.5), &signals(0.5, 0.1));
            assert!(out.get("change_score").is_none());
        }
    }
}
