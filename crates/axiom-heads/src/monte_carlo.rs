//! `MonteCarloHead` (spec §4.7.1). Grounded in `core/mc_head.py`'s resampling
//! loop: independent edge-dropout on the previous/current cumulative sets,
//! weight jitter on node weights, then the §4.5 fallback q/ted formulas
//! recomputed per trial — never the preprocessor-supplied `step_features`.

use std::collections::{BTreeSet, HashMap};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};

use axiom_core::config::MonteCarloConfig;
use axiom_core::model::{Frame, NodeId};
use axiom_core::traits::{Head, StepFrame};

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

pub struct MonteCarloHead {
    config: MonteCarloConfig,
    rng: ChaCha8Rng,
    per_step_ted_std: Vec<f64>,
    per_step_q_std: Vec<f64>,
}

impl MonteCarloHead {
    pub fn new(config: MonteCarloConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            per_step_ted_std: Vec::new(),
            per_step_q_std: Vec::new(),
        }
    }

    fn drop_edges(&mut self, frame: &Frame) -> Frame {
        if frame.is_empty() {
            return Frame::new();
        }
        let keep_prob = 1.0 - self.config.edge_dropout;
        let mut kept: Frame = frame
            .iter()
            .copied()
            .filter(|_| self.rng.gen::<f64>() < keep_prob)
            .collect();
        if kept.is_empty() {
            let edges: Vec<_> = frame.iter().copied().collect();
            let idx = self.rng.gen_range(0..edges.len());
            kept.insert(edges[idx]);
        }
        kept
    }

    fn jitter_weights(&mut self, weights: &HashMap<NodeId, f64>) -> HashMap<NodeId, f64> {
        let jitter = self.config.weight_jitter;
        weights
            .iter()
            .map(|(&node, &w)| {
                let factor = self.rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
                (node, (w * factor).max(0.0))
            })
            .collect()
    }
}

fn nodes_of(frame: &Frame) -> BTreeSet<NodeId> {
    let mut nodes = BTreeSet::new();
    for &(u, v) in frame {
        nodes.insert(u);
        nodes.insert(v);
    }
    nodes
}

fn fallback_q(frame: &Frame, weights: &HashMap<NodeId, f64>) -> f64 {
    let nodes = nodes_of(frame);
    if nodes.is_empty() {
        return 0.0;
    }
    let mass: f64 = nodes.iter().map(|n| weights.get(n).copied().unwrap_or(0.0)).sum();
    let n = nodes.len() as f64;
    (mass / (2.0 * n).max(1.0)).min(1.0)
}

fn fallback_ted(prev: &Frame, curr: &Frame) -> f64 {
    if prev.is_empty() && curr.is_empty() {
        return 0.0;
    }
    let intersection = prev.intersection(curr).count();
    let union = prev.union(curr).count();
    if union == 0 {
        return 0.0;
    }
    (1.0 - intersection as f64 / union as f64).clamp(0.0, 1.0)
}

fn stats(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

impl Head for MonteCarloHead {
    fn name(&self) -> &'static str {
        "monte_carlo"
    }

    fn per_step(&mut self, frame: &StepFrame, _signals: &Map<String, Value>) -> Map<String, Value> {
        let prev = frame.prev_cumulative.clone().unwrap_or_default();
        let curr = frame.cumulative_edges.clone();

        let mut q_samples = Vec::with_capacity(self.config.num_samples);
        let mut ted_samples = Vec::with_capacity(self.config.num_samples);

        for _ in 0..self.config.num_samples {
            let prev_sample = self.drop_edges(&prev);
            let curr_sample = self.drop_edges(&curr);
            let jittered = self.jitter_weights(&frame.node_weights);

            q_samples.push(fallback_q(&curr_sample, &jittered));
            ted_samples.push(fallback_ted(&prev_sample, &curr_sample));
        }

        let (q_mean, q_std) = stats(&q_samples);
        let (ted_mean, ted_std) = stats(&ted_samples);

        self.per_step_q_std.push(q_std);
        self.per_step_ted_std.push(ted_std);

        let mut out = Map::new();
        out.insert("q_mc_mean".to_string(), Value::from(round3(q_mean)));
        out.insert("q_mc_std".to_string(), Value::from(round3(q_std)));
        out.insert("ted_mc_mean".to_string(), Value::from(round3(ted_mean)));
        out.insert("ted_mc_std".to_string(), Value::from(round3(ted_std)));
        out
    }

    fn finalize(&mut self) -> Map<String, Value> {
        if self.per_step_q_std.is_empty() {
            return Map::new();
        }
        let avg_q_std = self.per_step_q_std.iter().sum::<f64>() / self.per_step_q_std.len() as f64;
        let avg_ted_std = self.per_step_ted_std.iter().sum::<f64>() / self.per_step_ted_std.len() as f64;
        let mut out = Map::new();
        out.insert("avg_q_mc_std".to_string(), Value::from(round3(avg_q_std)));
        out.insert("avg_ted_mc_std".to_string(), Value::from(round3(avg_ted_std)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(edges: &[(u64, u64)]) -> StepFrame {
        StepFrame {
            t: 0,
            step_id: 0,
            obs_edges: edges.iter().copied().collect(),
            cumulative_edges: edges.iter().copied().collect(),
            prev_cumulative: None,
            node_weights: HashMap::new(),
            step_features: Default::default(),
        }
    }

    #[test]
    fn single_zero_noise_sample_has_zero_std() {
        let config = MonteCarloConfig {
            num_samples: 1,
            edge_dropout: 0.0,
            weight_jitter: 0.0,
            seed: Some(42),
        };
        let mut head = MonteCarloHead::new(config);
        let out = head.per_step(&frame(&[(0, 1), (1, 2)]), &Map::new());
        assert_eq!(out["q_mc_std"], Value::from(0.0));
        assert_eq!(out["ted_mc_std"], Value::from(0.0));
    }

    #[test]
    fn same_seed_reproduces_identical_sequences() {
        let config = MonteCarloConfig {
            num_samples: 16,
            edge_dropout: 0.2,
            weight_jitter: 0.2,
            seed: Some(7),
        };
        let mut one = MonteCarloHead::new(config.clone());
        let mut two = MonteCarloHead::new(config);
        let f = frame(&[(0, 1), (1, 2), (2, 3)]);
        let out1 = one.per_step(&f, &Map::new());
        let out2 = two.per_step(&f, &Map::new());
        assert_eq!(out1, out2);
    }
}
