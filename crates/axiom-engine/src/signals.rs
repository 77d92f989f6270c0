//! `SignalComputer` — q, TED, stability, ted_delta, spread, locality (spec
//! §4.5). Grounded directly in `core/signals.py`'s fallback formulas
//! (examples/original_source): preprocessor-supplied fields win when
//! present and finite, otherwise the Jaccard/weighted-mass fallbacks apply.

use std::collections::{BTreeSet, HashMap, HashSet};

use axiom_core::config::SignalConfig;
use axiom_core::model::{Frame, NodeId, StepFeatures};

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// One step's computed signal record (spec §4.5 output).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SignalRecord {
    pub q: f64,
    pub ted: f64,
    pub stability: f64,
    pub ted_delta: Option<f64>,
    pub spread: Option<f64>,
    pub locality_nodes: Option<Vec<NodeId>>,
}

/// Retains only `prev_ted` across calls (spec §4.5 "ted_delta").
pub struct SignalComputer {
    config: SignalConfig,
    prev_ted: Option<f64>,
}

impl SignalComputer {
    pub fn new(config: SignalConfig) -> Self {
        Self { config, prev_ted: None }
    }

    pub fn compute(
        &mut self,
        obs_t: &Frame,
        prev_obs: Option<&Frame>,
        step_features: &StepFeatures,
    ) -> SignalRecord {
        let q = compute_q(obs_t, step_features);
        let ted = compute_ted(obs_t, prev_obs, step_features);
        let stability = compute_stability(ted, step_features);

        let ted_delta = self.prev_ted.map(|prev| round3(ted - prev));
        self.prev_ted = Some(ted);

        let spread = if self.config.compute_spread {
            Some(compute_spread(obs_t))
        } else {
            None
        };

        let locality_nodes = if self.config.compute_locality {
            Some(compute_locality(obs_t, prev_obs))
        } else {
            None
        };

        SignalRecord {
            q: round3(q),
            ted: round3(ted),
            stability: round3(stability),
            ted_delta,
            spread,
            locality_nodes,
        }
    }
}

/// `q` fallback (spec §4.5): prefer `step_features.quality`; else weighted
/// node mass over `2·unique_node_count`; else node-count/25; else 0.
pub fn compute_q(obs_t: &Frame, step_features: &StepFeatures) -> f64 {
    if let Some(quality) = step_features.quality.filter(|v| v.is_finite()) {
        return quality;
    }
    if let (Some(mass), Some(n)) = (step_features.weighted_node_mass, step_features.unique_node_count) {
        if n > 0 {
            return (mass / (2.0 * n as f64).max(1.0)).min(1.0);
        }
    }
    if obs_t.is_empty() {
        return 0.0;
    }
    (nodes_of(obs_t).len() as f64 / 25.0).min(1.0)
}

/// `ted` fallback (spec §4.5): prefer `step_features.ted`; else Jaccard
/// distance against `prev_obs` (0 when `prev_obs` is absent or both empty).
pub fn compute_ted(obs_t: &Frame, prev_obs: Option<&Frame>, step_features: &StepFeatures) -> f64 {
    if let Some(ted) = step_features.ted.filter(|v| v.is_finite()) {
        return ted;
    }
    let Some(prev) = prev_obs else { return 0.0 };
    if prev.is_empty() && obs_t.is_empty() {
        return 0.0;
    }
    jaccard_distance(prev, obs_t)
}

fn compute_stability(ted: f64, step_features: &StepFeatures) -> f64 {
    if let Some(stability) = step_features.stability.filter(|v| v.is_finite()) {
        return stability;
    }
    (1.0 - ted).clamp(0.0, 1.0)
}

pub fn jaccard_distance(a: &Frame, b: &Frame) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    (1.0 - intersection as f64 / union as f64).clamp(0.0, 1.0)
}

fn nodes_of(frame: &Frame) -> BTreeSet<NodeId> {
    let mut nodes = BTreeSet::new();
    for &(u, v) in frame {
        nodes.insert(u);
        nodes.insert(v);
    }
    nodes
}

/// Normalized Shannon entropy of connected-component sizes (spec §4.5
/// "spread"). 0 for 0 or 1 components.
fn compute_spread(obs_t: &Frame) -> f64 {
    let components = connected_components(obs_t);
    let k = components.len();
    if k <= 1 {
        return 0.0;
    }
    let total: usize = components.iter().map(|c| c.len()).sum();
    let entropy: f64 = components
        .iter()
        .map(|c| {
            let p = c.len() as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    round3(entropy / (k as f64).ln())
}

fn connected_components(frame: &Frame) -> Vec<HashSet<NodeId>> {
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for &(u, v) in frame {
        adjacency.entry(u).or_default().push(v);
        adjacency.entry(v).or_default().push(u);
    }
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut components = Vec::new();
    let mut ordered_nodes: Vec<NodeId> = adjacency.keys().copied().collect();
    ordered_nodes.sort_unstable();

    for &start in &ordered_nodes {
        if visited.contains(&start) {
            continue;
        }
        let mut component = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !component.insert(node) {
                continue;
            }
            visited.insert(node);
            if let Some(neighbors) = adjacency.get(&node) {
                for &next in neighbors {
                    if !component.contains(&next) {
                        stack.push(next);
                    }
                }
            }
        }
        components.push(component);
    }
    components
}

/// Top-k (default 5) node ids by `|deg_cur − deg_prev|` descending, tied
/// broken by ascending node id (spec §9 open question 3).
fn compute_locality(obs_t: &Frame, prev_obs: Option<&Frame>) -> Vec<NodeId> {
    const TOP_K: usize = 5;
    let cur_degrees = degree_map(obs_t);
    let prev_degrees = prev_obs.map(degree_map).unwrap_or_default();

    let mut union_nodes: BTreeSet<NodeId> = cur_degrees.keys().copied().collect();
    union_nodes.extend(prev_degrees.keys().copied());

    let mut deltas: Vec<(NodeId, i64)> = union_nodes
        .into_iter()
        .map(|id| {
            let cur = *cur_degrees.get(&id).unwrap_or(&0);
            let prev = *prev_degrees.get(&id).unwrap_or(&0);
            (id, (cur as i64 - prev as i64).abs())
        })
        .collect();

    deltas.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    deltas.into_iter().take(TOP_K).map(|(id, _)| id).collect()
}

fn degree_map(frame: &Frame) -> HashMap<NodeId, u32> {
    let mut degrees = HashMap::new();
    for &(u, v) in frame {
        *degrees.entry(u).or_insert(0) += 1;
        *degrees.entry(v).or_insert(0) += 1;
    }
    degrees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q_falls_back_to_node_count_over_25() {
        let frame: Frame = [(0, 1)].into_iter().collect();
        let q = compute_q(&frame, &StepFeatures::default());
        assert_eq!(q, (2.0_f64 / 25.0));
    }

    #[test]
    fn ted_is_zero_on_first_step() {
        let frame: Frame = [(0, 1)].into_iter().collect();
        assert_eq!(compute_ted(&frame, None, &StepFeatures::default()), 0.0);
    }

    #[test]
    fn spread_is_one_for_three_equal_components() {
        let frame: Frame = [(0, 1), (2, 3), (4, 5)].into_iter().collect();
        assert_eq!(compute_spread(&frame), 1.0);
    }

    #[test]
    fn spread_is_zero_for_one_component() {
        let frame: Frame = [(0, 1), (1, 2)].into_iter().collect();
        assert_eq!(compute_spread(&frame), 0.0);
    }

    #[test]
    fn scenario_a_two_step_course() {
        let mut computer = SignalComputer::new(SignalConfig::default());
        let step0: Frame = [(0, 1)].into_iter().collect();
        let rec0 = computer.compute(&step0, None, &StepFeatures::default());
        assert_eq!(rec0.q, 0.08);
        assert_eq!(rec0.ted, 0.0);
        assert_eq!(rec0.stability, 1.0);

        let step1: Frame = [(0, 1), (1, 2)].into_iter().collect();
        let rec1 = computer.compute(&step1, Some(&step0), &StepFeatures::default());
        assert_eq!(rec1.q, 0.12);
        assert_eq!(rec1.ted, 0.5);
        assert_eq!(rec1.stability, 0.5);
        assert_eq!(rec1.ted_delta, Some(0.5));
    }

    #[test]
    fn locality_ties_break_on_ascending_node_id() {
        let prev: Frame = Frame::new();
        let cur: Frame = [(0, 1), (2, 3)].into_iter().collect();
        let mut config = SignalConfig::default();
        config.compute_locality = true;
        let mut computer = SignalComputer::new(config);
        let rec = computer.compute(&cur, Some(&prev), &StepFeatures::default());
        let nodes = rec.locality_nodes.unwrap();
        assert_eq!(nodes, vec![0, 1, 2, 3]);
    }
}
