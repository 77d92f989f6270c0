//! `IdentityPolicy` and `CapacityPolicy` (spec §4.6). Grounded in
//! `core/policy.py`'s `IdentityPolicy`/`CapacityPolicy` selection order:
//! sticky budget from the intersection (ascending), then new edges
//! (ascending), then a top-up from the remaining intersection, then an
//! optional per-node capacity enforcement pass.

use axiom_core::model::{Edge, Frame};
use axiom_core::traits::Policy;
use serde_json::{Map, Value};

/// Returns a copy of the observed frame every step.
#[derive(Debug, Default)]
pub struct IdentityPolicy;

impl Policy for IdentityPolicy {
    fn step(&mut self, _step_index: u64, _prev_pred: Option<&Frame>, obs_t: &Frame, _signals: &Map<String, Value>) -> Frame {
        obs_t.clone()
    }
}

/// Capacity-bounded, sticky frame predictor.
pub struct CapacityPolicy {
    max_edges: Option<usize>,
    sticky_fraction: f64,
    max_nodes: Option<usize>,
}

impl CapacityPolicy {
    pub fn new(max_edges: Option<usize>, sticky_fraction: f64, max_nodes: Option<usize>) -> Self {
        Self {
            max_edges,
            sticky_fraction: sticky_fraction.clamp(0.0, 1.0),
            max_nodes,
        }
    }
}

impl Policy for CapacityPolicy {
    fn step(&mut self, _step_index: u64, prev_pred: Option<&Frame>, obs_t: &Frame, _signals: &Map<String, Value>) -> Frame {
        let Some(max_edges) = self.max_edges else {
            return obs_t.clone();
        };
        if max_edges == 0 {
            return Frame::new();
        }

        let empty = Frame::new();
        let prev = prev_pred.unwrap_or(&empty);

        let sticky_budget = (max_edges as f64 * self.sticky_fraction).floor() as usize;

        let kept: Vec<Edge> = prev.intersection(obs_t).copied().collect();
        let new_edges: Vec<Edge> = obs_t.difference(prev).copied().collect();

        let mut selected: Vec<Edge> = Vec::with_capacity(max_edges);
        selected.extend(kept.iter().take(sticky_budget).copied());

        for &edge in &new_edges {
            if selected.len() >= max_edges {
                break;
            }
            selected.push(edge);
        }

        if selected.len() < max_edges {
            for &edge in kept.iter().skip(sticky_budget) {
                if selected.len() >= max_edges {
                    break;
                }
                if !selected.contains(&edge) {
                    selected.push(edge);
                }
            }
        }

        let mut frame: Frame = selected.into_iter().collect();

        if let Some(max_nodes) = self.max_nodes {
            frame = enforce_node_capacity(frame, max_nodes);
        }

        frame
    }
}

/// Drop edges (in ascending `(src,dst)` order) whose endpoint already has
/// `≥ max_nodes` incident edges in the retained set.
fn enforce_node_capacity(frame: Frame, max_nodes: usize) -> Frame {
    use std::collections::HashMap;
    let mut degree: HashMap<u64, usize> = HashMap::new();
    let mut kept = Frame::new();
    for edge @ (u, v) in frame {
        let du = *degree.get(&u).unwrap_or(&0);
        let dv = *degree.get(&v).unwrap_or(&0);
        if du >= max_nodes || dv >= max_nodes {
            continue;
        }
        kept.insert(edge);
        *degree.entry(u).or_insert(0) += 1;
        *degree.entry(v).or_insert(0) += 1;
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_edges_zero_yields_empty_frame() {
        let mut policy = CapacityPolicy::new(Some(0), 0.5, None);
        let obs: Frame = [(0, 1), (1, 2)].into_iter().collect();
        assert!(policy.step(0, None, &obs, &Map::new()).is_empty());
    }

    #[test]
    fn scenario_c_stickiness() {
        let mut policy = CapacityPolicy::new(Some(3), 0.5, None);
        let prev_pred: Frame = [(0, 1), (1, 2)].into_iter().collect();
        let obs: Frame = [(0, 1), (2, 3), (3, 4)].into_iter().collect();
        let selected = policy.step(1, Some(&prev_pred), &obs, &Map::new());
        let expected: Frame = [(0, 1), (2, 3), (3, 4)].into_iter().collect();
        assert_eq!(selected, expected);
    }

    #[test]
    fn zero_sticky_fraction_never_carries_stale_predictions() {
        let mut policy = CapacityPolicy::new(Some(2), 0.0, None);
        let prev_pred: Frame = [(5, 6)].into_iter().collect();
        let obs: Frame = [(0, 1)].into_iter().collect();
        let selected = policy.step(0, Some(&prev_pred), &obs, &Map::new());
        assert!(!selected.contains(&(5, 6)));
    }
}
