//! Stateful cursor over a `ProcessedStream` (spec §4.3).

use std::collections::HashMap;

use axiom_core::model::{Frame, NodeId, ProcessedStream, StepFeatures};
use axiom_core::traits::Adapter;

/// A fixed node-id permutation, applied to every returned frame when the
/// adapter is constructed with `scramble=true`.
#[derive(Debug, Clone)]
struct Permutation(HashMap<NodeId, NodeId>);

impl Permutation {
    fn identity() -> Self {
        Self(HashMap::new())
    }

    /// A deterministic derangement-friendly shuffle seeded by `seed`,
    /// over the closed set of node ids appearing in `stream`.
    fn from_seed(stream: &ProcessedStream, seed: u64) -> Self {
        let mut ids: Vec<NodeId> = stream.nodes.keys().copied().collect();
        ids.sort_unstable();
        let n = ids.len();
        if n <= 1 {
            return Self::identity();
        }
        // A linear-congruential shuffle: deterministic, seed-dependent,
        // and a bijection over 0..n by construction (Fisher-Yates driven
        // by a simple xorshift-style PRNG rather than pulling in `rand`
        // for a one-off permutation).
        let mut state = seed ^ 0x9E3779B97F4A7C15;
        let mut order: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = (state as usize) % (i + 1);
            order.swap(i, j);
        }
        let mapping = ids
            .iter()
            .zip(order.into_iter().map(|idx| ids[idx]))
            .map(|(&from, to)| (from, to))
            .collect();
        Self(mapping)
    }

    fn apply(&self, frame: &Frame) -> Frame {
        if self.0.is_empty() {
            return frame.clone();
        }
        frame
            .iter()
            .map(|&(u, v)| (self.map(u), self.map(v)))
            .collect()
    }

    fn map(&self, id: NodeId) -> NodeId {
        self.0.get(&id).copied().unwrap_or(id)
    }
}

/// Single-pass cursor over `sorted(obs_steps.keys() ∪ true_steps.keys())`.
/// Constructed once per course; `next_obs` MUST NOT be called concurrently
/// from more than one traversal (spec §9 "iteration without generators").
pub struct StreamAdapter {
    stream: ProcessedStream,
    steps: Vec<u64>,
    cursor: usize,
    current_step: Option<u64>,
    permutation: Permutation,
}

impl StreamAdapter {
    pub fn new(stream: ProcessedStream) -> Self {
        Self::new_with_scramble(stream, None)
    }

    pub fn new_with_scramble(stream: ProcessedStream, scramble_seed: Option<u64>) -> Self {
        let steps = stream.ordered_steps();
        let permutation = match scramble_seed {
            Some(seed) => Permutation::from_seed(&stream, seed),
            None => Permutation::identity(),
        };
        Self {
            stream,
            steps,
            cursor: 0,
            current_step: None,
            permutation,
        }
    }
}

impl Adapter for StreamAdapter {
    fn next_obs(&mut self) -> Frame {
        let Some(&step) = self.steps.get(self.cursor) else {
            return Frame::new();
        };
        self.cursor += 1;
        self.current_step = Some(step);
        let frame = self.stream.obs_steps.get(&step).cloned().unwrap_or_default();
        self.permutation.apply(&frame)
    }

    fn peek_truth(&self, horizon: u64) -> Option<Frame> {
        let base = self.cursor.checked_sub(1)?;
        let target_idx = base.checked_add(horizon as usize)?;
        let step = *self.steps.get(target_idx)?;
        let frame = self.stream.true_steps.get(&step)?;
        Some(self.permutation.apply(frame))
    }

    fn has_more(&self) -> bool {
        self.cursor < self.steps.len()
    }

    fn current_step(&self) -> Option<u64> {
        self.current_step
    }

    fn get_step_features(&self, step: u64) -> StepFeatures {
        self.stream.step_features.get(&step).cloned().unwrap_or_default()
    }

    fn meta(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.stream.meta
    }

    fn node_label(&self, node_id: NodeId) -> Option<String> {
        self.stream.node_label(node_id)
    }

    fn node_weights(&self) -> &HashMap<NodeId, f64> {
        &self.stream.node_weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axiom_core::model::RawStream;

    fn sample_stream() -> ProcessedStream {
        let mut raw = RawStream::default();
        for id in 0..3u64 {
            raw.nodes.insert(id, Default::default());
        }
        raw.obs_steps.insert(0, [(0, 1)].into_iter().collect());
        raw.obs_steps.insert(2, [(1, 2)].into_iter().collect());
        ProcessedStream {
            nodes: raw.nodes,
            obs_steps: raw.obs_steps,
            true_steps: raw.true_steps,
            meta: raw.meta,
            node_tags: Default::default(),
            node_weights: Default::default(),
            step_features: Default::default(),
        }
    }

    #[test]
    fn walks_sparse_steps_in_ascending_order() {
        let mut adapter = StreamAdapter::new(sample_stream());
        assert_eq!(adapter.current_step(), None);
        let first = adapter.next_obs();
        assert_eq!(adapter.current_step(), Some(0));
        assert!(first.contains(&(0, 1)));
        let second = adapter.next_obs();
        assert_eq!(adapter.current_step(), Some(2));
        assert!(second.contains(&(1, 2)));
        assert!(!adapter.has_more());
        assert!(adapter.next_obs().is_empty());
    }

    #[test]
    fn scrambled_adapter_is_deterministic_across_runs() {
        let mut one = StreamAdapter::new_with_scramble(sample_stream(), Some(7));
        let mut two = StreamAdapter::new_with_scramble(sample_stream(), Some(7));
        assert_eq!(one.next_obs(), two.next_obs());
        assert_eq!(one.next_obs(), two.next_obs());
    }
}
