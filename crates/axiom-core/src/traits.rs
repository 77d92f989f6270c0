//! Capability traits for pluggable adapters, signal heads, and policies.
//!
//! No duck typing: the registry (axiom-registry) matches exhaustively over
//! closed name sets and these traits, rather than relying on structural
//! typing (spec §9 "Dynamic dispatch over adapters/reporters/heads").

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::model::{Frame, NodeId, StepFeatures};

/// A stateful, single-pass cursor over a `ProcessedStream`'s steps (spec
/// §4.3). Implementations MUST NOT support multiple concurrent traversals —
/// there is no iterator-protocol requirement here, just `next_obs`/
/// `has_more` (spec §9 "Iteration without generators").
pub trait Adapter {
    fn next_obs(&mut self) -> Frame;
    fn peek_truth(&self, horizon: u64) -> Option<Frame>;
    fn has_more(&self) -> bool;
    fn current_step(&self) -> Option<u64>;
    fn get_step_features(&self, step: u64) -> StepFeatures;
    fn meta(&self) -> &Map<String, Value>;
    fn node_label(&self, node_id: NodeId) -> Option<String> {
        let _ = node_id;
        None
    }
    /// Per-node weights assigned by the preprocessor; constant across the
    /// course. Used by `StepFrame.node_weights` and by heads that jitter
    /// weights (e.g. `MonteCarloHead`).
    fn node_weights(&self) -> &HashMap<NodeId, f64>;
}

/// One step's context, handed to every enabled `Head` in declaration order
/// (spec §4.4 step 7). Mirrors the engine's `StepFrame` used internally.
#[derive(Debug, Clone)]
pub struct StepFrame {
    pub t: u64,
    pub step_id: u64,
    pub obs_edges: Frame,
    pub cumulative_edges: Frame,
    pub prev_cumulative: Option<Frame>,
    pub node_weights: HashMap<NodeId, f64>,
    pub step_features: StepFeatures,
}

/// A pluggable per-step computation that augments signals and produces a
/// course-level summary at the end of the run (spec §4.7).
pub trait Head {
    fn name(&self) -> &'static str;

    /// Reset any per-course state. Called once before the first step.
    fn init_course(&mut self, _course_id: &str, _meta: &Map<String, Value>) {}

    /// Compute this head's contribution for one step; the returned map is
    /// merged into the running signals map, visible to heads declared
    /// after this one (spec §4.4).
    fn per_step(&mut self, frame: &StepFrame, signals: &Map<String, Value>) -> Map<String, Value>;

    /// Emit a course-level summary once the stream is exhausted. An empty
    /// map means "nothing to report" and is omitted from `head_summaries`.
    fn finalize(&mut self) -> Map<String, Value> {
        Map::new()
    }
}

/// Produces a capacity-bounded predicted frame for the next step (spec
/// §4.6).
pub trait Policy {
    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        step_index: u64,
        prev_pred: Option<&Frame>,
        obs_t: &Frame,
        signals: &Map<String, Value>,
    ) -> Frame;
}

/// Accepts per-step records and produces a final JSON summary (spec §4.8).
/// Concrete reporter variants (insight / curriculum_insight /
/// conversation_insight / curriculum_dynamics) live in axiom-reporter;
/// the engine only ever sees this trait.
pub trait Reporter {
    /// Record one step's signals, step metadata (top_nodes, commentary,
    /// counts, and all step_features fields), the predicted frame, and an
    /// optional regret value.
    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        t: u64,
        signals: &Map<String, Value>,
        step_meta: &Map<String, Value>,
        pred: &Frame,
        regret: Option<f64>,
    );

    /// Attach non-empty head finalize() summaries under `head_summaries`.
    fn attach_head_summaries(&mut self, summaries: Map<String, Value>);

    /// Produce the final JSON report. Called exactly once, after every
    /// step has been recorded and every head finalized.
    fn finish(&mut self) -> Value;
}
