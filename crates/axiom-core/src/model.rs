//! The canonical data model: `Frame`, `RawStream`, `ProcessedStream`.
//!
//! Edge storage stays in `(u, v)` tuples inside ordered sets rather than a
//! pointer graph — node graphs here are integer edge sets, not object
//! graphs, and there is no cycle to model at this layer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node identifier, local to one course/stream.
pub type NodeId = u64;

/// A directed edge between two nodes.
pub type Edge = (NodeId, NodeId);

/// The set of edges observed (or predicted) at one step. Order is
/// irrelevant and duplicates are impossible by construction.
pub type Frame = BTreeSet<Edge>;

/// A single attribute value parsed from a `nodes.csv` column. Columns beyond
/// `label`/`term`/`concept` are preserved verbatim under their original
/// names using this closed value set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeAttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Json(Value),
}

impl NodeAttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeAttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// One node's discovered-at-load attribute map. Always carries `label`.
pub type NodeAttrs = HashMap<String, NodeAttrValue>;

/// Output of the `Loader`: the archive's contents with no domain filtering
/// applied yet.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawStream {
    pub nodes: HashMap<NodeId, NodeAttrs>,
    pub obs_steps: BTreeMap<u64, Frame>,
    pub true_steps: BTreeMap<u64, Frame>,
    pub meta: serde_json::Map<String, Value>,
}

/// A discovered top-scoring node for a step, surfaced in reporter output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopNode {
    pub id: NodeId,
    pub label: String,
    pub tags: Vec<String>,
    pub score: f64,
}

/// Per-step features a preprocessor MAY attach. Every field is optional;
/// consumers treat an absent `StepFeatures` (or an absent field within one)
/// as empty, never as an error.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StepFeatures {
    pub quality: Option<f64>,
    pub ted: Option<f64>,
    pub stability: Option<f64>,
    pub continuity: Option<f64>,
    #[serde(default)]
    pub top_nodes: Vec<TopNode>,
    pub commentary: Option<String>,
    #[serde(default)]
    pub counts: HashMap<String, u64>,
    pub nav_noise: Option<f64>,
    pub edge_count: Option<u64>,
    pub step_type: Option<String>,
    pub concept_fraction: Option<f64>,
    pub assessment_fraction: Option<f64>,
    pub reading_fraction: Option<f64>,
    pub meta_fraction: Option<f64>,
    pub weighted_node_mass: Option<f64>,
    pub unique_node_count: Option<u64>,
    pub engagement: Option<Value>,
    /// Domain-specific extras a reporter may read by name (e.g. conversation
    /// `adjacency_ratio`, `question_density`).
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

/// Output of a `Preprocessor`: a `RawStream` enriched with tags, weights,
/// and per-step features, with every invariant in spec §3 holding.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessedStream {
    pub nodes: HashMap<NodeId, NodeAttrs>,
    pub obs_steps: BTreeMap<u64, Frame>,
    pub true_steps: BTreeMap<u64, Frame>,
    pub meta: serde_json::Map<String, Value>,
    pub node_tags: HashMap<NodeId, BTreeSet<String>>,
    pub node_weights: HashMap<NodeId, f64>,
    pub step_features: BTreeMap<u64, StepFeatures>,
}

impl ProcessedStream {
    /// The ascending union of observed and ground-truth step indices — the
    /// order an `Adapter` cursor walks.
    pub fn ordered_steps(&self) -> Vec<u64> {
        let mut steps: BTreeSet<u64> = self.obs_steps.keys().copied().collect();
        steps.extend(self.true_steps.keys().copied());
        steps.into_iter().collect()
    }

    pub fn node_label(&self, id: NodeId) -> Option<String> {
        self.nodes.get(&id).and_then(|attrs| {
            attrs
                .get("label")
                .or_else(|| attrs.get("term"))
                .or_else(|| attrs.get("concept"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_steps_merges_obs_and_truth() {
        let mut ps = ProcessedStream::default();
        ps.obs_steps.insert(0, Frame::new());
        ps.obs_steps.insert(2, Frame::new());
        ps.true_steps.insert(1, Frame::new());
        assert_eq!(ps.ordered_steps(), vec![0, 1, 2]);
    }

    #[test]
    fn node_label_prefers_label_then_term_then_concept() {
        let mut ps = ProcessedStream::default();
        let mut attrs = NodeAttrs::new();
        attrs.insert("term".to_string(), NodeAttrValue::Str("Derivative".into()));
        ps.nodes.insert(1, attrs);
        assert_eq!(ps.node_label(1), Some("Derivative".to_string()));
    }
}
