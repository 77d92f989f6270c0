//! Shared preprocessing helpers: degree capping, tag-weight tables, and the
//! trusted-drift composition (spec §4.2).
//!
//! Grounded in `adapters/curriculum/preprocess.py`'s stoplist/degree-cap
//! contract from `examples/original_source`, adapted to the insertion-order
//! degree cap spec.md prescribes (the original caps from the tail of the
//! step; spec.md prescribes insertion order — this implementation follows
//! spec.md, see DESIGN.md).

use std::collections::{BTreeSet, HashMap};

use axiom_core::config::TrustConfig;
use axiom_core::model::{Edge, Frame, NodeId};

/// Default per-tag node weight (spec §4.2).
pub fn default_tag_weight(tag: &str) -> f64 {
    match tag {
        "concept" | "theorem" | "definition" => 1.0,
        "reading" => 0.85,
        "assessment" | "exam" | "pset" => 0.70,
        "segment" => 0.70,
        "person" => 0.30,
        "meta" => 0.20,
        "navigation" | "media" => 0.05,
        _ => 0.50,
    }
}

/// Authority weight used by the trusted-drift composition (spec §4.2).
pub fn authority_weight(tag: &str) -> f64 {
    match tag {
        "theorem" | "definition" => 1.0,
        "assessment" => 0.8,
        "reading" => 0.6,
        "concept" => 0.7,
        _ => 0.5,
    }
}

/// Apply the per-step degree cap in insertion order: process edges in the
/// order given, skipping any edge that would push either endpoint's degree
/// in the *retained* set over `cap`.
pub fn cap_step_degree(edges: impl IntoIterator<Item = Edge>, cap: usize) -> Frame {
    let mut degree: HashMap<NodeId, usize> = HashMap::new();
    let mut kept = Frame::new();
    for edge @ (u, v) in edges {
        let du = *degree.get(&u).unwrap_or(&0);
        let dv = *degree.get(&v).unwrap_or(&0);
        if du >= cap || dv >= cap {
            continue;
        }
        kept.insert(edge);
        *degree.entry(u).or_insert(0) += 1;
        *degree.entry(v).or_insert(0) += 1;
    }
    kept
}

/// Composed per-edge trust score (spec §4.2: verification/authority/
/// recency/locality) and the τ-thresholded trusted subset of one step.
pub struct TrustTracker {
    trust: TrustConfig,
    freq: HashMap<Edge, u32>,
    last_seen: HashMap<Edge, u64>,
    prev_trusted: Option<Frame>,
}

impl TrustTracker {
    pub fn new(trust: TrustConfig) -> Self {
        Self {
            trust,
            freq: HashMap::new(),
            last_seen: HashMap::new(),
            prev_trusted: None,
        }
    }

    /// Process one step's (already-filtered) frame; returns the trusted
    /// subset and the Jaccard distance to the previous step's trusted
    /// subset (`None` on the first step).
    pub fn step(
        &mut self,
        step: u64,
        frame: &Frame,
        node_weight: impl Fn(NodeId) -> f64,
        node_tag: impl Fn(NodeId) -> Option<String>,
    ) -> (Frame, Option<f64>) {
        let mut trusted = Frame::new();
        for &edge @ (u, v) in frame {
            let freq = *self.freq.get(&edge).unwrap_or(&0);
            let v_score = (freq as f64 / 5.0).min(1.0);

            let tag_u = node_tag(u).unwrap_or_default();
            let tag_v = node_tag(v).unwrap_or_default();
            let a_score = authority_weight(&tag_u).min(authority_weight(&tag_v));

            let last = *self.last_seen.get(&edge).unwrap_or(&step);
            let r_score = 1.0 / (1.0 + (step.saturating_sub(last)) as f64);

            let l_score = node_weight(u).min(node_weight(v));

            let s = self.trust.alpha * v_score
                + self.trust.beta * a_score
                + self.trust.gamma * r_score
                + self.trust.delta * l_score;

            if s >= self.trust.tau {
                trusted.insert(edge);
            }

            *self.freq.entry(edge).or_insert(0) += 1;
            self.last_seen.insert(edge, step);
        }

        let ted_trusted = self.prev_trusted.as_ref().map(|prev| jaccard_distance(prev, &trusted));
        self.prev_trusted = Some(trusted.clone());
        (trusted, ted_trusted)
    }
}

/// Jaccard-distance between two edge sets: `1 - |A∩B| / |A∪B|`, `0` when
/// both are empty.
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

pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Shared `(quality, nav_noise, stability)` triplet (spec §4.2 "Curriculum
/// quality formula"), generalized to any domain's concept/assessment/noise
/// weight split: `quality = min(1, (concept_focus + 0.6·assessment_focus) / W)`,
/// `nav_noise = clamp(noise / W, 0, 1)`, `stability = clamp(quality − 0.3·nav_noise, 0, 1)`.
pub fn quality_triplet(concept_focus: f64, assessment_focus: f64, noise: f64, total_w: f64) -> (f64, f64, f64) {
    let w = total_w.max(1.0);
    let quality = ((concept_focus + 0.6 * assessment_focus) / w).min(1.0).max(0.0);
    let nav_noise = clamp01(noise / w);
    let stability = clamp01(quality - 0.3 * nav_noise);
    (quality, nav_noise, stability)
}

pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Nodes touched by a frame's edges.
pub fn step_nodes(frame: &Frame) -> BTreeSet<NodeId> {
    let mut nodes = BTreeSet::new();
    for &(u, v) in frame {
        nodes.insert(u);
        nodes.insert(v);
    }
    nodes
}
