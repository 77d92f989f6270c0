//! Conversation-brainstorm preprocessor: tags nodes `idea`/`build`/`risk`/
//! `question` rather than the plain conversation domain's `concept`/`entity`
//! split, since brainstorm turns are contributions to a shared idea pool
//! rather than question/answer exchanges.

use std::collections::{BTreeSet, HashMap, HashSet};

use axiom_core::config::CoreConfig;
use axiom_core::model::{Edge, Frame, NodeId, ProcessedStream, RawStream, StepFeatures, TopNode};

use crate::common::{cap_step_degree, clamp01, quality_triplet, round3, step_nodes};

const DEFAULT_KEEP_THRESHOLD: f64 = 0.10;
const DEFAULT_DEGREE_CAP: usize = 50;

fn brainstorm_tag_weight(tag: &str) -> f64 {
    match tag {
        "idea" => 1.0,
        "build" => 0.80,
        "risk" => 0.60,
        "question" => 0.50,
        _ => 0.40,
    }
}

fn classify_tag(label: &str) -> &'static str {
    let lower = label.to_lowercase();
    if lower.trim_end().ends_with('?') {
        return "question";
    }
    if lower.starts_with("risk:") || lower.contains("concern") || lower.contains("but ") {
        return "risk";
    }
    if lower.starts_with("build:") || lower.contains("building on") || lower.contains("+1") {
        return "build";
    }
    "idea"
}

pub struct ConversationBrainstormPreprocessor {
    keep_threshold: f64,
    degree_cap: usize,
}

impl ConversationBrainstormPreprocessor {
    pub fn new(_core: &CoreConfig) -> Self {
        Self {
            keep_threshold: DEFAULT_KEEP_THRESHOLD,
            degree_cap: DEFAULT_DEGREE_CAP,
        }
    }

    pub fn process(&self, raw: RawStream) -> ProcessedStream {
        let mut node_tag: HashMap<NodeId, &'static str> = HashMap::new();
        for (&id, attrs) in &raw.nodes {
            let label = attrs
                .get("label")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            node_tag.insert(id, classify_tag(label));
        }

        let keep_node = |id: NodeId| -> bool {
            let tag = node_tag.get(&id).copied().unwrap_or("idea");
            brainstorm_tag_weight(tag) >= self.keep_threshold
        };

        let filter_and_cap = |frame: &Frame| -> Frame {
            let filtered: Vec<Edge> = frame
                .iter()
                .copied()
                .filter(|&(u, v)| u != v && keep_node(u) && keep_node(v))
                .collect();
            cap_step_degree(filtered, self.degree_cap)
        };

        let obs_steps: std::collections::BTreeMap<u64, Frame> = raw
            .obs_steps
            .iter()
            .map(|(&t, frame)| (t, filter_and_cap(frame)))
            .collect();
        let true_steps: std::collections::BTreeMap<u64, Frame> = raw
            .true_steps
            .iter()
            .map(|(&t, frame)| (t, filter_and_cap(frame)))
            .collect();

        let mut used_nodes: HashSet<NodeId> = HashSet::new();
        for frame in obs_steps.values().chain(true_steps.values()) {
            used_nodes.extend(step_nodes(frame));
        }

        let nodes: HashMap<NodeId, _> = raw
            .nodes
            .into_iter()
            .filter(|(id, _)| used_nodes.contains(id))
            .collect();

        let node_weights: HashMap<NodeId, f64> = used_nodes
            .iter()
            .map(|&id| (id, brainstorm_tag_weight(node_tag.get(&id).copied().unwrap_or("idea"))))
            .collect();
        let node_tags: HashMap<NodeId, BTreeSet<String>> = used_nodes
            .iter()
            .map(|&id| (id, [node_tag.get(&id).copied().unwrap_or("idea").to_string()].into_iter().collect()))
            .collect();

        let label_of = |id: NodeId| -> String {
            nodes
                .get(&id)
                .and_then(|a| a.get("label"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| id.to_string())
        };

        let mut step_features = std::collections::BTreeMap::new();
        for (&t, frame) in &obs_steps {
            let nodes_in_step = step_nodes(frame);
            let mut weight_by_tag: HashMap<&'static str, f64> = HashMap::new();
            for &n in &nodes_in_step {
                let tag = node_tag.get(&n).copied().unwrap_or("idea");
                *weight_by_tag.entry(tag).or_insert(0.0) += node_weights.get(&n).copied().unwrap_or(0.0);
            }
            let w_idea = weight_by_tag.get("idea").copied().unwrap_or(0.0);
            let w_build = weight_by_tag.get("build").copied().unwrap_or(0.0);
            let w_risk = weight_by_tag.get("risk").copied().unwrap_or(0.0);
            let total_w: f64 = weight_by_tag.values().sum();

            let concept_focus = w_idea + 0.7 * w_build;
            let assessment_focus = w_risk;
            let (quality, nav_noise, stability) = quality_triplet(concept_focus, assessment_focus, 0.0, total_w);

            let mut top_nodes: Vec<TopNode> = nodes_in_step
                .iter()
                .map(|&id| TopNode {
                    id,
                    label: label_of(id),
                    tags: vec![node_tag.get(&id).copied().unwrap_or("idea").to_string()],
                    score: node_weights.get(&id).copied().unwrap_or(0.0),
                })
                .collect();
            top_nodes.sort_by(|a, b| {
                b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id))
            });
            top_nodes.truncate(8);

            let commentary = if frame.is_empty() {
                "No brainstorm activity recorded.".to_string()
            } else {
                format!("Round {t} produced {} idea/build/risk links.", frame.len())
            };

            step_features.insert(
                t,
                StepFeatures {
                    quality: Some(round3(quality)),
                    ted: None,
                    stability: Some(round3(stability)),
                    continuity: None,
                    top_nodes,
                    commentary: Some(commentary),
                    counts: weight_by_tag
                        .keys()
                        .map(|&tag| {
                            let count = nodes_in_step
                                .iter()
                                .filter(|&&id| node_tag.get(&id).copied() == Some(tag))
                                .count() as u64;
                            (tag.to_string(), count)
                        })
                        .collect(),
                    nav_noise: Some(round3(nav_noise)),
                    edge_count: Some(frame.len() as u64),
                    step_type: None,
                    concept_fraction: Some(round3(clamp01(w_idea / total_w.max(1.0)))),
                    assessment_fraction: Some(round3(clamp01(w_risk / total_w.max(1.0)))),
                    reading_fraction: Some(0.0),
                    meta_fraction: Some(0.0),
                    weighted_node_mass: Some(round3(total_w)),
                    unique_node_count: Some(nodes_in_step.len() as u64),
                    engagement: None,
                    extra: HashMap::new(),
                },
            );
        }

        let mut meta = raw.meta;
        meta.insert(
            "filter".to_string(),
            serde_json::Value::String("conversation_brainstorm".to_string()),
        );

        ProcessedStream {
            nodes,
            obs_steps,
            true_steps,
            meta,
            node_tags,
            node_weights,
            step_features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_risk_and_build() {
        assert_eq!(classify_tag("Risk: scope creep"), "risk");
        assert_eq!(classify_tag("Building on the last point"), "build");
        assert_eq!(classify_tag("What if we tried X?"), "question");
        assert_eq!(classify_tag("A shared workspace tool"), "idea");
    }
}
