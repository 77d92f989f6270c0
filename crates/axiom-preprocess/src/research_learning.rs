//! Research-learning preprocessor: activity/corpus logs over reading,
//! citation, concept, and assessment nodes. Shares the curriculum tag-weight
//! table (`common::default_tag_weight`) but adds a `citation` tag and skips
//! the trusted-drift augmentation, which spec.md scopes to curriculum.

use std::collections::{BTreeSet, HashMap, HashSet};

use axiom_core::config::CoreConfig;
use axiom_core::model::{Edge, Frame, NodeId, ProcessedStream, RawStream, StepFeatures, TopNode};

use crate::common::{cap_step_degree, clamp01, default_tag_weight, quality_triplet, round3, step_nodes};

const DEFAULT_KEEP_THRESHOLD: f64 = 0.10;
const DEFAULT_DEGREE_CAP: usize = 50;

fn classify_tag(label: &str) -> &'static str {
    let lower = label.to_lowercase();
    if lower.contains("et al.") || lower.contains("doi:") || lower.contains("arxiv") {
        return "citation";
    }
    if ["exam", "quiz", "assignment", "problem set"].iter().any(|t| lower.contains(t)) {
        return "assessment";
    }
    if lower.contains("reading") || lower.contains("chapter") || lower.contains("paper") {
        return "reading";
    }
    if ["theorem", "lemma", "proof"].iter().any(|t| lower.contains(t)) {
        return "theorem";
    }
    if lower.contains("navigation") || lower.contains("menu") {
        return "navigation";
    }
    "concept"
}

fn research_tag_weight(tag: &str) -> f64 {
    match tag {
        "citation" => 0.75,
        _ => default_tag_weight(tag),
    }
}

pub struct ResearchLearningPreprocessor {
    keep_threshold: f64,
    degree_cap: usize,
}

impl ResearchLearningPreprocessor {
    pub fn new(_core: &CoreConfig) -> Self {
        Self {
            keep_threshold: DEFAULT_KEEP_THRESHOLD,
            degree_cap: DEFAULT_DEGREE_CAP,
        }
    }

    pub fn process(&self, raw: RawStream) -> ProcessedStream {
        let mut node_tag: HashMap<NodeId, &'static str> = HashMap::new();
        for (&id, attrs) in &raw.nodes {
            let label = attrs.get("label").and_then(|v| v.as_str()).unwrap_or_default();
            node_tag.insert(id, classify_tag(label));
        }

        let keep_node = |id: NodeId| -> bool {
            let tag = node_tag.get(&id).copied().unwrap_or("concept");
            research_tag_weight(tag) >= self.keep_threshold
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
            .map(|&id| (id, research_tag_weight(node_tag.get(&id).copied().unwrap_or("concept"))))
            .collect();
        let node_tags: HashMap<NodeId, BTreeSet<String>> = used_nodes
            .iter()
            .map(|&id| (id, [node_tag.get(&id).copied().unwrap_or("concept").to_string()].into_iter().collect()))
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
                let tag = node_tag.get(&n).copied().unwrap_or("concept");
                *weight_by_tag.entry(tag).or_insert(0.0) += node_weights.get(&n).copied().unwrap_or(0.0);
            }
            let w_concept = weight_by_tag.get("concept").copied().unwrap_or(0.0);
            let w_theorem = weight_by_tag.get("theorem").copied().unwrap_or(0.0);
            let w_reading = weight_by_tag.get("reading").copied().unwrap_or(0.0);
            let w_citation = weight_by_tag.get("citation").copied().unwrap_or(0.0);
            let w_assessment = weight_by_tag.get("assessment").copied().unwrap_or(0.0);
            let w_navigation = weight_by_tag.get("navigation").copied().unwrap_or(0.0);
            let total_w: f64 = weight_by_tag.values().sum();

            let concept_focus = w_concept + 0.9 * w_theorem + 0.7 * w_reading + 0.6 * w_citation;
            let assessment_focus = w_assessment;
            let (quality, nav_noise, stability) =
                quality_triplet(concept_focus, assessment_focus, w_navigation, total_w);

            let mut top_nodes: Vec<TopNode> = nodes_in_step
                .iter()
                .map(|&id| TopNode {
                    id,
                    label: label_of(id),
                    tags: vec![node_tag.get(&id).copied().unwrap_or("concept").to_string()],
                    score: node_weights.get(&id).copied().unwrap_or(0.0),
                })
                .collect();
            top_nodes.sort_by(|a, b| {
                b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id))
            });
            top_nodes.truncate(8);

            let commentary = if frame.is_empty() {
                "No research activity recorded.".to_string()
            } else {
                format!("Session {t} touches {} reading/concept links.", frame.len())
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
                    concept_fraction: Some(round3(clamp01((w_concept + w_theorem) / total_w.max(1.0)))),
                    assessment_fraction: Some(round3(clamp01(w_assessment / total_w.max(1.0)))),
                    reading_fraction: Some(round3(clamp01(w_reading / total_w.max(1.0)))),
                    meta_fraction: Some(round3(clamp01(w_navigation / total_w.max(1.0)))),
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
            serde_json::Value::String("research_learning".to_string()),
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
    fn classifies_citation_nodes() {
        assert_eq!(classify_tag("Smith et al. 2019"), "citation");
        assert_eq!(classify_tag("Chapter 4: dynamic programming"), "reading");
    }
}
