//! Creation-blueprint preprocessor: tags nodes over a design artifact graph
//! as `component`/`decision`/`dependency`/`risk`/`milestone`.

use std::collections::{BTreeSet, HashMap, HashSet};

use axiom_core::config::CoreConfig;
use axiom_core::model::{Edge, Frame, NodeId, ProcessedStream, RawStream, StepFeatures, TopNode};

use crate::common::{cap_step_degree, clamp01, quality_triplet, round3, step_nodes};

const DEFAULT_KEEP_THRESHOLD: f64 = 0.10;
const DEFAULT_DEGREE_CAP: usize = 50;

fn classify_tag(label: &str) -> &'static str {
    let lower = label.to_lowercase();
    if lower.contains("decide") || lower.contains("decision") {
        return "decision";
    }
    if lower.contains("risk") || lower.contains("blocker") {
        return "risk";
    }
    if lower.contains("depends on") || lower.contains("dependency") {
        return "dependency";
    }
    if lower.contains("milestone") || lower.contains("release") {
        return "milestone";
    }
    "component"
}

fn blueprint_tag_weight(tag: &str) -> f64 {
    match tag {
        "component" => 1.0,
        "decision" => 0.90,
        "milestone" => 0.80,
        "dependency" => 0.70,
        "risk" => 0.60,
        _ => 0.40,
    }
}

pub struct CreationBlueprintPreprocessor {
    keep_threshold: f64,
    degree_cap: usize,
}

impl CreationBlueprintPreprocessor {
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
            let tag = node_tag.get(&id).copied().unwrap_or("component");
            blueprint_tag_weight(tag) >= self.keep_threshold
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
            .map(|&id| (id, blueprint_tag_weight(node_tag.get(&id).copied().unwrap_or("component"))))
            .collect();
        let node_tags: HashMap<NodeId, BTreeSet<String>> = used_nodes
            .iter()
            .map(|&id| (id, [node_tag.get(&id).copied().unwrap_or("component").to_string()].into_iter().collect()))
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
                let tag = node_tag.get(&n).copied().unwrap_or("component");
                *weight_by_tag.entry(tag).or_insert(0.0) += node_weights.get(&n).copied().unwrap_or(0.0);
            }
            let w_component = weight_by_tag.get("component").copied().unwrap_or(0.0);
            let w_decision = weight_by_tag.get("decision").copied().unwrap_or(0.0);
            let w_milestone = weight_by_tag.get("milestone").copied().unwrap_or(0.0);
            let w_risk = weight_by_tag.get("risk").copied().unwrap_or(0.0);
            let total_w: f64 = weight_by_tag.values().sum();

            let concept_focus = w_component + 0.8 * w_milestone;
            let assessment_focus = w_decision;
            let (quality, nav_noise, stability) =
                quality_triplet(concept_focus, assessment_focus, w_risk, total_w);

            let mut top_nodes: Vec<TopNode> = nodes_in_step
                .iter()
                .map(|&id| TopNode {
                    id,
                    label: label_of(id),
                    tags: vec![node_tag.get(&id).copied().unwrap_or("component").to_string()],
                    score: node_weights.get(&id).copied().unwrap_or(0.0),
                })
                .collect();
            top_nodes.sort_by(|a, b| {
                b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id))
            });
            top_nodes.truncate(8);

            let commentary = if frame.is_empty() {
                "No blueprint activity recorded.".to_string()
            } else {
                format!("Iteration {t} wires {} component/decision links.", frame.len())
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
                    concept_fraction: Some(round3(clamp01(w_component / total_w.max(1.0)))),
                    assessment_fraction: Some(round3(clamp01(w_decision / total_w.max(1.0)))),
                    reading_fraction: Some(0.0),
                    meta_fraction: Some(round3(clamp01(w_risk / total_w.max(1.0)))),
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
            serde_json::Value::String("creation_blueprint".to_string()),
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
