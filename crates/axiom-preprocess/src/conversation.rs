//! Conversation domain preprocessor (spec §4.2 "Conversation preprocessor").
//!
//! Adds a minimum-token-length filter on top of the common stoplist/degree-cap
//! contract, and classifies nodes into `concept`/`question`/`entity`/`answer`
//! via regex heuristics rather than the curriculum keyword table.

use std::collections::HashMap;

use regex::Regex;

use axiom_core::config::CoreConfig;
use axiom_core::model::{Edge, Frame, NodeId, ProcessedStream, RawStream, StepFeatures, TopNode};

use crate::common::{cap_step_degree, clamp01, quality_triplet, round3, step_nodes};

const DEFAULT_KEEP_THRESHOLD: f64 = 0.10;
const DEFAULT_DEGREE_CAP: usize = 50;
const DEFAULT_MIN_TOKENS: usize = 2;

fn conversation_tag_weight(tag: &str) -> f64 {
    match tag {
        "concept" => 1.0,
        "entity" => 0.65,
        "answer" => 0.55,
        "question" => 0.60,
        _ => 0.50,
    }
}

pub struct ConversationPreprocessor {
    keep_threshold: f64,
    degree_cap: usize,
    min_tokens: usize,
    question_pattern: Regex,
    entity_pattern: Regex,
}

impl ConversationPreprocessor {
    pub fn new(_core: &CoreConfig) -> Self {
        Self {
            keep_threshold: DEFAULT_KEEP_THRESHOLD,
            degree_cap: DEFAULT_DEGREE_CAP,
            min_tokens: DEFAULT_MIN_TOKENS,
            question_pattern: Regex::new(r"(?i)\?\s*$|^(who|what|when|where|why|how|can|could|would|should|is|are|do|does)\b")
                .expect("static pattern"),
            entity_pattern: Regex::new(r"^[A-Z][a-zA-Z]*(\s[A-Z][a-zA-Z]*)*$").expect("static pattern"),
        }
    }

    fn classify_tag(&self, label: &str) -> &'static str {
        let trimmed = label.trim();
        if self.question_pattern.is_match(trimmed) {
            return "question";
        }
        if trimmed.starts_with("A:") || trimmed.to_lowercase().starts_with("answer:") {
            return "answer";
        }
        if self.entity_pattern.is_match(trimmed) && trimmed.split_whitespace().count() <= 3 {
            return "entity";
        }
        "concept"
    }

    pub fn process(&self, raw: RawStream) -> ProcessedStream {
        let mut node_tag: HashMap<NodeId, &'static str> = HashMap::new();
        for (&id, attrs) in &raw.nodes {
            let label = attrs
                .get("label")
                .or_else(|| attrs.get("term"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            node_tag.insert(id, self.classify_tag(label));
        }

        let keep_node = |id: NodeId| -> bool {
            let label = raw
                .nodes
                .get(&id)
                .and_then(|a| a.get("label"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if label.split_whitespace().count() < self.min_tokens {
                return false;
            }
            let tag = node_tag.get(&id).copied().unwrap_or("concept");
            conversation_tag_weight(tag) >= self.keep_threshold
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

        let mut used_nodes: std::collections::HashSet<NodeId> = std::collections::HashSet::new();
        for frame in obs_steps.values().chain(true_steps.values()) {
            for &n in &step_nodes(frame) {
                used_nodes.insert(n);
            }
        }

        let nodes: HashMap<NodeId, _> = raw
            .nodes
            .into_iter()
            .filter(|(id, _)| used_nodes.contains(id))
            .collect();

        let node_weights: HashMap<NodeId, f64> = used_nodes
            .iter()
            .map(|&id| (id, conversation_tag_weight(node_tag.get(&id).copied().unwrap_or("concept"))))
            .collect();
        let node_tags: HashMap<NodeId, std::collections::BTreeSet<String>> = used_nodes
            .iter()
            .map(|&id| {
                (
                    id,
                    [node_tag.get(&id).copied().unwrap_or("concept").to_string()]
                        .into_iter()
                        .collect(),
                )
            })
            .collect();

        let label_of = |id: NodeId| -> String {
            nodes
                .get(&id)
                .and_then(|a| a.get("label"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| id.to_string())
        };
        let speaker_of = |id: NodeId| -> Option<String> {
            nodes
                .get(&id)
                .and_then(|a| a.get("speaker"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
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
            let w_entity = weight_by_tag.get("entity").copied().unwrap_or(0.0);
            let w_answer = weight_by_tag.get("answer").copied().unwrap_or(0.0);
            let w_question = weight_by_tag.get("question").copied().unwrap_or(0.0);
            let total_w: f64 = weight_by_tag.values().sum();

            // Concept-focus weights entities as half-credit peers of concepts;
            // answers count toward "assessment_focus" the way curriculum scores
            // checkpoints, since an answered question closes a reasoning loop.
            let concept_focus = w_concept + 0.5 * w_entity;
            let assessment_focus = w_answer;
            let noise = 0.0;
            let (quality, nav_noise, stability) = quality_triplet(concept_focus, assessment_focus, noise, total_w);

            // adjacency edges link consecutive turn ids; everything else is a
            // cross-reference ("reply") edge.
            let mut adjacency_edges = 0u64;
            let mut reply_edges = 0u64;
            for &(u, v) in frame {
                if u.abs_diff(v) == 1 {
                    adjacency_edges += 1;
                } else {
                    reply_edges += 1;
                }
            }
            let adjacency_ratio = if adjacency_edges + reply_edges == 0 {
                0.0
            } else {
                reply_edges as f64 / (adjacency_edges + reply_edges) as f64
            };
            let question_density = if nodes_in_step.is_empty() {
                0.0
            } else {
                w_question / total_w.max(1.0)
            };
            let speaker_count = nodes_in_step
                .iter()
                .filter_map(|&id| speaker_of(id))
                .collect::<std::collections::BTreeSet<_>>()
                .len() as u64;

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
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            });
            top_nodes.truncate(8);

            let commentary = if frame.is_empty() {
                "No conversation activity recorded.".to_string()
            } else {
                format!(
                    "Turn {t} carries {} edges, question density {:.2}.",
                    frame.len(),
                    question_density
                )
            };

            let mut extra = HashMap::new();
            extra.insert("adjacency_ratio".to_string(), serde_json::Value::from(round3(adjacency_ratio)));
            extra.insert("question_density".to_string(), serde_json::Value::from(round3(question_density)));
            extra.insert("speaker_count".to_string(), serde_json::Value::from(speaker_count));
            extra.insert(
                "turns_per_step".to_string(),
                serde_json::Value::from(nodes_in_step.len() as u64),
            );

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
                    concept_fraction: Some(round3(clamp01(w_concept / total_w.max(1.0)))),
                    assessment_fraction: Some(round3(clamp01(w_answer / total_w.max(1.0)))),
                    reading_fraction: Some(0.0),
                    meta_fraction: Some(0.0),
                    weighted_node_mass: Some(round3(total_w)),
                    unique_node_count: Some(nodes_in_step.len() as u64),
                    engagement: None,
                    extra,
                },
            );
        }

        let mut meta = raw.meta;
        meta.insert("filter".to_string(), serde_json::Value::String("conversation".to_string()));

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
    use axiom_core::model::{NodeAttrValue, NodeAttrs};

    fn raw(labels: &[(u64, &str)], edges: &[(u64, u64, u64)]) -> RawStream {
        let mut raw = RawStream::default();
        for &(id, label) in labels {
            let mut attrs = NodeAttrs::new();
            attrs.insert("label".to_string(), NodeAttrValue::Str(label.to_string()));
            raw.nodes.insert(id, attrs);
        }
        for &(step, src, dst) in edges {
            raw.obs_steps.entry(step).or_default().insert((src, dst));
        }
        raw
    }

    #[test]
    fn classifies_question_nodes() {
        let pre = ConversationPreprocessor::new(&CoreConfig::default());
        assert_eq!(pre.classify_tag("What is a monad?"), "question");
        assert_eq!(pre.classify_tag("functional composition"), "concept");
    }

    #[test]
    fn drops_short_labels() {
        let raw = raw(&[(0, "ok"), (1, "a detailed follow-up question?")], &[(0, 0, 1)]);
        let pre = ConversationPreprocessor::new(&CoreConfig::default());
        let processed = pre.process(raw);
        assert!(processed.obs_steps[&0].is_empty());
    }

    #[test]
    fn adjacency_edges_do_not_count_as_replies() {
        let raw = raw(
            &[(0, "first message here"), (1, "second message here")],
            &[(0, 0, 1)],
        );
        let pre = ConversationPreprocessor::new(&CoreConfig::default());
        let processed = pre.process(raw);
        let extra = &processed.step_features[&0].extra;
        assert_eq!(extra["adjacency_ratio"], serde_json::Value::from(0.0));
    }
}
