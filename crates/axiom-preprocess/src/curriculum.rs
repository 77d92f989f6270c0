//! Curriculum domain preprocessor (spec §4.2 "Curriculum quality formula",
//! "Trusted-drift augmentation").
//!
//! Tag/stoplist heuristics are grounded in
//! `adapters/curriculum/preprocess.py` (examples/original_source): a
//! default stop-node set, regex stop-patterns for media filenames, and a
//! keyword-based type inferrer. The quality/trust math follows spec.md
//! exactly rather than the (older, trust-less) original.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use axiom_core::config::{CoreConfig, WeightScaleConfig};
use axiom_core::model::{Edge, Frame, NodeId, ProcessedStream, RawStream, StepFeatures, TopNode};

use crate::common::{
    cap_step_degree, clamp01, default_tag_weight, quality_triplet, round3, step_nodes, TrustTracker,
};

const DEFAULT_KEEP_THRESHOLD: f64 = 0.10;
const DEFAULT_DEGREE_CAP: usize = 50;

fn default_stop_nodes() -> HashSet<String> {
    [
        "Contact Us",
        "Browse Course Material",
        "Help & FAQs",
        "About OCW",
        "Give Now",
        "Syllabus",
        "Calendar",
        "Recitations",
        "Download",
        "Transcript",
    ]
    .into_iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_stop_patterns() -> Vec<Regex> {
    [r"^lec\d+\.(jpg|png|mp4|srt)$", r".*\.srt$", r"^\s*$"]
        .into_iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("static pattern"))
        .collect()
}

pub struct CurriculumPreprocessor {
    stop_nodes: HashSet<String>,
    stop_patterns: Vec<Regex>,
    keep_threshold: f64,
    degree_cap: usize,
    weight_scale: WeightScaleConfig,
    core: CoreConfig,
}

impl CurriculumPreprocessor {
    pub fn new(core: &CoreConfig) -> Self {
        Self {
            stop_nodes: default_stop_nodes(),
            stop_patterns: default_stop_patterns(),
            keep_threshold: DEFAULT_KEEP_THRESHOLD,
            degree_cap: DEFAULT_DEGREE_CAP,
            weight_scale: core.weight_scale.clone(),
            core: core.clone(),
        }
    }

    fn classify_tag(&self, label: &str) -> &'static str {
        let lower = label.to_lowercase();
        if self.stop_patterns.iter().any(|rx| rx.is_match(label)) {
            return "media";
        }
        let nav_tokens = [
            "contact", "browse", "help", "faq", "about", "give now", "syllabus", "calendar",
            "recitation", "download", "transcript",
        ];
        if nav_tokens.iter().any(|t| lower.contains(t)) {
            return "navigation";
        }
        if lower.contains(".mp4") || lower.contains("_mp4") {
            return "media";
        }
        if (lower.contains(".pdf") || lower.contains("_pdf"))
            && (lower.contains("lecture") || lower.starts_with("lec") || lower.contains("notes"))
        {
            return "reading";
        }
        if ["exam", "midterm", "final", "quiz", "test", "pset", "problem set", "assignment", "homework"]
            .iter()
            .any(|t| lower.contains(t))
        {
            return "assessment";
        }
        if lower.contains("definition") || lower.contains("def.") {
            return "definition";
        }
        if ["theorem", "lemma", "proposition", "corollary"]
            .iter()
            .any(|t| lower.contains(t))
        {
            return "theorem";
        }
        if ["prof.", "instructor"].iter().any(|t| lower.contains(t)) {
            return "person";
        }
        let concept_tokens = [
            "derivative", "integral", "series", "limit", "taylor", "chain rule", "riemann",
            "differential", "gradient", "partial",
        ];
        if concept_tokens.iter().any(|t| lower.contains(t)) {
            return "concept";
        }
        "unknown"
    }

    fn node_weight(&self, tag: &str) -> f64 {
        let base = default_tag_weight(tag) * self.weight_scale.weight_scale;
        match tag {
            "reading" => base * self.weight_scale.resource_w_scale,
            "concept" | "theorem" | "definition" => base * self.weight_scale.lecture_w_scale,
            "assessment" => base * self.weight_scale.pset_w_scale,
            _ => base,
        }
    }

    pub fn process(&self, raw: RawStream) -> ProcessedStream {
        let mut node_tag: HashMap<NodeId, &'static str> = HashMap::new();
        for (&id, attrs) in &raw.nodes {
            let label = attrs
                .get("label")
                .or_else(|| attrs.get("term"))
                .or_else(|| attrs.get("concept"))
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
            if self.stop_nodes.contains(label) {
                return false;
            }
            let tag = node_tag.get(&id).copied().unwrap_or("unknown");
            self.node_weight(tag) >= self.keep_threshold
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
            .map(|&id| {
                let tag = node_tag.get(&id).copied().unwrap_or("unknown");
                (id, self.node_weight(tag))
            })
            .collect();

        let node_tags: HashMap<NodeId, std::collections::BTreeSet<String>> = used_nodes
            .iter()
            .map(|&id| {
                let tag = node_tag.get(&id).copied().unwrap_or("unknown");
                (id, [tag.to_string()].into_iter().collect())
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

        let mut trust_tracker = TrustTracker::new(self.core.trust.clone());
        let mut step_features = std::collections::BTreeMap::new();

        for (&t, frame) in &obs_steps {
            let nodes_in_step = step_nodes(frame);
            let mut weight_by_tag: HashMap<&'static str, f64> = HashMap::new();
            for &n in &nodes_in_step {
                let tag = node_tag.get(&n).copied().unwrap_or("unknown");
                *weight_by_tag.entry(tag).or_insert(0.0) += node_weights.get(&n).copied().unwrap_or(0.0);
            }
            let w_concept = weight_by_tag.get("concept").copied().unwrap_or(0.0);
            let w_definition = weight_by_tag.get("definition").copied().unwrap_or(0.0);
            let w_theorem = weight_by_tag.get("theorem").copied().unwrap_or(0.0);
            let w_reading = weight_by_tag.get("reading").copied().unwrap_or(0.0);
            let w_assessment = weight_by_tag.get("assessment").copied().unwrap_or(0.0);
            let w_navigation = weight_by_tag.get("navigation").copied().unwrap_or(0.0);
            let w_media = weight_by_tag.get("media").copied().unwrap_or(0.0);
            let w_meta = weight_by_tag.get("meta").copied().unwrap_or(0.0);
            let w_other = weight_by_tag.get("person").copied().unwrap_or(0.0)
                + weight_by_tag.get("unknown").copied().unwrap_or(0.0);

            let total_w: f64 = weight_by_tag.values().sum();
            let w_denom = total_w.max(1.0);

            let concept_focus =
                w_concept + 0.8 * w_definition + 0.9 * w_theorem + 0.7 * w_reading + 0.4 * w_other;
            let assessment_focus = w_assessment;
            let meta_noise = w_navigation + w_media + w_meta;

            let (quality, nav_noise, stability) =
                quality_triplet(concept_focus, assessment_focus, meta_noise, w_denom);

            let node_weight_fn = |id: NodeId| node_weights.get(&id).copied().unwrap_or(0.0);
            let node_tag_fn =
                |id: NodeId| node_tag.get(&id).map(|t| t.to_string());
            let (_trusted, ted_trusted) = trust_tracker.step(t, frame, node_weight_fn, node_tag_fn);

            let mut top_nodes: Vec<TopNode> = nodes_in_step
                .iter()
                .map(|&id| TopNode {
                    id,
                    label: label_of(id),
                    tags: vec![node_tag.get(&id).copied().unwrap_or("unknown").to_string()],
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

            let concept_fraction = clamp01((w_concept + w_definition + w_theorem) / w_denom);
            let assessment_fraction = clamp01(w_assessment / w_denom);
            let reading_fraction = clamp01(w_reading / w_denom);
            let meta_fraction = clamp01(w_meta / w_denom);

            let commentary = if frame.is_empty() {
                tracing::warn!(step = t, "empty curriculum step, degenerate quality triplet");
                "No curriculum updates recorded.".to_string()
            } else {
                format!(
                    "Week {t} spans {} edges with concept share {:.2} and assessment share {:.2}.",
                    frame.len(),
                    concept_fraction,
                    assessment_fraction
                )
            };

            let mut extra = HashMap::new();
            if let Some(tt) = ted_trusted {
                extra.insert(
                    "ted_trusted".to_string(),
                    serde_json::Value::from(round3(tt)),
                );
            }

            step_features.insert(
                t,
                StepFeatures {
                    quality: Some(round3(quality)),
                    ted: None,
                    stability: Some(round3(stability)),
                    continuity: ted_trusted.map(|tt| round3(clamp01(1.0 - tt))),
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
                    concept_fraction: Some(round3(concept_fraction)),
                    assessment_fraction: Some(round3(assessment_fraction)),
                    reading_fraction: Some(round3(reading_fraction)),
                    meta_fraction: Some(round3(meta_fraction)),
                    weighted_node_mass: Some(round3(total_w)),
                    unique_node_count: Some(nodes_in_step.len() as u64),
                    engagement: None,
                    extra,
                },
            );
        }

        let mut meta = raw.meta;
        meta.insert(
            "filter".to_string(),
            serde_json::Value::String("curriculum".to_string()),
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
    use axiom_core::model::{NodeAttrValue, NodeAttrs};

    fn raw_with_labels(labels: &[(u64, &str)], edges: &[(u64, u64, u64)]) -> RawStream {
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
    fn drops_self_loops_and_stoplisted_nodes() {
        let raw = raw_with_labels(
            &[(0, "Derivative Rules"), (1, "Contact Us"), (2, "Chain Rule")],
            &[(0, 0, 0), (0, 0, 1), (0, 0, 2)],
        );
        let pre = CurriculumPreprocessor::new(&CoreConfig::default());
        let processed = pre.process(raw);
        let frame = &processed.obs_steps[&0];
        assert!(!frame.contains(&(0, 0)));
        assert!(!frame.contains(&(0, 1)));
        assert!(frame.contains(&(0, 2)));
    }

    #[test]
    fn quality_is_in_unit_interval() {
        let raw = raw_with_labels(
            &[(0, "Derivative Rules"), (1, "Integral Calculus")],
            &[(0, 0, 1), (1, 0, 1)],
        );
        let pre = CurriculumPreprocessor::new(&CoreConfig::default());
        let processed = pre.process(raw);
        for (_, feat) in processed.step_features {
            let q = feat.quality.unwrap();
            assert!((0.0..=1.0).contains(&q));
        }
    }

    #[test]
    fn step_features_exist_for_every_obs_step() {
        let raw = raw_with_labels(
            &[(0, "Derivative Rules"), (1, "Integral Calculus")],
            &[(0, 0, 1), (2, 0, 1)],
        );
        let pre = CurriculumPreprocessor::new(&CoreConfig::default());
        let processed = pre.process(raw);
        assert!(processed.step_features.contains_key(&0));
        assert!(processed.step_features.contains_key(&2));
    }
}
