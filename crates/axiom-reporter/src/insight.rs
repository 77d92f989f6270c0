//! `InsightReporter` family (spec §4.8). Grounded in `reporters/insight.py`,
//! `reporters/curriculum_insight.py`, `reporters/conversation_insight.py`
//! (examples/original_source): one running-aggregate reporter, specialized
//! by domain via an [`InsightExtend`] tag rather than subclassing.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{json, Map, Value};

use axiom_core::model::Frame;
use axiom_core::traits::Reporter;

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn avg(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round3(values.iter().sum::<f64>() / values.len() as f64))
    }
}

/// Domain specialization applied on top of the shared running aggregates.
pub enum InsightExtend {
    Generic,
    Curriculum,
    Conversation,
}

/// Curriculum step-type thresholds as read by *this* reporter (spec §9 open
/// question 1): `assessment_fraction >= 0.35`, distinct from
/// `ForecastHead`'s `> 0.4` — the two are intentionally not unified.
fn classify_curriculum_step(q: f64, edge_count: u64, concept: f64, assessment: f64, reading: f64, meta_fraction: f64, nav_noise: f64) -> &'static str {
    if edge_count == 0 || q <= 0.01 {
        return "empty";
    }
    if assessment >= 0.35 && concept >= 0.2 {
        return "checkpoint";
    }
    if concept >= 0.55 && assessment <= 0.25 {
        return "concept_dense";
    }
    if reading >= 0.45 && assessment <= 0.2 {
        return "reading_heavy";
    }
    if meta_fraction >= 0.3 || nav_noise >= 0.45 {
        return "transition";
    }
    "mixed"
}

pub struct InsightReporter {
    domain: String,
    path: PathBuf,
    run_meta: Map<String, Value>,
    extend: InsightExtend,
    steps: Vec<Value>,
    series_q: Vec<f64>,
    series_ted: Vec<f64>,
    series_s: Vec<f64>,
    series_spread: Vec<f64>,
    type_counts: BTreeMap<String, u64>,
    continuity_vals: Vec<f64>,
    ted_trusted_vals: Vec<f64>,
    adjacency_ratios: Vec<f64>,
    question_densities: Vec<f64>,
    speaker_counts: Vec<f64>,
    turns_per_step: Vec<f64>,
    active: bool,
    head_summaries: Map<String, Value>,
}

impl InsightReporter {
    pub fn new(domain: impl Into<String>, path: PathBuf, run_meta: Map<String, Value>, extend: InsightExtend) -> Self {
        let domain = domain.into();
        let active = match extend {
            InsightExtend::Conversation => {
                run_meta.get("domain").and_then(Value::as_str) == Some("conversation")
            }
            _ => true,
        };
        Self {
            domain,
            path,
            run_meta,
            extend,
            steps: Vec::new(),
            series_q: Vec::new(),
            series_ted: Vec::new(),
            series_s: Vec::new(),
            series_spread: Vec::new(),
            type_counts: BTreeMap::new(),
            continuity_vals: Vec::new(),
            ted_trusted_vals: Vec::new(),
            adjacency_ratios: Vec::new(),
            question_densities: Vec::new(),
            speaker_counts: Vec::new(),
            turns_per_step: Vec::new(),
            active,
            head_summaries: Map::new(),
        }
    }

    pub fn generic(domain: impl Into<String>, path: PathBuf, run_meta: Map<String, Value>) -> Self {
        Self::new(domain, path, run_meta, InsightExtend::Generic)
    }

    pub fn curriculum(path: PathBuf, run_meta: Map<String, Value>) -> Self {
        Self::new("curriculum", path, run_meta, InsightExtend::Curriculum)
    }

    pub fn conversation(path: PathBuf, run_meta: Map<String, Value>) -> Self {
        Self::new("conversation", path, run_meta, InsightExtend::Conversation)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn fraction_of(step_meta: &Map<String, Value>, key: &str) -> f64 {
        step_meta.get(key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    fn extra_of<'a>(step_meta: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
        step_meta.get("extra").and_then(Value::as_object).and_then(|m| m.get(key))
    }
}

impl Reporter for InsightReporter {
    fn record(
        &mut self,
        t: u64,
        signals: &Map<String, Value>,
        step_meta: &Map<String, Value>,
        _pred: &Frame,
        _regret: Option<f64>,
    ) {
        if !self.active {
            return;
        }

        let q = signals.get("q").and_then(Value::as_f64);
        let ted = signals.get("ted").and_then(Value::as_f64);
        let stability = signals.get("stability").and_then(Value::as_f64);
        let delta_ted = signals.get("ted_delta").and_then(Value::as_f64);
        let spread = signals.get("spread").and_then(Value::as_f64);
        let locality_nodes = signals.get("locality_nodes").cloned();

        if let Some(v) = q {
            self.series_q.push(v);
        }
        if let Some(v) = ted {
            self.series_ted.push(v);
        }
        if let Some(v) = stability {
            self.series_s.push(v);
        }
        if let Some(v) = spread {
            self.series_spread.push(v);
        }

        let concept_fraction = Self::fraction_of(step_meta, "concept_fraction");
        let assessment_fraction = Self::fraction_of(step_meta, "assessment_fraction");
        let reading_fraction = Self::fraction_of(step_meta, "reading_fraction");
        let meta_fraction = Self::fraction_of(step_meta, "meta_fraction");
        let nav_noise = Self::fraction_of(step_meta, "nav_noise");
        let edge_count = step_meta.get("edge_count").and_then(Value::as_u64);

        let base_commentary = step_meta
            .get("commentary")
            .and_then(Value::as_str)
            .unwrap_or("Run progressing normally.")
            .to_string();
        let mut step_type = step_meta.get("step_type").and_then(Value::as_str).map(str::to_string);
        let mut commentary = base_commentary;

        if matches!(self.extend, InsightExtend::Curriculum) {
            if step_type.is_none() {
                step_type = Some(
                    classify_curriculum_step(
                        q.unwrap_or(0.0),
                        edge_count.unwrap_or(0),
                        concept_fraction,
                        assessment_fraction,
                        reading_fraction,
                        meta_fraction,
                        nav_noise,
                    )
                    .to_string(),
                );
            }
            commentary = match step_type.as_deref() {
                Some("empty") => "No curriculum updates recorded.".to_string(),
                Some("checkpoint") => format!(
                    "Major checkpoint week; assessments closely follow current concepts (concept share={concept_fraction:.2}, assessments={assessment_fraction:.2})."
                ),
                Some("concept_dense") => format!(
                    "Concept-dense segment; ideal for exploration and teaching (concept share={concept_fraction:.2})."
                ),
                Some("reading_heavy") => format!(
                    "Reading-heavy window; emphasize synthesis and discussion (reading share={reading_fraction:.2})."
                ),
                Some("transition") => format!("Transition/structural week; navigation/meta nodes dominate (noise={nav_noise:.2})."),
                _ => commentary,
            };

            if let Some(continuity) = step_meta.get("continuity").and_then(Value::as_f64) {
                self.continuity_vals.push(continuity);
            }
            if let Some(ted_trusted) = Self::extra_of(step_meta, "ted_trusted").and_then(Value::as_f64) {
                self.ted_trusted_vals.push(ted_trusted);
            }
        }

        if matches!(self.extend, InsightExtend::Conversation) {
            if let Some(v) = Self::extra_of(step_meta, "adjacency_ratio").and_then(Value::as_f64) {
                self.adjacency_ratios.push(v);
            }
            if let Some(v) = Self::extra_of(step_meta, "question_density").and_then(Value::as_f64) {
                self.question_densities.push(v);
            }
            if let Some(v) = Self::extra_of(step_meta, "speaker_count").and_then(Value::as_f64) {
                self.speaker_counts.push(v);
            }
            if let Some(v) = Self::extra_of(step_meta, "turns_per_step").and_then(Value::as_f64) {
                self.turns_per_step.push(v);
            }
        }

        if let Some(st) = &step_type {
            *self.type_counts.entry(st.clone()).or_insert(0) += 1;
        }

        let mut top_nodes = step_meta.get("top_nodes").cloned().unwrap_or(Value::Array(Vec::new()));
        if let Value::Array(arr) = &mut top_nodes {
            arr.truncate(8);
        }

        let fractions = json!({
            "concept_fraction": concept_fraction,
            "assessment_fraction": assessment_fraction,
            "reading_fraction": reading_fraction,
            "meta_fraction": meta_fraction,
        });

        self.steps.push(json!({
            "step": t,
            "mean_q": q,
            "mean_ted": ted,
            "mean_s": stability,
            "delta_ted": delta_ted,
            "top_nodes": top_nodes,
            "commentary": commentary,
            "counts": step_meta.get("counts").cloned().unwrap_or(Value::Object(Map::new())),
            "spread": spread,
            "locality_nodes": locality_nodes,
            "step_type": step_type,
            "edge_count": edge_count,
            "fractions": fractions,
        }));
    }

    fn attach_head_summaries(&mut self, summaries: Map<String, Value>) {
        self.head_summaries = summaries;
    }

    fn finish(&mut self) -> Value {
        let mut aggregates = Map::new();
        aggregates.insert("avg_q".to_string(), avg(&self.series_q).map(Value::from).unwrap_or(Value::Null));
        aggregates.insert("avg_ted".to_string(), avg(&self.series_ted).map(Value::from).unwrap_or(Value::Null));
        aggregates.insert(
            "avg_stability".to_string(),
            avg(&self.series_s).map(Value::from).unwrap_or(Value::Null),
        );
        aggregates.insert(
            "avg_spread".to_string(),
            avg(&self.series_spread).map(Value::from).unwrap_or(Value::Null),
        );
        aggregates.insert("steps".to_string(), Value::from(self.steps.len() as u64));
        if !self.type_counts.is_empty() {
            let map: Map<String, Value> = self
                .type_counts
                .iter()
                .map(|(k, &v)| (k.clone(), Value::from(v)))
                .collect();
            aggregates.insert("step_types".to_string(), Value::Object(map));
        }

        let mut recommendations = Vec::new();
        let avg_ted = aggregates.get("avg_ted").and_then(Value::as_f64);
        let avg_q = aggregates.get("avg_q").and_then(Value::as_f64);
        if avg_ted.is_some_and(|v| v > 0.6) {
            recommendations.push("High drift detected; schedule a review or escalation.".to_string());
        }
        if avg_q.is_some_and(|v| v < 0.4) {
            recommendations.push("Quality is lagging; consider injecting higher-signal context.".to_string());
        }
        if recommendations.is_empty() {
            recommendations.push("System performing within expected ranges.".to_string());
        }

        let mut summary = Map::new();
        summary.insert("domain".to_string(), Value::String(self.domain.clone()));
        summary.insert("run_meta".to_string(), Value::Object(self.run_meta.clone()));
        summary.insert("steps".to_string(), Value::Array(self.steps.clone()));
        summary.insert("aggregates".to_string(), Value::Object(aggregates));
        summary.insert(
            "recommendations".to_string(),
            Value::Array(recommendations.into_iter().map(Value::String).collect()),
        );

        if matches!(self.extend, InsightExtend::Curriculum) {
            let phase_counts = summary["aggregates"]
                .get("step_types")
                .cloned()
                .unwrap_or(Value::Object(Map::new()));
            let dominant_step_type = phase_counts.as_object().and_then(|m| {
                m.iter()
                    .max_by_key(|(_, v)| v.as_u64().unwrap_or(0))
                    .map(|(k, _)| k.clone())
            });
            summary.insert(
                "curriculum_highlights".to_string(),
                json!({
                    "phase_counts": phase_counts,
                    "avg_continuity": avg(&self.continuity_vals),
                    "avg_ted_trusted": avg(&self.ted_trusted_vals),
                    "dominant_step_type": dominant_step_type,
                }),
            );
        }

        if matches!(self.extend, InsightExtend::Conversation) && !self.adjacency_ratios.is_empty() {
            summary.insert(
                "conversation_highlights".to_string(),
                json!({
                    "avg_adjacency_ratio": avg(&self.adjacency_ratios),
                    "avg_question_density": avg(&self.question_densities),
                    "avg_speaker_count": avg(&self.speaker_counts),
                    "avg_turns_per_step": avg(&self.turns_per_step),
                }),
            );
        }

        if !self.head_summaries.is_empty() {
            summary.insert("head_summaries".to_string(), Value::Object(self.head_summaries.clone()));
        }

        Value::Object(summary)
    }
}
