//! `CurriculumDynamicsReporter` (spec §4.8 "Curriculum-dynamics"). Grounded
//! in `reporters/curriculum_dynamics.py` (examples/original_source): a
//! phase/guidance view built from the `regime_change` and `forecast` head
//! summaries rather than from per-step aggregates alone.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{json, Map, Value};

use axiom_core::model::Frame;
use axiom_core::traits::Reporter;

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn safe_f64(v: Option<&Value>) -> f64 {
    v.and_then(Value::as_f64).unwrap_or(0.0)
}

pub struct CurriculumDynamicsReporter {
    path: PathBuf,
    run_meta: Map<String, Value>,
    steps: Vec<Value>,
    head_summaries: Map<String, Value>,
}

impl CurriculumDynamicsReporter {
    pub fn new(path: PathBuf, run_meta: Map<String, Value>) -> Self {
        Self {
            path,
            run_meta,
            steps: Vec::new(),
            head_summaries: Map::new(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn top_uncertain_steps(steps: &[Value], top_n: usize) -> Vec<Value> {
        let mut ranked: Vec<(u64, f64)> = steps
            .iter()
            .filter_map(|s| {
                let std = s.get("q_mc_std")?.as_f64()?;
                let step = s.get("step")?.as_u64()?;
                Some((step, std))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
            .into_iter()
            .take(top_n)
            .map(|(step, std)| json!({"step": step, "q_mc_std": std}))
            .collect()
    }

    fn build_phases(change_points: &[u64], total_steps: usize) -> Vec<Value> {
        if change_points.is_empty() || total_steps == 0 {
            return Vec::new();
        }
        let mut points: Vec<u64> = change_points
            .iter()
            .copied()
            .filter(|&cp| (cp as usize) < total_steps)
            .collect();
        points.sort_unstable();
        points.dedup();

        let mut phases = Vec::new();
        let mut start = 0u64;
        for (idx, &cp) in points.iter().enumerate() {
            phases.push(json!({"phase": idx + 1, "start": start, "end": cp}));
            start = cp + 1;
        }
        if (start as usize) < total_steps {
            phases.push(json!({"phase": points.len() + 1, "start": start, "end": total_steps as u64 - 1}));
        }
        phases
    }

    fn dominant_step_types(step_types: &[Value], top_n: usize) -> Vec<Value> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for label in step_types {
            if let Some(s) = label.as_str() {
                *counts.entry(s.to_string()).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(top_n).map(|(label, count)| json!([label, count])).collect()
    }
}

impl Reporter for CurriculumDynamicsReporter {
    fn record(
        &mut self,
        t: u64,
        signals: &Map<String, Value>,
        step_meta: &Map<String, Value>,
        _pred: &Frame,
        _regret: Option<f64>,
    ) {
        let step_type = signals
            .get("step_type_inferred")
            .or_else(|| signals.get("step_type"))
            .or_else(|| step_meta.get("step_type"))
            .cloned()
            .unwrap_or(Value::Null);

        self.steps.push(json!({
            "step": t,
            "step_id": step_meta.get("step_id").cloned().unwrap_or(Value::from(t)),
            "q": signals.get("q"),
            "ted": signals.get("ted"),
            "stability": signals.get("stability"),
            "spread": signals.get("spread"),
            "ted_delta": signals.get("ted_delta"),
            "step_type": step_type,
            "next_step_type_pred": signals.get("next_step_type_pred"),
            "q_mc_std": signals.get("q_mc_std"),
            "ted_mc_std": signals.get("ted_mc_std"),
            "change_score": signals.get("change_score"),
            "top_nodes": step_meta.get("top_nodes"),
            "commentary": step_meta.get("commentary"),
        }));
    }

    fn attach_head_summaries(&mut self, summaries: Map<String, Value>) {
        self.head_summaries = summaries;
    }

    fn finish(&mut self) -> Value {
        let (avg_q, avg_ted, step_type_counts) = if self.steps.is_empty() {
            (0.0, 0.0, BTreeMap::new())
        } else {
            let avg_q = self.steps.iter().map(|s| safe_f64(s.get("q"))).sum::<f64>() / self.steps.len() as f64;
            let avg_ted = self.steps.iter().map(|s| safe_f64(s.get("ted"))).sum::<f64>() / self.steps.len() as f64;
            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for s in &self.steps {
                let label = s.get("step_type").and_then(Value::as_str).unwrap_or("unknown").to_string();
                *counts.entry(label).or_insert(0) += 1;
            }
            (avg_q, avg_ted, counts)
        };

        let monte_carlo = self.head_summaries.get("monte_carlo").cloned().unwrap_or(Value::Object(Map::new()));
        let forecast = self.head_summaries.get("forecast").cloned().unwrap_or(Value::Object(Map::new()));
        let regime = self.head_summaries.get("regime_change").cloned().unwrap_or(Value::Object(Map::new()));

        let dynamics = json!({
            "avg_q": round3(avg_q),
            "avg_ted": round3(avg_ted),
            "step_type_distribution": step_type_counts,
            "q_trend_slope": forecast.get("q_slope"),
            "ted_trend_slope": forecast.get("ted_slope"),
        });

        let uncertainty = json!({
            "avg_q_mc_std": monte_carlo.get("avg_q_mc_std"),
            "avg_ted_mc_std": monte_carlo.get("avg_ted_mc_std"),
            "most_uncertain_steps": Self::top_uncertain_steps(&self.steps, 5),
        });

        let change_points: Vec<u64> = regime
            .get("change_points")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();
        let phases = Self::build_phases(&change_points, self.steps.len());

        let step_type_sequence = forecast.get("step_types").and_then(Value::as_array).cloned().unwrap_or_default();
        let next_focus_hint = step_type_sequence.last().cloned().unwrap_or(Value::String("unknown".to_string()));
        let mut guidance = Map::new();
        guidance.insert(
            "dominant_step_types".to_string(),
            Value::Array(Self::dominant_step_types(&step_type_sequence, 3)),
        );
        guidance.insert("next_focus_hint".to_string(), next_focus_hint);
        if !phases.is_empty() {
            guidance.insert("phase_count".to_string(), Value::from(phases.len() as u64));
        }

        json!({
            "run_meta": self.run_meta,
            "steps": self.steps,
            "dynamics": dynamics,
            "phases": phases,
            "uncertainty": uncertainty,
            "guidance": guidance,
        })
    }
}
