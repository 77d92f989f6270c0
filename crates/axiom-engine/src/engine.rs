//! The per-step engine loop (spec §4.4). Grounded in `core/engine.py`'s
//! `Engine.run()` step order: adapter → cumulative union → signals → heads
//! (merging extras) → policy → reporter.record → state update.

use serde_json::{Map, Value};

use axiom_core::model::Frame;
use axiom_core::traits::{Adapter, Head, Policy, Reporter, StepFrame};

use crate::signals::SignalComputer;

/// Owns one course's adapter, heads, policy, and reporter; no state is
/// shared across engine instances (spec §5 "Parallelism").
pub struct Engine {
    adapter: Box<dyn Adapter>,
    signal_computer: SignalComputer,
    heads: Vec<Box<dyn Head>>,
    policy: Box<dyn Policy>,
    reporter: Box<dyn Reporter>,
    course_id: String,
}

impl Engine {
    pub fn new(
        adapter: Box<dyn Adapter>,
        signal_computer: SignalComputer,
        heads: Vec<Box<dyn Head>>,
        policy: Box<dyn Policy>,
        reporter: Box<dyn Reporter>,
        course_id: String,
    ) -> Self {
        Self {
            adapter,
            signal_computer,
            heads,
            policy,
            reporter,
            course_id,
        }
    }

    /// Drive the stream to exhaustion and return the reporter's final JSON.
    pub fn run(mut self) -> Value {
        tracing::info!(course_id = %self.course_id, "engine starting");
        let meta = self.adapter.meta().clone();
        for head in &mut self.heads {
            head.init_course(&self.course_id, &meta);
        }

        let mut prev_cumulative: Option<Frame> = None;
        let mut prev_pred: Option<Frame> = None;
        let mut t: u64 = 0;

        while self.adapter.has_more() {
            let obs = self.adapter.next_obs();
            let step_id = self.adapter.current_step().unwrap_or(t);
            let step_features = self.adapter.get_step_features(step_id);

            let cumulative: Frame = match &prev_cumulative {
                Some(prev) => prev.union(&obs).copied().collect(),
                None => obs.clone(),
            };

            let record = self
                .signal_computer
                .compute(&cumulative, prev_cumulative.as_ref(), &step_features);

            tracing::debug!(step_id, q = record.q, ted = record.ted, "step computed");
            if cumulative.is_empty() {
                tracing::warn!(step_id, "empty cumulative frame, signals degenerate to neutral record");
            }

            let mut signals = signal_record_to_map(&record);

            let frame = StepFrame {
                t,
                step_id,
                obs_edges: obs.clone(),
                cumulative_edges: cumulative.clone(),
                prev_cumulative: prev_cumulative.clone(),
                node_weights: self.adapter.node_weights().clone(),
                step_features: step_features.clone(),
            };

            for head in &mut self.heads {
                let extras = head.per_step(&frame, &signals);
                signals.extend(extras);
            }

            let pred = self.policy.step(t, prev_pred.as_ref(), &obs, &signals);

            let step_meta = build_step_meta(step_id, &step_features);
            self.reporter.record(t, &signals, &step_meta, &pred, None);

            prev_pred = Some(pred);
            prev_cumulative = Some(cumulative);
            t += 1;
        }

        let mut head_summaries = Map::new();
        for head in &mut self.heads {
            let summary = head.finalize();
            if !summary.is_empty() {
                head_summaries.insert(head.name().to_string(), Value::Object(summary));
            }
        }
        self.reporter.attach_head_summaries(head_summaries);
        tracing::info!(course_id = %self.course_id, steps = t, "engine finished");
        self.reporter.finish()
    }
}

fn signal_record_to_map(record: &crate::signals::SignalRecord) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn build_step_meta(step_id: u64, step_features: &axiom_core::model::StepFeatures) -> Map<String, Value> {
    let mut map = match serde_json::to_value(step_features) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    map.insert("step_id".to_string(), Value::from(step_id));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use axiom_core::config::SignalConfig;
    use axiom_core::model::{NodeId, ProcessedStream, RawStream, StepFeatures};
    use std::collections::HashMap;

    struct StubAdapter {
        stream: ProcessedStream,
        steps: Vec<u64>,
        idx: usize,
        current: Option<u64>,
    }

    impl StubAdapter {
        fn new(stream: ProcessedStream) -> Self {
            let steps = stream.ordered_steps();
            Self { stream, steps, idx: 0, current: None }
        }
    }

    impl Adapter for StubAdapter {
        fn next_obs(&mut self) -> Frame {
            let Some(&step) = self.steps.get(self.idx) else { return Frame::new() };
            self.idx += 1;
            self.current = Some(step);
            self.stream.obs_steps.get(&step).cloned().unwrap_or_default()
        }
        fn peek_truth(&self, _horizon: u64) -> Option<Frame> {
            None
        }
        fn has_more(&self) -> bool {
            self.idx < self.steps.len()
        }
        fn current_step(&self) -> Option<u64> {
            self.current
        }
        fn get_step_features(&self, step: u64) -> StepFeatures {
            self.stream.step_features.get(&step).cloned().unwrap_or_default()
        }
        fn meta(&self) -> &Map<String, Value> {
            &self.stream.meta
        }
        fn node_weights(&self) -> &HashMap<NodeId, f64> {
            &self.stream.node_weights
        }
    }

    struct StubReporter {
        steps: Vec<Value>,
        head_summaries: Map<String, Value>,
    }

    impl Reporter for StubReporter {
        fn record(&mut self, t: u64, signals: &Map<String, Value>, step_meta: &Map<String, Value>, pred: &Frame, _regret: Option<f64>) {
            self.steps.push(serde_json::json!({
                "t": t,
                "signals": signals,
                "step_meta": step_meta,
                "pred_len": pred.len(),
            }));
        }
        fn attach_head_summaries(&mut self, summaries: Map<String, Value>) {
            self.head_summaries = summaries;
        }
        fn finish(&mut self) -> Value {
            serde_json::json!({
                "steps": self.steps,
                "head_summaries": self.head_summaries,
            })
        }
    }

    fn two_step_stream() -> ProcessedStream {
        let mut raw = RawStream::default();
        for id in 0..3u64 {
            raw.nodes.insert(id, HashMap::new());
        }
        raw.obs_steps.insert(0, [(0, 1)].into_iter().collect());
        raw.obs_steps.insert(1, [(0, 1), (1, 2)].into_iter().collect());
        ProcessedStream {
            nodes: raw.nodes,
            obs_steps: raw.obs_steps,
            true_steps: raw.true_steps,
            meta: raw.meta,
            node_tags: Default::default(),
            node_weights: Default::default(),
            step_features: Default::default(),
        }
    }

    #[test]
    fn scenario_a_end_to_end() {
        let adapter = Box::new(StubAdapter::new(two_step_stream()));
        let signal_computer = SignalComputer::new(SignalConfig::default());
        let reporter = Box::new(StubReporter { steps: Vec::new(), head_summaries: Map::new() });
        let policy = Box::new(crate::policy::IdentityPolicy);

        let engine = Engine::new(adapter, signal_computer, Vec::new(), policy, reporter, "course-a".to_string());
        let out = engine.run();
        let steps = out["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0]["signals"]["q"], 0.08);
        assert_eq!(steps[1]["signals"]["ted"], 0.5);
    }
}
