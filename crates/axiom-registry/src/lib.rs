//! Name→factory wiring for adapters, reporters, and heads (spec §6
//! "Registry names"), plus [`build_engine`] which assembles one course's
//! full `Engine` from a dataset path and a [`CoreConfig`]. Grounded in
//! `core/registry.py` (examples/original_source): a closed string-keyed
//! lookup, matched exhaustively rather than via a runtime dict.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::{Map, Value};

use axiom_core::config::CoreConfig;
use axiom_core::errors::AxiomError;
use axiom_core::traits::{Adapter, Head, Policy, Reporter};
use axiom_engine::{CapacityPolicy, Engine, IdentityPolicy, SignalComputer, StreamAdapter};
use axiom_heads::SignalHead;
use axiom_preprocess::DomainPreprocessor;
use axiom_reporter::ReportKind;

/// Resolve an adapter registry name to the domain name its preprocessor is
/// keyed by. `zip_stream` is a bare alias for `curriculum_stream` (spec §6).
pub fn adapter_domain(name: &str) -> Result<&'static str, AxiomError> {
    match name {
        "curriculum_stream" | "zip_stream" => Ok("curriculum"),
        "conversation_stream" => Ok("conversation"),
        "conversation_brainstorm" => Ok("conversation_brainstorm"),
        "research_learning" => Ok("research_learning"),
        "creation_blueprint" => Ok("creation_blueprint"),
        other => Err(AxiomError::UnknownAdapter(other.to_string())),
    }
}

/// What one course run needs beyond the shared [`CoreConfig`]: where its
/// dataset lives, which adapter/reporter names to use, where the scrambled
/// permutation seed (if any) comes from, and where to write its report.
pub struct CourseConfig {
    pub dataset_path: PathBuf,
    pub adapter_name: String,
    pub reporter_name: String,
    pub scramble_seed: Option<u64>,
    pub report_path: PathBuf,
}

/// Build a fully-wired `Engine` for one course: load, preprocess, adapt,
/// and assemble signals/heads/policy/reporter per `core`.
pub fn build_engine(course: &CourseConfig, core: &CoreConfig) -> Result<Engine, AxiomError> {
    core.validate()?;

    let domain = adapter_domain(&course.adapter_name)?;
    let raw = axiom_loader::load(&course.dataset_path)?;
    let preprocessor = DomainPreprocessor::for_domain(domain, core)?;
    let processed = preprocessor.process(raw);

    let course_id = processed
        .meta
        .get("course_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| domain.to_string());

    let policy_name = if core.capacity.max_edges.is_some() { "capacity" } else { "identity" };
    let run_meta = build_run_meta(&course.dataset_path, &course.adapter_name, domain, policy_name, core, &processed);

    let adapter: Box<dyn Adapter> = Box::new(StreamAdapter::new_with_scramble(processed, course.scramble_seed));
    let signal_computer = SignalComputer::new(core.signal.clone());

    let heads: Vec<Box<dyn Head>> = core
        .heads
        .iter()
        .map(|name| SignalHead::for_name(name, core).map(|h| Box::new(h) as Box<dyn Head>))
        .collect::<Result<_, _>>()?;

    let policy: Box<dyn Policy> = match policy_name {
        "capacity" => Box::new(CapacityPolicy::new(core.capacity.max_edges, core.capacity.sticky_fraction, core.capacity.max_nodes)),
        _ => Box::new(IdentityPolicy),
    };

    let reporter: Box<dyn Reporter> = Box::new(ReportKind::for_name(
        &course.reporter_name,
        domain,
        course.report_path.clone(),
        run_meta,
    )?);

    Ok(Engine::new(adapter, signal_computer, heads, policy, reporter, course_id))
}

/// Build and run one course's engine, then write its report to
/// `course.report_path` atomically (spec §4.8 "written atomically").
pub fn run_course(course: &CourseConfig, core: &CoreConfig) -> Result<Value, AxiomError> {
    tracing::info!(
        dataset_path = %course.dataset_path.display(),
        adapter = %course.adapter_name,
        reporter = %course.reporter_name,
        "running course"
    );
    let engine = build_engine(course, core)?;
    let report = engine.run();
    axiom_reporter::write_atomic(&course.report_path, &report).map_err(AxiomError::from)?;
    tracing::info!(report_path = %course.report_path.display(), "course report written");
    Ok(report)
}

/// Run several courses independently, one `Engine` per course, no state
/// shared across them (spec §5 "Parallelism"). Each course's outcome is
/// reported separately rather than short-circuiting the whole batch on the
/// first failure.
pub fn run_courses_parallel(courses: &[CourseConfig], core: &CoreConfig) -> Vec<Result<Value, AxiomError>> {
    courses.par_iter().map(|course| run_course(course, core)).collect()
}

fn build_run_meta(
    dataset_path: &Path,
    adapter_name: &str,
    domain: &str,
    policy_name: &str,
    core: &CoreConfig,
    processed: &axiom_core::model::ProcessedStream,
) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("dataset_path".to_string(), Value::String(dataset_path.display().to_string()));
    meta.insert("hash".to_string(), processed.meta.get("hash").cloned().unwrap_or(Value::Null));
    meta.insert("steps".to_string(), Value::from(processed.ordered_steps().len() as u64));
    meta.insert("nodes".to_string(), Value::from(processed.nodes.len() as u64));
    meta.insert("adapter".to_string(), Value::String(adapter_name.to_string()));
    meta.insert("domain".to_string(), Value::String(domain.to_string()));
    meta.insert("policy".to_string(), Value::String(policy_name.to_string()));
    if let Some(max_edges) = core.capacity.max_edges {
        meta.insert("capacity".to_string(), Value::from(max_edges as u64));
    }
    if let Some(course_id) = processed.meta.get("course_id") {
        meta.insert("course_id".to_string(), course_id.clone());
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn zip_stream_aliases_curriculum_stream() {
        assert_eq!(adapter_domain("zip_stream").unwrap(), adapter_domain("curriculum_stream").unwrap());
    }

    #[test]
    fn unknown_adapter_name_is_rejected() {
        assert!(matches!(adapter_domain("not_an_adapter"), Err(AxiomError::UnknownAdapter(_))));
    }

    fn write_fixture(dir: &Path) {
        fs::write(dir.join("nodes.csv"), "id,label\n0,Derivative Rules\n1,Chain Rule\n").unwrap();
        fs::write(dir.join("edges_obs.csv"), "step,src,dst\n0,0,1\n").unwrap();
    }

    #[test]
    fn build_engine_runs_a_tiny_curriculum_course_end_to_end() {
        let dataset_dir = tempfile::tempdir().unwrap();
        write_fixture(dataset_dir.path());
        let report_dir = tempfile::tempdir().unwrap();

        let course = CourseConfig {
            dataset_path: dataset_dir.path().to_path_buf(),
            adapter_name: "curriculum_stream".to_string(),
            reporter_name: "insight".to_string(),
            scramble_seed: None,
            report_path: report_dir.path().join("insight_summary.json"),
        };
        let core = CoreConfig::default();
        let report = run_course(&course, &core).unwrap();
        assert_eq!(report["domain"], "curriculum");
        assert_eq!(report["steps"].as_array().unwrap().len(), 1);
        assert!(course.report_path.exists());
    }

    #[test]
    fn build_engine_rejects_unknown_adapter_before_loading() {
        let dataset_dir = tempfile::tempdir().unwrap();
        let course = CourseConfig {
            dataset_path: dataset_dir.path().to_path_buf(),
            adapter_name: "not_an_adapter".to_string(),
            reporter_name: "insight".to_string(),
            scramble_seed: None,
            report_path: PathBuf::from("out.json"),
        };
        let err = build_engine(&course, &CoreConfig::default()).unwrap_err();
        assert!(matches!(err, AxiomError::UnknownAdapter(_)));
    }

    #[test]
    fn run_courses_parallel_reports_each_course_independently() {
        let dataset_dir = tempfile::tempdir().unwrap();
        write_fixture(dataset_dir.path());
        let report_dir = tempfile::tempdir().unwrap();

        let good = CourseConfig {
            dataset_path: dataset_dir.path().to_path_buf(),
            adapter_name: "curriculum_stream".to_string(),
            reporter_name: "insight".to_string(),
            scramble_seed: None,
            report_path: report_dir.path().join("good.json"),
        };
        let bad = CourseConfig {
            dataset_path: dataset_dir.path().to_path_buf(),
            adapter_name: "not_an_adapter".to_string(),
            reporter_name: "insight".to_string(),
            scramble_seed: None,
            report_path: report_dir.path().join("bad.json"),
        };

        let results = run_courses_parallel(&[good, bad], &CoreConfig::default());
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(AxiomError::UnknownAdapter(_))));
    }
}
