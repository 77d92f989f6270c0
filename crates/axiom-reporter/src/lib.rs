//! Reporter implementations (spec §4.8): `insight`, `curriculum_insight`,
//! `conversation_insight`, `curriculum_dynamics`. [`ReportKind`] resolves
//! the closed registry name set to a concrete reporter by exhaustive match,
//! mirroring `axiom-heads::SignalHead` and `axiom-preprocess::DomainPreprocessor`.

pub mod curriculum_dynamics;
pub mod insight;

use std::path::PathBuf;

use serde_json::{Map, Value};

use axiom_core::errors::AxiomError;
use axiom_core::model::Frame;
use axiom_core::traits::Reporter;

pub use curriculum_dynamics::CurriculumDynamicsReporter;
pub use insight::{InsightExtend, InsightReporter};

/// A fully-resolved reporter. One variant per registry name.
pub enum ReportKind {
    Insight(InsightReporter),
    CurriculumDynamics(CurriculumDynamicsReporter),
}

impl ReportKind {
    /// Resolve a registry name to a reporter. `domain` only matters for the
    /// generic `insight` name — the specialized names fix their own domain.
    pub fn for_name(
        name: &str,
        domain: &str,
        path: PathBuf,
        run_meta: Map<String, Value>,
    ) -> Result<Self, AxiomError> {
        match name {
            "insight" => Ok(Self::Insight(InsightReporter::generic(domain.to_string(), path, run_meta))),
            "curriculum_insight" => Ok(Self::Insight(InsightReporter::curriculum(path, run_meta))),
            "conversation_insight" => Ok(Self::Insight(InsightReporter::conversation(path, run_meta))),
            "curriculum_dynamics" => Ok(Self::CurriculumDynamics(CurriculumDynamicsReporter::new(path, run_meta))),
            other => Err(AxiomError::UnknownReporter(other.to_string())),
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Insight(r) => r.path(),
            Self::CurriculumDynamics(r) => r.path(),
        }
    }
}

impl Reporter for ReportKind {
    fn record(
        &mut self,
        t: u64,
        signals: &Map<String, Value>,
        step_meta: &Map<String, Value>,
        pred: &Frame,
        regret: Option<f64>,
    ) {
        match self {
            Self::Insight(r) => r.record(t, signals, step_meta, pred, regret),
            Self::CurriculumDynamics(r) => r.record(t, signals, step_meta, pred, regret),
        }
    }

    fn attach_head_summaries(&mut self, summaries: Map<String, Value>) {
        match self {
            Self::Insight(r) => r.attach_head_summaries(summaries),
            Self::CurriculumDynamics(r) => r.attach_head_summaries(summaries),
        }
    }

    fn finish(&mut self) -> Value {
        match self {
            Self::Insight(r) => r.finish(),
            Self::CurriculumDynamics(r) => r.finish(),
        }
    }
}

/// Write a reporter's final JSON document atomically: render to a sibling
/// temp file in the same directory, then rename over the target (spec §4.8
/// "written atomically").
pub fn write_atomic(path: &PathBuf, value: &Value) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, serde_json::to_vec_pretty(value)?)?;
    std::fs::rename(&tmp_path, path)?;
    tracing::debug!(path = %path.display(), "report written atomically");
    Ok(())
}
