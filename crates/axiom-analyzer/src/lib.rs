//! Cross-course `comparison.json` aggregation (spec §6 "Report output").
//!
//! Each course's own reporter already wrote a per-course JSON document
//! (spec §4.8); this crate reads a directory of those documents back and
//! enumerates `{course_id, avg_q, avg_ted, avg_stability, avg_spread,
//! avg_continuity, avg_ted_trusted}` per course, pulling the averages from
//! whichever reporter shape produced them (`aggregates` for the `insight`
//! family, `dynamics` for `curriculum_dynamics`).

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use axiom_core::errors::AxiomError;

const COMPARISON_FILE: &str = "comparison.json";

/// Read every `*.json` report in `dir`, skipping `comparison.json` itself.
pub fn scan_directory(dir: &Path) -> Result<Vec<Value>, AxiomError> {
    let mut reports = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some(COMPARISON_FILE) {
            continue;
        }
        let text = fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&text).map_err(|e| AxiomError::MalformedJson {
            file: path.display().to_string(),
            source: e,
        })?;
        reports.push(value);
    }
    Ok(reports)
}

fn course_id_of(report: &Value) -> String {
    report["run_meta"]["course_id"]
        .as_str()
        .or_else(|| report["domain"].as_str())
        .unwrap_or("unknown")
        .to_string()
}

fn avg_field(report: &Value, key: &str) -> Value {
    report["aggregates"].get(key).cloned().or_else(|| report["dynamics"].get(key).cloned()).unwrap_or(Value::Null)
}

fn highlight_field(report: &Value, key: &str) -> Value {
    report["curriculum_highlights"].get(key).cloned().unwrap_or(Value::Null)
}

/// One course's row in `comparison.json`.
pub fn compare_one(report: &Value) -> Value {
    serde_json::json!({
        "course_id": course_id_of(report),
        "avg_q": avg_field(report, "avg_q"),
        "avg_ted": avg_field(report, "avg_ted"),
        "avg_stability": avg_field(report, "avg_stability"),
        "avg_spread": avg_field(report, "avg_spread"),
        "avg_continuity": highlight_field(report, "avg_continuity"),
        "avg_ted_trusted": highlight_field(report, "avg_ted_trusted"),
    })
}

/// Build the full `comparison.json` document from a set of per-course
/// reports, sorted by `course_id` for a stable diff across runs.
pub fn build_comparison(reports: &[Value]) -> Value {
    let mut rows: Vec<Value> = reports.iter().map(compare_one).collect();
    rows.sort_by(|a, b| a["course_id"].as_str().cmp(&b["course_id"].as_str()));

    let mut out = Map::new();
    out.insert("courses".to_string(), Value::Array(rows));
    Value::Object(out)
}

/// Scan `dir` for per-course reports, build the comparison document, and
/// write it to `dir/comparison.json` atomically.
pub fn write_comparison(dir: &Path) -> Result<Value, AxiomError> {
    let reports = scan_directory(dir)?;
    tracing::info!(dir = %dir.display(), courses = reports.len(), "comparing courses");
    let comparison = build_comparison(&reports);
    axiom_reporter::write_atomic(&dir.join(COMPARISON_FILE), &comparison).map_err(AxiomError::from)?;
    Ok(comparison)
}
