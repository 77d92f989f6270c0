//! Degradation scenarios: capacity squeezed to zero, an edgeless dataset,
//! and a Monte-Carlo head under total edge dropout. Mirrors the cortex
//! crate's degradation tests — every scenario asserts the pipeline
//! completes and produces bounded output, never that it panics.

use std::fs;

use axiom_registry::CourseConfig;
use test_fixtures::full_core_config;

#[test]
fn zero_capacity_still_produces_a_well_formed_report() {
    let dataset_dir = tempfile::tempdir().unwrap();
    fs::write(dataset_dir.path().join("nodes.csv"), "id,label\n0,Derivative Rules\n1,Chain Rule\n").unwrap();
    fs::write(dataset_dir.path().join("edges_obs.csv"), "step,src,dst\n0,0,1\n1,0,1\n").unwrap();
    let report_dir = tempfile::tempdir().unwrap();

    let mut core = full_core_config();
    core.capacity.max_edges = Some(0);

    let course = CourseConfig {
        dataset_path: dataset_dir.path().to_path_buf(),
        adapter_name: "curriculum_stream".to_string(),
        reporter_name: "curriculum_insight".to_string(),
        scramble_seed: None,
        report_path: report_dir.path().join("out.json"),
    };
    let report = axiom_registry::run_course(&course, &core).unwrap();
    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    // q/ted are still bounded even though every predicted frame is empty.
    for step in steps {
        if let Some(q) = step["mean_q"].as_f64() {
            assert!((0.0..=1.0).contains(&q));
        }
    }
}

#[test]
fn edgeless_dataset_yields_empty_aggregates_without_panicking() {
    let dataset_dir = tempfile::tempdir().unwrap();
    fs::write(dataset_dir.path().join("nodes.csv"), "id,label\n0,Derivative Rules\n1,Chain Rule\n").unwrap();
    fs::write(dataset_dir.path().join("edges_obs.csv"), "step,src,dst\n").unwrap();
    let report_dir = tempfile::tempdir().unwrap();

    let course = CourseConfig {
        dataset_path: dataset_dir.path().to_path_buf(),
        adapter_name: "curriculum_stream".to_string(),
        reporter_name: "insight".to_string(),
        scramble_seed: None,
        report_path: report_dir.path().join("out.json"),
    };
    let report = axiom_registry::run_course(&course, &full_core_config()).unwrap();
    assert_eq!(report["steps"].as_array().unwrap().len(), 0);
    assert!(report["aggregates"]["avg_q"].is_null());
    assert_eq!(report["recommendations"][0], "System performing within expected ranges.");
}

#[test]
fn monte_carlo_head_survives_total_edge_dropout() {
    let dataset_dir = tempfile::tempdir().unwrap();
    fs::write(dataset_dir.path().join("nodes.csv"), "id,label\n0,Derivative Rules\n1,Chain Rule\n2,Integral Calculus\n").unwrap();
    fs::write(
        dataset_dir.path().join("edges_obs.csv"),
        "step,src,dst\n0,0,1\n1,0,1\n1,1,2\n2,0,2\n",
    )
    .unwrap();
    let report_dir = tempfile::tempdir().unwrap();

    let mut core = full_core_config();
    core.monte_carlo.edge_dropout = 1.0;
    core.monte_carlo.weight_jitter = 1.0;
    core.monte_carlo.num_samples = 4;

    let course = CourseConfig {
        dataset_path: dataset_dir.path().to_path_buf(),
        adapter_name: "curriculum_stream".to_string(),
        reporter_name: "insight".to_string(),
        scramble_seed: None,
        report_path: report_dir.path().join("out.json"),
    };
    let report = axiom_registry::run_course(&course, &core).unwrap();
    let mc = &report["head_summaries"]["monte_carlo"];
    let avg_q_std = mc["avg_q_mc_std"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&avg_q_std));
}

#[test]
fn invalid_sticky_fraction_is_rejected_before_any_file_is_touched() {
    let dataset_dir = tempfile::tempdir().unwrap();
    fs::write(dataset_dir.path().join("nodes.csv"), "id,label\n0,a\n").unwrap();
    fs::write(dataset_dir.path().join("edges_obs.csv"), "step,src,dst\n").unwrap();

    let mut core = full_core_config();
    core.capacity.sticky_fraction = 2.0;

    let course = CourseConfig {
        dataset_path: dataset_dir.path().to_path_buf(),
        adapter_name: "curriculum_stream".to_string(),
        reporter_name: "insight".to_string(),
        scramble_seed: None,
        report_path: dataset_dir.path().join("unwritten.json"),
    };
    let err = axiom_registry::run_course(&course, &core).unwrap_err();
    assert!(matches!(err, axiom_core::errors::AxiomError::InvalidConfig(_)));
    assert!(!course.report_path.exists());
}
