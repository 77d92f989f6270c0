//! Conversation-domain end-to-end run, including the `conversation_insight`
//! reporter's activation guard (it only emits steps when `run_meta.domain`
//! is `"conversation"`).

use axiom_registry::CourseConfig;
use test_fixtures::{full_core_config, write_conversation_fixture};

#[test]
fn conversation_course_runs_end_to_end_with_conversation_insight() {
    let dataset_dir = tempfile::tempdir().unwrap();
    write_conversation_fixture(dataset_dir.path());
    let report_dir = tempfile::tempdir().unwrap();

    let course = CourseConfig {
        dataset_path: dataset_dir.path().to_path_buf(),
        adapter_name: "conversation_stream".to_string(),
        reporter_name: "conversation_insight".to_string(),
        scramble_seed: None,
        report_path: report_dir.path().join("session.json"),
    };
    let report = axiom_registry::run_course(&course, &full_core_config()).unwrap();

    assert_eq!(report["domain"], "conversation");
    let steps = report["steps"].as_array().unwrap();
    assert!(!steps.is_empty(), "conversation_insight must be active for a conversation-domain run");
    assert!(report["conversation_highlights"].is_object());
}

#[test]
fn generic_insight_reporter_works_for_conversation_domain_too() {
    let dataset_dir = tempfile::tempdir().unwrap();
    write_conversation_fixture(dataset_dir.path());
    let report_dir = tempfile::tempdir().unwrap();

    let course = CourseConfig {
        dataset_path: dataset_dir.path().to_path_buf(),
        adapter_name: "conversation_stream".to_string(),
        reporter_name: "insight".to_string(),
        scramble_seed: None,
        report_path: report_dir.path().join("session.json"),
    };
    let report = axiom_registry::run_course(&course, &full_core_config()).unwrap();
    assert_eq!(report["domain"], "conversation");
    // generic `insight` has no domain guard, unlike `conversation_insight`.
    assert!(!report["steps"].as_array().unwrap().is_empty());
    assert!(report.get("conversation_highlights").is_none());
}
