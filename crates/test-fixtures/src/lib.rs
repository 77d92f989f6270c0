//! Dataset builders shared across integration tests, grounded in the
//! `make_episodic`-style helper pattern from the cortex test fixtures:
//! small functions that hand back a ready-to-use on-disk dataset rather
//! than a mocked type.

use std::fs;
use std::path::Path;

/// Write a small curriculum dataset (nodes.csv/edges_obs.csv/meta.json) into
/// `dir`. Six weeks, a mix of concept/assessment/reading labels so every
/// curriculum step-type classification bucket is reachable.
pub fn write_curriculum_fixture(dir: &Path, course_id: &str) {
    fs::write(
        dir.join("nodes.csv"),
        "id,label,kind\n\
         0,Derivative Rules,concept\n\
         1,Chain Rule,concept\n\
         2,Problem Set 1,assessment\n\
         3,Reading: Limits,reading\n\
         4,Course Syllabus,meta\n\
         5,Integration Basics,concept\n\
         6,Midterm Review,assessment\n",
    )
    .unwrap();
    fs::write(
        dir.join("edges_obs.csv"),
        "step,src,dst\n\
         0,0,1\n\
         0,1,5\n\
         1,5,2\n\
         1,2,6\n\
         2,3,0\n\
         2,3,1\n\
         3,4,0\n\
         3,4,5\n\
         4,5,1\n\
         5,2,6\n",
    )
    .unwrap();
    fs::write(
        dir.join("meta.json"),
        serde_json::json!({"course_id": course_id, "domain": "curriculum"}).to_string(),
    )
    .unwrap();
}

/// Write a small conversation dataset: a mix of question/concept/entity/
/// answer turns with adjacency and cross-reference edges.
pub fn write_conversation_fixture(dir: &Path) {
    fs::write(
        dir.join("nodes.csv"),
        "id,label,speaker\n\
         0,What is a monad in Haskell?,alice\n\
         1,A monad wraps computation context,bob\n\
         2,Can you give an example?,alice\n\
         3,A: the Maybe monad models optional values,bob\n\
         4,Haskell Functor,bob\n",
    )
    .unwrap();
    fs::write(
        dir.join("edges_obs.csv"),
        "step,src,dst\n\
         0,0,1\n\
         1,1,2\n\
         1,0,2\n\
         2,2,3\n\
         2,1,4\n",
    )
    .unwrap();
    fs::write(
        dir.join("meta.json"),
        serde_json::json!({"domain": "conversation"}).to_string(),
    )
    .unwrap();
}

/// A `CoreConfig` with every head enabled and a small, deterministic
/// Monte-Carlo seed — the shape most end-to-end tests want.
pub fn full_core_config() -> axiom_core::config::CoreConfig {
    let mut cfg = axiom_core::config::CoreConfig::default();
    cfg.signal.compute_spread = true;
    cfg.signal.compute_locality = true;
    cfg.monte_carlo.seed = Some(7);
    cfg.monte_carlo.num_samples = 8;
    cfg.heads = vec!["monte_carlo".to_string(), "forecast".to_string(), "regime_change".to_string()];
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curriculum_fixture_has_required_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_curriculum_fixture(tmp.path(), "6.001");
        assert!(tmp.path().join("nodes.csv").exists());
        assert!(tmp.path().join("edges_obs.csv").exists());
        assert!(tmp.path().join("meta.json").exists());
    }
}
