//! Property test for the shared quality/nav_noise/stability triplet (spec
//! §8): every component stays within [0, 1] regardless of the raw weight
//! inputs it's composed from.

use proptest::prelude::*;

use axiom_preprocess::common::quality_triplet;

proptest! {
    #[test]
    fn prop_quality_triplet_stays_within_unit_interval(
        concept_focus in 0.0..50.0,
        assessment_focus in 0.0..50.0,
        noise in 0.0..50.0,
        total_w in 0.0..50.0,
    ) {
        let (quality, nav_noise, stability) =
            quality_triplet(concept_focus, assessment_focus, noise, total_w);

        prop_assert!((0.0..=1.0).contains(&quality));
        prop_assert!((0.0..=1.0).contains(&nav_noise));
        prop_assert!((0.0..=1.0).contains(&stability));
    }
}
