//! Property tests over object counts and failure sets.

use crate::common::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn failures_are_exactly_the_reopened_objects(
        count in 1usize..48,
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let opened: BTreeSet<usize> = picks.iter().map(|p| p.index(count)).collect();
        let mut fakes = FakeCollaborators::new();
        for &i in &opened {
            fakes = fakes.with_response(ObjectIndex::new(i), FakeResponse::Open);
        }
        let probe = fakes.probe();
        let dir = TempDir::new().unwrap();

        let report = harness(fakes, count).run(dir.path()).unwrap();

        prop_assert_eq!(report.outcomes.len(), count);
        prop_assert_eq!(failing(&report), opened.iter().copied().collect::<Vec<_>>());
        prop_assert_eq!(report.passed(), opened.is_empty());
        prop_assert_eq!(probe.closed(), opened.len());
        prop_assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn flush_count_tracks_configuration(passes in 1u32..6) {
        let fakes = FakeCollaborators::new();
        let probe = fakes.probe();
        let dir = TempDir::new().unwrap();
        let harness = Harness::new(
            config(4).with_flush_passes(passes),
            fakes.into_collaborators(),
        )
        .unwrap();

        harness.run(dir.path()).unwrap();

        prop_assert_eq!(
            probe.log.count(|e| *e == FakeEvent::Flush),
            passes as usize + 1
        );
    }
}
