//! Property-based tests for propagation and search.
//!
//! Small grids and word lists over a three-letter alphabet keep every instance cheap enough to
//! check against brute force, while still producing plenty of both solvable and unsolvable cases.

use crossfill::arc_consistency::{establish_arc_consistency, is_arc_consistent};
use crossfill::{
    find_fill, find_fill_parallel, validate_assignment, validate_extension, Assignment,
    DomainStore, FillFailure, FillOptions, Propagation, SlotId, Solver, Structure, Vocabulary,
};
use proptest::prelude::*;

// ============================================================================
// Helper functions
// ============================================================================

const TEMPLATES: &[&str] = &[
    "___",
    "___\n###\n___",
    "___\n_##\n_##",
    "__\n__",
    "___\n_#_\n___",
    "____\n_##_",
    "___\n__#",
];

fn instance() -> impl Strategy<Value = (Structure, Vocabulary)> {
    (
        prop::sample::select(TEMPLATES.to_vec()),
        prop::collection::vec("[abc]{2,4}", 0..10),
    )
        .prop_map(|(template, words)| {
            let structure = Structure::from_template(template).expect("templates are well-formed");
            (structure, Vocabulary::new(words))
        })
}

/// Does any complete, valid assignment exist? Checked by plain enumeration.
fn brute_force_exists(structure: &Structure, vocabulary: &Vocabulary) -> bool {
    fn extend(
        structure: &Structure,
        vocabulary: &Vocabulary,
        assignment: &mut Assignment,
        slot_id: SlotId,
    ) -> bool {
        if slot_id == structure.slot_count() {
            return validate_assignment(structure, assignment).is_ok();
        }
        for &word_id in vocabulary.words_of_length(structure.slot(slot_id).length) {
            let word = vocabulary.word(word_id).string.as_str();
            if validate_extension(structure, assignment, slot_id, word).is_ok() {
                assignment.insert(slot_id, word);
                if extend(structure, vocabulary, assignment, slot_id + 1) {
                    return true;
                }
                assignment.remove(slot_id);
            }
        }
        false
    }

    extend(structure, vocabulary, &mut Assignment::new(), 0)
}

// ============================================================================
// Propagation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_initial_domains_are_node_consistent((structure, vocabulary) in instance()) {
        let domains = DomainStore::initialize(&structure, &vocabulary);

        for slot_id in structure.slot_ids() {
            let length = structure.slot(slot_id).length;
            prop_assert_eq!(domains.len(slot_id), vocabulary.words_of_length(length).len());
            for word_id in domains.domain_of(slot_id) {
                prop_assert_eq!(vocabulary.word(word_id).len(), length);
            }
        }
    }

    #[test]
    fn prop_arc_consistency_reaches_an_idempotent_fixed_point(
        (structure, vocabulary) in instance()
    ) {
        let mut domains = DomainStore::initialize(&structure, &vocabulary);

        if establish_arc_consistency(&structure, &vocabulary, &mut domains, None).is_ok() {
            prop_assert!(is_arc_consistent(&structure, &vocabulary, &domains));

            let settled = domains.clone();
            let again = establish_arc_consistency(&structure, &vocabulary, &mut domains, None);
            prop_assert_eq!(again.map(|success| success.eliminations), Ok(0));
            prop_assert_eq!(domains, settled);
        }
    }

    #[test]
    fn prop_arc_consistency_never_removes_a_solution_word((structure, vocabulary) in instance()) {
        let mut domains = DomainStore::initialize(&structure, &vocabulary);
        let propagated = establish_arc_consistency(&structure, &vocabulary, &mut domains, None);

        if let Ok(success) = find_fill(&structure, &vocabulary, FillOptions::default()) {
            prop_assert!(propagated.is_ok());
            for (slot_id, word) in success.assignment.iter() {
                let word_id = vocabulary.word_id(word).expect("solution words come from the vocabulary");
                prop_assert!(domains.contains(slot_id, word_id));
            }
        }
    }
}

// ============================================================================
// Search
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_fill_is_sound_and_complete((structure, vocabulary) in instance()) {
        let expected = brute_force_exists(&structure, &vocabulary);

        match find_fill(&structure, &vocabulary, FillOptions::default()) {
            Ok(success) => {
                prop_assert!(expected);
                prop_assert!(success.assignment.is_complete(&structure));
                prop_assert_eq!(validate_assignment(&structure, &success.assignment), Ok(()));
            }
            Err(failure) => {
                prop_assert!(!expected);
                prop_assert_eq!(failure, FillFailure::NoSolution);
            }
        }
    }

    #[test]
    fn prop_search_variants_agree_on_solvability((structure, vocabulary) in instance()) {
        let expected = brute_force_exists(&structure, &vocabulary);

        let full = FillOptions::default()
            .with_propagation(Propagation::Full)
            .with_forward_check_uniqueness(false);
        prop_assert_eq!(find_fill(&structure, &vocabulary, full).is_ok(), expected);

        let parallel = find_fill_parallel(&structure, &vocabulary, FillOptions::default());
        prop_assert_eq!(parallel.is_ok(), expected);
        if let Ok(success) = parallel {
            prop_assert_eq!(validate_assignment(&structure, &success.assignment), Ok(()));
        }
    }

    #[test]
    fn prop_abandoned_candidates_are_rolled_back((structure, vocabulary) in instance()) {
        let mut solver = Solver::new(&structure, &vocabulary);
        if solver.establish_initial_consistency().is_err() {
            return Ok(());
        }
        let Some(slot_id) = solver.select_unassigned_slot() else {
            return Ok(());
        };

        for word_id in solver.order_domain_values(slot_id) {
            let domains_before = solver.domains().clone();
            let assignment_before = solver.assignment().clone();

            if solver.try_candidate(slot_id, word_id) == Ok(true) {
                break;
            }
            prop_assert_eq!(solver.domains(), &domains_before);
            prop_assert_eq!(solver.assignment(), &assignment_before);
        }
    }
}
