//! This module implements grid filling as a depth-first backtracking search that maintains arc
//! consistency. Variables are chosen by minimum remaining values (ties going to the slot with the
//! most crossings, then to the lowest slot in `Slot` order), and values are tried
//! least-constraining first. Every narrowing made for a tentative choice is recorded on the
//! domain store's trail and rolled back before the next candidate is tried.

use instant::{Duration, Instant};
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::arc_consistency::{arcs_into, establish_arc_consistency, ConstraintArc};
use crate::assignment::Assignment;
use crate::config::{FillOptions, Propagation};
use crate::domain::DomainStore;
use crate::structure::{Overlap, SlotId, Structure};
use crate::validator::{validate_assignment, validate_extension};
use crate::vocabulary::{Vocabulary, WordId};

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub states: u64,
    pub backtracks: u64,
    pub revisions: u64,
    pub duration: Duration,
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub assignment: Assignment,
}

/// Why a fill attempt came back without an assignment. Neither case is an error in the input:
/// `NoSolution` is a definite answer, and `BudgetExhausted` means the search stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FillFailure {
    #[error("no solution")]
    NoSolution,
    #[error("search budget exhausted before a solution was found")]
    BudgetExhausted,
}

/// The live state of a single search: the domains, the partial assignment, and bookkeeping.
#[derive(Debug)]
pub struct Solver<'a> {
    structure: &'a Structure,
    vocabulary: &'a Vocabulary,
    options: FillOptions,
    domains: DomainStore,
    assignment: Assignment,
    statistics: Statistics,
    start: Instant,

    /// Present when this solver is one branch of a parallel search.
    shared: Option<&'a SharedProgress>,
}

/// State shared by the branches of a parallel search.
#[derive(Debug, Default)]
struct SharedProgress {
    /// Set once any branch has found a solution.
    finished: AtomicBool,

    /// States visited across every branch, so `max_states` bounds the whole search.
    states: AtomicU64,
}

impl<'a> Solver<'a> {
    pub fn new(structure: &'a Structure, vocabulary: &'a Vocabulary) -> Solver<'a> {
        Solver::with_options(structure, vocabulary, FillOptions::default())
    }

    /// Set up a solver whose domains are already node-consistent: each slot starts with only the
    /// words of its own length.
    pub fn with_options(
        structure: &'a Structure,
        vocabulary: &'a Vocabulary,
        options: FillOptions,
    ) -> Solver<'a> {
        Solver {
            structure,
            vocabulary,
            options,
            domains: DomainStore::initialize(structure, vocabulary),
            assignment: Assignment::new(),
            statistics: Statistics::default(),
            start: Instant::now(),
            shared: None,
        }
    }

    pub fn domains(&self) -> &DomainStore {
        &self.domains
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Run AC-3 over the current domains, from every arc or from the given seed arcs. Returns
    /// false if some domain was emptied.
    pub fn ac3(&mut self, arcs: Option<Vec<ConstraintArc>>) -> bool {
        match establish_arc_consistency(self.structure, self.vocabulary, &mut self.domains, arcs) {
            Ok(success) => {
                self.statistics.revisions += success.revisions;
                true
            }
            Err(failure) => {
                self.statistics.revisions += failure.revisions;
                false
            }
        }
    }

    /// The pre-search pass: fail if node consistency already left some slot without candidates,
    /// otherwise run AC-3 to a fixed point and make its eliminations permanent.
    pub fn establish_initial_consistency(&mut self) -> Result<(), FillFailure> {
        if let Some(slot_id) = self.structure.slot_ids().find(|&id| self.domains.is_empty(id)) {
            debug!(slot_id, "no words of the required length");
            return Err(FillFailure::NoSolution);
        }

        if !self.ac3(None) {
            debug!(revisions = self.statistics.revisions, "initial arc consistency failed");
            return Err(FillFailure::NoSolution);
        }
        self.domains.commit();

        debug!(
            revisions = self.statistics.revisions,
            "established initial arc consistency"
        );
        Ok(())
    }

    /// Choose the next slot to fill: fewest remaining candidates, then most crossings, then the
    /// lowest slot by (row, column, direction, length).
    pub fn select_unassigned_slot(&self) -> Option<SlotId> {
        self.structure
            .slot_ids()
            .filter(|&slot_id| !self.assignment.contains(slot_id))
            .min_by_key(|&slot_id| {
                (
                    self.domains.len(slot_id),
                    Reverse(self.structure.degree(slot_id)),
                    *self.structure.slot(slot_id),
                )
            })
    }

    /// Order the slot's candidates by how many options each would rule out in the unfilled
    /// crossing slots, fewest first. Equal counts keep ascending word id order.
    pub fn order_domain_values(&self, slot_id: SlotId) -> Vec<WordId> {
        // For each open crossing, count how many of its candidates put each glyph in the shared
        // cell, so that a candidate's cost is just a lookup per crossing.
        let crossings: Vec<(Overlap, usize, HashMap<char, usize>)> = self
            .structure
            .neighbors(slot_id)
            .iter()
            .filter(|&&neighbor_id| !self.assignment.contains(neighbor_id))
            .filter_map(|&neighbor_id| {
                let overlap = self.structure.overlap(slot_id, neighbor_id)?;
                let mut glyph_counts: HashMap<char, usize> = HashMap::new();
                for word_id in self.domains.domain_of(neighbor_id) {
                    *glyph_counts
                        .entry(self.vocabulary.word(word_id).glyph(overlap.second))
                        .or_insert(0) += 1;
                }
                Some((overlap, self.domains.len(neighbor_id), glyph_counts))
            })
            .collect();

        let mut candidates: Vec<(usize, WordId)> = self
            .domains
            .domain_of(slot_id)
            .map(|word_id| {
                let word = self.vocabulary.word(word_id);
                let ruled_out: usize = crossings
                    .iter()
                    .map(|(overlap, option_count, glyph_counts)| {
                        let compatible =
                            glyph_counts.get(&word.glyph(overlap.first)).copied().unwrap_or(0);
                        option_count - compatible
                    })
                    .sum();
                (ruled_out, word_id)
            })
            .collect();

        candidates.sort_by_key(|&(ruled_out, _)| ruled_out);
        candidates.into_iter().map(|(_, word_id)| word_id).collect()
    }

    /// Count a new search state, or fail with `BudgetExhausted` if a sibling has finished or a
    /// configured limit has passed.
    fn enter_state(&mut self) -> Result<(), FillFailure> {
        if let Some(shared) = self.shared {
            if shared.finished.load(Ordering::Relaxed) {
                return Err(FillFailure::BudgetExhausted);
            }
        }
        if let Some(time_limit) = self.options.time_limit {
            if self.start.elapsed() >= time_limit {
                debug!(?time_limit, "time budget exhausted");
                return Err(FillFailure::BudgetExhausted);
            }
        }

        // Branches claim states from the shared counter before checking it, so that two of them
        // can't both take the last one.
        let visited = match self.shared {
            Some(shared) => shared.states.fetch_add(1, Ordering::Relaxed),
            None => self.statistics.states,
        };
        if let Some(max_states) = self.options.max_states {
            if visited >= max_states {
                debug!(max_states, "state budget exhausted");
                return Err(FillFailure::BudgetExhausted);
            }
        }

        self.statistics.states += 1;
        Ok(())
    }

    /// Narrow the domains to reflect `word_id` being placed in `slot_id`. Returns false if that
    /// leaves some slot without candidates. The caller is responsible for restoring a snapshot
    /// either way.
    fn propagate_choice(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        self.domains.restrict(slot_id, |candidate| candidate == word_id);
        let mut seed = arcs_into(self.structure, slot_id);

        if self.options.forward_check_uniqueness {
            for other_slot_id in self.structure.slot_ids() {
                if other_slot_id == slot_id || self.assignment.contains(other_slot_id) {
                    continue;
                }
                if self.domains.remove(other_slot_id, word_id) {
                    if self.domains.is_empty(other_slot_id) {
                        return false;
                    }
                    seed.extend(arcs_into(self.structure, other_slot_id));
                }
            }
        }

        match self.options.propagation {
            Propagation::Incremental => self.ac3(Some(seed)),
            Propagation::Full => self.ac3(None),
        }
    }

    /// Tentatively place `word_id` in `slot_id` and search below it. On failure, the domains and
    /// assignment are left exactly as they were before the call.
    pub fn try_candidate(&mut self, slot_id: SlotId, word_id: WordId) -> Result<bool, FillFailure> {
        let vocabulary = self.vocabulary;
        let word = &vocabulary.word(word_id).string;

        if let Err(violation) = validate_extension(self.structure, &self.assignment, slot_id, word)
        {
            trace!(slot_id, word = word.as_str(), %violation, "rejected candidate");
            return Ok(false);
        }

        let snapshot = self.domains.snapshot();
        self.assignment.insert(slot_id, word.as_str());

        let outcome = if self.propagate_choice(slot_id, word_id) {
            self.backtrack()
        } else {
            Ok(false)
        };

        if !matches!(outcome, Ok(true)) {
            self.domains.restore(snapshot);
            self.assignment.remove(slot_id);
        }
        outcome
    }

    /// Extend the current assignment to a complete one if possible. `Ok(true)` leaves the
    /// solution in place; `Ok(false)` means this subtree has no solution and nothing was changed.
    pub fn backtrack(&mut self) -> Result<bool, FillFailure> {
        if self.assignment.is_complete(self.structure) {
            // The incremental checks should make this unreachable, but a complete assignment is
            // never reported without a full pass.
            return match validate_assignment(self.structure, &self.assignment) {
                Ok(()) => Ok(true),
                Err(violation) => {
                    warn!(%violation, "complete assignment failed validation");
                    Ok(false)
                }
            };
        }

        self.enter_state()?;

        let Some(slot_id) = self.select_unassigned_slot() else {
            return Ok(false);
        };
        trace!(
            slot_id,
            remaining_options = self.domains.len(slot_id),
            depth = self.assignment.len(),
            "selected slot"
        );

        for word_id in self.order_domain_values(slot_id) {
            if self.try_candidate(slot_id, word_id)? {
                return Ok(true);
            }
            self.statistics.backtracks += 1;
        }

        trace!(slot_id, "exhausted candidates, backtracking");
        Ok(false)
    }

    fn into_success(mut self) -> FillSuccess {
        self.statistics.duration = self.start.elapsed();
        FillSuccess { statistics: self.statistics, assignment: self.assignment }
    }

    /// Establish consistency, then search from the empty assignment.
    pub fn solve(mut self) -> Result<FillSuccess, FillFailure> {
        debug!(
            slots = self.structure.slot_count(),
            words = self.vocabulary.len(),
            "starting fill"
        );

        self.establish_initial_consistency()?;

        if self.backtrack()? {
            let success = self.into_success();
            debug!(statistics = ?success.statistics, "found fill");
            Ok(success)
        } else {
            debug!(statistics = ?self.statistics, "search exhausted without a fill");
            Err(FillFailure::NoSolution)
        }
    }

    /// A copy of this solver's state that can explore a branch independently.
    fn fork<'b>(&'b self, shared: &'b SharedProgress) -> Solver<'b> {
        Solver {
            structure: self.structure,
            vocabulary: self.vocabulary,
            options: self.options.clone(),
            domains: self.domains.clone(),
            assignment: self.assignment.clone(),
            statistics: Statistics::default(),
            start: self.start,
            shared: Some(shared),
        }
    }
}

/// Search for a valid fill for the given grid.
pub fn find_fill(
    structure: &Structure,
    vocabulary: &Vocabulary,
    options: FillOptions,
) -> Result<FillSuccess, FillFailure> {
    Solver::with_options(structure, vocabulary, options).solve()
}

/// Search for a valid fill, exploring the candidates for the first slot in parallel. Each branch
/// works on its own copy of the domains; the first branch to succeed wins and the others stop at
/// their next budget check. `max_states` bounds the states visited by all branches together. The
/// returned statistics cover the winning branch only (plus the initial propagation), but the
/// duration is the overall wall-clock time.
pub fn find_fill_parallel(
    structure: &Structure,
    vocabulary: &Vocabulary,
    options: FillOptions,
) -> Result<FillSuccess, FillFailure> {
    let mut root = Solver::with_options(structure, vocabulary, options);
    root.establish_initial_consistency()?;

    let Some(slot_id) = root.select_unassigned_slot() else {
        return Ok(root.into_success());
    };
    root.enter_state()?;
    let candidates = root.order_domain_values(slot_id);
    debug!(slot_id, branches = candidates.len(), "starting parallel fill");

    let shared = SharedProgress {
        finished: AtomicBool::new(false),
        states: AtomicU64::new(root.statistics.states),
    };
    let budget_exhausted = AtomicBool::new(false);

    let winner = candidates.par_iter().find_map_any(|&word_id| {
        let mut branch = root.fork(&shared);
        match branch.try_candidate(slot_id, word_id) {
            Ok(true) => {
                shared.finished.store(true, Ordering::Relaxed);
                Some((branch.assignment, branch.statistics))
            }
            Ok(false) => None,
            Err(_) => {
                budget_exhausted.store(true, Ordering::Relaxed);
                None
            }
        }
    });

    match winner {
        Some((assignment, branch_statistics)) => {
            let statistics = Statistics {
                states: root.statistics.states + branch_statistics.states,
                backtracks: branch_statistics.backtracks,
                revisions: root.statistics.revisions + branch_statistics.revisions,
                duration: root.start.elapsed(),
            };
            debug!(?statistics, "found fill");
            Ok(FillSuccess { statistics, assignment })
        }
        None if budget_exhausted.load(Ordering::Relaxed) => Err(FillFailure::BudgetExhausted),
        None => Err(FillFailure::NoSolution),
    }
}

#[cfg(test)]
mod tests {
    use crate::backtracking_search::{find_fill, find_fill_parallel, FillFailure, Solver};
    use crate::config::{FillOptions, Propagation};
    use crate::structure::{Direction, Overlap, Slot, Structure};
    use crate::validator::validate_assignment;
    use crate::vocabulary::Vocabulary;
    use instant::Duration;

    /// A across at row 0, B down from A's middle cell, so A[1] == B[0].
    fn crossing_pair() -> Structure {
        let a = Slot::new(0, 0, Direction::Across, 3);
        let b = Slot::new(0, 1, Direction::Down, 3);
        Structure::new(
            vec![vec![true, true, true], vec![false, true, false], vec![false, true, false]],
            vec![a, b],
            vec![(a, b, Overlap::new(1, 0))],
        )
        .unwrap()
    }

    /// Fills a 3x3 square as rows sap/ore/dew and columns sod/are/pew (or the transpose).
    fn square_vocabulary() -> Vocabulary {
        Vocabulary::new(["cat", "sap", "dog", "ore", "dew", "zzz", "sod", "are", "pew", "ape"])
    }

    #[test]
    fn test_find_fill_for_single_slot() {
        let structure = Structure::from_template("___").unwrap();
        let vocabulary = Vocabulary::new(["cat", "dog"]);

        let result = find_fill(&structure, &vocabulary, FillOptions::default())
            .expect("Failed to find a fill");

        let word = result.assignment.get(0).unwrap();
        assert!(word == "cat" || word == "dog");
        assert!(result.assignment.is_complete(&structure));
    }

    #[test]
    fn test_find_fill_for_crossing_pair() {
        let structure = crossing_pair();
        let vocabulary = Vocabulary::new(["cat", "art"]);

        let result = find_fill(&structure, &vocabulary, FillOptions::default())
            .expect("Failed to find a fill");

        assert_eq!(result.assignment.get(0), Some("cat"));
        assert_eq!(result.assignment.get(1), Some("art"));
    }

    #[test]
    fn test_find_fill_for_3x3_square() {
        let structure = Structure::from_template("___\n___\n___").unwrap();
        let vocabulary = square_vocabulary();

        let result = find_fill(&structure, &vocabulary, FillOptions::default())
            .expect("Failed to find a fill");

        assert!(result.assignment.is_complete(&structure));
        assert_eq!(validate_assignment(&structure, &result.assignment), Ok(()));
        assert!(result.statistics.states >= 6);
    }

    #[test]
    fn test_find_fill_with_full_propagation() {
        let structure = Structure::from_template("___\n___\n___").unwrap();
        let vocabulary = square_vocabulary();
        let options = FillOptions::default()
            .with_propagation(Propagation::Full)
            .with_forward_check_uniqueness(false);

        let result = find_fill(&structure, &vocabulary, options).expect("Failed to find a fill");

        assert_eq!(validate_assignment(&structure, &result.assignment), Ok(()));
        assert!(result.assignment.is_complete(&structure));
    }

    #[test]
    fn test_missing_length_fails_without_search() {
        let structure = Structure::from_template("____\n#___").unwrap();
        let vocabulary = Vocabulary::new(["cat", "dog", "ox"]);

        let mut solver = Solver::new(&structure, &vocabulary);
        assert_eq!(solver.establish_initial_consistency(), Err(FillFailure::NoSolution));
        assert_eq!(solver.statistics().states, 0);

        assert_eq!(
            find_fill(&structure, &vocabulary, FillOptions::default()).unwrap_err(),
            FillFailure::NoSolution
        );
    }

    #[test]
    fn test_arc_consistency_failure_fails_without_search() {
        // Both slots have candidates, but no letter lines up at the crossing.
        let structure = crossing_pair();
        let vocabulary = Vocabulary::new(["abc", "xyz"]);

        let mut solver = Solver::new(&structure, &vocabulary);
        assert_eq!(solver.domains().len(0), 2);
        assert_eq!(solver.domains().len(1), 2);

        assert_eq!(solver.establish_initial_consistency(), Err(FillFailure::NoSolution));
        assert!(solver.statistics().revisions > 0);
        assert_eq!(solver.statistics().states, 0);
        assert_eq!(solver.statistics().backtracks, 0);
        assert!(solver.assignment().is_empty());

        assert_eq!(
            find_fill(&structure, &vocabulary, FillOptions::default()).unwrap_err(),
            FillFailure::NoSolution
        );
    }

    #[test]
    fn test_uniqueness_without_crossings() {
        let structure = Structure::from_template("___\n###\n___").unwrap();
        let vocabulary = Vocabulary::new(["cat", "dog"]);

        for options in [
            FillOptions::default(),
            FillOptions::default().with_forward_check_uniqueness(false),
        ] {
            let result = find_fill(&structure, &vocabulary, options).expect("Failed to find a fill");
            assert_ne!(result.assignment.get(0), result.assignment.get(1));
        }
    }

    #[test]
    fn test_fill_fails_gracefully() {
        let structure = Structure::from_template("___\n###\n___").unwrap();
        let vocabulary = Vocabulary::new(["cat"]);

        let mut solver = Solver::new(&structure, &vocabulary);
        solver.establish_initial_consistency().unwrap();
        assert_eq!(solver.backtrack(), Ok(false));
        assert!(solver.assignment().is_empty());

        find_fill(&structure, &vocabulary, FillOptions::default())
            .expect_err("Found an impossible fill??");
    }

    #[test]
    fn test_select_unassigned_slot_uses_mrv_then_degree() {
        // Slots: 0 = 3-across (1 crossing), 1 = 4-across (2), 2 = 4-down (2), 3 = 3-down (1).
        let structure = Structure::from_template(
            "
            #___#
            #_##_
            #_##_
            #____
            ",
        )
        .unwrap();
        let vocabulary = Vocabulary::new(["cat", "dog", "bird", "fish"]);
        let mut solver = Solver::new(&structure, &vocabulary);

        // Every domain has two words; slots 1 and 2 tie on degree, and slot 2 starts higher up.
        assert_eq!(solver.select_unassigned_slot(), Some(2));

        solver.domains.remove(0, 0);
        assert_eq!(solver.select_unassigned_slot(), Some(0));

        solver.assignment.insert(0, "dog");
        assert_eq!(solver.select_unassigned_slot(), Some(2));
    }

    #[test]
    fn test_order_domain_values_least_constraining_first() {
        let structure = crossing_pair();
        let vocabulary = Vocabulary::new(["cat", "dog", "ant", "axe", "nab"]);
        let solver = Solver::new(&structure, &vocabulary);

        let ordered: Vec<&str> = solver
            .order_domain_values(0)
            .into_iter()
            .map(|word_id| vocabulary.word(word_id).string.as_str())
            .collect();

        assert_eq!(ordered, vec!["cat", "nab", "ant", "dog", "axe"]);
    }

    #[test]
    fn test_failed_candidate_is_rolled_back() {
        let structure = Structure::from_template("___\n###\n___").unwrap();
        let vocabulary = Vocabulary::new(["cat"]);
        let mut solver = Solver::new(&structure, &vocabulary);
        solver.establish_initial_consistency().unwrap();

        let domains_before = solver.domains().clone();
        let assignment_before = solver.assignment().clone();

        assert_eq!(solver.try_candidate(0, 0), Ok(false));
        assert_eq!(solver.domains(), &domains_before);
        assert_eq!(solver.assignment(), &assignment_before);
    }

    #[test]
    fn test_state_budget_is_enforced() {
        let structure = Structure::from_template("___\n###\n___").unwrap();
        let vocabulary = Vocabulary::new(["cat", "dog", "cow"]);

        let result = find_fill(&structure, &vocabulary, FillOptions::default().with_max_states(1));

        assert_eq!(result.unwrap_err(), FillFailure::BudgetExhausted);
    }

    #[test]
    fn test_time_budget_is_enforced() {
        let structure = Structure::from_template("___\n###\n___").unwrap();
        let vocabulary = Vocabulary::new(["cat", "dog", "cow"]);
        let options = FillOptions::default().with_time_limit(Duration::ZERO);

        assert_eq!(
            find_fill(&structure, &vocabulary, options.clone()).unwrap_err(),
            FillFailure::BudgetExhausted
        );
        assert_eq!(
            find_fill_parallel(&structure, &vocabulary, options).unwrap_err(),
            FillFailure::BudgetExhausted
        );
    }

    #[test]
    fn test_state_budget_is_shared_across_parallel_branches() {
        // Three separate slots but only two words: each top-level branch dies one state in, so
        // the whole search needs three states to prove there's no fill.
        let structure = Structure::from_template("___\n###\n___\n###\n___").unwrap();
        let vocabulary = Vocabulary::new(["cat", "dog"]);

        assert_eq!(
            find_fill_parallel(&structure, &vocabulary, FillOptions::default()).unwrap_err(),
            FillFailure::NoSolution
        );
        assert_eq!(
            find_fill_parallel(&structure, &vocabulary, FillOptions::default().with_max_states(3))
                .unwrap_err(),
            FillFailure::NoSolution
        );
        assert_eq!(
            find_fill_parallel(&structure, &vocabulary, FillOptions::default().with_max_states(2))
                .unwrap_err(),
            FillFailure::BudgetExhausted
        );
        assert_eq!(
            find_fill(&structure, &vocabulary, FillOptions::default().with_max_states(2))
                .unwrap_err(),
            FillFailure::BudgetExhausted
        );
    }

    #[test]
    fn test_find_fill_parallel() {
        let structure = Structure::from_template("___\n___\n___").unwrap();
        let vocabulary = square_vocabulary();

        let result = find_fill_parallel(&structure, &vocabulary, FillOptions::default())
            .expect("Failed to find a fill");

        assert!(result.assignment.is_complete(&structure));
        assert_eq!(validate_assignment(&structure, &result.assignment), Ok(()));

        let structure = Structure::from_template("___\n###\n___").unwrap();
        let vocabulary = Vocabulary::new(["cat"]);
        assert_eq!(
            find_fill_parallel(&structure, &vocabulary, FillOptions::default()).unwrap_err(),
            FillFailure::NoSolution
        );
    }
}
