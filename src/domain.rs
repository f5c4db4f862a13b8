//! Per-slot candidate sets, with an explicit trail so that search can roll back exactly the
//! eliminations made while exploring a branch.

use bit_set::BitSet;
use std::fmt::{Debug, Formatter};

use crate::structure::{SlotId, Structure};
use crate::vocabulary::{Vocabulary, WordId};

/// A marker for a point in the elimination trail. Restoring it undoes every removal recorded
/// after it was taken, as long as no `commit` has happened in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    epoch: u64,
    trail_len: usize,
}

/// The live candidate words for each slot.
#[derive(Clone, PartialEq, Eq)]
pub struct DomainStore {
    /// Indexed by SlotId; each set holds WordIds from the Vocabulary.
    domains: Vec<BitSet>,

    /// Cached cardinality of each domain, since `BitSet::len` walks the whole set.
    sizes: Vec<usize>,

    /// Every removal since the last `commit`, oldest first.
    trail: Vec<(SlotId, WordId)>,

    /// Bumped by each `commit`, so snapshots from before it can be recognized.
    epoch: u64,
}

impl Debug for DomainStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainStore")
            .field("sizes", &self.sizes)
            .field("trail", &format!("({} removals)", self.trail.len()))
            .finish()
    }
}

impl DomainStore {
    /// Give every slot the vocabulary words of exactly its length. Words of any other length are
    /// never added, so node consistency holds from the start.
    pub fn initialize(structure: &Structure, vocabulary: &Vocabulary) -> DomainStore {
        let domains: Vec<BitSet> = structure
            .slots()
            .iter()
            .map(|slot| {
                let mut domain = BitSet::with_capacity(vocabulary.len());
                for &word_id in vocabulary.words_of_length(slot.length) {
                    domain.insert(word_id);
                }
                domain
            })
            .collect();
        let sizes = structure
            .slots()
            .iter()
            .map(|slot| vocabulary.words_of_length(slot.length).len())
            .collect();

        DomainStore { domains, sizes, trail: vec![], epoch: 0 }
    }

    /// Candidate word ids for the slot, in ascending order.
    pub fn domain_of(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        self.domains[slot_id].iter()
    }

    /// Candidate strings for the slot, in ascending word id order.
    pub fn words_of<'a>(&self, slot_id: SlotId, vocabulary: &'a Vocabulary) -> Vec<&'a str> {
        self.domain_of(slot_id)
            .map(|word_id| vocabulary.word(word_id).string.as_str())
            .collect()
    }

    pub fn len(&self, slot_id: SlotId) -> usize {
        self.sizes[slot_id]
    }

    pub fn is_empty(&self, slot_id: SlotId) -> bool {
        self.sizes[slot_id] == 0
    }

    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        self.domains[slot_id].contains(word_id)
    }

    pub fn slot_count(&self) -> usize {
        self.domains.len()
    }

    /// Remove every candidate for which `keep` returns false. Returns whether anything was
    /// removed.
    pub fn restrict<F>(&mut self, slot_id: SlotId, mut keep: F) -> bool
    where
        F: FnMut(WordId) -> bool,
    {
        let removed: Vec<WordId> =
            self.domains[slot_id].iter().filter(|&word_id| !keep(word_id)).collect();

        for &word_id in &removed {
            self.domains[slot_id].remove(word_id);
            self.trail.push((slot_id, word_id));
        }
        self.sizes[slot_id] -= removed.len();

        !removed.is_empty()
    }

    /// Remove a single candidate, returning whether it was present.
    pub fn remove(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        if !self.domains[slot_id].remove(word_id) {
            return false;
        }
        self.trail.push((slot_id, word_id));
        self.sizes[slot_id] -= 1;
        true
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { epoch: self.epoch, trail_len: self.trail.len() }
    }

    /// Put back every candidate removed since `snapshot` was taken. Snapshots have to be restored
    /// innermost-first. A snapshot taken before the last `commit` restores nothing.
    pub fn restore(&mut self, snapshot: Snapshot) {
        if snapshot.epoch != self.epoch {
            return;
        }
        while self.trail.len() > snapshot.trail_len {
            if let Some((slot_id, word_id)) = self.trail.pop() {
                self.domains[slot_id].insert(word_id);
                self.sizes[slot_id] += 1;
            }
        }
    }

    /// Make every removal so far permanent, dropping the trail. Outstanding snapshots become
    /// no-ops, including for removals made after the commit.
    pub fn commit(&mut self) {
        self.trail.clear();
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::DomainStore;
    use crate::structure::Structure;
    use crate::vocabulary::Vocabulary;

    fn build() -> (Structure, Vocabulary, DomainStore) {
        let structure = Structure::from_template(
            "
            ___#
            _###
            ____
            ",
        )
        .unwrap();
        let vocabulary = Vocabulary::new(["cat", "dog", "be", "to", "bird", "fish", "ox"]);
        let domains = DomainStore::initialize(&structure, &vocabulary);
        (structure, vocabulary, domains)
    }

    #[test]
    fn test_initialize_enforces_node_consistency() {
        let (structure, vocabulary, domains) = build();

        for slot_id in structure.slot_ids() {
            let length = structure.slot(slot_id).length;
            assert!(domains.len(slot_id) > 0);
            for word_id in domains.domain_of(slot_id) {
                assert_eq!(vocabulary.word(word_id).len(), length);
            }
        }
        assert_eq!(domains.words_of(0, &vocabulary), vec!["cat", "dog"]);
        assert_eq!(domains.words_of(1, &vocabulary), vec!["bird", "fish"]);
        assert_eq!(domains.words_of(2, &vocabulary), vec!["cat", "dog"]);
    }

    #[test]
    fn test_restrict_reports_removals() {
        let (_, vocabulary, mut domains) = build();

        assert!(!domains.restrict(0, |_| true));
        assert!(domains.restrict(0, |word_id| vocabulary.word(word_id).string == "dog"));
        assert_eq!(domains.words_of(0, &vocabulary), vec!["dog"]);
        assert_eq!(domains.len(0), 1);
        assert!(!domains.remove(0, 0));
        assert!(domains.remove(0, 1));
        assert!(domains.is_empty(0));
    }

    #[test]
    fn test_restore_is_exact() {
        let (_, _, mut domains) = build();
        let original = domains.clone();

        let outer = domains.snapshot();
        domains.remove(1, 4);
        let after_outer = domains.clone();

        let inner = domains.snapshot();
        domains.restrict(0, |_| false);
        domains.restrict(2, |word_id| word_id == 1);
        assert_eq!(domains.len(0), 0);

        domains.restore(inner);
        assert_eq!(domains, after_outer);

        domains.restore(outer);
        assert_eq!(domains, original);
    }

    #[test]
    fn test_commit_makes_removals_permanent() {
        let (_, _, mut domains) = build();
        let snapshot = domains.snapshot();
        domains.remove(0, 0);
        domains.commit();

        domains.restore(snapshot);
        assert!(!domains.contains(0, 0));
    }

    #[test]
    fn test_snapshot_from_before_commit_restores_nothing() {
        let (_, _, mut domains) = build();
        let stale = domains.snapshot();
        domains.commit();

        domains.remove(0, 0);
        domains.remove(1, 4);
        let after_removals = domains.clone();

        domains.restore(stale);
        assert_eq!(domains, after_removals);
        assert!(!domains.contains(0, 0));

        let fresh = domains.snapshot();
        domains.remove(2, 1);
        domains.restore(fresh);
        assert_eq!(domains, after_removals);
    }
}
