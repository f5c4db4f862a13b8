//! AC-3 over the crossing constraints. Each arc `(x, y)` asks that every candidate left for `x`
//! has some candidate for `y` with the same letter in their shared cell.

use std::collections::{HashSet, VecDeque};
use tracing::trace;

use crate::domain::DomainStore;
use crate::structure::{SlotId, Structure};
use crate::vocabulary::Vocabulary;

/// An ordered pair of crossing slots. Revising the arc prunes the first slot against the second.
pub type ConstraintArc = (SlotId, SlotId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArcConsistencySuccess {
    /// How many arcs were revised before the worklist drained.
    pub revisions: u64,
    /// How many candidates were removed in total.
    pub eliminations: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    /// The slot whose domain was emptied.
    pub slot_id: SlotId,
    pub revisions: u64,
}

pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Worklist of arcs still to be revised. An arc that's already waiting isn't queued twice.
#[derive(Debug)]
struct ConsistencyQueue {
    queue: VecDeque<ConstraintArc>,
    queued: HashSet<ConstraintArc>,
}

impl ConsistencyQueue {
    fn with_initial_queue<Items>(items: Items) -> ConsistencyQueue
    where
        Items: IntoIterator<Item = ConstraintArc>,
    {
        let mut queue = ConsistencyQueue { queue: VecDeque::new(), queued: HashSet::new() };
        for arc in items {
            queue.enqueue(arc);
        }
        queue
    }

    fn pop_front(&mut self) -> Option<ConstraintArc> {
        let arc = self.queue.pop_front()?;
        self.queued.remove(&arc);
        Some(arc)
    }

    fn enqueue(&mut self, arc: ConstraintArc) {
        if self.queued.insert(arc) {
            self.queue.push_back(arc);
        }
    }
}

/// The arcs pointing into `slot_id` from each of its neighbors. After `slot_id`'s domain shrinks,
/// these are the only arcs whose consistency can have changed.
pub fn arcs_into(structure: &Structure, slot_id: SlotId) -> Vec<ConstraintArc> {
    structure.neighbors(slot_id).iter().map(|&neighbor_id| (neighbor_id, slot_id)).collect()
}

/// Make `slot_id` arc-consistent with `other_slot_id` by removing every candidate whose letter in
/// the shared cell doesn't appear at that position in any of `other_slot_id`'s candidates.
/// Returns whether anything was removed. Slots that don't cross are trivially consistent.
pub fn revise(
    structure: &Structure,
    vocabulary: &Vocabulary,
    domains: &mut DomainStore,
    slot_id: SlotId,
    other_slot_id: SlotId,
) -> bool {
    let Some(overlap) = structure.overlap(slot_id, other_slot_id) else {
        return false;
    };

    let supported_glyphs: HashSet<char> = domains
        .domain_of(other_slot_id)
        .map(|word_id| vocabulary.word(word_id).glyph(overlap.second))
        .collect();

    domains.restrict(slot_id, |word_id| {
        supported_glyphs.contains(&vocabulary.word(word_id).glyph(overlap.first))
    })
}

/// Run AC-3 until the worklist drains or a domain empties. With `arcs` set to `None` the worklist
/// starts with every arc in the structure; otherwise it starts with just the given arcs, which is
/// how search propagates a single new choice. Either way, whenever a revision shrinks `x`, each
/// arc `(z, x)` for the other neighbors `z` of `x` is revisited.
pub fn establish_arc_consistency(
    structure: &Structure,
    vocabulary: &Vocabulary,
    domains: &mut DomainStore,
    arcs: Option<Vec<ConstraintArc>>,
) -> ArcConsistencyResult {
    let mut queue = match arcs {
        Some(arcs) => ConsistencyQueue::with_initial_queue(arcs),
        None => ConsistencyQueue::with_initial_queue(structure.arcs()),
    };

    let mut success = ArcConsistencySuccess::default();

    while let Some((slot_id, other_slot_id)) = queue.pop_front() {
        let size_before = domains.len(slot_id);
        success.revisions += 1;

        if !revise(structure, vocabulary, domains, slot_id, other_slot_id) {
            continue;
        }
        success.eliminations += (size_before - domains.len(slot_id)) as u64;

        if domains.is_empty(slot_id) {
            trace!(slot_id, other_slot_id, "arc revision emptied a domain");
            return Err(ArcConsistencyFailure { slot_id, revisions: success.revisions });
        }

        for &neighbor_id in structure.neighbors(slot_id) {
            if neighbor_id != other_slot_id {
                queue.enqueue((neighbor_id, slot_id));
            }
        }
    }

    Ok(success)
}

/// Check (without modifying anything) whether every candidate of every slot has support in each
/// crossing slot.
pub fn is_arc_consistent(
    structure: &Structure,
    vocabulary: &Vocabulary,
    domains: &DomainStore,
) -> bool {
    structure.arcs().into_iter().all(|(slot_id, other_slot_id)| {
        let Some(overlap) = structure.overlap(slot_id, other_slot_id) else {
            return true;
        };
        domains.domain_of(slot_id).all(|word_id| {
            let glyph = vocabulary.word(word_id).glyph(overlap.first);
            domains
                .domain_of(other_slot_id)
                .any(|other_word_id| vocabulary.word(other_word_id).glyph(overlap.second) == glyph)
        })
    })
}
