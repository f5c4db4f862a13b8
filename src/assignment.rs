use std::collections::BTreeMap;

use crate::structure::{Slot, SlotId, Structure};

/// A partial or complete mapping from slots to words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    words: BTreeMap<SlotId, String>,
}

impl Assignment {
    pub fn new() -> Assignment {
        Assignment::default()
    }

    /// Assign `word` to the slot, returning the word it replaced, if any.
    pub fn insert(&mut self, slot_id: SlotId, word: impl Into<String>) -> Option<String> {
        self.words.insert(slot_id, word.into())
    }

    pub fn remove(&mut self, slot_id: SlotId) -> Option<String> {
        self.words.remove(&slot_id)
    }

    pub fn get(&self, slot_id: SlotId) -> Option<&str> {
        self.words.get(&slot_id).map(String::as_str)
    }

    pub fn contains(&self, slot_id: SlotId) -> bool {
        self.words.contains_key(&slot_id)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Entries in ascending slot id order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &str)> + '_ {
        self.words.iter().map(|(&slot_id, word)| (slot_id, word.as_str()))
    }

    /// Does this assign a word to every slot in the structure (and nothing else)?
    pub fn is_complete(&self, structure: &Structure) -> bool {
        self.words.len() == structure.slot_count()
            && structure.slot_ids().all(|slot_id| self.contains(slot_id))
    }

    /// The same assignment keyed by slot identity instead of id. Entries for ids the structure
    /// doesn't know are skipped.
    pub fn by_slot(&self, structure: &Structure) -> BTreeMap<Slot, String> {
        self.words
            .iter()
            .filter(|(&slot_id, _)| slot_id < structure.slot_count())
            .map(|(&slot_id, word)| (*structure.slot(slot_id), word.clone()))
            .collect()
    }
}

impl FromIterator<(SlotId, String)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (SlotId, String)>>(iter: I) -> Assignment {
        Assignment { words: iter.into_iter().collect() }
    }
}
