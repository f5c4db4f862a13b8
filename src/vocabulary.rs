//! The candidate words available to the solver.

use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};

use crate::MAX_SLOT_LENGTH;

/// An identifier for a given word, based on its index in the Vocabulary's `words` field.
pub type WordId = usize;

/// A struct representing a word that can be chosen for a given slot. The word's characters are
/// kept alongside the string so that crossing checks can index by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyph(&self, cell_idx: usize) -> char {
        self.glyphs[cell_idx]
    }
}

/// A deduplicated word list, bucketed by length. Words are used exactly as given: no case
/// normalization happens here, so callers need to supply words in the same convention they
/// expect to see in the grid.
#[derive(Clone, Default)]
pub struct Vocabulary {
    words: Vec<Word>,
    word_ids_by_length: HashMap<usize, Vec<WordId>>,
}

impl Debug for Vocabulary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vocabulary")
            .field("words", &format!("({} entries)", self.words.len()))
            .finish()
    }
}

impl Vocabulary {
    /// Build a vocabulary from any sequence of strings. Duplicates keep their first position and
    /// empty strings are dropped.
    pub fn new<I, S>(words: I) -> Vocabulary
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = Vocabulary::default();
        let mut seen: HashSet<String> = HashSet::new();

        for word in words {
            let string: String = word.into();
            if string.is_empty() || seen.contains(&string) {
                continue;
            }
            seen.insert(string.clone());

            let word_id = vocabulary.words.len();
            let word = Word { glyphs: string.chars().collect(), string };
            vocabulary.word_ids_by_length.entry(word.len()).or_default().push(word_id);
            vocabulary.words.push(word);
        }

        vocabulary
    }

    /// Parse a word list with one entry per line. Anything after the first comma, semicolon, or
    /// whitespace on a line (e.g. a score column) is ignored, as are blank lines.
    pub fn from_word_list(text: &str) -> Vocabulary {
        Vocabulary::new(text.lines().filter_map(|line| {
            line.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .find(|part| !part.is_empty())
        }))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn word_id(&self, string: &str) -> Option<WordId> {
        let length = string.chars().count();
        self.words_of_length(length)
            .iter()
            .copied()
            .find(|&word_id| self.words[word_id].string == string)
    }

    /// Ids of every word with exactly `length` characters, in insertion order.
    pub fn words_of_length(&self, length: usize) -> &[WordId] {
        self.word_ids_by_length.get(&length).map(Vec::as_slice).unwrap_or(&[])
    }
}
