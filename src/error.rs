//! Error types for building structures and checking assignments.

use thiserror::Error;

use crate::structure::{Slot, SlotId};

/// Result type for structure construction.
pub type StructureResult<T> = Result<T, MalformedStructureError>;

/// Reasons a grid structure can be rejected at construction time. These are fatal: a structure
/// that fails validation is never handed to the solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedStructureError {
    #[error("structure has no cells")]
    EmptyGrid,

    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("unexpected character {ch:?} at row {row}, column {col}")]
    InvalidCell { row: usize, col: usize, ch: char },

    #[error("slot {0:?} has zero length")]
    EmptySlot(Slot),

    #[error("slot {0:?} is listed more than once")]
    DuplicateSlot(Slot),

    /// The slot's declared length doesn't match the fillable cells it spans, either because it
    /// runs off the grid or because it covers a blocked cell.
    #[error("slot {slot:?} spans a blocked or out-of-bounds cell at ({row}, {col})")]
    SpanMismatch { slot: Slot, row: usize, col: usize },

    #[error("overlap references slot {0:?}, which is not part of the structure")]
    UnknownSlot(Slot),

    #[error("slot {0:?} cannot overlap itself")]
    SelfOverlap(Slot),

    #[error("overlap index {index} is out of bounds for slot {slot:?}")]
    OverlapOutOfBounds { slot: Slot, index: usize },

    #[error("overlap between {first:?} and {second:?} does not name a shared cell")]
    OverlapCellMismatch { first: Slot, second: Slot },

    #[error("overlap between {first:?} and {second:?} is declared twice with different indices")]
    ConflictingOverlap { first: Slot, second: Slot },

    #[error("slots {first:?} and {second:?} run in the same direction through a shared cell")]
    SharedCells { first: Slot, second: Slot },

    #[error("slots {first:?} and {second:?} cross but no overlap is declared between them")]
    UndeclaredOverlap { first: Slot, second: Slot },
}

/// A reason a (partial or complete) assignment breaks one of the fill rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentViolation {
    #[error("slot id {0} is not part of the structure")]
    UnknownSlot(SlotId),

    #[error("word {word:?} has length {actual} but slot {slot_id} needs {expected}")]
    LengthMismatch {
        slot_id: SlotId,
        word: String,
        expected: usize,
        actual: usize,
    },

    #[error("word {word:?} is used by both slot {first} and slot {second}")]
    DuplicateWord {
        word: String,
        first: SlotId,
        second: SlotId,
    },

    #[error("slots {first} and {second} disagree at their crossing ({first_char:?} vs {second_char:?})")]
    OverlapConflict {
        first: SlotId,
        second: SlotId,
        first_char: char,
        second_char: char,
    },
}
