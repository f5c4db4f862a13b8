//! Fills crossword grids by treating each slot as a constraint-satisfaction variable: node
//! consistency and AC-3 prune the candidate words, then a backtracking search (MRV with a degree
//! tie-break, least-constraining values first) looks for an assignment where every slot gets a
//! distinct word of the right length and crossing slots agree on their shared letters.

pub mod arc_consistency;
pub mod assignment;
pub mod backtracking_search;
pub mod config;
pub mod domain;
pub mod error;
pub mod render;
pub mod structure;
pub mod validator;
pub mod vocabulary;

/// The expected maximum length for a single slot. Longer slots still work; their per-word
/// buffers just spill to the heap.
pub const MAX_SLOT_LENGTH: usize = 21;

pub use crate::assignment::Assignment;
pub use crate::backtracking_search::{
    find_fill, find_fill_parallel, FillFailure, FillSuccess, Solver, Statistics,
};
pub use crate::config::{FillOptions, Propagation};
pub use crate::domain::{DomainStore, Snapshot};
pub use crate::error::{AssignmentViolation, MalformedStructureError};
pub use crate::render::render_grid;
pub use crate::structure::{Direction, Overlap, Slot, SlotId, Structure};
pub use crate::validator::{is_consistent, validate_assignment, validate_extension};
pub use crate::vocabulary::{Vocabulary, Word, WordId};
