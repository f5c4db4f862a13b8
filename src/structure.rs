//! The static shape of a crossword: which cells are fillable, which slots they form, and where
//! those slots cross. A `Structure` is validated once at construction and never changes after.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

use crate::error::{MalformedStructureError, StructureResult};
use crate::MAX_SLOT_LENGTH;

/// An identifier for a given slot, based on its index in the Structure's `slots` field.
pub type SlotId = usize;

/// Zero-indexed row and column for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing. `Across` sorts before `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

/// A contiguous run of fillable cells, identified by its start cell, direction, and length. Field
/// order matters: the derived `Ord` is the lexicographic order used to break ties during search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub row: usize,
    pub col: usize,
    pub direction: Direction,
    pub length: usize,
}

impl Slot {
    pub fn new(row: usize, col: usize, direction: Direction, length: usize) -> Slot {
        Slot { row, col, direction, length }
    }

    /// The coords of the cell at `cell_idx` within this slot.
    pub fn cell(&self, cell_idx: usize) -> GridCoord {
        match self.direction {
            Direction::Across => (self.row, self.col + cell_idx),
            Direction::Down => (self.row + cell_idx, self.col),
        }
    }

    /// Generate the coords for each cell of this slot.
    pub fn cell_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(move |cell_idx| self.cell(cell_idx))
    }
}

/// A crossing between two slots: character `first` of the first slot's word must equal character
/// `second` of the second slot's word. Which slot is "first" depends on the lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Overlap {
    pub first: usize,
    pub second: usize,
}

impl Overlap {
    pub fn new(first: usize, second: usize) -> Overlap {
        Overlap { first, second }
    }

    /// The same overlap seen from the other slot.
    pub fn flipped(self) -> Overlap {
        Overlap { first: self.second, second: self.first }
    }
}

/// An immutable, validated description of a grid.
#[derive(Clone)]
pub struct Structure {
    height: usize,
    width: usize,
    cells: Vec<Vec<bool>>,
    slots: Vec<Slot>,
    ids_by_slot: HashMap<Slot, SlotId>,

    /// Keyed by ordered pair; each crossing is stored once in each orientation.
    overlaps: HashMap<(SlotId, SlotId), Overlap>,

    /// Sorted ids of the slots crossing each slot.
    neighbors: Vec<SmallVec<[SlotId; MAX_SLOT_LENGTH]>>,
}

impl Debug for Structure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Structure")
            .field("height", &self.height)
            .field("width", &self.width)
            .field("slots", &self.slots)
            .field("overlaps", &format!("({} crossings)", self.overlaps.len() / 2))
            .finish()
    }
}

impl Structure {
    /// Build a structure from a cell mask (`true` = fillable), a slot list, and a list of declared
    /// crossings. Every invariant is checked here so nothing downstream has to.
    pub fn new(
        cells: Vec<Vec<bool>>,
        slots: Vec<Slot>,
        overlaps: Vec<(Slot, Slot, Overlap)>,
    ) -> StructureResult<Structure> {
        let height = cells.len();
        let width = cells.first().map(|row| row.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(MalformedStructureError::EmptyGrid);
        }
        for (row, cells_in_row) in cells.iter().enumerate() {
            if cells_in_row.len() != width {
                return Err(MalformedStructureError::RaggedRow {
                    row,
                    expected: width,
                    actual: cells_in_row.len(),
                });
            }
        }

        // Every pair of slots that physically cross, in the order they were found. Each one needs
        // a declared overlap.
        let mut crossings: Vec<(SlotId, SlotId)> = vec![];
        let mut slots_by_cell: HashMap<GridCoord, SmallVec<[SlotId; 2]>> = HashMap::new();

        let mut ids_by_slot: HashMap<Slot, SlotId> = HashMap::with_capacity(slots.len());
        for (slot_id, &slot) in slots.iter().enumerate() {
            if slot.length == 0 {
                return Err(MalformedStructureError::EmptySlot(slot));
            }
            if ids_by_slot.insert(slot, slot_id).is_some() {
                return Err(MalformedStructureError::DuplicateSlot(slot));
            }
            for (row, col) in slot.cell_coords() {
                let fillable = cells.get(row).and_then(|r| r.get(col)).copied().unwrap_or(false);
                if !fillable {
                    return Err(MalformedStructureError::SpanMismatch { slot, row, col });
                }

                // Perpendicular slots meet in at most one cell, so only parallel slots can share
                // more than one.
                let covering = slots_by_cell.entry((row, col)).or_default();
                for &other_slot_id in covering.iter() {
                    let other_slot = slots[other_slot_id];
                    if other_slot.direction == slot.direction {
                        return Err(MalformedStructureError::SharedCells {
                            first: other_slot,
                            second: slot,
                        });
                    }
                    crossings.push((other_slot_id, slot_id));
                }
                covering.push(slot_id);
            }
        }

        let mut overlap_map: HashMap<(SlotId, SlotId), Overlap> = HashMap::new();
        for (first, second, overlap) in overlaps {
            let first_id = *ids_by_slot
                .get(&first)
                .ok_or(MalformedStructureError::UnknownSlot(first))?;
            let second_id = *ids_by_slot
                .get(&second)
                .ok_or(MalformedStructureError::UnknownSlot(second))?;

            if first_id == second_id {
                return Err(MalformedStructureError::SelfOverlap(first));
            }
            if overlap.first >= first.length {
                return Err(MalformedStructureError::OverlapOutOfBounds {
                    slot: first,
                    index: overlap.first,
                });
            }
            if overlap.second >= second.length {
                return Err(MalformedStructureError::OverlapOutOfBounds {
                    slot: second,
                    index: overlap.second,
                });
            }
            if first.cell(overlap.first) != second.cell(overlap.second) {
                return Err(MalformedStructureError::OverlapCellMismatch { first, second });
            }

            match overlap_map.get(&(first_id, second_id)) {
                Some(&existing) if existing != overlap => {
                    return Err(MalformedStructureError::ConflictingOverlap { first, second });
                }
                Some(_) => {}
                None => {
                    overlap_map.insert((first_id, second_id), overlap);
                    overlap_map.insert((second_id, first_id), overlap.flipped());
                }
            }
        }

        if let Some(&(first_id, second_id)) =
            crossings.iter().find(|&crossing| !overlap_map.contains_key(crossing))
        {
            return Err(MalformedStructureError::UndeclaredOverlap {
                first: slots[first_id],
                second: slots[second_id],
            });
        }

        let mut neighbors: Vec<SmallVec<[SlotId; MAX_SLOT_LENGTH]>> =
            slots.iter().map(|_| SmallVec::new()).collect();
        for &(slot_id, other_slot_id) in overlap_map.keys() {
            neighbors[slot_id].push(other_slot_id);
        }
        for slot_neighbors in &mut neighbors {
            slot_neighbors.sort_unstable();
        }

        Ok(Structure {
            height,
            width,
            cells,
            slots,
            ids_by_slot,
            overlaps: overlap_map,
            neighbors,
        })
    }

    /// Build a structure from a cell mask, treating every maximal run of two or more fillable
    /// cells as a slot. Across slots come first, then down slots, each in row-major order of
    /// their start cells.
    pub fn from_cells(cells: Vec<Vec<bool>>) -> StructureResult<Structure> {
        let height = cells.len();
        let width = cells.first().map(|row| row.len()).unwrap_or(0);
        if let Some((row, cells_in_row)) =
            cells.iter().enumerate().find(|(_, r)| r.len() != width)
        {
            return Err(MalformedStructureError::RaggedRow {
                row,
                expected: width,
                actual: cells_in_row.len(),
            });
        }

        let is_open = |row: usize, col: usize| row < height && col < width && cells[row][col];

        let mut slots: Vec<Slot> = vec![];
        for direction in [Direction::Across, Direction::Down] {
            for row in 0..height {
                for col in 0..width {
                    let starts_run = is_open(row, col)
                        && match direction {
                            Direction::Across => col == 0 || !is_open(row, col - 1),
                            Direction::Down => row == 0 || !is_open(row - 1, col),
                        };
                    if !starts_run {
                        continue;
                    }

                    let length = (0..)
                        .take_while(|&offset| match direction {
                            Direction::Across => is_open(row, col + offset),
                            Direction::Down => is_open(row + offset, col),
                        })
                        .count();

                    if length > 1 {
                        slots.push(Slot::new(row, col, direction, length));
                    }
                }
            }
        }

        // Map each cell to the (slot, cell index) pairs covering it, then read the crossings
        // off of any cell covered twice.
        let mut entries_by_cell: HashMap<GridCoord, SmallVec<[(usize, usize); 2]>> =
            HashMap::new();
        for (slot_idx, slot) in slots.iter().enumerate() {
            for (cell_idx, loc) in slot.cell_coords().enumerate() {
                entries_by_cell.entry(loc).or_default().push((slot_idx, cell_idx));
            }
        }

        let mut crossing_cells: Vec<_> = entries_by_cell
            .into_iter()
            .filter(|(_, entries)| entries.len() == 2)
            .collect();
        crossing_cells.sort_unstable_by_key(|&(loc, _)| loc);

        let overlaps = crossing_cells
            .into_iter()
            .map(|(_, entries)| {
                let (first_idx, first_cell) = entries[0];
                let (second_idx, second_cell) = entries[1];
                (slots[first_idx], slots[second_idx], Overlap::new(first_cell, second_cell))
            })
            .collect();

        Structure::new(cells, slots, overlaps)
    }

    /// Parse a text template, with `#` (or `█`) representing blocks and `_` or `.` representing
    /// fillable cells. Blank lines and leading/trailing whitespace are ignored.
    pub fn from_template(template: &str) -> StructureResult<Structure> {
        let cells = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(row, line)| {
                line.chars()
                    .enumerate()
                    .map(|(col, ch)| match ch {
                        '#' | '█' => Ok(false),
                        '_' | '.' => Ok(true),
                        _ => Err(MalformedStructureError::InvalidCell { row, col, ch }),
                    })
                    .collect::<StructureResult<Vec<bool>>>()
            })
            .collect::<StructureResult<Vec<Vec<bool>>>>()?;

        Structure::from_cells(cells)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_fillable(&self, row: usize, col: usize) -> bool {
        self.cells.get(row).and_then(|r| r.get(col)).copied().unwrap_or(false)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, slot_id: SlotId) -> &Slot {
        &self.slots[slot_id]
    }

    pub fn slot_id(&self, slot: &Slot) -> Option<SlotId> {
        self.ids_by_slot.get(slot).copied()
    }

    pub fn slot_ids(&self) -> std::ops::Range<SlotId> {
        0..self.slots.len()
    }

    /// All slots crossing the given slot, in ascending id order.
    pub fn neighbors(&self, slot_id: SlotId) -> &[SlotId] {
        &self.neighbors[slot_id]
    }

    pub fn degree(&self, slot_id: SlotId) -> usize {
        self.neighbors[slot_id].len()
    }

    /// The crossing between two slots, oriented so that `first` indexes into `slot_id`'s word.
    /// Returns `None` for slots that don't cross.
    pub fn overlap(&self, slot_id: SlotId, other_slot_id: SlotId) -> Option<Overlap> {
        self.overlaps.get(&(slot_id, other_slot_id)).copied()
    }

    /// Like `overlap`, but addressed by slot identity rather than id.
    pub fn overlap_between(&self, slot: &Slot, other_slot: &Slot) -> Option<Overlap> {
        self.overlap(self.slot_id(slot)?, self.slot_id(other_slot)?)
    }

    /// Every ordered pair of crossing slots.
    pub fn arcs(&self) -> Vec<(SlotId, SlotId)> {
        self.slot_ids()
            .flat_map(|slot_id| {
                self.neighbors(slot_id).iter().map(move |&other_slot_id| (slot_id, other_slot_id))
            })
            .collect()
    }
}
