//! Checks the three fill rules against an assignment: each word fits its slot's length, no word
//! is used twice, and crossing slots agree on their shared letter.

use smallvec::SmallVec;
use std::collections::HashMap;

use crate::assignment::Assignment;
use crate::error::AssignmentViolation;
use crate::structure::{SlotId, Structure};
use crate::MAX_SLOT_LENGTH;

type Glyphs = SmallVec<[char; MAX_SLOT_LENGTH]>;

fn check_length(
    structure: &Structure,
    slot_id: SlotId,
    word: &str,
) -> Result<Glyphs, AssignmentViolation> {
    if slot_id >= structure.slot_count() {
        return Err(AssignmentViolation::UnknownSlot(slot_id));
    }

    let glyphs: Glyphs = word.chars().collect();
    let expected = structure.slot(slot_id).length;
    if glyphs.len() != expected {
        return Err(AssignmentViolation::LengthMismatch {
            slot_id,
            word: word.to_string(),
            expected,
            actual: glyphs.len(),
        });
    }

    Ok(glyphs)
}

fn check_crossing(
    structure: &Structure,
    slot_id: SlotId,
    glyphs: &Glyphs,
    other_slot_id: SlotId,
    other_glyphs: &Glyphs,
) -> Result<(), AssignmentViolation> {
    if let Some(overlap) = structure.overlap(slot_id, other_slot_id) {
        let glyph = glyphs[overlap.first];
        let other_glyph = other_glyphs[overlap.second];
        if glyph != other_glyph {
            return Err(AssignmentViolation::OverlapConflict {
                first: slot_id,
                second: other_slot_id,
                first_char: glyph,
                second_char: other_glyph,
            });
        }
    }
    Ok(())
}

/// Check whether adding `word` at `slot_id` keeps `assignment` valid, comparing the new entry
/// against every slot that's already assigned. Any existing entry for `slot_id` is ignored.
pub fn validate_extension(
    structure: &Structure,
    assignment: &Assignment,
    slot_id: SlotId,
    word: &str,
) -> Result<(), AssignmentViolation> {
    let glyphs = check_length(structure, slot_id, word)?;

    for (other_slot_id, other_word) in assignment.iter() {
        if other_slot_id == slot_id {
            continue;
        }
        if other_word == word {
            return Err(AssignmentViolation::DuplicateWord {
                word: word.to_string(),
                first: other_slot_id.min(slot_id),
                second: other_slot_id.max(slot_id),
            });
        }
        if structure.overlap(slot_id, other_slot_id).is_some() {
            let other_glyphs = check_length(structure, other_slot_id, other_word)?;
            check_crossing(structure, slot_id, &glyphs, other_slot_id, &other_glyphs)?;
        }
    }

    Ok(())
}

/// Check every entry of `assignment` against every other. This is the full pass run over any
/// claimed solution; it doesn't rely on how the assignment was built.
pub fn validate_assignment(
    structure: &Structure,
    assignment: &Assignment,
) -> Result<(), AssignmentViolation> {
    let mut glyphs_by_slot: HashMap<SlotId, Glyphs> = HashMap::with_capacity(assignment.len());
    let mut slots_by_word: HashMap<&str, SlotId> = HashMap::with_capacity(assignment.len());

    for (slot_id, word) in assignment.iter() {
        glyphs_by_slot.insert(slot_id, check_length(structure, slot_id, word)?);

        if let Some(&first) = slots_by_word.get(word) {
            return Err(AssignmentViolation::DuplicateWord {
                word: word.to_string(),
                first,
                second: slot_id,
            });
        }
        slots_by_word.insert(word, slot_id);
    }

    for (slot_id, _) in assignment.iter() {
        for &other_slot_id in structure.neighbors(slot_id) {
            if other_slot_id <= slot_id {
                continue;
            }
            if let (Some(glyphs), Some(other_glyphs)) =
                (glyphs_by_slot.get(&slot_id), glyphs_by_slot.get(&other_slot_id))
            {
                check_crossing(structure, slot_id, glyphs, other_slot_id, other_glyphs)?;
            }
        }
    }

    Ok(())
}

pub fn is_consistent(structure: &Structure, assignment: &Assignment) -> bool {
    validate_assignment(structure, assignment).is_ok()
}
