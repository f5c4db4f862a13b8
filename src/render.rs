use crate::assignment::Assignment;
use crate::structure::Structure;

/// Turn the given structure and assignment into a rendered string, one line per grid row.
/// Blocked cells are drawn as `█` and fillable cells without a letter as spaces.
pub fn render_grid(structure: &Structure, assignment: &Assignment) -> String {
    let mut grid: Vec<Vec<char>> = (0..structure.height())
        .map(|row| {
            (0..structure.width())
                .map(|col| if structure.is_fillable(row, col) { ' ' } else { '█' })
                .collect()
        })
        .collect();

    for (slot_id, word) in assignment.iter() {
        if slot_id >= structure.slot_count() {
            continue;
        }
        let slot = structure.slot(slot_id);
        for ((row, col), glyph) in slot.cell_coords().zip(word.chars()) {
            grid[row][col] = glyph;
        }
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
