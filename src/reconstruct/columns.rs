use super::fragment::{BBox, Fragment};

/// Fraction of the table width under which two horizontal centers are
/// considered the same cell.
pub const DEFAULT_CELL_MERGE_EPSILON: f32 = 0.02;

struct Cell {
    anchor: BBox,
    parts: Vec<String>,
}

impl Cell {
    fn accepts(&self, bbox: &BBox, epsilon_px: f32) -> bool {
        (bbox.center_x() - self.anchor.center_x()).abs() <= epsilon_px
            && self.anchor.vertical_overlap(bbox) > 0.0
    }

    fn into_text(self) -> String {
        self.parts
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Orders one row's fragments left to right and returns the cell texts.
///
/// Fragments whose horizontal centers sit within `epsilon_px` of a cell's
/// first fragment, and that share vertical extent with it, are pieces of
/// that cell and are joined with a single space. A fragment joins the
/// nearest such cell even when another cell was opened in between.
pub fn order_cells(mut row: Vec<Fragment>, epsilon_px: f32) -> Vec<String> {
    row.sort_by(|a, b| {
        a.center_x()
            .total_cmp(&b.center_x())
            .then_with(|| a.center_y().total_cmp(&b.center_y()))
            .then_with(|| a.bbox().x_min.total_cmp(&b.bbox().x_min))
    });

    let mut cells: Vec<Cell> = Vec::new();
    for fragment in row {
        let center_x = fragment.center_x();
        // Anchors are in ascending center order, so only the tail can match.
        if let Some(cell) = cells
            .iter_mut()
            .rev()
            .take_while(|cell| center_x - cell.anchor.center_x() <= epsilon_px)
            .find(|cell| cell.accepts(fragment.bbox(), epsilon_px))
        {
            cell.parts.push(fragment.text().to_string());
            continue;
        }
        cells.push(Cell {
            anchor: *fragment.bbox(),
            parts: vec![fragment.text().to_string()],
        });
    }

    cells.into_iter().map(Cell::into_text).collect()
}
