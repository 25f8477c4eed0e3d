use tracing::{debug, warn};

use super::columns::{DEFAULT_CELL_MERGE_EPSILON, order_cells};
use super::fragment::Fragment;
use super::rows::{DEFAULT_ROW_OVERLAP_THRESHOLD, cluster_rows};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructionOptions {
    pub row_overlap_threshold: f32,
    /// Fraction of the region width.
    pub cell_merge_epsilon: f32,
}

impl Default for ReconstructionOptions {
    fn default() -> Self {
        Self {
            row_overlap_threshold: DEFAULT_ROW_OVERLAP_THRESHOLD,
            cell_merge_epsilon: DEFAULT_CELL_MERGE_EPSILON,
        }
    }
}

/// One reconstructed table row. Only the assembler creates rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    row_no: usize,
    cells: Vec<String>,
}

impl Row {
    pub fn row_no(&self) -> usize {
        self.row_no
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// Rebuilds the rows of one region from its fragments.
///
/// Malformed fragments are dropped with a warning. A region with no usable
/// fragments yields no rows. Rows are numbered from 1 in top to bottom order.
pub fn assemble_table(
    fragments: Vec<Fragment>,
    region_width: f32,
    options: &ReconstructionOptions,
) -> Vec<Row> {
    let total = fragments.len();
    let fragments = fragments
        .into_iter()
        .filter(|fragment| match fragment.validate() {
            Ok(()) => true,
            Err(err) => {
                warn!("dropping fragment: {}", err);
                false
            }
        })
        .collect::<Vec<_>>();
    if fragments.is_empty() {
        debug!("region yielded no usable fragments ({} received)", total);
        return Vec::new();
    }

    let epsilon_px = options.cell_merge_epsilon * effective_width(&fragments, region_width);
    let rows = cluster_rows(fragments, options.row_overlap_threshold)
        .into_iter()
        .enumerate()
        .map(|(idx, group)| Row {
            row_no: idx + 1,
            cells: order_cells(group, epsilon_px),
        })
        .collect::<Vec<_>>();
    debug!(
        "assembled {} rows from {} fragments (cell epsilon {:.1}px)",
        rows.len(),
        total,
        epsilon_px
    );
    rows
}

fn effective_width(fragments: &[Fragment], region_width: f32) -> f32 {
    if region_width.is_finite() && region_width > 0.0 {
        return region_width;
    }
    let min = fragments
        .iter()
        .map(|f| f.bbox().x_min)
        .fold(f32::INFINITY, f32::min);
    let max = fragments
        .iter()
        .map(|f| f.bbox().x_max)
        .fold(f32::NEG_INFINITY, f32::max);
    (max - min).max(0.0)
}
