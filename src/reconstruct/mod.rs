//! Table reconstruction: recovers rows and cells from positioned text.

mod assemble;
mod columns;
mod fragment;
mod rows;

pub use assemble::{ReconstructionOptions, Row, assemble_table};
pub use columns::{DEFAULT_CELL_MERGE_EPSILON, order_cells};
pub use fragment::{BBox, Fragment};
pub use rows::{DEFAULT_ROW_OVERLAP_THRESHOLD, cluster_rows};
