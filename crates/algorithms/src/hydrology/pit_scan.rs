//! Pit candidate extraction
//!
//! A full scan looks at every cell; after a round only the neighbors of the
//! cells that changed can have switched state, so the incremental scan looks
//! at those alone.

use depit_core::{BitMatrix, ProgressMonitor};

use super::grid::DemGrid;
use super::node::{Cell, GridNode};

/// A cell the depitter has to resolve.
///
/// Outlets drain out of the domain and are never candidates; cells whose
/// whole neighborhood is no-data cannot be resolved and are skipped.
pub fn is_pit_candidate(node: &GridNode<'_>) -> bool {
    node.is_pit() && !node.is_outlet() && node.surrounding_min().is_finite()
}

/// Candidates over the whole grid, in row-major order.
pub fn full_scan(grid: &DemGrid, progress: &dyn ProgressMonitor) -> Vec<Cell> {
    let (rows, cols) = (grid.rows(), grid.cols());
    let mut pits = Vec::new();

    progress.begin_task("Extract pits from DEM...", rows);
    for row in 0..rows {
        for col in 0..cols {
            let node = grid.node(Cell::new(row, col));
            if is_pit_candidate(&node) {
                pits.push(node.cell());
            }
        }
        progress.worked(1);
    }
    progress.done();

    pits
}

/// Candidates among the neighbors of `touched`, each examined once.
pub fn incremental_scan(grid: &DemGrid, touched: &[Cell], progress: &dyn ProgressMonitor) -> Vec<Cell> {
    let mut pits = Vec::new();
    if touched.is_empty() {
        return pits;
    }

    let mut examined = BitMatrix::new(grid.rows(), grid.cols());
    progress.begin_task("Extract pits from the cells surrounding the pit pools...", touched.len());
    for &cell in touched {
        for (_, neighbor) in grid.node(cell).valid_neighbors() {
            if !examined.mark_new(neighbor.row(), neighbor.col()) {
                continue;
            }
            if is_pit_candidate(&neighbor) {
                pits.push(neighbor.cell());
            }
        }
        progress.worked(1);
    }
    progress.done();

    pits
}
