//! Pit pool growth and pour point selection
//!
//! Starting from a pit, neighbors that are themselves local minima once the
//! pool is ignored get absorbed, until a neighbor with a lower way out shows
//! up next to the pool. The pour point is the highest of the lowest escapes
//! seen while absorbing, which is the least raise that lets the whole pool
//! drain.

use std::collections::HashSet;

use depit_core::{BitMatrix, Error, ProgressMonitor, Result};
use tracing::debug;

use super::grid::DemGrid;
use super::node::{lowest, Cell, GridNode};

/// A connected depression resolved in one round.
#[derive(Debug, Clone)]
pub struct PitPool {
    /// Cells of the depression, in the order they were absorbed
    pub members: Vec<Cell>,
    /// Cell the pool drains through
    pub exit: Cell,
    /// Elevation the pool gets raised to
    pub exit_elevation: f64,
    membership: HashSet<Cell>,
}

impl PitPool {
    pub fn contains(&self, cell: Cell) -> bool {
        self.membership.contains(&cell)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Grow a pool for every candidate not already absorbed this round.
///
/// `absorbed` collects the members of every pool built here. Pools never
/// share a cell: cells marked by an earlier pool are neither used as a
/// starting point nor absorbed again.
///
/// Returns `Ok(None)` when the run was cancelled.
pub fn resolve_pools(
    grid: &DemGrid,
    candidates: &[Cell],
    absorbed: &mut BitMatrix,
    progress: &dyn ProgressMonitor,
) -> Result<Option<Vec<PitPool>>> {
    let mut pools = Vec::new();

    progress.begin_task("Processing pits...", candidates.len());
    for &start in candidates {
        if progress.is_canceled() {
            return Ok(None);
        }
        if absorbed.is_marked(start.row, start.col) {
            progress.worked(1);
            continue;
        }

        let pool = grow_pool(grid, start, absorbed)?;
        for cell in &pool.members {
            absorbed.mark(cell.row, cell.col);
        }
        pools.push(pool);
        progress.worked(1);
    }
    progress.done();

    debug!(
        candidates = candidates.len(),
        pools = pools.len(),
        absorbed = absorbed.count(),
        "pit pools grown"
    );
    Ok(Some(pools))
}

/// Grow the depression containing `start`.
///
/// Fails with [`Error::UnresolvableCell`] when no finite pour point exists.
pub fn grow_pool(grid: &DemGrid, start: Cell, absorbed: &BitMatrix) -> Result<PitPool> {
    let mut members = vec![start];
    let mut membership = HashSet::from([start]);
    let mut exit: Option<GridNode<'_>> = None;

    let mut cursor = 0;
    while cursor < members.len() {
        let current = grid.node(members[cursor]);
        cursor += 1;

        let surrounding = outside(current, &membership);
        let Some(min_node) = lowest(surrounding.iter().copied()) else {
            continue;
        };
        if !min_node.is_pit_relative_to(outside(min_node, &membership)) {
            // The lowest neighbor already drains somewhere else
            break;
        }

        for candidate in surrounding {
            if candidate.is_outlet() || absorbed.is_marked(candidate.row(), candidate.col()) {
                continue;
            }
            let escapes = outside(candidate, &membership);
            if !candidate.is_pit_relative_to(escapes.iter().copied()) {
                continue;
            }

            members.push(candidate.cell());
            membership.insert(candidate.cell());

            if let Some(escape) = lowest(escapes) {
                if exit.map_or(true, |e| escape.elevation() > e.elevation()) {
                    exit = Some(escape);
                }
            }
        }
    }

    if members.len() == 1 {
        exit = lowest(grid.node(start).valid_neighbors().map(|(_, n)| n));
    }

    match exit {
        Some(node) if node.elevation().is_finite() => Ok(PitPool {
            members,
            exit: node.cell(),
            exit_elevation: node.elevation(),
            membership,
        }),
        _ => Err(Error::UnresolvableCell {
            row: start.row,
            col: start.col,
        }),
    }
}

/// Neighbors of `node` holding data and not part of `pool`
fn outside<'a>(node: GridNode<'a>, pool: &HashSet<Cell>) -> Vec<GridNode<'a>> {
    node.valid_neighbors()
        .map(|(_, n)| n)
        .filter(|n| !pool.contains(&n.cell()))
        .collect()
}
