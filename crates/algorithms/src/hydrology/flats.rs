//! Micro-slope imposition over filled depressions
//!
//! Every pool is raised to its pour point and then tilted away from it in
//! steps of `delta`, one step per ring of cells around the exit. The result
//! has a unique steepest descent everywhere inside the former flat.

use std::collections::{HashMap, VecDeque};

use depit_core::raster::d8::Direction;
use depit_core::ProgressMonitor;
use depit_parallel::{Executor, ParallelStrategy};

use super::grid::DemGrid;
use super::node::Cell;
use super::pit_pool::PitPool;

/// Result of flattening one round of pools.
#[derive(Debug, Default)]
pub struct Flattened {
    /// Members of every pool whose updates were applied
    pub touched: Vec<Cell>,
    /// Pools applied before stopping
    pub applied: usize,
    pub canceled: bool,
}

/// New elevations for the members of `pool`.
///
/// Reads only the pool's own cells, so pools of one round can be computed
/// concurrently. The exit keeps its elevation.
pub fn flatten(grid: &DemGrid, pool: &PitPool, delta: f64) -> Vec<(Cell, f64)> {
    let exit_elevation = pool.exit_elevation;

    // Members still at the pour point after the raise, with their ring number
    let mut rings: HashMap<Cell, usize> = pool
        .members
        .iter()
        .filter(|&&cell| cell != pool.exit && grid.elevation(cell) <= exit_elevation)
        .map(|&cell| (cell, 0))
        .collect();

    let mut queue = VecDeque::from([(pool.exit, 0usize)]);
    while let Some((cell, ring)) = queue.pop_front() {
        for dir in Direction::ALL {
            let Some(next) = grid.offset(cell, dir) else {
                continue;
            };
            if let Some(slot) = rings.get_mut(&next) {
                if *slot == 0 {
                    *slot = ring + 1;
                    queue.push_back((next, ring + 1));
                }
            }
        }
    }

    pool.members
        .iter()
        .filter_map(|&cell| {
            let ring = *rings.get(&cell)?;
            Some((cell, exit_elevation + delta * ring as f64))
        })
        .collect()
}

/// Flatten every pool and write the results into `grid`.
///
/// Updates are computed on the executor and applied one whole pool at a
/// time. On cancellation the pools that finished are still applied, the
/// others are left untouched.
pub fn flatten_pools(
    grid: &mut DemGrid,
    pools: &[PitPool],
    delta: f64,
    executor: &Executor,
    progress: &dyn ProgressMonitor,
) -> Flattened {
    progress.begin_task("Handle flats...", pools.len());

    let shared: &DemGrid = grid;
    let updates: Vec<Option<Vec<(Cell, f64)>>> = executor.par_map(0..pools.len(), |i| {
        if progress.is_canceled() {
            return None;
        }
        let changes = flatten(shared, &pools[i], delta);
        progress.worked(1);
        Some(changes)
    });

    let mut result = Flattened::default();
    for (pool, changes) in pools.iter().zip(updates) {
        let Some(changes) = changes else {
            result.canceled = true;
            continue;
        };
        for (cell, value) in changes {
            grid.set_elevation(cell, value);
        }
        result.touched.extend_from_slice(&pool.members);
        result.applied += 1;
    }
    progress.done();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::pit_pool::grow_pool;
    use approx::assert_relative_eq;
    use depit_core::{BitMatrix, LogProgress, Raster};
    use depit_parallel::ProcessingMode;

    const DELTA: f64 = 2e-6;

    fn grid(rows: usize, cols: usize, values: &[f64]) -> DemGrid {
        let dem = Raster::from_vec(values.to_vec(), rows, cols).unwrap();
        DemGrid::from_raster(&dem).unwrap()
    }

    /// A 1x4 trough inside a rim, draining east through (2, 5)
    fn trough() -> DemGrid {
        #[rustfmt::skip]
        let g = grid(5, 7, &[
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 8.0, 8.0, 8.0, 8.0, 8.0, 0.0,
            0.0, 8.0, 1.0, 2.0, 3.0, 6.0, 0.0,
            0.0, 8.0, 8.0, 8.0, 8.0, 8.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ]);
        g
    }

    #[test]
    fn test_flatten_steps_away_from_exit() {
        let g = trough();
        let pool = grow_pool(&g, Cell::new(2, 2), &BitMatrix::new(5, 7)).unwrap();
        assert_eq!(pool.exit, Cell::new(2, 5));
        assert_eq!(pool.exit_elevation, 6.0);

        let updates: HashMap<Cell, f64> = flatten(&g, &pool, DELTA).into_iter().collect();
        assert_eq!(updates.len(), 3);
        assert_relative_eq!(updates[&Cell::new(2, 4)], 6.0 + DELTA);
        assert_relative_eq!(updates[&Cell::new(2, 3)], 6.0 + 2.0 * DELTA);
        assert_relative_eq!(updates[&Cell::new(2, 2)], 6.0 + 3.0 * DELTA);
    }

    #[test]
    fn test_flatten_singleton_is_one_step_above_exit() {
        #[rustfmt::skip]
        let g = grid(3, 3, &[
            5.0, 5.0, 5.0,
            5.0, 1.0, 4.0,
            5.0, 5.0, 5.0,
        ]);
        let pool = grow_pool(&g, Cell::new(1, 1), &BitMatrix::new(3, 3)).unwrap();
        let updates = flatten(&g, &pool, DELTA);
        assert_eq!(updates, vec![(Cell::new(1, 1), 4.0 + DELTA)]);
    }

    #[test]
    fn test_flatten_pools_applies_every_pool() {
        let mut g = trough();
        let pool = grow_pool(&g, Cell::new(2, 2), &BitMatrix::new(5, 7)).unwrap();
        let exec = ProcessingMode::ParallelWith(2).executor().unwrap();
        let pm = LogProgress::new();

        let result = flatten_pools(&mut g, &[pool], DELTA, &exec, &pm);
        assert!(!result.canceled);
        assert_eq!(result.applied, 1);
        assert_eq!(result.touched.len(), 3);
        assert_eq!(pm.worked_units(), 1);

        assert!(g.elevation(Cell::new(2, 2)) > g.elevation(Cell::new(2, 3)));
        assert!(g.elevation(Cell::new(2, 3)) > g.elevation(Cell::new(2, 4)));
        assert!(g.elevation(Cell::new(2, 4)) > g.elevation(Cell::new(2, 5)));
        assert_eq!(g.elevation(Cell::new(2, 5)), 6.0);
    }

    #[test]
    fn test_flatten_pools_leaves_grid_alone_when_canceled() {
        let mut g = trough();
        let pool = grow_pool(&g, Cell::new(2, 2), &BitMatrix::new(5, 7)).unwrap();
        let exec = ProcessingMode::Sequential.executor().unwrap();
        let pm = LogProgress::new();
        pm.cancel();

        let result = flatten_pools(&mut g, &[pool], DELTA, &exec, &pm);
        assert!(result.canceled);
        assert_eq!(result.applied, 0);
        assert!(result.touched.is_empty());
        assert_eq!(g.elevation(Cell::new(2, 2)), 1.0);
    }
}
