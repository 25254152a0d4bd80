//! Iterative depression removal
//!
//! Every round finds the pits of the current surface, grows each one into a
//! pool that drains through a single pour point, raises the pool to that
//! point and tilts it away from it. Only the surroundings of what changed
//! are scanned again, until no pit is left. The D8 flow directions of the
//! resulting surface are computed last.
//!
//! Elevations only ever go up. Cells touching the grid edge or a no-data
//! hole are outlets and are never raised on their own account.

use depit_core::raster::Raster;
use depit_core::{Algorithm, BitMatrix, Error, LogProgress, ProgressMonitor, Result};
use depit_parallel::ProcessingMode;
use tracing::{debug, info, warn};

use super::flats::flatten_pools;
use super::flow_direction::flow_raster;
use super::grid::DemGrid;
use super::pit_pool::resolve_pools;
use super::pit_scan::{full_scan, incremental_scan};

/// Parameters for depression removal
#[derive(Debug, Clone)]
pub struct DepitParams {
    /// Elevation step between successive rings of a filled flat.
    /// Keep it well below the vertical resolution of the data.
    pub delta: f64,
    /// Worker pool used to flatten pools and compute flow directions
    pub processing: ProcessingMode,
    /// Give up with [`Error::NotConverged`] after this many rounds
    pub max_rounds: Option<usize>,
}

impl Default for DepitParams {
    fn default() -> Self {
        Self {
            delta: 2e-6,
            processing: ProcessingMode::default(),
            max_rounds: None,
        }
    }
}

impl DepitParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(Error::InvalidParameter {
                name: "delta",
                value: self.delta.to_string(),
                reason: "must be positive and finite".to_string(),
            });
        }
        if let ProcessingMode::ParallelWith(0) = self.processing {
            return Err(Error::InvalidParameter {
                name: "threads",
                value: "0".to_string(),
                reason: "worker pool needs at least one thread".to_string(),
            });
        }
        Ok(())
    }
}

/// Rasters and statistics of a finished run
#[derive(Debug, Clone)]
pub struct DepitResult {
    /// Depression-free elevations, same geometry as the input
    pub elevation: Raster<f64>,
    /// D8 flow codes, `NOVALUE` as no-data
    pub flow: Raster<i32>,
    /// Scan-resolve-flatten rounds performed
    pub rounds: usize,
    /// Pit pools raised over all rounds
    pub pools_resolved: usize,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum DepitOutcome {
    Completed(DepitResult),
    /// Stopped on request. `elevation` holds the surface after the last
    /// applied pool; every pool in it was applied in full.
    Cancelled { elevation: Raster<f64>, rounds: usize },
}

impl DepitOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DepitOutcome::Cancelled { .. })
    }

    /// The result of a completed run
    pub fn completed(self) -> Option<DepitResult> {
        match self {
            DepitOutcome::Completed(result) => Some(result),
            DepitOutcome::Cancelled { .. } => None,
        }
    }
}

/// Depression removal algorithm
#[derive(Debug, Clone, Default)]
pub struct Depitter;

impl Algorithm for Depitter {
    type Input = Raster<f64>;
    type Output = DepitOutcome;
    type Params = DepitParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Depitter"
    }

    fn description(&self) -> &'static str {
        "Remove pits and flats from a DEM and compute D8 flow directions"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        depit(&input, &params, &LogProgress::new())
    }
}

/// Remove every depression from `dem` and compute its D8 flow directions.
///
/// `progress` receives per-round messages and is polled for cancellation
/// between rounds, between pit candidates and inside the flattening tasks.
///
/// # Errors
/// - [`Error::InvalidDimensions`] / [`Error::InvalidParameter`] for an
///   empty raster, a degenerate cell size or bad parameters
/// - [`Error::UnresolvableCell`] when a pit has no finite drain
/// - [`Error::NotConverged`] when `max_rounds` is exceeded
pub fn depit(dem: &Raster<f64>, params: &DepitParams, progress: &dyn ProgressMonitor) -> Result<DepitOutcome> {
    params.validate()?;
    let mut grid = DemGrid::from_raster(dem)?;
    let executor = params.processing.executor()?;
    let (rows, cols) = (grid.rows(), grid.cols());

    info!(rows, cols, threads = executor.num_threads(), delta = params.delta, "removing depressions");

    let mut pits = full_scan(&grid, progress);
    let mut rounds = 0;
    let mut pools_resolved = 0;

    while !pits.is_empty() {
        if progress.is_canceled() {
            return Ok(cancelled(grid, dem, rounds));
        }
        if params.max_rounds.is_some_and(|max| rounds >= max) {
            warn!(rounds, pits = pits.len(), "round limit reached");
            return Err(Error::NotConverged { rounds });
        }

        progress.message(&format!("Iteration number: {}", rounds + 1));
        progress.message(&format!("Pits to process: {}", pits.len()));

        let mut absorbed = BitMatrix::new(rows, cols);
        let pools = match resolve_pools(&grid, &pits, &mut absorbed, progress) {
            Ok(Some(pools)) => pools,
            Ok(None) => return Ok(cancelled(grid, dem, rounds)),
            Err(Error::UnresolvableCell { row, col }) => {
                let (x, y) = dem.transform().pixel_to_geo(col, row);
                progress.error_message(&format!(
                    "Unable to find a drain for the pit at row {row}, col {col} ({x}, {y})"
                ));
                return Err(Error::UnresolvableCell { row, col });
            }
            Err(e) => return Err(e),
        };

        let flattened = flatten_pools(&mut grid, &pools, params.delta, &executor, progress);
        pools_resolved += flattened.applied;
        if flattened.canceled {
            return Ok(cancelled(grid, dem, rounds));
        }

        rounds += 1;
        pits = incremental_scan(&grid, &flattened.touched, progress);
        progress.message(&format!("Left pits: {}", pits.len()));
        debug!(
            round = rounds,
            pools = pools.len(),
            raised = flattened.touched.len(),
            left = pits.len(),
            "round finished"
        );
    }

    let flow = flow_raster(&grid, dem, &executor, progress)?;
    let elevation = grid.into_raster(dem);

    info!(rounds, pools_resolved, "depressions removed");
    Ok(DepitOutcome::Completed(DepitResult {
        elevation,
        flow,
        rounds,
        pools_resolved,
    }))
}

fn cancelled(grid: DemGrid, dem: &Raster<f64>, rounds: usize) -> DepitOutcome {
    info!(rounds, "depression removal cancelled");
    DepitOutcome::Cancelled {
        elevation: grid.into_raster(dem),
        rounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use depit_core::raster::d8::OUTLET;

    const DELTA: f64 = 2e-6;

    #[rustfmt::skip]
    fn single_pit() -> Raster<f64> {
        Raster::from_vec(vec![
            9.0, 9.0, 9.0, 9.0, 9.0,
            9.0, 5.0, 5.0, 5.0, 9.0,
            9.0, 5.0, 1.0, 5.0, 2.0,
            9.0, 5.0, 5.0, 5.0, 9.0,
            9.0, 9.0, 9.0, 9.0, 9.0,
        ], 5, 5).unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = DepitParams::default();
        assert_relative_eq!(params.delta, 2e-6);
        assert_eq!(params.processing, ProcessingMode::Parallel);
        assert!(params.max_rounds.is_none());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_delta() {
        for delta in [0.0, -1e-6, f64::NAN, f64::INFINITY] {
            let params = DepitParams { delta, ..Default::default() };
            let err = params.validate().unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { name: "delta", .. }));
        }
    }

    #[test]
    fn test_single_pit_drains_through_rim() {
        let result = depit(&single_pit(), &DepitParams::default(), &LogProgress::new())
            .unwrap()
            .completed()
            .unwrap();

        assert_relative_eq!(result.elevation.get(2, 2).unwrap(), 5.0 + DELTA);
        assert_eq!(result.flow.get(2, 2).unwrap(), 1);
        assert_eq!(result.flow.get(2, 3).unwrap(), 1);
        assert_eq!(result.flow.get(2, 4).unwrap(), OUTLET);
        assert_eq!(result.rounds, 3);
        assert!(result.pools_resolved >= 1);
    }

    #[test]
    fn test_round_limit() {
        let params = DepitParams {
            max_rounds: Some(1),
            ..Default::default()
        };
        let err = depit(&single_pit(), &params, &LogProgress::new()).unwrap_err();
        assert!(matches!(err, Error::NotConverged { rounds: 1 }));
    }

    #[test]
    fn test_cancel_before_first_round() {
        let pm = LogProgress::new();
        pm.cancel();
        let outcome = depit(&single_pit(), &DepitParams::default(), &pm).unwrap();

        assert!(outcome.is_cancelled());
        let DepitOutcome::Cancelled { elevation, rounds } = outcome else {
            unreachable!();
        };
        assert_eq!(rounds, 0);
        assert_eq!(elevation.data(), single_pit().data());
    }

    #[test]
    fn test_algorithm_trait() {
        let algo = Depitter;
        assert_eq!(algo.name(), "Depitter");
        let outcome = algo.execute_default(single_pit()).unwrap();
        assert!(!outcome.is_cancelled());
    }
}
