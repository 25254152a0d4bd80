//! D8 flow direction algorithm
//!
//! Each cell drains to the neighbor with the steepest drop, measured with
//! the real center-to-center distance of the grid.
//!
//! Flow direction encoding:
//! ```text
//!   4  3  2
//!   5  x  1
//!   6  7  8
//! ```
//! `OUTLET` (10) marks cells whose flow leaves the domain through the grid
//! edge or a no-data hole, `NOVALUE` (-9999) marks no-data cells.

use depit_core::raster::d8::NOVALUE;
use depit_core::raster::Raster;
use depit_core::{Algorithm, Error, LogProgress, ProgressMonitor, Result};
use depit_parallel::{Executor, ParallelStrategy, ProcessingMode};
use ndarray::Array2;
use tracing::debug;

use super::grid::DemGrid;
use super::node::Cell;

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<i32>;
    type Params = ProcessingMode;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a depression-free DEM"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        flow_direction_with(&input, params)
    }
}

/// Calculate D8 flow direction from a DEM.
///
/// No depression handling happens here: on a DEM that still has pits, the
/// pit cells point at their least-rising neighbor. Use
/// [`depit`](super::depit) to get both rasters from raw elevations.
///
/// # Returns
/// `Raster<i32>` of flow codes with `NOVALUE` as no-data and the geometry
/// of `dem`
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<i32>> {
    flow_direction_with(dem, ProcessingMode::default())
}

/// [`flow_direction`] with an explicit processing mode
pub fn flow_direction_with(dem: &Raster<f64>, mode: ProcessingMode) -> Result<Raster<i32>> {
    let grid = DemGrid::from_raster(dem)?;
    let executor = mode.executor()?;
    flow_raster(&grid, dem, &executor, &LogProgress::new())
}

/// Final D8 pass over `grid`, one row per task.
pub(crate) fn flow_raster(
    grid: &DemGrid,
    template: &Raster<f64>,
    executor: &Executor,
    progress: &dyn ProgressMonitor,
) -> Result<Raster<i32>> {
    let (rows, cols) = (grid.rows(), grid.cols());

    progress.begin_task("Calculating flow directions...", rows);
    let codes: Vec<i32> = executor
        .par_map(0..rows, |row| {
            let line: Vec<i32> = (0..cols)
                .map(|col| grid.node(Cell::new(row, col)).steepest_descent())
                .collect();
            progress.worked(1);
            line
        })
        .into_iter()
        .flatten()
        .collect();
    progress.done();

    debug!(rows, cols, "flow directions computed");

    let mut output = template.with_same_meta::<i32>(rows, cols);
    output.set_nodata(Some(NOVALUE));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), codes).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
