//! Elevation buffer with the geometry needed for D8 neighbor queries

use depit_core::raster::d8::Direction;
use depit_core::raster::{Raster, RasterElement};
use depit_core::{Error, Result};
use ndarray::Array2;

use super::node::{Cell, GridNode};

/// Mutable elevation grid owned by the depitter for the duration of a run.
///
/// Reads go through [`GridNode`]s; writes only happen between rounds, when
/// the updates computed for each pit pool are applied.
#[derive(Debug, Clone)]
pub struct DemGrid {
    data: Array2<f64>,
    nodata: Option<f64>,
    distances: [f64; 8],
}

impl DemGrid {
    /// Copy the elevations of `dem`, rejecting rasters the algorithm cannot work on.
    pub fn from_raster(dem: &Raster<f64>) -> Result<Self> {
        let (rows, cols) = dem.shape();
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let cell_width = dem.cell_width();
        let cell_height = dem.cell_height();
        check_resolution("cell_width", cell_width)?;
        check_resolution("cell_height", cell_height)?;

        let mut distances = [0.0; 8];
        for dir in Direction::ALL {
            distances[dir as usize] = dir.distance(cell_width, cell_height);
        }

        Ok(Self {
            data: dem.data().clone(),
            nodata: dem.nodata(),
            distances,
        })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn elevation(&self, cell: Cell) -> f64 {
        self.data[(cell.row, cell.col)]
    }

    #[inline]
    pub(crate) fn set_elevation(&mut self, cell: Cell, value: f64) {
        self.data[(cell.row, cell.col)] = value;
    }

    /// Whether `value` is real data (neither NaN nor the sentinel)
    #[inline]
    pub fn is_valid_value(&self, value: f64) -> bool {
        !value.is_nodata(self.nodata)
    }

    /// Neighbor of `cell` in direction `dir`, `None` when it falls off the grid.
    #[inline]
    pub fn offset(&self, cell: Cell, dir: Direction) -> Option<Cell> {
        let (dr, dc) = dir.offset();
        let row = cell.row.checked_add_signed(dr)?;
        let col = cell.col.checked_add_signed(dc)?;
        (row < self.rows() && col < self.cols()).then_some(Cell { row, col })
    }

    /// Center-to-center distance towards `dir`
    #[inline]
    pub fn distance(&self, dir: Direction) -> f64 {
        self.distances[dir as usize]
    }

    pub fn node(&self, cell: Cell) -> GridNode<'_> {
        GridNode::new(self, cell)
    }

    /// Hand the elevations back as a raster with the geometry of `template`.
    pub fn into_raster(self, template: &Raster<f64>) -> Raster<f64> {
        let mut out = template.with_same_meta::<f64>(self.rows(), self.cols());
        out.set_nodata(template.nodata());
        *out.data_mut() = self.data;
        out
    }
}

fn check_resolution(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: "cell size must be positive and finite".to_string(),
        })
    }
}
