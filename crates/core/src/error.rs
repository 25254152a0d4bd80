//! Error types for depit

use thiserror::Error;

/// Main error type for depit operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unresolvable cell at ({row}, {col}): no finite drain reachable")]
    UnresolvableCell { row: usize, col: usize },

    #[error("Depression removal did not converge within {rounds} rounds")]
    NotConverged { rounds: usize },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for depit operations
pub type Result<T> = std::result::Result<T, Error>;
