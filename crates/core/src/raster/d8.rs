//! D8 flow directions (standard encoding)
//!
//! ```text
//!   4  3  2
//!   5  *  1
//!   6  7  8
//! ```
//!
//! Codes 1-8 name the neighbor receiving the flow. [`OUTLET`] marks cells
//! whose flow leaves the analysis domain, [`NOVALUE`] marks undefined cells.

use serde::{Deserialize, Serialize};

/// Flow code of a cell draining out of the grid or into no-data.
pub const OUTLET: i32 = 10;

/// Flow code of a cell with no defined direction.
pub const NOVALUE: i32 = -9999;

/// One of the eight neighbor directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    E,
    NE,
    N,
    NW,
    W,
    SW,
    S,
    SE,
}

impl Direction {
    /// All directions in ascending code order.
    pub const ALL: [Direction; 8] = [
        Direction::E,
        Direction::NE,
        Direction::N,
        Direction::NW,
        Direction::W,
        Direction::SW,
        Direction::S,
        Direction::SE,
    ];

    /// Flow code in `1..=8`
    pub fn code(self) -> i32 {
        self as i32 + 1
    }

    /// Direction for a flow code, `None` for OUTLET, NOVALUE or garbage.
    pub fn from_code(code: i32) -> Option<Self> {
        if (1..=8).contains(&code) {
            Some(Self::ALL[(code - 1) as usize])
        } else {
            None
        }
    }

    /// (row_offset, col_offset)
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::E => (0, 1),
            Direction::NE => (-1, 1),
            Direction::N => (-1, 0),
            Direction::NW => (-1, -1),
            Direction::W => (0, -1),
            Direction::SW => (1, -1),
            Direction::S => (1, 0),
            Direction::SE => (1, 1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(self, Direction::NE | Direction::NW | Direction::SW | Direction::SE)
    }

    /// Distance to the neighbor in this direction for the given cell size.
    pub fn distance(self, cell_width: f64, cell_height: f64) -> f64 {
        if self.is_diagonal() {
            return cell_width.hypot(cell_height);
        }
        match self {
            Direction::E | Direction::W => cell_width,
            _ => cell_height,
        }
    }
}

/// Whether a flow code is one of the eight directions.
pub fn is_direction(code: i32) -> bool {
    Direction::from_code(code).is_some()
}
