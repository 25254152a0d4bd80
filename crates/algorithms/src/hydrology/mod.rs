//! Hydrological conditioning of Digital Elevation Models
//!
//! - Depitter: iterative pit filling with flat resolution, producing a
//!   depression-free surface and its D8 flow directions
//! - Flow direction: D8 steepest descent on a surface that already drains
//!
//! The building blocks (grid access, pit scans, pool growth, flattening)
//! are public so that each step can be inspected on its own.

pub mod depitter;
pub mod flats;
pub mod flow_direction;
pub mod grid;
pub mod node;
pub mod pit_pool;
pub mod pit_scan;

pub use depitter::{depit, DepitOutcome, DepitParams, DepitResult, Depitter};
pub use flow_direction::{flow_direction, flow_direction_with, FlowDirection};
pub use grid::DemGrid;
pub use node::{Cell, GridNode};
pub use pit_pool::PitPool;
