//! # depit algorithms
//!
//! Depression removal and D8 flow directions for depit.
//!
//! ## Available Algorithm Categories
//!
//! - **hydrology**: pit filling with flat resolution, D8 flow direction

pub mod hydrology;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        depit, flow_direction, flow_direction_with, DepitOutcome, DepitParams, DepitResult,
        Depitter, FlowDirection,
    };
    pub use depit_core::prelude::*;
    pub use depit_parallel::ProcessingMode;
}
