//! # depit parallel
//!
//! Bounded worker pools for the data-parallel steps of depression removal:
//! per-pool flat resolution and the row-parallel D8 pass.

pub mod strategy;

pub use strategy::{Executor, ParallelStrategy, ProcessingMode};
