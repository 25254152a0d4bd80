//! Parallel processing strategies

use depit_core::{Error, Result};
use rayon::prelude::*;

/// Processing mode for algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on rayon's global pool
    #[default]
    Parallel,
    /// Parallel with a dedicated pool of the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Build the executor for this mode.
    ///
    /// `ParallelWith` creates its thread pool once here, so a whole run
    /// shares one bounded pool.
    pub fn executor(&self) -> Result<Executor> {
        let pool = match *self {
            ProcessingMode::Sequential | ProcessingMode::Parallel => None,
            ProcessingMode::ParallelWith(0) => {
                return Err(Error::InvalidParameter {
                    name: "threads",
                    value: "0".to_string(),
                    reason: "worker pool needs at least one thread".to_string(),
                })
            }
            ProcessingMode::ParallelWith(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::Algorithm(format!("failed to build thread pool: {e}")))?,
            ),
        };
        Ok(Executor { mode: *self, pool })
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

/// A ready-to-use [`ProcessingMode`]
#[derive(Debug)]
pub struct Executor {
    mode: ProcessingMode,
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Number of workers tasks are spread over
    pub fn num_threads(&self) -> usize {
        match (&self.mode, &self.pool) {
            (ProcessingMode::Sequential, _) => 1,
            (_, Some(pool)) => pool.current_num_threads(),
            (_, None) => rayon::current_num_threads(),
        }
    }
}

impl ParallelStrategy for Executor {
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match (&self.mode, &self.pool) {
            (ProcessingMode::Sequential, _) => range.map(f).collect(),
            (_, Some(pool)) => pool.install(|| range.into_par_iter().map(f).collect()),
            (_, None) => range.into_par_iter().map(f).collect(),
        }
    }
}
