//! # Run Error Types
//!
//! Everything that can stop a run before or after the workers start.
//! Protocol violations inside the barrier are not here: those panic.

use std::io;
use std::path::PathBuf;

use lockstep_core::BarrierError;
use thiserror::Error;

use crate::worker::WorkerId;

/// Errors detected while building a [`RunConfig`](crate::RunConfig).
///
/// All of these are caught before any thread is spawned.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `thread_count` was zero.
    #[error("number of threads should be at least 1")]
    ZeroThreads,

    /// `cycle_count` was zero.
    #[error("number of cycles should be at least 1")]
    ZeroCycles,

    /// A pre-built barrier was sized for a different number of workers.
    #[error("barrier expects {barrier} threads but the run is configured for {configured}")]
    BarrierMismatch {
        /// Configured worker count.
        configured: usize,
        /// The barrier's participant count.
        barrier: usize,
    },

    /// A pre-built barrier has already been used. Workers start at cycle 0,
    /// so they would all be rejected as out of order.
    #[error("barrier already in use: {generation} cycles published, {waiting} threads waiting")]
    BarrierInUse {
        /// Cycles the barrier has already published.
        generation: u64,
        /// Threads currently parked in it.
        waiting: usize,
    },

    /// The config file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for a run.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that abort a run.
///
/// There is no partial-failure mode: either every worker completes every
/// cycle, or the run ends with one of these.
#[derive(Error, Debug)]
pub enum RunError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The barrier could not be built.
    #[error("barrier: {0}")]
    Barrier(#[from] BarrierError),

    /// The OS refused to create a worker thread.
    #[error("failed to create worker {worker}: {source}")]
    Spawn {
        /// The worker that could not be started.
        worker: WorkerId,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A worker panicked. Its peers are left parked in the barrier.
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// The worker that died.
        worker: WorkerId,
    },

    /// A cycle did not get one record from every worker.
    #[error("cycle {cycle}: expected {expected} records, found {found}")]
    MissingRecords {
        /// The incomplete cycle.
        cycle: u64,
        /// Records expected (the thread count).
        expected: usize,
        /// Records found.
        found: usize,
    },

    /// Two workers returned different values for the same cycle.
    #[error("cycle {cycle}: worker {worker} saw a different value than worker {reference}")]
    Divergence {
        /// The cycle where values differ.
        cycle: u64,
        /// Worker whose value was used as reference.
        reference: WorkerId,
        /// Worker whose value differs.
        worker: WorkerId,
    },
}

/// Result type for runs.
pub type RunResult<T> = Result<T, RunError>;
