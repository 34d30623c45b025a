//! # Barrier Error Types

use thiserror::Error;

/// Errors that can occur when building a [`CycleBarrier`](super::CycleBarrier).
///
/// Misuse of a live barrier (out-of-order or surplus `sync` calls) is not
/// reported here: that is a programmer error and panics.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierError {
    /// A barrier needs at least one participant.
    #[error("thread count must be at least 1")]
    ZeroThreads,
}
