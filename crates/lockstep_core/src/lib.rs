//! # Lockstep Core
//!
//! A cyclic rendezvous barrier for a fixed set of worker threads.
//!
//! Every cycle, all `N` participants block until the last one arrives. The
//! last arrival is implicitly elected leader: it runs the value-producing
//! step exactly once, publishes the result and wakes everyone. All `N`
//! callers return the same value for that cycle.
//!
//! ## Architecture Rules
//!
//! 1. **One lock** - all barrier state lives behind a single mutex
//! 2. **No coordinator thread** - the leader is whoever arrives last
//! 3. **Fail fast** - out-of-order or surplus calls are programmer errors and panic
//!
//! ## Example
//!
//! ```rust
//! use lockstep_core::CycleBarrier;
//!
//! let mut next = 0u64;
//! let barrier = CycleBarrier::new(1, move || {
//!     next += 10;
//!     next
//! })
//! .unwrap();
//!
//! assert_eq!(barrier.sync(0), 10);
//! assert_eq!(barrier.sync(1), 20);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod sync;
pub mod value;

pub use sync::{
    BarrierError, BarrierSnapshot, BarrierStats, BarrierTransition, CycleBarrier, SyncOutcome,
    TransitionKind, TransitionObserver, ValueGenerator,
};
pub use value::{RandomDraw, SeededDraws};
