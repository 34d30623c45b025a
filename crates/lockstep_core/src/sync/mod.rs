//! # Cycle Rendezvous
//!
//! ## The Problem
//!
//! ```text
//! N worker threads run M cycles.
//! Every cycle needs ONE fresh shared value (e.g. a random draw).
//! Every worker must see the SAME value for a given cycle.
//!
//! Plain barrier:        everyone meets, nobody computes anything
//! Per-thread compute:   N values per cycle → workers disagree
//! Coordinator thread:   extra thread, extra hop per cycle
//! ```
//!
//! ## The Solution: Last Arrival Computes
//!
//! ```text
//! cycle i:
//!   T0 ──arrive──┐ (park)
//!   T1 ──arrive──┤ (park)
//!   T2 ──arrive──┴─> waiting == N → T2 is leader
//!                    generate() once, publish, notify_all
//!   T0, T1, T2 all return the published value
//! ```
//!
//! The election test and the publish happen under one lock, so exactly
//! one caller per cycle sees itself as the last arrival.

mod cycle_barrier;
mod error;
mod generator;

pub use cycle_barrier::{
    BarrierSnapshot,
    BarrierStats,
    BarrierTransition,
    CycleBarrier,
    SyncOutcome,
    TransitionKind,
    TransitionObserver,
};
pub use error::BarrierError;
pub use generator::ValueGenerator;
