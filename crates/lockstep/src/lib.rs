//! # Lockstep
//!
//! Drives a fixed set of worker threads through synchronized cycles on a
//! [`CycleBarrier`](lockstep_core::CycleBarrier).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   RunConfig    ┌───────────────────────────────────┐
//! │ CLI / TOML   │──────────────> │ Run (driver)                      │
//! └──────────────┘                │  spawn N ─ gate ─ await ─ join    │
//!                                 └───────┬───────────────▲───────────┘
//!                                         │ Arc<Barrier>  │ CycleRecords
//!                    ┌────────────────────┼───────────────┼──────────┐
//!                    ▼                    ▼               │          ▼
//!              ┌──────────┐         ┌──────────┐          │    ┌──────────┐
//!              │ Worker 0 │         │ Worker 1 │   ...    │    │ Worker N │
//!              └────┬─────┘         └────┬─────┘          │    └────┬─────┘
//!                   └──────── sync(cycle) ┴──── CycleBarrier ───────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: run configuration, TOML loading
//! - `worker`: the per-thread cycle loop and local workloads
//! - `run`: spawn/join driver
//! - `report`: per-cycle records and after-the-fact verification
//! - `cli`: argument parsing for the `lockstep` binary

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod report;
pub mod run;
pub mod worker;

pub use config::RunConfig;
pub use error::{ConfigError, ConfigResult, RunError, RunResult};
pub use report::RunReport;
pub use run::{run_draws, Run};
pub use worker::{CycleRecord, DelaySeed, Idle, PseudoDelay, Worker, WorkerId, WorkerSummary, Workload};

pub use lockstep_core::{BarrierStats, CycleBarrier, RandomDraw, SeededDraws};
