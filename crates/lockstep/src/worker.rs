//! # Worker Loop
//!
//! ```text
//! for cycle in 0..cycle_count {
//!     value = barrier.sync(cycle)     // the only suspension point
//!     workload.work(id, cycle, value) // local, touches nothing shared
//!     report CycleRecord to driver
//! }
//! ```
//!
//! Workers never talk to each other. The record channel only flows to
//! the driver, for the run report.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use lockstep_core::{CycleBarrier, RandomDraw};

/// Identity of a worker, assigned by the driver at spawn time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One worker's view of one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleRecord<T> {
    /// Who observed the value.
    pub worker: WorkerId,
    /// The cycle index.
    pub cycle: u64,
    /// The value `sync` returned.
    pub value: T,
    /// Whether this worker produced the value.
    pub leader: bool,
}

/// What a worker did over the whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerSummary {
    /// The worker.
    pub worker: WorkerId,
    /// Cycles completed.
    pub cycles: u64,
    /// Cycles in which this worker was the elected leader.
    pub leader_cycles: u64,
}

/// Bounded local work done with each cycle's value.
///
/// Must not touch state visible to other workers and must not call back
/// into the barrier.
pub trait Workload<T>: Send + Sync {
    /// Performs the work for one cycle.
    fn work(&self, worker: WorkerId, cycle: u64, value: &T);
}

/// Values that can seed a [`PseudoDelay`].
pub trait DelaySeed {
    /// Returns the bits the delay is derived from.
    fn delay_seed(&self) -> u32;
}

impl DelaySeed for RandomDraw {
    #[inline]
    fn delay_seed(&self) -> u32 {
        self.bits
    }
}

impl DelaySeed for u32 {
    #[inline]
    fn delay_seed(&self) -> u32 {
        *self
    }
}

impl DelaySeed for u64 {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn delay_seed(&self) -> u32 {
        *self as u32
    }
}

/// Number of work units for one cycle, in `0..200`.
///
/// Deterministic in the value, the cycle and the worker, so different
/// workers finish the same cycle at different times.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn pseudo_delay(seed: u32, cycle: u64, worker: WorkerId) -> u32 {
    let units = u64::from(seed & 0xFF)
        .wrapping_add(cycle.wrapping_mul(0xF))
        .wrapping_add(worker.0 as u64);
    (units % 200) as u32
}

/// Sleeps for [`pseudo_delay`] units of a fixed duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PseudoDelay {
    unit: Duration,
}

impl PseudoDelay {
    /// Creates a workload with the given unit. A zero unit never sleeps.
    #[must_use]
    pub const fn new(unit: Duration) -> Self {
        Self { unit }
    }

    /// Returns how long the workload sleeps for this cycle.
    #[must_use]
    pub fn delay_for<T: DelaySeed>(&self, worker: WorkerId, cycle: u64, value: &T) -> Duration {
        self.unit * pseudo_delay(value.delay_seed(), cycle, worker)
    }
}

impl<T: DelaySeed> Workload<T> for PseudoDelay {
    fn work(&self, worker: WorkerId, cycle: u64, value: &T) {
        let delay = self.delay_for(worker, cycle, value);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

/// No local work at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Idle;

impl<T> Workload<T> for Idle {
    #[inline]
    fn work(&self, _worker: WorkerId, _cycle: u64, _value: &T) {}
}

/// A single thread's task: drives `cycle_count` calls to `sync`, in order.
pub struct Worker<T, W> {
    id: WorkerId,
    barrier: Arc<CycleBarrier<T>>,
    workload: Arc<W>,
    cycle_count: u64,
    records: Sender<CycleRecord<T>>,
}

impl<T, W> Worker<T, W>
where
    T: Clone + Send,
    W: Workload<T>,
{
    /// Creates a worker. Nothing runs until [`run`](Self::run).
    #[must_use]
    pub fn new(
        id: WorkerId,
        barrier: Arc<CycleBarrier<T>>,
        workload: Arc<W>,
        cycle_count: u64,
        records: Sender<CycleRecord<T>>,
    ) -> Self {
        Self {
            id,
            barrier,
            workload,
            cycle_count,
            records,
        }
    }

    /// Returns this worker's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Runs every cycle to completion.
    pub fn run(self) -> WorkerSummary {
        let mut leader_cycles = 0;

        for cycle in 0..self.cycle_count {
            let outcome = self.barrier.sync_with_role(cycle);
            let leader = outcome.is_leader();
            if leader {
                leader_cycles += 1;
            }
            tracing::debug!("worker {} at work: cycle {} (leader: {})", self.id, cycle, leader);

            let value = outcome.into_value();
            self.workload.work(self.id, cycle, &value);

            // The driver keeps the receiver alive until every worker is joined.
            let _ = self.records.send(CycleRecord {
                worker: self.id,
                cycle,
                value,
                leader,
            });
        }

        WorkerSummary {
            worker: self.id,
            cycles: self.cycle_count,
            leader_cycles,
        }
    }
}
