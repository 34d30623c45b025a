//! # Cycle Barrier
//!
//! Reusable N-party rendezvous that publishes one computed value per cycle.
//!
//! ## State Machine (per cycle)
//!
//! ```text
//!            arrive (waiting < N)
//!          ┌──────────────────────┐
//!          ▼                      │
//!   ┌──────────────┐   waiting == N   ┌──────────────────────────┐
//!   │ ACCUMULATING │ ───────────────> │ COMPUTED & BROADCASTING  │
//!   └──────────────┘                  └────────────┬─────────────┘
//!          ▲          waiting = 0, generation += 1 │
//!          └───────────────────────────────────────┘
//! ```
//!
//! ## Generations
//!
//! `waiting_count` is reset the moment quorum is reached, so a fast thread
//! can start arriving for cycle `i+1` while slow peers are still waking up
//! from cycle `i`. Parked threads therefore wait on the generation they
//! arrived in, never on the shared counter, and arrivals for different
//! cycles are never conflated.
//!
//! ## Thread Safety
//!
//! - All state sits behind one `parking_lot::Mutex`
//! - The generator and the transition observer run with that lock held
//! - `parking_lot` locks do not poison: a panic under the lock is a fatal
//!   run error, not something peers recover from

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::error::BarrierError;
use super::generator::ValueGenerator;

/// Point-in-time view of the barrier's counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrierSnapshot {
    /// Total participants, fixed at construction.
    pub thread_count: usize,
    /// Threads that have arrived for the cycle being accumulated.
    pub waiting_count: usize,
    /// Most recently published cycle, `None` before the first one.
    pub current_cycle: Option<u64>,
    /// Number of cycles published so far.
    pub generation: u64,
}

/// Counters accumulated over the barrier's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BarrierStats {
    /// Times the value-producing step ran (one per published cycle).
    pub generations: u64,
    /// Total `sync` calls that passed the protocol checks.
    pub arrivals: u64,
    /// Arrivals that were not last and had to block.
    pub parked: u64,
    /// Returns from the condition variable, spurious ones included.
    pub wakeups: u64,
}

/// Which step of the protocol a [`BarrierTransition`] reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    /// A caller incremented `waiting_count`.
    Arrived,
    /// A non-last caller is about to block.
    Parked,
    /// The leader stored the new value and reset the count.
    Published,
    /// A caller is about to return the shared value.
    Departed,
}

/// One observed state change, reported to a [`TransitionObserver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrierTransition {
    /// The protocol step.
    pub kind: TransitionKind,
    /// The iteration the calling thread passed to `sync`.
    pub iteration: u64,
    /// Barrier counters right after the step.
    pub snapshot: BarrierSnapshot,
}

/// Hook invoked on every barrier transition, with the barrier lock held.
///
/// Intended for instrumented test harnesses. Must not call back into the
/// barrier.
pub trait TransitionObserver: Send + Sync {
    /// Called once per transition.
    fn on_transition(&self, transition: &BarrierTransition);
}

impl<F> TransitionObserver for F
where
    F: Fn(&BarrierTransition) + Send + Sync,
{
    fn on_transition(&self, transition: &BarrierTransition) {
        self(transition);
    }
}

/// Value returned by [`CycleBarrier::sync_with_role`].
#[derive(Clone, Debug, PartialEq)]
pub struct SyncOutcome<T> {
    value: T,
    leader: bool,
}

impl<T> SyncOutcome<T> {
    /// Returns the shared value for the cycle.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns `true` if this caller arrived last and produced the value.
    #[inline]
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.leader
    }

    /// Consumes the outcome, returning the shared value.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

struct BarrierState<T> {
    waiting_count: usize,
    current_cycle: Option<u64>,
    generation: u64,
    shared_value: Option<T>,
    generator: Box<dyn ValueGenerator<T>>,
    stats: BarrierStats,
}

impl<T> BarrierState<T> {
    fn snapshot(&self, thread_count: usize) -> BarrierSnapshot {
        BarrierSnapshot {
            thread_count,
            waiting_count: self.waiting_count,
            current_cycle: self.current_cycle,
            generation: self.generation,
        }
    }
}

/// Cyclic rendezvous barrier with a computed per-cycle value.
///
/// `thread_count` threads each call [`sync`](Self::sync) once per cycle,
/// with cycles `0, 1, 2, ...` in order. The last arrival for a cycle runs
/// the generator exactly once; every caller for that cycle returns a clone
/// of the value it produced.
///
/// ## Usage
///
/// ```rust
/// use std::thread;
/// use lockstep_core::CycleBarrier;
///
/// let mut cycle = 0u64;
/// let barrier = CycleBarrier::shared(3, move || {
///     let value = cycle * 10;
///     cycle += 1;
///     value
/// })
/// .unwrap();
///
/// thread::scope(|s| {
///     for _ in 0..3 {
///         let barrier = &barrier;
///         s.spawn(move || {
///             for i in 0..5 {
///                 assert_eq!(barrier.sync(i), i * 10);
///             }
///         });
///     }
/// });
/// assert_eq!(barrier.stats().generations, 5);
/// ```
///
/// # Panics
///
/// `sync` panics on protocol violations: an iteration other than the
/// next unpublished cycle, or more than `thread_count` calls for one cycle.
/// A thread that never calls `sync` for a cycle leaves its peers blocked
/// forever; there is no timeout or cancellation.
pub struct CycleBarrier<T> {
    state: Mutex<BarrierState<T>>,
    published: Condvar,
    thread_count: usize,
    observer: Option<Box<dyn TransitionObserver>>,
}

impl<T: Clone> CycleBarrier<T> {
    /// Creates a barrier for `thread_count` participants.
    ///
    /// # Errors
    ///
    /// Returns [`BarrierError::ZeroThreads`] if `thread_count` is zero.
    pub fn new<G>(thread_count: usize, generator: G) -> Result<Self, BarrierError>
    where
        G: ValueGenerator<T> + 'static,
    {
        if thread_count == 0 {
            return Err(BarrierError::ZeroThreads);
        }

        Ok(Self {
            state: Mutex::new(BarrierState {
                waiting_count: 0,
                current_cycle: None,
                generation: 0,
                shared_value: None,
                generator: Box::new(generator),
                stats: BarrierStats::default(),
            }),
            published: Condvar::new(),
            thread_count,
            observer: None,
        })
    }

    /// Creates a barrier already wrapped for sharing between the driver
    /// and every worker.
    ///
    /// # Errors
    ///
    /// Returns [`BarrierError::ZeroThreads`] if `thread_count` is zero.
    pub fn shared<G>(thread_count: usize, generator: G) -> Result<Arc<Self>, BarrierError>
    where
        G: ValueGenerator<T> + 'static,
    {
        Self::new(thread_count, generator).map(Arc::new)
    }

    /// Installs a hook called on every transition, under the barrier lock.
    #[must_use]
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: TransitionObserver + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Returns the number of participants.
    #[inline]
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Returns the current counters.
    #[must_use]
    pub fn snapshot(&self) -> BarrierSnapshot {
        self.state.lock().snapshot(self.thread_count)
    }

    /// Returns the lifetime counters.
    #[must_use]
    pub fn stats(&self) -> BarrierStats {
        self.state.lock().stats
    }

    /// Blocks until all participants have arrived for `iteration`, then
    /// returns the value published for it.
    ///
    /// # Panics
    ///
    /// Panics if `iteration` is not the next unpublished cycle, or if it
    /// names a cycle that has already been published (a surplus caller).
    pub fn sync(&self, iteration: u64) -> T {
        self.sync_with_role(iteration).into_value()
    }

    /// Like [`sync`](Self::sync), but also reports whether this caller was
    /// elected to produce the value.
    ///
    /// # Panics
    ///
    /// Same conditions as [`sync`](Self::sync).
    pub fn sync_with_role(&self, iteration: u64) -> SyncOutcome<T> {
        let mut state = self.state.lock();

        if state.current_cycle == Some(iteration) {
            panic!(
                "surplus arrival for cycle {iteration}: it was already published to all {} participants",
                self.thread_count
            );
        }
        let expected = state.current_cycle.map_or(0, |cycle| cycle + 1);
        assert!(
            iteration == expected,
            "sync called out of order: iteration {iteration}, current cycle {:?}",
            state.current_cycle
        );

        state.waiting_count += 1;
        state.stats.arrivals += 1;
        debug_assert!(state.waiting_count <= self.thread_count);
        self.notify(TransitionKind::Arrived, iteration, &state);
        tracing::trace!(
            "arrive: I = {} (C = {:?}, W = {})",
            iteration,
            state.current_cycle,
            state.waiting_count
        );

        let leader = state.waiting_count == self.thread_count;
        if leader {
            let value = state.generator.generate();
            state.shared_value = Some(value);
            state.current_cycle = Some(iteration);
            state.generation = state.generation.wrapping_add(1);
            state.waiting_count = 0;
            state.stats.generations += 1;
            self.notify(TransitionKind::Published, iteration, &state);
            tracing::trace!("publish: cycle {} (generation {})", iteration, state.generation);
            self.published.notify_all();
        } else {
            let arrived_in = state.generation;
            state.stats.parked += 1;
            self.notify(TransitionKind::Parked, iteration, &state);
            tracing::trace!(
                "park: I = {} (C = {:?}, W = {})",
                iteration,
                state.current_cycle,
                state.waiting_count
            );
            while state.generation == arrived_in {
                self.published.wait(&mut state);
                state.stats.wakeups += 1;
            }
        }

        // Cycle `iteration + 1` cannot publish until this thread arrives for
        // it, so the stored value still belongs to `iteration`.
        debug_assert_eq!(state.current_cycle, Some(iteration));
        let Some(value) = state.shared_value.clone() else {
            unreachable!("cycle {iteration} published without a value");
        };

        self.notify(TransitionKind::Departed, iteration, &state);
        tracing::trace!(
            "depart: I = {} (C = {:?}, W = {}) leader = {}",
            iteration,
            state.current_cycle,
            state.waiting_count,
            leader
        );

        SyncOutcome { value, leader }
    }

    #[inline]
    fn notify(&self, kind: TransitionKind, iteration: u64, state: &BarrierState<T>) {
        if let Some(observer) = &self.observer {
            observer.on_transition(&BarrierTransition {
                kind,
                iteration,
                snapshot: state.snapshot(self.thread_count),
            });
        }
    }
}

impl<T> fmt::Debug for CycleBarrier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("CycleBarrier");
        s.field("thread_count", &self.thread_count);
        match self.state.try_lock() {
            Some(state) => s
                .field("waiting_count", &state.waiting_count)
                .field("current_cycle", &state.current_cycle)
                .field("generation", &state.generation),
            None => s.field("state", &format_args!("<locked>")),
        };
        s.finish_non_exhaustive()
    }
}
