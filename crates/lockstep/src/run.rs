//! # Run Driver
//!
//! Spawns one thread per worker, joins them all, and collects the report.
//!
//! ```text
//! spawn worker 0..N ──> each parks on the start gate
//!        │
//!        ├─ any spawn fails ──> close gate, workers exit untouched,
//!        │                      join them, return RunError::Spawn
//!        ▼
//! open gate (N tokens) ──> workers run all cycles
//!        │
//! wait for N exit notices ──> a panicked worker aborts the run
//!        ▼
//! join all ──> RunReport
//! ```
//!
//! The gate exists because the barrier cannot be cancelled: a missing
//! worker would leave every other worker parked forever.

use std::io;
use std::sync::Arc;
use std::thread::{self, Builder, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use lockstep_core::{CycleBarrier, RandomDraw, SeededDraws, ValueGenerator};

use crate::config::RunConfig;
use crate::error::{ConfigError, RunError, RunResult};
use crate::report::RunReport;
use crate::worker::{CycleRecord, PseudoDelay, Worker, WorkerId, WorkerSummary, Workload};

/// Sent by every worker thread as it exits, normally or by unwinding.
struct ExitNotice {
    worker: WorkerId,
    tx: Sender<WorkerExit>,
}

#[derive(Clone, Copy, Debug)]
struct WorkerExit {
    worker: WorkerId,
    panicked: bool,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.tx.send(WorkerExit {
            worker: self.worker,
            panicked: thread::panicking(),
        });
    }
}

/// Prepares the thread for one worker. An `Err` counts as a failed spawn.
pub type ThreadConfig = Box<dyn FnMut(WorkerId) -> io::Result<Builder>>;

/// Default worker thread: named `lockstep-worker-N`, default stack.
fn named_thread(id: WorkerId) -> io::Result<Builder> {
    Ok(Builder::new().name(format!("lockstep-worker-{id}")))
}

/// A configured run, ready to execute.
pub struct Run<T, W> {
    config: RunConfig,
    barrier: Arc<CycleBarrier<T>>,
    workload: Arc<W>,
    thread_config: ThreadConfig,
}

impl<T, W> Run<T, W>
where
    T: Clone + Send + 'static,
    W: Workload<T> + 'static,
{
    /// Builds a run with a fresh barrier sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Config`] if `config` fails validation.
    pub fn new<G>(config: RunConfig, generator: G, workload: W) -> RunResult<Self>
    where
        G: ValueGenerator<T> + 'static,
    {
        config.validate()?;
        let barrier = CycleBarrier::shared(config.thread_count, generator)?;
        Ok(Self {
            config,
            barrier,
            workload: Arc::new(workload),
            thread_config: Box::new(named_thread),
        })
    }

    /// Builds a run around an existing barrier (e.g. one with an observer).
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Config`] if `config` fails validation, the
    /// barrier is sized for a different thread count, or the barrier has
    /// already seen arrivals (workers always start at cycle 0).
    pub fn with_barrier(config: RunConfig, barrier: Arc<CycleBarrier<T>>, workload: W) -> RunResult<Self> {
        config.validate()?;
        if barrier.thread_count() != config.thread_count {
            return Err(ConfigError::BarrierMismatch {
                configured: config.thread_count,
                barrier: barrier.thread_count(),
            }
            .into());
        }
        let snapshot = barrier.snapshot();
        if snapshot.generation != 0 || snapshot.waiting_count != 0 {
            return Err(ConfigError::BarrierInUse {
                generation: snapshot.generation,
                waiting: snapshot.waiting_count,
            }
            .into());
        }
        Ok(Self {
            config,
            barrier,
            workload: Arc::new(workload),
            thread_config: Box::new(named_thread),
        })
    }

    /// Replaces how each worker's thread is prepared (name, stack size).
    ///
    /// If `thread_config` fails for a worker, the run stops exactly as if
    /// the OS had refused to spawn it.
    #[must_use]
    pub fn with_thread_config<F>(mut self, thread_config: F) -> Self
    where
        F: FnMut(WorkerId) -> io::Result<Builder> + 'static,
    {
        self.thread_config = Box::new(thread_config);
        self
    }

    /// Returns the run's configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Returns the shared barrier.
    #[inline]
    #[must_use]
    pub fn barrier(&self) -> &Arc<CycleBarrier<T>> {
        &self.barrier
    }

    /// Runs every worker through every cycle.
    ///
    /// # Errors
    ///
    /// - [`RunError::Spawn`] if a worker thread cannot be created. No
    ///   worker will have entered the barrier.
    /// - [`RunError::WorkerPanicked`] if a worker dies. Its peers may be
    ///   left parked; their threads are detached.
    pub fn execute(mut self) -> RunResult<RunReport<T>> {
        let started = Instant::now();
        let thread_count = self.config.thread_count;
        let cycle_count = self.config.cycle_count;

        tracing::info!("run starting: {} threads, {} cycles", thread_count, cycle_count);

        let (record_tx, record_rx) = unbounded::<CycleRecord<T>>();
        let (exit_tx, exit_rx) = unbounded::<WorkerExit>();
        let (gate_tx, gate_rx) = unbounded::<()>();

        // Grows with each successful spawn; the OS bounds it, not the config.
        let mut handles: Vec<(WorkerId, JoinHandle<Option<WorkerSummary>>)> = Vec::new();
        for index in 0..thread_count {
            let id = WorkerId(index);
            let worker = Worker::new(
                id,
                Arc::clone(&self.barrier),
                Arc::clone(&self.workload),
                cycle_count,
                record_tx.clone(),
            );

            let spawned = (self.thread_config)(id)
                .and_then(|builder| Self::spawn_worker(builder, worker, gate_rx.clone(), exit_tx.clone()));
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(source) => {
                    tracing::error!("failed to create worker {}: {}", id, source);
                    // Closing the gate releases the spawned workers without
                    // letting any of them reach the barrier.
                    drop(gate_tx);
                    for (_, handle) in handles {
                        let _ = handle.join();
                    }
                    return Err(RunError::Spawn { worker: id, source });
                }
            }
        }
        drop(record_tx);
        drop(exit_tx);

        for _ in 0..thread_count {
            // Receivers are alive until every worker exits.
            let _ = gate_tx.send(());
        }

        Self::await_exits(&exit_rx, thread_count)?;

        // The gate sender is still alive here, so every worker was released
        // and returns a summary.
        let mut workers = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.join() {
                Ok(Some(summary)) => {
                    tracing::debug!("worker {} returned after {} cycles", id, summary.cycles);
                    workers.push(summary);
                }
                Ok(None) => {}
                Err(_) => {
                    tracing::error!("worker {} panicked", id);
                    return Err(RunError::WorkerPanicked { worker: id });
                }
            }
        }

        let records: Vec<CycleRecord<T>> = record_rx.try_iter().collect();
        let stats = self.barrier.stats();
        let elapsed = started.elapsed();

        tracing::info!(
            "run finished in {:?}: {} values generated, {} arrivals parked",
            elapsed,
            stats.generations,
            stats.parked
        );

        Ok(RunReport::new(thread_count, cycle_count, records, workers, stats, elapsed))
    }

    fn spawn_worker(
        builder: Builder,
        worker: Worker<T, W>,
        gate: Receiver<()>,
        exits: Sender<WorkerExit>,
    ) -> io::Result<JoinHandle<Option<WorkerSummary>>> {
        let id = worker.id();
        builder.spawn(move || {
            let _notice = ExitNotice { worker: id, tx: exits };
            if gate.recv().is_err() {
                tracing::debug!("worker {} released without running", id);
                return None;
            }
            Some(worker.run())
        })
    }

    /// Waits until every worker has exited. Returns early on the first
    /// panic, since the survivors can never reach quorum again.
    fn await_exits(exits: &Receiver<WorkerExit>, thread_count: usize) -> RunResult<()> {
        for _ in 0..thread_count {
            let Ok(exit) = exits.recv() else {
                break;
            };
            if exit.panicked {
                tracing::error!("worker {} panicked, aborting run", exit.worker);
                return Err(RunError::WorkerPanicked { worker: exit.worker });
            }
        }
        Ok(())
    }
}

/// Runs the default workload: seeded random draws, pseudo-delayed work.
///
/// # Errors
///
/// Same as [`Run::new`] and [`Run::execute`].
pub fn run_draws(config: RunConfig) -> RunResult<RunReport<RandomDraw>> {
    let generator = SeededDraws::new(config.seed);
    let workload = PseudoDelay::new(config.work_unit());
    Run::new(config, generator, workload)?.execute()
}
