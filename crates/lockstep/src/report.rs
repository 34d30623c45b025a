//! # Run Report
//!
//! Per-worker-per-cycle records collected by the driver, plus the barrier's
//! counters. `verify` checks the rendezvous guarantee after the fact: every
//! cycle has one record per worker, and all of them carry the same value.

use std::time::Duration;

use lockstep_core::BarrierStats;

use crate::error::{RunError, RunResult};
use crate::worker::{CycleRecord, WorkerId, WorkerSummary};

/// Outcome of a completed run.
#[derive(Clone, Debug)]
pub struct RunReport<T> {
    thread_count: usize,
    cycle_count: u64,
    records: Vec<CycleRecord<T>>,
    workers: Vec<WorkerSummary>,
    stats: BarrierStats,
    elapsed: Duration,
}

impl<T> RunReport<T> {
    pub(crate) fn new(
        thread_count: usize,
        cycle_count: u64,
        mut records: Vec<CycleRecord<T>>,
        workers: Vec<WorkerSummary>,
        stats: BarrierStats,
        elapsed: Duration,
    ) -> Self {
        records.sort_by_key(|r| (r.cycle, r.worker));
        Self {
            thread_count,
            cycle_count,
            records,
            workers,
            stats,
            elapsed,
        }
    }

    /// Returns the number of workers.
    #[inline]
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Returns the number of cycles each worker ran.
    #[inline]
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// All records, ordered by cycle, then worker.
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[CycleRecord<T>] {
        &self.records
    }

    /// Per-worker summaries, in worker order.
    #[inline]
    #[must_use]
    pub fn workers(&self) -> &[WorkerSummary] {
        &self.workers
    }

    /// Barrier counters at the end of the run.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> BarrierStats {
        self.stats
    }

    /// Wall-clock time from first spawn to last join.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the records for one cycle, in worker order.
    pub fn cycle(&self, cycle: u64) -> impl Iterator<Item = &CycleRecord<T>> {
        self.records.iter().filter(move |r| r.cycle == cycle)
    }

    /// Returns the values every worker saw for one cycle, in worker order.
    #[must_use]
    pub fn values_for(&self, cycle: u64) -> Vec<&T> {
        self.cycle(cycle).map(|r| &r.value).collect()
    }

    /// Returns the elected leader of each cycle, in cycle order.
    #[must_use]
    pub fn leaders(&self) -> Vec<(u64, WorkerId)> {
        self.records
            .iter()
            .filter(|r| r.leader)
            .map(|r| (r.cycle, r.worker))
            .collect()
    }
}

impl<T: PartialEq> RunReport<T> {
    /// Checks that every cycle was seen by every worker with one value.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::MissingRecords`] if a cycle lacks records, or
    /// [`RunError::Divergence`] if two workers disagree.
    pub fn verify(&self) -> RunResult<()> {
        for cycle in 0..self.cycle_count {
            let mut records = self.cycle(cycle);
            let found = self.cycle(cycle).count();
            if found != self.thread_count {
                return Err(RunError::MissingRecords {
                    cycle,
                    expected: self.thread_count,
                    found,
                });
            }

            let Some(reference) = records.next() else {
                continue;
            };
            if let Some(other) = records.find(|r| r.value != reference.value) {
                return Err(RunError::Divergence {
                    cycle,
                    reference: reference.worker,
                    worker: other.worker,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(worker: usize, cycle: u64, value: u64, leader: bool) -> CycleRecord<u64> {
        CycleRecord {
            worker: WorkerId(worker),
            cycle,
            value,
            leader,
        }
    }

    fn report(records: Vec<CycleRecord<u64>>) -> RunReport<u64> {
        RunReport::new(2, 2, records, Vec::new(), BarrierStats::default(), Duration::ZERO)
    }

    #[test]
    fn test_records_sorted() {
        let report = report(vec![
            record(1, 1, 10, false),
            record(0, 0, 0, true),
            record(0, 1, 10, true),
            record(1, 0, 0, false),
        ]);

        let order: Vec<_> = report.records().iter().map(|r| (r.cycle, r.worker.0)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(report.values_for(1), vec![&10, &10]);
        assert_eq!(report.leaders(), vec![(0, WorkerId(0)), (1, WorkerId(0))]);
        assert!(report.verify().is_ok());
    }

    #[test]
    fn test_verify_detects_divergence() {
        let report = report(vec![
            record(0, 0, 0, true),
            record(1, 0, 0, false),
            record(0, 1, 10, false),
            record(1, 1, 11, true),
        ]);

        match report.verify() {
            Err(RunError::Divergence { cycle, reference, worker }) => {
                assert_eq!(cycle, 1);
                assert_eq!(reference, WorkerId(0));
                assert_eq!(worker, WorkerId(1));
            }
            other => panic!("expected divergence, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_detects_missing_records() {
        let report = report(vec![record(0, 0, 0, true), record(1, 0, 0, false), record(0, 1, 10, true)]);

        match report.verify() {
            Err(RunError::MissingRecords { cycle, expected, found }) => {
                assert_eq!((cycle, expected, found), (1, 2, 1));
            }
            other => panic!("expected missing records, got {other:?}"),
        }
    }
}
