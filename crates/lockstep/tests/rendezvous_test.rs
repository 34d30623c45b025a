//! # Rendezvous Verification Tests
//!
//! End-to-end checks of the barrier protocol through the run driver:
//!
//! 1. **Once per cycle**: the generator runs exactly M times, never N×M
//! 2. **Rendezvous**: every worker sees the same value for a cycle
//! 3. **Bounded counters**: `waiting_count` stays in `[0, N]` on every transition
//! 4. **Monotonic cycles**: `current_cycle` takes `0..M` once each, in order
//! 5. **Deadlock-freedom**: N ∈ {1, 2, 8} × M ∈ {1, 5, 50} within a time budget
//!
//! Run with: cargo test -p lockstep --test rendezvous_test

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use lockstep::{CycleBarrier, Idle, PseudoDelay, Run, RunConfig, RunReport};
use lockstep_core::{BarrierTransition, TransitionKind};
use parking_lot::Mutex;

const TIME_BUDGET: Duration = Duration::from_secs(30);

fn config(thread_count: usize, cycle_count: u64) -> RunConfig {
    RunConfig {
        thread_count,
        cycle_count,
        work_unit_us: 0,
        ..RunConfig::default()
    }
}

/// Generator returning `cycle × 10`, counting its own invocations.
fn tens(calls: &Arc<AtomicU64>) -> impl FnMut() -> u64 + Send {
    let calls = Arc::clone(calls);
    move || calls.fetch_add(1, Ordering::SeqCst) * 10
}

/// Runs on a helper thread and fails the test if it overruns the budget.
fn run_with_budget<T, F>(run: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(run());
    });
    rx.recv_timeout(TIME_BUDGET)
        .expect("run did not complete within the time budget (deadlock?)")
}

fn assert_rendezvous(report: &RunReport<u64>, threads: usize, cycles: u64) {
    report.verify().expect("every cycle must be seen identically by every worker");
    assert_eq!(report.records().len(), threads * cycles as usize);
    for cycle in 0..cycles {
        let values = report.values_for(cycle);
        assert_eq!(values.len(), threads);
        assert!(values.iter().all(|v| **v == cycle * 10), "cycle {cycle}: {values:?}");
    }
}

// ============================================================================
// SCENARIO: N = 3, M = 5, value = cycle × 10
// ============================================================================

#[test]
fn verify_three_threads_five_cycles() {
    let calls = Arc::new(AtomicU64::new(0));
    let generator = tens(&calls);

    let report = run_with_budget(move || {
        Run::new(config(3, 5), generator, Idle)
            .unwrap()
            .execute()
            .unwrap()
    });

    assert_rendezvous(&report, 3, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5, "generator must run 5 times, not 15");
    assert_eq!(report.stats().generations, 5);
    assert_eq!(report.leaders().len(), 5);

    let expected: Vec<u64> = vec![0, 10, 20, 30, 40];
    for worker in 0..3 {
        let seen: Vec<u64> = report
            .records()
            .iter()
            .filter(|r| r.worker.index() == worker)
            .map(|r| r.value)
            .collect();
        assert_eq!(seen, expected, "worker {worker} log");
    }
}

#[test]
fn verify_scenario_with_real_delays() {
    // Same scenario, but workers finish each cycle at different times so
    // the fast ones race ahead into the next cycle.
    let calls = Arc::new(AtomicU64::new(0));
    let generator = tens(&calls);

    let report = run_with_budget(move || {
        Run::new(config(3, 5), generator, PseudoDelay::new(Duration::from_micros(50)))
            .unwrap()
            .execute()
            .unwrap()
    });

    assert_rendezvous(&report, 3, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

// ============================================================================
// BOUNDARY: N = 1
// ============================================================================

#[test]
fn verify_single_thread_never_waits() {
    let calls = Arc::new(AtomicU64::new(0));
    let generator = tens(&calls);

    let report = run_with_budget(move || {
        Run::new(config(1, 20), generator, Idle)
            .unwrap()
            .execute()
            .unwrap()
    });

    assert_rendezvous(&report, 1, 20);
    let stats = report.stats();
    assert_eq!(stats.generations, 20);
    assert_eq!(stats.parked, 0, "a lone thread is always the last arrival");
    assert_eq!(stats.wakeups, 0);
    assert!(report.records().iter().all(|r| r.leader));
}

// ============================================================================
// INSTRUMENTED: invariants on every transition
// ============================================================================

#[test]
fn verify_invariants_on_every_transition() {
    const THREADS: usize = 6;
    const CYCLES: u64 = 40;

    let calls = Arc::new(AtomicU64::new(0));
    let log: Arc<Mutex<Vec<BarrierTransition>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);

    let barrier = Arc::new(
        CycleBarrier::new(THREADS, tens(&calls))
            .unwrap()
            .with_observer(move |t: &BarrierTransition| {
                assert!(t.snapshot.waiting_count <= t.snapshot.thread_count);
                sink.lock().push(*t);
            }),
    );

    let report = run_with_budget(move || {
        Run::with_barrier(config(THREADS, CYCLES), barrier, PseudoDelay::new(Duration::from_micros(10)))
            .unwrap()
            .execute()
            .unwrap()
    });
    assert_rendezvous(&report, THREADS, CYCLES);

    let log = log.lock();
    let mut last = None;
    let mut published = Vec::new();
    for transition in log.iter() {
        let current = transition.snapshot.current_cycle;
        assert!(current >= last, "current_cycle decreased: {last:?} -> {current:?}");
        if let (Some(prev), Some(now)) = (last, current) {
            assert!(now - prev <= 1, "current_cycle jumped: {prev} -> {now}");
        }
        last = current;

        if transition.kind == TransitionKind::Published {
            published.push(transition.iteration);
        }
    }
    assert_eq!(published, (0..CYCLES).collect::<Vec<_>>());
    assert_eq!(calls.load(Ordering::SeqCst), CYCLES);
}

// ============================================================================
// DEADLOCK-FREEDOM GRID
// ============================================================================

#[test]
fn verify_deadlock_freedom_grid() {
    for threads in [1usize, 2, 8] {
        for cycles in [1u64, 5, 50] {
            let calls = Arc::new(AtomicU64::new(0));
            let generator = tens(&calls);

            let report = run_with_budget(move || {
                Run::new(config(threads, cycles), generator, Idle)
                    .unwrap()
                    .execute()
                    .unwrap()
            });

            assert_rendezvous(&report, threads, cycles);
            assert_eq!(
                calls.load(Ordering::SeqCst),
                cycles,
                "N = {threads}, M = {cycles}: generator count"
            );
        }
    }
}

// ============================================================================
// DEFAULT DRIVER: seeded random draws
// ============================================================================

#[test]
fn verify_seeded_draws_shared_by_all() {
    let report = run_with_budget(|| lockstep::run_draws(config(4, 12)).unwrap());

    report.verify().unwrap();
    assert_eq!(report.stats().generations, 12);
    for cycle in 0..12 {
        let values = report.values_for(cycle);
        assert!(values.iter().all(|draw| draw.bits < (1 << 31)));
    }
}
