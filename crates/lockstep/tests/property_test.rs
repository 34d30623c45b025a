//! # Property Tests
//!
//! For random small N and M, a full run publishes exactly M values and
//! every worker observes every one of them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lockstep::{Idle, PseudoDelay, Run, RunConfig};
use proptest::prelude::*;

fn config(thread_count: usize, cycle_count: u64) -> RunConfig {
    RunConfig {
        thread_count,
        cycle_count,
        work_unit_us: 0,
        ..RunConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_generator_runs_once_per_cycle(threads in 1usize..=6, cycles in 1u64..=20) {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);

        let report = Run::new(config(threads, cycles), move || counter.fetch_add(1, Ordering::SeqCst), Idle)
            .unwrap()
            .execute()
            .unwrap();

        prop_assert_eq!(calls.load(Ordering::SeqCst), cycles);
        prop_assert_eq!(report.stats().generations, cycles);
        prop_assert_eq!(report.stats().arrivals, cycles * threads as u64);
        prop_assert!(report.verify().is_ok());
    }

    #[test]
    fn prop_one_leader_per_cycle(threads in 1usize..=5, cycles in 1u64..=10, seed in any::<u64>()) {
        let run_config = RunConfig { seed, ..config(threads, cycles) };
        let report = Run::new(
            run_config,
            lockstep::SeededDraws::new(seed),
            PseudoDelay::new(Duration::from_micros(1)),
        )
        .unwrap()
        .execute()
        .unwrap();

        let leaders = report.leaders();
        prop_assert_eq!(leaders.len() as u64, cycles);
        for (index, (cycle, _)) in leaders.iter().enumerate() {
            prop_assert_eq!(*cycle, index as u64);
        }
        let led: u64 = report.workers().iter().map(|w| w.leader_cycles).sum();
        prop_assert_eq!(led, cycles);
    }
}
