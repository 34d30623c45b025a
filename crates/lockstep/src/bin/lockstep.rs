//! # Lockstep
//!
//! N threads cooperate on M cycles. Each cycle needs one new random number,
//! and every thread must use the same number for that cycle. Whichever
//! thread arrives last draws it.
//!
//! ## Usage
//!
//! ```bash
//! lockstep                 # 3 threads, 5 cycles
//! lockstep -n 8 -c 50 -u 0 # no per-cycle delay
//! lockstep --config run.toml
//! ```

use std::path::Path;
use std::process::ExitCode;

use lockstep::cli::{self, Command, HELP, USAGE};
use lockstep::{PseudoDelay, RandomDraw, Run, RunConfig, SeededDraws, WorkerId, Workload};

/// Prints each cycle's value before doing the delayed work.
struct Narrated(PseudoDelay);

impl Workload<RandomDraw> for Narrated {
    fn work(&self, worker: WorkerId, cycle: u64, value: &RandomDraw) {
        println!("worker {worker} at work: I = {cycle}, L = {}, F = {}", value.bits, value.value);
        self.0.work(worker, cycle, value);
    }
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("lockstep")
        .to_owned()
}

fn execute(config: RunConfig) -> Result<(), lockstep::RunError> {
    let generator = SeededDraws::new(config.seed);
    let workload = Narrated(PseudoDelay::new(config.work_unit()));
    let report = Run::new(config, generator, workload)?.execute()?;

    for summary in report.workers() {
        println!(
            "worker {} returned after {} cycles ({} as leader)",
            summary.worker, summary.cycles, summary.leader_cycles
        );
    }

    report.verify()?;

    let stats = report.stats();
    println!();
    println!("Generator ran {} times for {} cycles", stats.generations, report.cycle_count());
    println!("Arrivals: {} total, {} parked", stats.arrivals, stats.parked);
    println!("Elapsed:  {:.3} ms", report.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

fn main() -> ExitCode {
    let program = program_name();

    let options = match cli::parse_args_os(std::env::args_os().skip(1)) {
        Ok(Command::Help) => {
            println!("Usage: {program} {USAGE}");
            print!("{HELP}");
            return ExitCode::SUCCESS;
        }
        Ok(Command::Run(options)) => options,
        Err(e) => {
            eprintln!("{program}: {e}");
            eprintln!("Usage: {program} {USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let config = match options.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{program}: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("Threads = {}, Cycles = {}", config.thread_count, config.cycle_count);

    match execute(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{program}: FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}
