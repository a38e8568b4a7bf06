//! Debug binary for concurrent arrive/depart workloads.
//!
//! Hammers one tree from many threads, reports threads that stop making
//! progress, and validates the tree invariant at the end.
//!
//! Run with:
//! ```bash
//! RUST_LOG=mindicator=debug cargo run --features tracing
//!
//! # Custom shape and load
//! MINDICATOR_THREADS=16 MINDICATOR_OPS=200000 MINDICATOR_WIDTH=4 MINDICATOR_DEPTH=3 cargo run --release
//! ```

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use mindicator::{INFINITY, Mindicator};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Config {
    threads: usize,
    ops_per_thread: usize,
    width: usize,
    depth: usize,
    runs: usize,
}

impl Config {
    fn from_env() -> Self {
        Self {
            threads: env_or("MINDICATOR_THREADS", 8),
            ops_per_thread: env_or("MINDICATOR_OPS", 50_000),
            width: env_or("MINDICATOR_WIDTH", 4),
            depth: env_or("MINDICATOR_DEPTH", 3),
            runs: env_or("MINDICATOR_RUNS", 3),
        }
    }
}

fn env_or(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// =============================================================================
// Thread progress tracking for hang detection
// =============================================================================

struct ThreadProgress {
    /// Current operation index for each thread
    current_op: Vec<AtomicUsize>,
    /// Last time each thread made progress
    last_progress_ms: Vec<AtomicU64>,
    /// Whether each thread is done
    done: Vec<AtomicBool>,
    /// Start time
    start: Instant,
}

impl ThreadProgress {
    fn new(num_threads: usize) -> Self {
        Self {
            current_op: (0..num_threads).map(|_| AtomicUsize::new(0)).collect(),
            last_progress_ms: (0..num_threads).map(|_| AtomicU64::new(0)).collect(),
            done: (0..num_threads).map(|_| AtomicBool::new(false)).collect(),
            start: Instant::now(),
        }
    }

    fn update(&self, thread_id: usize, op: usize) {
        self.current_op[thread_id].store(op, Ordering::Relaxed);
        self.last_progress_ms[thread_id]
            .store(self.start.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn mark_done(&self, thread_id: usize) {
        self.done[thread_id].store(true, Ordering::Relaxed);
    }

    fn report_stuck(&self, timeout_ms: u64) -> Vec<(usize, usize, u64)> {
        let now_ms = self.start.elapsed().as_millis() as u64;

        (0..self.done.len())
            .filter(|&i| !self.done[i].load(Ordering::Relaxed))
            .filter_map(|i| {
                let last = self.last_progress_ms[i].load(Ordering::Relaxed);
                let stall = now_ms.saturating_sub(last);
                (stall > timeout_ms).then(|| (i, self.current_op[i].load(Ordering::Relaxed), stall))
            })
            .collect()
    }

    fn all_done(&self) -> bool {
        self.done.iter().all(|d| d.load(Ordering::Relaxed))
    }
}

// =============================================================================
// Workload: thread `t` uses leaf slot `t % max_leaves`
// =============================================================================

fn run_once(config: Config, tree: &Arc<Mindicator>) -> Duration {
    let progress = Arc::new(ThreadProgress::new(config.threads));
    let stop_watchdog = Arc::new(AtomicBool::new(false));

    // Watchdog thread to detect hangs
    let watchdog = {
        let progress = Arc::clone(&progress);
        let stop = Arc::clone(&stop_watchdog);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(500));
                for (tid, op, stall_ms) in progress.report_stuck(2000) {
                    eprintln!("!!! STUCK: Thread {tid} at op {op} for {stall_ms}ms");
                }
                if progress.all_done() {
                    break;
                }
            }
        })
    };

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let tree = Arc::clone(tree);
            let progress = Arc::clone(&progress);
            thread::spawn(move || {
                let slot = t % tree.max_leaves();
                let mut state = (t as u64).wrapping_mul(0x517c_c1b7_2722_0a95) | 1;

                for op in 0..config.ops_per_thread {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1);
                    let ts = (state >> 34) as i32;

                    progress.update(t, op);

                    if let Err(e) = tree.arrive(slot, ts) {
                        eprintln!("[T{t:02}] ERROR arrive op {op}: {e}");
                    }
                    let seen = tree.query();
                    if seen > ts {
                        eprintln!("[T{t:02}] BAD query {seen} above own value {ts}");
                    }
                    if let Err(e) = tree.depart(slot) {
                        eprintln!("[T{t:02}] ERROR depart op {op}: {e}");
                    }
                }

                progress.mark_done(t);
            })
        })
        .collect();

    for h in handles {
        let _ = h.join();
    }

    stop_watchdog.store(true, Ordering::Relaxed);
    let _ = watchdog.join();

    start.elapsed()
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    mindicator::init_tracing();

    let config = Config::from_env();
    eprintln!("Mindicator contention driver: {config:?}");

    let tree = match Mindicator::new(config.width, config.depth) {
        Ok(tree) => Arc::new(tree),
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if config.threads > tree.max_leaves() {
        eprintln!(
            "note: {} threads share {} leaf slots; shared slots may report BAD queries",
            config.threads,
            tree.max_leaves()
        );
    }

    for run in 1..=config.runs {
        let elapsed = run_once(config, &tree);
        let total = config.threads * config.ops_per_thread;

        println!(
            "run {run}/{}: {total} rounds in {elapsed:?} ({:.0} rounds/sec)",
            config.runs,
            total as f64 / elapsed.as_secs_f64()
        );

        if let Err(violation) = tree.validate() {
            eprintln!("INVARIANT BROKEN: {violation}");
            return ExitCode::FAILURE;
        }
        if tree.query() != INFINITY {
            eprintln!("tree not empty after run: root = {}", tree.query());
            return ExitCode::FAILURE;
        }
    }

    eprintln!("All runs completed!");
    ExitCode::SUCCESS
}
