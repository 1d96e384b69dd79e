//! Runs programs on a worker thread under a wall-clock timeout and step limit.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::{Interpreter, ScrewtapeError, StepControl};

pub const TIMEOUT_ENV: &str = "SCREWTAPE_TIMEOUT_MS";
pub const MAX_STEPS_ENV: &str = "SCREWTAPE_MAX_STEPS";
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Resolved execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub timeout_ms: u64,
    pub max_steps: Option<usize>,
}

impl Limits {
    /// Resolve limits: flags -> env -> config file -> defaults.
    pub fn resolve(timeout_flag: Option<u64>, max_steps_flag: Option<u64>, config: &Config) -> Self {
        let timeout_ms = timeout_flag
            .or_else(|| env_u64(TIMEOUT_ENV))
            .or(config.limits.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let max_steps = max_steps_flag
            .or_else(|| env_u64(MAX_STEPS_ENV))
            .or(config.limits.max_steps)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX));

        let limits = Self { timeout_ms, max_steps };
        debug!(?limits, "resolved execution limits");
        limits
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("ignoring {name}={raw:?}: not a non-negative integer");
            None
        }
    }
}

/// Failures of the worker itself, as opposed to the program it ran.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Execution aborted: wall-clock timeout exceeded ({timeout_ms} ms)")]
    TimedOut { timeout_ms: u64 },

    #[error("Execution aborted: interpreter thread exited without a result")]
    WorkerLost,
}

/// What came back from the worker thread.
#[derive(Debug)]
pub struct Outcome {
    pub interpreter: Interpreter,
    pub result: Result<String, ScrewtapeError>,
}

/// Execute `program` against `interpreter` on a worker thread.
///
/// With `debug` set, the step table is written to stdout as the program runs.
/// The interpreter is handed back unless the run timed out.
pub fn run_bounded(
    mut interpreter: Interpreter,
    program: String,
    limits: Limits,
    debug: bool,
) -> Result<Outcome, RunError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<Outcome>();
    let ctrl = StepControl::new(limits.max_steps, cancel.clone());

    thread::spawn(move || {
        let result = if debug {
            let mut stdout = io::stdout().lock();
            interpreter.execute_debug_with_control(&program, &mut stdout, &ctrl)
        } else {
            interpreter.execute_with_control(&program, &ctrl)
        };
        let _ = tx.send(Outcome { interpreter, result });
    });

    match rx.recv_timeout(Duration::from_millis(limits.timeout_ms)) {
        Ok(outcome) => Ok(outcome),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            debug!(timeout_ms = limits.timeout_ms, "worker timed out; cancelling");
            Err(RunError::TimedOut { timeout_ms: limits.timeout_ms })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(RunError::WorkerLost),
    }
}
