use super::progress::{Progress, ProgressReporter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Computation was cancelled")]
pub struct Cancelled;

/// Shared flag for cooperative cancellation. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// # Errors
    ///
    /// Returns [`Cancelled`] once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Pending { current: u64, total: u64 },
    Done,
}

/// Long-running work split into bounded steps.
pub trait ChunkedTask {
    type Output;
    type Error: From<Cancelled>;

    /// Performs one bounded unit of work.
    fn step(&mut self) -> Result<StepOutcome, Self::Error>;

    /// Consumes the completed task.
    fn finish(self) -> Result<Self::Output, Self::Error>;
}

/// Runs `task` to completion, checking `token` before every step and
/// reporting progress after each pending one.
///
/// # Errors
///
/// Returns the task's own error, or `Cancelled` converted into it when the
/// token is set between steps.
pub fn drive<T: ChunkedTask>(
    mut task: T,
    reporter: &ProgressReporter,
    token: &CancellationToken,
) -> Result<T::Output, T::Error> {
    let mut steps = 0usize;
    let mut started = false;
    loop {
        if token.is_cancelled() {
            debug!(steps, "Cancellation observed between steps");
            if started {
                reporter.report(Progress::TaskFinish);
            }
            return Err(Cancelled.into());
        }
        match task.step()? {
            StepOutcome::Pending { current, total } => {
                if !started {
                    reporter.report(Progress::TaskStart { total });
                    started = true;
                }
                steps += 1;
                trace!(steps, current, total, "Step complete");
                reporter.report(Progress::TaskUpdate { current, total });
            }
            StepOutcome::Done => break,
        }
    }
    if started {
        reporter.report(Progress::TaskFinish);
    }
    debug!(steps, "Task complete");
    task.finish()
}
