//! Application service: the monitor control loop.
//!
//! Runs a command over and over, counting exits by code and slowing down
//! commands that crash immediately. Cancellation is only checked between
//! attempts: an in-flight run or backoff sleep is never interrupted.

use tokio_util::sync::CancellationToken;

use crate::application::ports::{Clock, ProcessRunner, RestartRecorder};
use crate::domain::{ExecutionRecord, MonitorError, NextStep, RestartBudget, decide_next};

/// Why the control loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Every allowed attempt has run.
    BudgetExhausted { attempts: u32 },
    /// Shutdown was requested.
    Cancelled { attempts: u32 },
}

impl MonitorOutcome {
    /// Number of times the command was started.
    #[must_use]
    pub fn attempts(self) -> u32 {
        match self {
            Self::BudgetExhausted { attempts } | Self::Cancelled { attempts } => attempts,
        }
    }
}

/// Sequential process supervisor. At most one child runs at a time.
pub struct Supervisor<R, C, M> {
    runner: R,
    clock: C,
    metrics: M,
    budget: RestartBudget,
}

impl<R, C, M> Supervisor<R, C, M>
where
    R: ProcessRunner,
    C: Clock,
    M: RestartRecorder,
{
    #[must_use]
    pub fn new(runner: R, clock: C, metrics: M, budget: RestartBudget) -> Self {
        Self {
            runner,
            clock,
            metrics,
            budget,
        }
    }

    /// Run `argv` until the restart budget is spent or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NoCommand`] for an empty `argv`, and the
    /// runner's error if the command cannot be started or waited on. Non-zero
    /// exit codes are never errors.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        argv: &[String],
    ) -> Result<MonitorOutcome, MonitorError> {
        if argv.is_empty() {
            return Err(MonitorError::NoCommand);
        }
        let command = argv.join(" ");
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                tracing::info!(attempts = attempt, "shutdown observed, not restarting");
                return Ok(MonitorOutcome::Cancelled { attempts: attempt });
            }

            let start_time = self.clock.now();
            tracing::info!(attempt, command = %command, "starting command");

            let exit_code = match self.runner.execute(cancel, argv).await {
                Ok(code) => code,
                Err(e) if e.is_interrupted() => {
                    tracing::info!(attempt, "command interrupted by shutdown");
                    return Ok(MonitorOutcome::Cancelled {
                        attempts: attempt + 1,
                    });
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "error executing command");
                    return Err(e);
                }
            };

            let record = ExecutionRecord {
                start_time,
                duration: self.clock.now().saturating_duration_since(start_time),
                exit_code,
                attempt,
            };
            tracing::info!(
                attempt,
                exit_code,
                duration_ms = u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
                "command exited"
            );
            self.metrics.increment_restart(&record.exit_label());

            match decide_next(&record, self.budget) {
                NextStep::Stop => {
                    tracing::info!(attempts = attempt + 1, "restart budget exhausted");
                    return Ok(MonitorOutcome::BudgetExhausted {
                        attempts: attempt + 1,
                    });
                }
                NextStep::Backoff(delay) => {
                    tracing::warn!(
                        attempt,
                        exit_code,
                        delay_secs = delay.as_secs(),
                        "command failed quickly, delaying restart"
                    );
                    self.clock.sleep(delay).await;
                }
                NextStep::Restart => {}
            }

            attempt = attempt.saturating_add(1);
        }
    }
}
