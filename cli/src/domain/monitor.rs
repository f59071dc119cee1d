//! Monitor domain types and the pure restart decision.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use std::time::{Duration, Instant};

use crate::domain::error::MonitorError;

// ── Constants ────────────────────────────────────────────────────────────────

/// A non-zero exit faster than this is treated as a crash loop.
pub const FAST_FAILURE_THRESHOLD: Duration = Duration::from_secs(1);

/// Delay inserted before restarting a crash-looping command.
pub const CRASH_LOOP_DELAY: Duration = Duration::from_secs(5);

/// Default bind address of the health endpoint.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":3000";

/// Name under which restarts are exported; the exposition adds `_total`.
pub const RESTARTS_METRIC: &str = "cs_monitor_restarts";

/// Label recorded once at startup, before any exit code is known.
pub const ALIVE_LABEL: &str = "";

// ── Restart budget ───────────────────────────────────────────────────────────

/// How many times the command may be restarted after its first run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartBudget {
    /// Restart forever.
    Unlimited,
    /// Restart at most this many times (total executions = n + 1).
    Limited(u32),
}

impl RestartBudget {
    /// Build a budget from the `--max-restarts` flag value.
    ///
    /// Any negative value means unlimited; the CLI only lets `-1` through.
    #[must_use]
    pub fn from_flag(max_restarts: i64) -> Self {
        match u32::try_from(max_restarts) {
            Ok(n) => Self::Limited(n),
            Err(_) if max_restarts < 0 => Self::Unlimited,
            Err(_) => Self::Limited(u32::MAX),
        }
    }

    /// Whether the budget is spent once attempt `attempt` (0-based) has finished.
    #[must_use]
    pub fn exhausted_after(self, attempt: u32) -> bool {
        match self {
            Self::Unlimited => false,
            Self::Limited(max) => attempt >= max,
        }
    }
}

// ── Execution record ─────────────────────────────────────────────────────────

/// One finished run of the supervised command. Never stored.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRecord {
    pub start_time: Instant,
    pub duration: Duration,
    pub exit_code: i32,
    pub attempt: u32,
}

impl ExecutionRecord {
    /// Metric label for this run's exit code.
    #[must_use]
    pub fn exit_label(&self) -> String {
        self.exit_code.to_string()
    }

    /// A non-zero exit that happened too fast to have done real work.
    #[must_use]
    pub fn is_fast_failure(&self) -> bool {
        self.exit_code != 0 && self.duration < FAST_FAILURE_THRESHOLD
    }
}

// ── Decision ─────────────────────────────────────────────────────────────────

/// What the control loop does after an attempt finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Start the next attempt right away.
    Restart,
    /// Sleep, then start the next attempt.
    Backoff(Duration),
    /// The restart budget is spent.
    Stop,
}

/// Decide what follows `record` under `budget`.
///
/// Budget exhaustion wins over backoff, so the final attempt never sleeps.
#[must_use]
pub fn decide_next(record: &ExecutionRecord, budget: RestartBudget) -> NextStep {
    if budget.exhausted_after(record.attempt) {
        NextStep::Stop
    } else if record.is_fast_failure() {
        NextStep::Backoff(CRASH_LOOP_DELAY)
    } else {
        NextStep::Restart
    }
}

// ── Listen address ───────────────────────────────────────────────────────────

/// Normalise a `host:port` bind address.
///
/// An empty host (`:3000`) binds every interface.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidAddress`] if there is no port or the port
/// is not a number.
pub fn normalize_listen_address(address: &str) -> Result<String, MonitorError> {
    let invalid = || MonitorError::InvalidAddress(address.to_string());
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    port.parse::<u16>().map_err(|_| invalid())?;
    if host.is_empty() {
        Ok(format!("0.0.0.0:{port}"))
    } else {
        Ok(address.to_string())
    }
}
