//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`
//! or `crate::commands`.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::domain::MonitorError;

// ── Clock Port ────────────────────────────────────────────────────────────────

/// Source of time for the control loop, so backoff can be tested without
/// real waiting.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Current monotonic time.
    fn now(&self) -> Instant;
    /// Suspend for at least `duration`. Returns immediately for a zero duration.
    async fn sleep(&self, duration: Duration);
}

// ── Process Runner Port ───────────────────────────────────────────────────────

/// Runs the supervised command to completion.
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    /// Run `argv[0]` with the remaining elements as arguments and return its
    /// exit code. The child's output is streamed to the parent's streams.
    ///
    /// `cancel` does not kill the child; it only changes how a failed wait is
    /// reported.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::NoCommand`] if `argv` is empty.
    /// - [`MonitorError::Spawn`] if the process cannot be started.
    /// - [`MonitorError::Interrupted`] if waiting fails after `cancel` fired.
    /// - [`MonitorError::Wait`] if waiting fails otherwise.
    async fn execute(&self, cancel: &CancellationToken, argv: &[String])
    -> Result<i32, MonitorError>;
}

// ── Metrics Port ──────────────────────────────────────────────────────────────

/// Counts finished runs by exit code. Must be safe to call while the counts
/// are being read from another task.
pub trait RestartRecorder {
    /// Increment the counter for `exit_code_label`.
    fn increment_restart(&self, exit_code_label: &str);
}
