//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Monitor errors ────────────────────────────────────────────────────────────

/// Errors raised by the monitor (process supervisor) subsystem.
///
/// Only `Spawn`, `Wait` and `Bind` are fatal at runtime. `Interrupted` is the
/// clean-shutdown path and never surfaces as a program-level error.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no command specified")]
    NoCommand,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' was interrupted by shutdown")]
    Interrupted { program: String },

    #[error("failed to listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid listen address '{0}': expected host:port")]
    InvalidAddress(String),

    #[error("failed to read CA certificate file {}: {source}", path.display())]
    CaCertRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no PEM certificates found in {}", .0.display())]
    CaCertEmpty(PathBuf),
}

impl MonitorError {
    /// Returns `true` when this error means the wait was cut short by shutdown.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}
