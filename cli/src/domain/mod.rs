//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod error;
pub mod forward;
pub mod monitor;

pub use error::MonitorError;
pub use forward::{ForwardTarget, TlsMode};
pub use monitor::{ExecutionRecord, NextStep, RestartBudget, decide_next};
