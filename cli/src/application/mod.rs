//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra` or
//! `crate::commands`.

pub mod ports;
pub mod services;

pub use ports::{Clock, ProcessRunner, RestartRecorder};
