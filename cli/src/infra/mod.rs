//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, timers,
//! metrics exposition, the health endpoint and its forwarding proxy, and OS
//! signal handling.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` are forbidden.

pub mod clock;
pub mod health;
pub mod metrics;
pub mod process;
pub mod proxy;
pub mod signals;
