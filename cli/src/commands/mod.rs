//! Command implementations

pub mod monitor;
pub mod version;
