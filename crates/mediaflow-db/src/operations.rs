//! Database operations.

pub mod executions;
pub mod queue;
pub mod records;
pub mod stats;
