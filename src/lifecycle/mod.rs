//! Lifecycle management subsystem.
//!
//! # Design Decisions
//! - Ordered startup: config first, then state, then the listener
//! - Shutdown drains in-flight requests before the process exits
//! - One broadcast channel fans the signal out to every long-running task

pub mod shutdown;

pub use shutdown::Shutdown;
