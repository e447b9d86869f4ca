//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging through `tracing`; the subscriber is installed by
//!   the binary, not by this library
//! - Metrics are cheap atomic updates behind the `metrics` facade, exposed
//!   by a Prometheus exporter on its own listener
//! - Request IDs flow through all subsystems via tower-http
//! - Token values and full session ids never appear in logs or labels

pub mod metrics;
