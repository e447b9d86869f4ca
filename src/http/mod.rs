//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, filter chain in fixed order)
//!     → security pipeline (headers → policy → csrf → key → limiter)
//!     → local endpoint (/user, /logout, callback, /catalog-fallback)
//!       or forwarding to a configured upstream
//! ```

pub mod server;

pub use server::{GatewayState, HttpServer};
