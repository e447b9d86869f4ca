//! Edge gateway library.
//!
//! Terminates user-facing HTTP traffic and runs every request through a
//! fixed-order security pipeline before anything reaches an internal
//! service.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────────┐
//!                    │                   EDGE GATEWAY                      │
//!                    │                                                     │
//!  Client Request    │  ┌─────────┐   ┌──────────┐   ┌──────┐   ┌──────┐  │
//!  ──────────────────┼─▶│ headers │──▶│  policy  │──▶│ csrf │──▶│ rate │  │
//!                    │  │  shim   │   │ (+OIDC)  │   │guard │   │ key  │  │
//!                    │  └─────────┘   └────┬─────┘   └──────┘   └──┬───┘  │
//!                    │                     │                        │      │
//!                    │                     ▼                        ▼      │
//!                    │               ┌──────────┐            ┌──────────┐ │
//!                    │               │ session  │            │  token   │ │
//!                    │               │  store   │            │  bucket  │ │
//!                    │               └──────────┘            └────┬─────┘ │
//!                    │                                            │       │
//!  Client Response   │  ┌──────────────┐   ┌─────────────────┐    ▼       │
//!  ◀─────────────────┼──│   fallback   │◀──│   forwarding    │◀───────────┼──── Upstream
//!                    │  │  synthesis   │   │ (route table)   │            │     Services
//!                    │  └──────────────┘   └─────────────────┘            │
//!                    │                                                     │
//!                    │  cross-cutting: config, observability, lifecycle    │
//!                    └────────────────────────────────────────────────────┘
//! ```
//!
//! Login, logout and the identity endpoint are answered by the gateway
//! itself; the identity provider stays an opaque external OAuth2/OIDC
//! server reached through its standard endpoints.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Security pipeline
pub mod oidc;
pub mod security;
pub mod session;
pub mod web;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
