//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → router.rs (ordered prefix lookup)
//!     → Return: matched Route or NoMatch
//!
//! Route Compilation (at startup):
//!     BackendRouteConfig[]
//!     → Sort by priority
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path (segment-aligned prefix matching only)
//! - Deterministic: same path always matches the same route
//! - First match wins (ordered by priority, then config order)

pub mod router;

pub use router::{Route, RouteTable};
