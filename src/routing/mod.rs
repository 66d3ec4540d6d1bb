//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → router.rs (public / protected / unclassified lookup)
//!     → matcher.rs (prefix and extension conditions)
//!
//! Table compilation (at startup and on reload):
//!     RoutesConfig
//!     → compile prefix and static-asset matchers
//!     → freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Tables compiled once, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path always yields the same class

pub mod matcher;
pub mod router;

pub use router::{RouteClass, RouteTable};
