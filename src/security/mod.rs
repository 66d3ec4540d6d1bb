//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → csrf.rs (double-submit check on state-changing methods)
//!     → client_ip.rs + rate_limit.rs (per-IP quota, counter in a cookie)
//!     → cookies.rs (auth cookie presence, cookie writes)
//!     → headers.rs (security headers on every response)
//! ```
//!
//! # Design Decisions
//! - Every check is a pure function of the request and the clock
//! - Fail closed on CSRF, fail open on an unreadable rate-limit cookie
//! - No server-side state shared between requests

pub mod client_ip;
pub mod cookies;
pub mod csrf;
pub mod headers;
pub mod rate_info;
pub mod rate_limit;
