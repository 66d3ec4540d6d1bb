//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware/guard.rs (guard verdict: continue / redirect / reject)
//!     → session routes (login, logout, refresh) or
//!     → upstream.rs (forward to the dashboard)
//!     → guard headers and cookies applied to the response
//! ```

pub mod middleware;
pub mod server;
pub mod upstream;

pub use server::{AppState, HttpServer};
