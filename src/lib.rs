//! Edge request guard for the owner dashboard.

pub mod config;
pub mod guard;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;

pub use config::GuardConfig;
pub use guard::{Guard, Outcome, Rejection, Verdict};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
