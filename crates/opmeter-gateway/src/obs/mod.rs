//! Request-level measurement hooks.
//!
//! The middleware is the host side of the begin/end contract: it opens a
//! correlation scope and a measurement context per request and guarantees
//! the context closes on every response path, including cancellation.

pub mod middleware;

pub use middleware::measure_request;
