//! opmeter gateway library entry.
//!
//! A reference host for the measurement core: an axum HTTP service whose
//! middleware measures every request and whose dispatcher measures every
//! operation. Consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
pub mod transport;
