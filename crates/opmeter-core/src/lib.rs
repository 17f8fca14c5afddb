//! opmeter core: per-operation measurement contexts.
//!
//! A [`MeasurementContext`] accumulates counters and exception tallies for a
//! single operation and emits one JSON summary record when it closes. The
//! [`ContextRegistry`] hands out contexts bound to the caller's correlation
//! id, and [`Activation`] guarantees each one is closed exactly once.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Instrumentation
//! must never take down the process it observes, so every fallible path
//! surfaces as `OpMeterError`/`Result`, and drop-time closes only log.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod activation;
pub mod context;
pub mod correlation;
pub mod error;
pub mod ports;
pub mod record;
pub mod registry;

pub use activation::Activation;
pub use context::MeasurementContext;
pub use error::{ErrorCode, OpMeterError, Result};
pub use ports::{Clock, IdGenerator, MemorySink, RecordSink, SystemClock, TracingSink, UuidV4};
pub use record::{MeasurementRecord, Tally, TallyValue};
pub use registry::{ContextRegistry, RegistryBuilder};
