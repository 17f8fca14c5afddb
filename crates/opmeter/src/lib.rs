//! Top-level facade crate for opmeter.
//!
//! Re-exports the measurement core and the reference gateway so users can
//! depend on a single crate.

pub mod core {
    pub use opmeter_core::*;
}

pub mod gateway {
    pub use opmeter_gateway::*;
}

pub use opmeter_core::{Activation, ContextRegistry, MeasurementContext, OpMeterError};
