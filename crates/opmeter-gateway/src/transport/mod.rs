//! HTTP transport surface.

pub mod operation;
