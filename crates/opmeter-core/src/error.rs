//! Shared error type across opmeter crates.

use thiserror::Error;

/// Stable error codes (used in logs, HTTP bodies, and exception tallies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A closed measurement context was mutated.
    ContextClosed,
    /// A counter or exception tally would overflow.
    CounterOverflow,
    /// The record sink rejected a record.
    Sink,
    /// A record could not be serialized.
    Serialize,
    /// Invalid input / malformed config.
    BadRequest,
    /// Unsupported config version.
    UnsupportedVersion,
    /// No operation registered under the requested name.
    UnknownOperation,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ContextClosed => "CONTEXT_CLOSED",
            ErrorCode::CounterOverflow => "COUNTER_OVERFLOW",
            ErrorCode::Sink => "SINK",
            ErrorCode::Serialize => "SERIALIZE",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::UnknownOperation => "UNKNOWN_OPERATION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, OpMeterError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum OpMeterError {
    /// Mutation of a finished measurement. A caller bug, never retryable.
    #[error("attempted to use closed measurement context: {name}")]
    ContextClosed { name: String },
    /// Adding to a counter would overflow; the counter keeps its value.
    #[error("counter overflow in {name}: {key}")]
    CounterOverflow { name: String, key: String },
    #[error("sink failed: {0}")]
    Sink(String),
    #[error("serialize failed: {0}")]
    Serialize(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl OpMeterError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            OpMeterError::ContextClosed { .. } => ErrorCode::ContextClosed,
            OpMeterError::CounterOverflow { .. } => ErrorCode::CounterOverflow,
            OpMeterError::Sink(_) => ErrorCode::Sink,
            OpMeterError::Serialize(_) => ErrorCode::Serialize,
            OpMeterError::BadRequest(_) => ErrorCode::BadRequest,
            OpMeterError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            OpMeterError::UnknownOperation(_) => ErrorCode::UnknownOperation,
            OpMeterError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<serde_json::Error> for OpMeterError {
    fn from(e: serde_json::Error) -> Self {
        OpMeterError::Serialize(e.to_string())
    }
}
