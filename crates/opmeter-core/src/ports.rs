//! Injected collaborators: clock, id generator, and record sink.
//!
//! The core never reaches for wall-clock time, randomness, or a logger on its
//! own. Everything goes through these traits so hosts and tests can swap them.

use std::sync::Mutex;

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{OpMeterError, Result};

/// Wall-clock source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System UTC clock, truncated to microseconds so that emitted timestamps
/// and `total_time` agree exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// Unique-id source for correlation ids.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Random (v4) UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV4;

impl IdGenerator for UuidV4 {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Receiver of serialized measurement records (one JSON line each).
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: &str) -> Result<()>;
}

/// Emits each record as an info-level `tracing` event.
///
/// `tracing` targets must be static, so the configured logger name travels
/// as the `logger` field instead.
#[derive(Debug, Clone)]
pub struct TracingSink {
    logger: String,
}

impl TracingSink {
    pub const TARGET: &'static str = "opmeter::record";

    pub fn new(logger: impl Into<String>) -> Self {
        Self { logger: logger.into() }
    }

    pub fn logger(&self) -> &str {
        &self.logger
    }
}

impl RecordSink for TracingSink {
    fn emit(&self, record: &str) -> Result<()> {
        tracing::info!(target: "opmeter::record", logger = %self.logger, "{record}");
        Ok(())
    }
}

/// In-memory sink that keeps every emitted line. Meant for tests and for
/// hosts that want to inspect records directly.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|l| l.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Lines parsed back into JSON values; unparseable lines are skipped.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: &str) -> Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| OpMeterError::Sink("memory sink lock poisoned".into()))?;
        lines.push(record.to_string());
        Ok(())
    }
}
