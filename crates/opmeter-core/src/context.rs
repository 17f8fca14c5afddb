//! MeasurementContext: the mutable record of one in-flight operation.
//!
//! A context is owned by exactly one execution unit and mutated through
//! `&mut self`, so no locking is involved. Lifecycle is `Open -> Closed`;
//! only the first close serializes and emits.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{OpMeterError, Result};
use crate::ports::{Clock, RecordSink};
use crate::record::{MeasurementRecord, Tally};

pub struct MeasurementContext {
    correlation_id: String,
    name: String,
    identity_user_id: Option<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    counters: Tally<i64>,
    exceptions: Tally<u64>,
    is_open: bool,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn RecordSink>,
}

impl MeasurementContext {
    /// Open a context; `start_time` is taken from `clock` immediately.
    pub fn new(
        name: impl Into<String>,
        correlation_id: impl Into<String>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let start_time = clock.now();
        Self {
            correlation_id: correlation_id.into(),
            name: name.into(),
            identity_user_id: None,
            start_time,
            end_time: None,
            counters: Tally::new(),
            exceptions: Tally::new(),
            is_open: true,
            clock,
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
    pub fn identity_user_id(&self) -> Option<&str> {
        self.identity_user_id.as_deref()
    }
    pub fn is_open(&self) -> bool {
        self.is_open
    }
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }
    pub fn counters(&self) -> &Tally<i64> {
        &self.counters
    }
    pub fn exceptions(&self) -> &Tally<u64> {
        &self.exceptions
    }
    pub fn count(&self, event: &str) -> Option<i64> {
        self.counters.get(event)
    }
    pub fn exception_count(&self, kind: &str) -> Option<u64> {
        self.exceptions.get(kind)
    }

    pub fn set_identity_user_id(&mut self, id: impl Into<String>) {
        self.identity_user_id = Some(id.into());
    }

    /// Add `amount` to the `event` counter. On overflow the counter keeps
    /// its previous value and `CounterOverflow` is returned.
    pub fn add_count(&mut self, event: &str, amount: i64) -> Result<()> {
        self.ensure_open()?;
        match self.counters.add(event, amount) {
            Some(_) => Ok(()),
            None => Err(self.overflow(event)),
        }
    }

    pub fn increment(&mut self, event: &str) -> Result<()> {
        self.add_count(event, 1)
    }

    /// Tally one occurrence of an exception kind.
    pub fn add_exception(&mut self, kind: &str) -> Result<()> {
        self.ensure_open()?;
        match self.exceptions.add(kind, 1) {
            Some(_) => Ok(()),
            None => Err(self.overflow(kind)),
        }
    }

    /// Tally one occurrence under the short type name of `E`.
    pub fn add_exception_type<E: ?Sized>(&mut self) -> Result<()> {
        self.add_exception(short_type_name::<E>())
    }

    /// Tally an error value by its type name.
    pub fn add_error<E: ?Sized>(&mut self, _err: &E) -> Result<()> {
        self.add_exception_type::<E>()
    }

    /// Close the context and emit its record. Only the first call does any
    /// work; later calls return `Ok(())` without emitting.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open {
            return Ok(());
        }
        let now = self.clock.now();
        // A clock stepping backwards must not produce a negative duration.
        self.end_time = Some(now.max(self.start_time));
        self.is_open = false;

        let line = self.build_record()?.to_json()?;
        self.sink.emit(&line)
    }

    /// The record as emitted at close, or `None` while still open.
    pub fn record(&self) -> Option<MeasurementRecord> {
        if self.is_open {
            return None;
        }
        self.build_record().ok()
    }

    fn build_record(&self) -> Result<MeasurementRecord> {
        let end = self
            .end_time
            .ok_or_else(|| OpMeterError::Internal("record requested before close".into()))?;
        Ok(MeasurementRecord::new(
            &self.correlation_id,
            &self.name,
            self.identity_user_id.as_deref(),
            self.start_time,
            end,
            &self.counters,
            &self.exceptions,
        ))
    }

    /// Close from a teardown path: sink errors and sink panics are logged,
    /// never propagated.
    pub(crate) fn close_quietly(&mut self, origin: &'static str) {
        if !self.is_open {
            return;
        }
        match panic::catch_unwind(AssertUnwindSafe(|| self.close())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(name = %self.name, guid = %self.correlation_id, origin, error = %e, "measurement close failed");
            }
            Err(_) => {
                tracing::warn!(name = %self.name, guid = %self.correlation_id, origin, "record sink panicked during close");
            }
        }
    }

    fn overflow(&self, key: &str) -> OpMeterError {
        OpMeterError::CounterOverflow {
            name: self.name.clone(),
            key: key.to_string(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(OpMeterError::ContextClosed { name: self.name.clone() })
        }
    }
}

impl std::fmt::Debug for MeasurementContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementContext")
            .field("correlation_id", &self.correlation_id)
            .field("name", &self.name)
            .field("identity_user_id", &self.identity_user_id)
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("counters", &self.counters)
            .field("exceptions", &self.exceptions)
            .field("is_open", &self.is_open)
            .finish()
    }
}

/// Best-effort close for contexts discarded while still open. Never panics;
/// sink failures are logged and dropped.
impl Drop for MeasurementContext {
    fn drop(&mut self) {
        self.close_quietly("drop");
    }
}

/// `my_crate::errors::ValueError<T>` -> `ValueError`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
