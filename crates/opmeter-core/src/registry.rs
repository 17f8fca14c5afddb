//! ContextRegistry: correlation id resolution and context construction.
//!
//! The registry holds only injected collaborators. It does not track the
//! contexts it hands out; callers own them exclusively.

use std::sync::Arc;

use crate::context::MeasurementContext;
use crate::correlation;
use crate::ports::{Clock, IdGenerator, RecordSink, SystemClock, UuidV4};

#[derive(Clone)]
pub struct ContextRegistry {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    sink: Arc<dyn RecordSink>,
}

impl ContextRegistry {
    /// Registry with the system clock and random UUIDs.
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self::builder(sink).build()
    }

    pub fn builder(sink: Arc<dyn RecordSink>) -> RegistryBuilder {
        RegistryBuilder {
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidV4),
            sink,
        }
    }

    /// Correlation id of the calling execution unit, generated and bound on
    /// first use.
    pub fn resolve_correlation_id(&self) -> String {
        correlation::resolve(self.ids.as_ref())
    }

    /// Fresh open context named `name` under the caller's correlation id.
    pub fn create_context(&self, name: &str) -> MeasurementContext {
        let guid = self.resolve_correlation_id();
        tracing::trace!(op = name, guid = %guid, "measurement context opened");
        MeasurementContext::new(name, guid, Arc::clone(&self.clock), Arc::clone(&self.sink))
    }

    pub fn sink(&self) -> Arc<dyn RecordSink> {
        Arc::clone(&self.sink)
    }
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistry").finish_non_exhaustive()
    }
}

pub struct RegistryBuilder {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    sink: Arc<dyn RecordSink>,
}

impl RegistryBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn build(self) -> ContextRegistry {
        ContextRegistry {
            clock: self.clock,
            ids: self.ids,
            sink: self.sink,
        }
    }
}
