use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use opmeter_core::error::{OpMeterError, Result};
use opmeter_core::{ContextRegistry, MeasurementContext};

/// A named unit of work measured by the dispatcher.
#[async_trait]
pub trait OperationService: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(&self, metrics: &mut MeasurementContext, input: Value) -> Result<Value>;
}

/// Registry and dispatcher for operation services. Every dispatch runs
/// inside its own activation named after the service.
#[derive(Default)]
pub struct Dispatcher {
    services: DashMap<&'static str, Arc<dyn OperationService>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    pub fn register(&self, svc: Arc<dyn OperationService>) {
        self.services.insert(svc.name(), svc);
    }

    pub fn registered(&self) -> Vec<&'static str> {
        self.services.iter().map(|e| *e.key()).collect()
    }

    pub async fn dispatch(
        &self,
        registry: &ContextRegistry,
        name: &str,
        identity: Option<&str>,
        input: Value,
    ) -> Result<Value> {
        let handler = self
            .services
            .get(name)
            .ok_or_else(|| OpMeterError::UnknownOperation(name.to_string()))?
            .value()
            .clone();

        let mut act = registry.activate(handler.name());
        if let Some(user) = identity {
            act.set_identity_user_id(user);
        }

        let result = handler.handle(&mut act, input).await;
        if let Err(e) = &result {
            tracing::debug!(svc = handler.name(), error = %e, "operation failed");
            if let Err(tally_err) = act.add_exception(e.code().as_str()) {
                tracing::warn!(svc = handler.name(), error = %tally_err, "could not tally operation failure");
            }
        }
        act.conclude(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use opmeter_core::MemorySink;

    /// Closes its own context, then fails.
    struct EarlyCloser;

    #[async_trait]
    impl OperationService for EarlyCloser {
        fn name(&self) -> &'static str {
            "closer"
        }

        async fn handle(&self, metrics: &mut MeasurementContext, _input: Value) -> Result<Value> {
            metrics.increment("attempts")?;
            metrics.close()?;
            Err(OpMeterError::BadRequest("work failed".into()))
        }
    }

    #[tokio::test]
    async fn work_error_survives_service_closing_its_context() {
        let sink = Arc::new(MemorySink::new());
        let registry = ContextRegistry::new(sink.clone());
        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(EarlyCloser));

        let err = dispatcher
            .dispatch(&registry, "closer", None, Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, OpMeterError::BadRequest(ref m) if m == "work failed"));

        let recs = sink.records();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0]["counters"]["attempts"], 1);
        assert_eq!(recs[0]["exceptions"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn unknown_operation_opens_no_context() {
        let sink = Arc::new(MemorySink::new());
        let registry = ContextRegistry::new(sink.clone());
        let err = Dispatcher::new()
            .dispatch(&registry, "missing", None, Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code().as_str(), "UNKNOWN_OPERATION");
        assert!(sink.is_empty());
    }
}
