//! Shared application state for the opmeter gateway.
//!
//! Wires the context registry (with its record sink) and the operation
//! dispatcher, and registers built-in services.

use std::sync::Arc;

use axum::http::HeaderMap;
use opmeter_core::error::Result;
use opmeter_core::{ContextRegistry, RecordSink, TracingSink};

use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::obs::middleware::header_str;
use crate::services::{CheckoutService, EchoService};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: ContextRegistry,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    cfg: GatewayConfig,
}

impl AppState {
    /// Build application state emitting records through `tracing` under the
    /// configured logger name.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let sink: Arc<dyn RecordSink> = Arc::new(TracingSink::new(cfg.metrics.logger.clone()));
        Self::with_registry(cfg, ContextRegistry::new(sink))
    }

    /// Build application state around a caller-supplied registry.
    pub fn with_registry(cfg: GatewayConfig, registry: ContextRegistry) -> Result<Self> {
        cfg.validate()?;

        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(EchoService::new()));
        dispatcher.register(Arc::new(CheckoutService::new()));
        tracing::debug!(services = ?dispatcher.registered(), "operation services registered");

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg }),
            registry,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Identity user id from the configured header, if any.
    pub fn identity_of<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let name = self.inner.cfg.metrics.identity_header.as_deref()?;
        header_str(headers, name)
    }
}
