use std::net::SocketAddr;

use axum::http::HeaderName;
use serde::Deserialize;
use opmeter_core::error::{OpMeterError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(OpMeterError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            OpMeterError::BadRequest(format!("gateway.listen must be a socket address: {e}"))
        })
    }
}

/// How the request middleware names its measurement context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameBy {
    /// Matched route template, e.g. `/v1/ops/:svc`.
    #[default]
    Route,
    /// Raw request path, e.g. `/v1/ops/checkout`.
    Path,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Logger name attached to every emitted record.
    #[serde(default = "default_logger")]
    pub logger: String,

    /// Request header carrying the caller's identity user id.
    #[serde(default)]
    pub identity_header: Option<String>,

    #[serde(default)]
    pub name_by: NameBy,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            logger: default_logger(),
            identity_header: None,
            name_by: NameBy::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if self.logger.trim().is_empty() {
            return Err(OpMeterError::BadRequest("metrics.logger must not be empty".into()));
        }
        if let Some(h) = &self.identity_header {
            HeaderName::from_bytes(h.as_bytes()).map_err(|_| {
                OpMeterError::BadRequest(format!("metrics.identity_header is not a valid header name: {h}"))
            })?;
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_logger() -> String {
    "metrics".into()
}
