use async_trait::async_trait;
use serde_json::Value;

use opmeter_core::error::Result;
use opmeter_core::MeasurementContext;

use crate::dispatch::OperationService;

/// Return the input unchanged, counting its serialized size.
pub struct EchoService;

impl EchoService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EchoService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperationService for EchoService {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn handle(&self, metrics: &mut MeasurementContext, input: Value) -> Result<Value> {
        let bytes = serde_json::to_vec(&input)?.len();
        metrics.add_count("bytes", bytes as i64)?;
        Ok(input)
    }
}
