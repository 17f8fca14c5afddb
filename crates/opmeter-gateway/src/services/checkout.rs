use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use opmeter_core::error::{OpMeterError, Result};
use opmeter_core::MeasurementContext;

use crate::dispatch::OperationService;

#[derive(Debug, Deserialize)]
struct Cart {
    items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
struct LineItem {
    sku: String,
    qty: i64,
}

/// Sum a cart's quantities. Empty carts and non-positive quantities are
/// tallied as `ValueError`, totals beyond `i64` as `OverflowError`; all are
/// rejected.
pub struct CheckoutService;

impl CheckoutService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CheckoutService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperationService for CheckoutService {
    fn name(&self) -> &'static str {
        "checkout"
    }

    async fn handle(&self, metrics: &mut MeasurementContext, input: Value) -> Result<Value> {
        let cart: Cart = serde_json::from_value(input)
            .map_err(|e| OpMeterError::BadRequest(format!("invalid cart: {e}")))?;

        if cart.items.is_empty() {
            metrics.add_exception("ValueError")?;
            return Err(OpMeterError::BadRequest("cart is empty".into()));
        }

        let mut total: i64 = 0;
        for item in &cart.items {
            if item.qty <= 0 {
                metrics.add_exception("ValueError")?;
                return Err(OpMeterError::BadRequest(format!("invalid qty for {}", item.sku)));
            }
            total = match total.checked_add(item.qty) {
                Some(t) => t,
                None => {
                    metrics.add_exception("OverflowError")?;
                    return Err(OpMeterError::BadRequest("cart quantity overflows".into()));
                }
            };
            metrics.add_count("items", item.qty)?;
        }
        metrics.add_count("lines", cart.items.len() as i64)?;

        Ok(json!({ "lines": cart.items.len(), "items": total }))
    }
}
