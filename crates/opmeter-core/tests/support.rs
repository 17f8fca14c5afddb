//! Deterministic clock and id doubles shared by lifecycle/property tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use opmeter_core::{Clock, ContextRegistry, IdGenerator, MemorySink};

/// Clock that advances by a fixed step (microseconds) on every read.
pub struct TickClock {
    base: DateTime<Utc>,
    step_us: i64,
    ticks: AtomicI64,
}

impl TickClock {
    pub fn new(step_us: i64) -> Self {
        Self {
            base: Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap(),
            step_us,
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for TickClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.ticks.fetch_add(1, Ordering::Relaxed);
        self.base + chrono::Duration::microseconds(n * self.step_us)
    }
}

/// Sequential ids: `corr-0`, `corr-1`, ...
#[derive(Default)]
pub struct SeqIds(AtomicU64);

impl IdGenerator for SeqIds {
    fn new_id(&self) -> String {
        format!("corr-{}", self.0.fetch_add(1, Ordering::Relaxed))
    }
}

pub fn registry(step_us: i64) -> (ContextRegistry, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let reg = ContextRegistry::builder(sink.clone())
        .clock(Arc::new(TickClock::new(step_us)))
        .ids(Arc::new(SeqIds::default()))
        .build();
    (reg, sink)
}
