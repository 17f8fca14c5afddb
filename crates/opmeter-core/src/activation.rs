//! Scoped activation: guaranteed close around a unit of work.
//!
//! [`Activation`] owns a context and closes it when the scope ends, whether
//! that is an explicit [`Activation::finish`], normal drop, an early `?`
//! return, a panic unwinding through it, or an async task being cancelled
//! while the guard lives in its future. Errors from the wrapped work are
//! never swallowed.

use std::ops::{Deref, DerefMut};

use crate::context::MeasurementContext;
use crate::error::{OpMeterError, Result};
use crate::registry::ContextRegistry;

pub struct Activation {
    ctx: MeasurementContext,
}

impl Activation {
    pub fn new(ctx: MeasurementContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &MeasurementContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut MeasurementContext {
        &mut self.ctx
    }

    /// Close now and surface sink failures to the caller.
    pub fn finish(mut self) -> Result<()> {
        self.ctx.close()
    }

    /// Close, then hand back the work's result.
    ///
    /// The work's own error always wins. A close failure is only returned
    /// when the work itself succeeded.
    pub fn conclude<T, E>(mut self, result: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<OpMeterError>,
    {
        let closed = self.ctx.close();
        match (result, closed) {
            (Ok(v), Ok(())) => Ok(v),
            (Ok(_), Err(e)) => Err(E::from(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(name = %self.ctx.name(), error = %close_err, "measurement close failed after work error");
                Err(e)
            }
        }
    }
}

impl Deref for Activation {
    type Target = MeasurementContext;

    fn deref(&self) -> &MeasurementContext {
        &self.ctx
    }
}

impl DerefMut for Activation {
    fn deref_mut(&mut self) -> &mut MeasurementContext {
        &mut self.ctx
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        if !self.ctx.is_open() {
            return;
        }
        if std::thread::panicking() {
            tracing::debug!(name = %self.ctx.name(), "closing measurement during unwind");
        }
        self.ctx.close_quietly("scope exit");
    }
}

impl ContextRegistry {
    /// Open a context named `name` under a scope guard.
    pub fn activate(&self, name: &str) -> Activation {
        Activation::new(self.create_context(name))
    }

    /// Run `f` inside an activation named `name`.
    ///
    /// The context is closed before the result is returned; `f`'s error is
    /// propagated unchanged.
    pub fn measure<T, E, F>(&self, name: &str, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut MeasurementContext) -> std::result::Result<T, E>,
        E: From<OpMeterError>,
    {
        let mut act = self.activate(name);
        let result = f(act.context_mut());
        act.conclude(result)
    }
}
