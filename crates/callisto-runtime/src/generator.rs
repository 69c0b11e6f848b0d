//! Generator objects
//!
//! Calling a generator function returns a suspended [`Generator`] without running any
//! of its body. Each `next` runs the body up to its next yield under a frame named
//! after the generator function.

use crate::context::Context;
use crate::error::RuntimeError;
use crate::value::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Resumable generator body: `Ok(Some(v))` yields `v`, `Ok(None)` completes
pub type GeneratorBody = Box<dyn FnMut(&Context) -> Result<Option<Value>, RuntimeError> + Send>;

/// Lifecycle of a generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStatus {
    Suspended,
    Running,
    Completed,
}

struct GeneratorState {
    status: GeneratorStatus,
    body: Option<GeneratorBody>,
}

/// Result of one `next` call
#[derive(Debug, Clone, PartialEq)]
pub struct IterResult {
    pub value: Value,
    pub done: bool,
}

impl IterResult {
    fn done() -> Self {
        IterResult {
            value: Value::Undefined,
            done: true,
        }
    }

    /// `{ value, done }` object as hosted code sees it
    pub fn into_value(self) -> Value {
        Value::object([("value", self.value), ("done", Value::Bool(self.done))])
    }
}

/// Shared handle to a generator
#[derive(Clone)]
pub struct Generator {
    name: Arc<str>,
    state: Arc<Mutex<GeneratorState>>,
}

impl Generator {
    /// Create a suspended generator; `name` is the frame name used while it runs
    pub fn new(name: Arc<str>, body: GeneratorBody) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(GeneratorState {
                status: GeneratorStatus::Suspended,
                body: Some(body),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, GeneratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> GeneratorStatus {
        self.lock().status
    }

    pub fn is_completed(&self) -> bool {
        self.status() == GeneratorStatus::Completed
    }

    /// Run the body up to its next yield.
    pub fn next(&self, ctx: &Context) -> Result<IterResult, RuntimeError> {
        let mut body = {
            let mut state = self.lock();
            match state.status {
                GeneratorStatus::Completed => return Ok(IterResult::done()),
                GeneratorStatus::Running => {
                    return Err(RuntimeError::type_error("Generator is already running"))
                }
                GeneratorStatus::Suspended => {}
            }
            let Some(body) = state.body.take() else {
                state.status = GeneratorStatus::Completed;
                return Ok(IterResult::done());
            };
            state.status = GeneratorStatus::Running;
            body
        };

        trace!(generator = %self.name, "generator resumed");
        let running = RunningGuard { generator: self };
        let step = ctx
            .call_stack()
            .enter(Arc::clone(&self.name))
            .and_then(|_frame| body(ctx));
        std::mem::forget(running);

        let mut state = self.lock();
        match step {
            Ok(Some(value)) => {
                state.status = GeneratorStatus::Suspended;
                state.body = Some(body);
                Ok(IterResult { value, done: false })
            }
            Ok(None) => {
                state.status = GeneratorStatus::Completed;
                Ok(IterResult::done())
            }
            Err(err) => {
                state.status = GeneratorStatus::Completed;
                Err(err)
            }
        }
    }
}

/// Completes the generator if its body unwinds while running
struct RunningGuard<'a> {
    generator: &'a Generator,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.generator.lock().status = GeneratorStatus::Completed;
    }
}

impl PartialEq for Generator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(limit: u32) -> Generator {
        let mut n = 0;
        Generator::new(
            Arc::from("count"),
            Box::new(move |_: &Context| {
                if n < limit {
                    n += 1;
                    Ok(Some(Value::Number(f64::from(n))))
                } else {
                    Ok(None)
                }
            }),
        )
    }

    #[test]
    fn test_yields_then_completes() {
        let ctx = Context::new();
        let gen = counting(2);
        assert_eq!(gen.status(), GeneratorStatus::Suspended);

        let values: Vec<IterResult> = (0..4).map(|_| gen.next(&ctx).unwrap()).collect();
        assert_eq!(values[0].value, Value::Number(1.0));
        assert_eq!(values[1].value, Value::Number(2.0));
        assert!(!values[1].done);
        assert!(values[2].done);
        assert!(values[3].done);
        assert!(gen.is_completed());
    }

    #[test]
    fn test_body_runs_under_generator_frame() {
        let ctx = Context::new();
        let gen = Generator::new(
            Arc::from("walk"),
            Box::new(|ctx: &Context| {
                let trace = ctx.capture_stack_trace();
                Ok(Some(Value::Bool(trace.contains_function("walk"))))
            }),
        );
        assert_eq!(gen.next(&ctx).unwrap().value, Value::Bool(true));
        assert_eq!(ctx.call_stack().depth(), 1);
    }

    #[test]
    fn test_error_completes_generator() {
        let ctx = Context::new();
        let gen = Generator::new(
            Arc::from("fails"),
            Box::new(|_: &Context| Err(RuntimeError::type_error("bad"))),
        );
        assert!(gen.next(&ctx).is_err());
        assert!(gen.next(&ctx).unwrap().done);
    }

    #[test]
    fn test_panicking_body_completes_generator() {
        let ctx = Context::new();
        let gen = Generator::new(
            Arc::from("explodes"),
            Box::new(|_: &Context| -> Result<Option<Value>, RuntimeError> {
                panic!("body failed")
            }),
        );

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| gen.next(&ctx)));
        assert!(unwound.is_err());
        assert!(gen.is_completed());
        assert!(gen.next(&ctx).unwrap().done);
        assert_eq!(ctx.call_stack().depth(), 1);
    }

    #[test]
    fn test_reentrant_next_is_type_error() {
        let ctx = Context::new();
        let slot: Arc<Mutex<Option<Generator>>> = Arc::new(Mutex::new(None));
        let inner = Arc::clone(&slot);
        let gen = Generator::new(
            Arc::from("reenter"),
            Box::new(move |ctx: &Context| {
                let gen = inner.lock().unwrap().clone().unwrap();
                let err = gen.next(ctx).unwrap_err();
                Ok(Some(Value::string(err.message())))
            }),
        );
        *slot.lock().unwrap() = Some(gen.clone());

        let result = gen.next(&ctx).unwrap();
        assert_eq!(result.value, Value::string("Generator is already running"));
    }
}
