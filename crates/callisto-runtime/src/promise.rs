//! Promises and async function completions
//!
//! A promise is an opaque deferred value. It can be:
//! - Pending: not settled yet
//! - Fulfilled: settled with a value
//! - Rejected: settled with a reason
//!
//! Once settled the state is final. Reactions never run synchronously: settling a
//! promise (or subscribing to an already settled one) enqueues them on the context's
//! job queue, where each job runs in its own isolated execution scope.

use crate::context::Context;
use crate::error::RuntimeError;
use crate::function::Function;
use crate::value::Value;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Outcome of a settled promise: `Ok(value)` when fulfilled, `Err(reason)` when rejected
pub type Settlement = Result<Value, Value>;

/// Callback run (as a job) once a promise settles
pub type Reaction = Box<dyn FnOnce(&Context, Settlement) + Send>;

/// Continuation of an async function after an `await`
pub type Resume = Box<dyn FnOnce(&Context, Settlement) -> Result<Completion, RuntimeError> + Send>;

/// How one synchronous slice of an async function ended
pub enum Completion {
    /// The function finished with a value
    Return(Value),
    /// The function awaits `value`; `resume` runs once it settles
    Await { value: Value, resume: Resume },
}

impl Completion {
    /// Await `value`, then continue with `resume`
    pub fn await_then<F>(value: Value, resume: F) -> Self
    where
        F: FnOnce(&Context, Settlement) -> Result<Completion, RuntimeError> + Send + 'static,
    {
        Completion::Await {
            value,
            resume: Box::new(resume),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Return(value) => write!(f, "Return({:?})", value),
            Completion::Await { value, .. } => write!(f, "Await({:?})", value),
        }
    }
}

/// Promise state
#[derive(Clone, Debug)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

struct PromiseInner {
    state: PromiseState,
    reactions: Vec<Reaction>,
}

/// Shared handle to a promise
#[derive(Clone)]
pub struct Promise {
    inner: Arc<Mutex<PromiseInner>>,
}

impl Promise {
    fn with_state(state: PromiseState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PromiseInner {
                state,
                reactions: Vec::new(),
            })),
        }
    }

    /// Create a new pending promise
    pub fn pending() -> Self {
        Self::with_state(PromiseState::Pending)
    }

    /// Create an already fulfilled promise
    pub fn resolved(value: Value) -> Self {
        Self::with_state(PromiseState::Fulfilled(value))
    }

    /// Create an already rejected promise
    pub fn rejected(reason: Value) -> Self {
        Self::with_state(PromiseState::Rejected(reason))
    }

    fn lock(&self) -> MutexGuard<'_, PromiseInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state (cloned)
    pub fn state(&self) -> PromiseState {
        self.lock().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.lock().state, PromiseState::Pending)
    }

    /// Settlement, if the promise is no longer pending
    pub fn settlement(&self) -> Option<Settlement> {
        match self.state() {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(value) => Some(Ok(value)),
            PromiseState::Rejected(reason) => Some(Err(reason)),
        }
    }

    /// Resolve with `value`. Resolving with another promise adopts its outcome.
    pub fn resolve(&self, ctx: &Context, value: Value) {
        match value {
            Value::Promise(other) if other != *self => {
                let this = self.clone();
                other.on_settled(ctx, Box::new(move |ctx: &Context, settlement: Settlement| {
                    this.settle(ctx, settlement);
                }));
            }
            Value::Promise(_) => {
                let reason = ctx.new_error("TypeError", "Chaining cycle detected for promise");
                self.settle(ctx, Err(reason));
            }
            value => self.settle(ctx, Ok(value)),
        }
    }

    /// Reject with `reason`
    pub fn reject(&self, ctx: &Context, reason: Value) {
        self.settle(ctx, Err(reason));
    }

    fn settle(&self, ctx: &Context, settlement: Settlement) {
        let reactions = {
            let mut inner = self.lock();
            if !matches!(inner.state, PromiseState::Pending) {
                return;
            }
            inner.state = match &settlement {
                Ok(value) => PromiseState::Fulfilled(value.clone()),
                Err(reason) => PromiseState::Rejected(reason.clone()),
            };
            mem::take(&mut inner.reactions)
        };

        for reaction in reactions {
            let settlement = settlement.clone();
            ctx.enqueue_job(Box::new(move |ctx: &Context| reaction(ctx, settlement)));
        }
    }

    /// Register `reaction`; it runs as a job once the promise settles.
    pub fn on_settled(&self, ctx: &Context, reaction: Reaction) {
        let settlement = {
            let mut inner = self.lock();
            match &inner.state {
                PromiseState::Pending => {
                    inner.reactions.push(reaction);
                    return;
                }
                PromiseState::Fulfilled(value) => Ok(value.clone()),
                PromiseState::Rejected(reason) => Err(reason.clone()),
            }
        };
        ctx.enqueue_job(Box::new(move |ctx: &Context| reaction(ctx, settlement)));
    }

    /// Chain handlers; returns the derived promise.
    ///
    /// A missing (or non-callable) handler passes the settlement through.
    pub fn then(&self, ctx: &Context, on_fulfilled: Option<Value>, on_rejected: Option<Value>) -> Promise {
        let derived = Promise::pending();
        let target = derived.clone();
        let on_fulfilled = on_fulfilled.filter(Value::is_callable);
        let on_rejected = on_rejected.filter(Value::is_callable);

        self.on_settled(
            ctx,
            Box::new(move |ctx: &Context, settlement: Settlement| {
                let (handler, argument) = match settlement {
                    Ok(value) => (on_fulfilled, Ok(value)),
                    Err(reason) => (on_rejected, Err(reason)),
                };
                match (handler, argument) {
                    (Some(handler), Ok(arg) | Err(arg)) => {
                        match ctx.call(&handler, &Value::Undefined, &[arg]) {
                            Ok(value) => target.resolve(ctx, value),
                            Err(err) => {
                                let reason = err.into_value(ctx);
                                target.reject(ctx, reason);
                            }
                        }
                    }
                    (None, Ok(value)) => target.resolve(ctx, value),
                    (None, Err(reason)) => target.reject(ctx, reason),
                }
            }),
        );

        derived
    }
}

impl PartialEq for Promise {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Display for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            PromiseState::Pending => write!(f, "<Promise pending>"),
            PromiseState::Fulfilled(value) => write!(f, "<Promise fulfilled {}>", value),
            PromiseState::Rejected(reason) => write!(f, "<Promise rejected {}>", reason),
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Promise({:?})", self.state())
    }
}

/// Drive an async function's promise from one completed slice to the next.
///
/// Each `Await` registers a reaction; the reaction re-enters the function under a
/// fresh frame, long after the initiating call (and any marker it ran under) returned.
pub(crate) fn drive_async(
    ctx: &Context,
    function: Arc<Function>,
    promise: Promise,
    step: Result<Completion, RuntimeError>,
) {
    match step {
        Ok(Completion::Return(value)) => promise.resolve(ctx, value),
        Ok(Completion::Await { value, resume }) => {
            let awaited = match value {
                Value::Promise(awaited) => awaited,
                other => Promise::resolved(other),
            };
            awaited.on_settled(
                ctx,
                Box::new(move |ctx: &Context, settlement: Settlement| {
                    let next = ctx
                        .call_stack()
                        .enter(function.frame_name())
                        .and_then(|_frame| resume(ctx, settlement));
                    drive_async(ctx, function, promise, next);
                }),
            );
        }
        Err(err) => {
            let reason = err.into_value(ctx);
            promise.reject(ctx, reason);
        }
    }
}
