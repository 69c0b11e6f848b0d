//! Execution context for embedding hosts
//!
//! A [`Context`] owns one call stack, one marker registry, one job queue and one global
//! object. It is single-threaded (`!Sync`); every thread that runs code creates its own
//! context, so markers never leak between threads.

use crate::error::RuntimeError;
use crate::function::{Function, FunctionKind};
use crate::generator::Generator;
use crate::promise::{drive_async, Promise};
use crate::stack::frame::FrameId;
use crate::stack::marker::MarkerRegistry;
use crate::stack::trace::{filter_frames, StackTrace};
use crate::stack::{CallStack, ExecutionScope, FrameGuard, MAIN_FRAME};
use crate::stdlib::{self, Intrinsics};
use crate::trampoline;
use crate::value::{ErrorObject, ObjectRef, Shared, Value};
use callisto_config::{Config, NullReceiver, DEFAULT_MAX_CALL_DEPTH, DEFAULT_TRACE_LIMIT};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Deferred unit of work run from the job queue
pub type Job = Box<dyn FnOnce(&Context)>;

/// Native stack left before a call moves onto a new segment
const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each new native stack segment
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Tunables for a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// Maximum number of frames on the call stack, root included
    pub max_call_depth: usize,
    /// Frames kept in a captured trace after hidden frames are removed
    pub trace_limit: usize,
    /// Receiver substituted for non-native functions called with `null`/`undefined`
    pub null_receiver: NullReceiver,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            trace_limit: DEFAULT_TRACE_LIMIT,
            null_receiver: NullReceiver::default(),
        }
    }
}

impl From<&Config> for ContextOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_call_depth: config.max_call_depth(),
            trace_limit: config.trace_limit(),
            null_receiver: config.null_receiver(),
        }
    }
}

/// Host execution context
///
/// # Examples
///
/// ```
/// use callisto_runtime::{Context, Value};
///
/// let ctx = Context::new();
/// let err = ctx.new_error("Error", "test");
/// assert_eq!(err.as_error().map(|e| e.message.as_str()), Some("test"));
/// ```
pub struct Context {
    options: ContextOptions,
    stack: CallStack,
    markers: MarkerRegistry,
    jobs: RefCell<VecDeque<Job>>,
    global: ObjectRef,
    intrinsics: Intrinsics,
}

impl Context {
    /// Create a context with default options
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    /// Create a context with explicit options
    pub fn with_options(options: ContextOptions) -> Self {
        let intrinsics = Intrinsics::new();
        let global = Shared::new(BTreeMap::new());
        stdlib::install_globals(&global, &intrinsics);

        debug!(
            max_call_depth = options.max_call_depth,
            trace_limit = options.trace_limit,
            null_receiver = %options.null_receiver,
            "context created"
        );

        Self {
            options,
            stack: CallStack::new(MAIN_FRAME, options.max_call_depth.max(1)),
            markers: MarkerRegistry::new(),
            jobs: RefCell::new(VecDeque::new()),
            global,
            intrinsics,
        }
    }

    /// Create a context from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::with_options(ContextOptions::from(config))
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub(crate) fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// Frame of whatever is running right now
    pub fn current_frame(&self) -> FrameId {
        self.stack.current()
    }

    /// Push a frame for `function`; popped when the guard drops.
    pub fn enter_frame(&self, function: &Function) -> Result<FrameGuard<'_>, RuntimeError> {
        self.stack.enter(function.frame_name())
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Call any value; non-callable values are a type error.
    pub fn call(&self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => self.call_function(function, this, args),
            other => Err(RuntimeError::type_error(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }

    /// Call a function the way every call site does.
    pub fn call_function(
        &self,
        function: &Arc<Function>,
        this: &Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        // every hosted call is a native recursion; only the depth limit may end it
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.dispatch(function, this, args)
        })
    }

    fn dispatch(
        &self,
        function: &Arc<Function>,
        this: &Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        match function.kind() {
            FunctionKind::Native(native) => native(self, this, args),
            FunctionKind::Bound(bound) => {
                let mut full = Vec::with_capacity(bound.args.len() + args.len());
                full.extend_from_slice(&bound.args);
                full.extend_from_slice(args);
                self.call_function(&bound.target, &bound.this, &full)
            }
            FunctionKind::Closure(body) => {
                let this = self.receiver_for(this);
                let args = pad_arguments(function, args);
                let _frame = self.enter_frame(function)?;
                body(self, &this, &args)
            }
            FunctionKind::Async(body) => {
                let this = self.receiver_for(this);
                let args = pad_arguments(function, args);
                let step = {
                    let _frame = self.enter_frame(function)?;
                    body(self, &this, &args)
                };
                let promise = Promise::pending();
                drive_async(self, Arc::clone(function), promise.clone(), step);
                Ok(Value::Promise(promise))
            }
            FunctionKind::Generator(factory) => {
                let this = self.receiver_for(this);
                let args = pad_arguments(function, args);
                let body = factory(&this, &args);
                Ok(Value::Generator(Generator::new(function.frame_name(), body)))
            }
        }
    }

    fn receiver_for(&self, this: &Value) -> Value {
        match self.options.null_receiver {
            NullReceiver::Global if this.is_nullish() => Value::Object(self.global.clone()),
            _ => this.clone(),
        }
    }

    /// Invoke through the frame-hiding trampoline.
    pub fn safe_apply(
        &self,
        callable: &Value,
        receiver: &Value,
        args: Option<&Value>,
    ) -> Result<Value, RuntimeError> {
        trampoline::safe_apply(self, callable, receiver, args)
    }

    // ------------------------------------------------------------------
    // Traces and errors
    // ------------------------------------------------------------------

    /// Capture the current stack with every hidden frame removed
    pub fn capture_stack_trace(&self) -> StackTrace {
        let markers = self.markers.active();
        self.stack
            .with_frames(|raw| filter_frames(raw, &markers, self.options.trace_limit))
    }

    /// Create an error object; its stack is captured now.
    pub fn new_error(&self, name: impl Into<String>, message: impl Into<String>) -> Value {
        Value::Error(Arc::new(ErrorObject {
            name: name.into(),
            message: message.into(),
            stack: self.capture_stack_trace(),
        }))
    }

    /// `Error` object wrapped as a thrown runtime error
    pub fn throw_error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::thrown(self.new_error("Error", message))
    }

    // ------------------------------------------------------------------
    // Properties and globals
    // ------------------------------------------------------------------

    /// Read `key` from `target`, including intrinsic methods
    pub fn get_property(&self, target: &Value, key: &str) -> Result<Value, RuntimeError> {
        stdlib::get_property(self, target, key)
    }

    /// `target.key(...args)`
    pub fn invoke_method(
        &self,
        target: &Value,
        key: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let method = self.get_property(target, key)?;
        if !method.is_callable() {
            return Err(RuntimeError::type_error(format!(
                "{}.{} is not a function",
                target.type_name(),
                key
            )));
        }
        self.call(&method, target, args)
    }

    pub fn global_object(&self) -> &ObjectRef {
        &self.global
    }

    pub fn set_global(&self, name: impl Into<String>, value: Value) {
        self.global.set(name, value);
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.global.get(name)
    }

    // ------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------

    pub fn enqueue_job(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.borrow().len()
    }

    fn run_next_job(&self) -> bool {
        let job = self.jobs.borrow_mut().pop_front();
        match job {
            Some(job) => {
                self.run_isolated(job);
                true
            }
            None => false,
        }
    }

    /// Drain the job queue, including jobs enqueued while draining.
    ///
    /// Returns the number of jobs run.
    pub fn run_jobs(&self) -> usize {
        let mut count = 0;
        while self.run_next_job() {
            count += 1;
        }
        if count > 0 {
            debug!(jobs = count, "job queue drained");
        }
        count
    }

    /// Run jobs until `value` settles.
    ///
    /// Non-promise values are returned as they are; a rejection surfaces as `Thrown`.
    pub fn await_value(&self, value: &Value) -> Result<Value, RuntimeError> {
        let Value::Promise(promise) = value else {
            return Ok(value.clone());
        };
        loop {
            if let Some(settlement) = promise.settlement() {
                return settlement.map_err(RuntimeError::thrown);
            }
            if !self.run_next_job() {
                debug!("promise still pending with an empty job queue");
                return Err(RuntimeError::UnsettledPromise);
            }
        }
    }

    /// Run `f` as an independent execution chain.
    ///
    /// `f` sees a fresh `<job>` root frame and no markers; the caller's frames and
    /// markers are restored afterwards, even when `f` unwinds.
    pub fn run_isolated<R>(&self, f: impl FnOnce(&Context) -> R) -> R {
        let _scope = ExecutionScope::enter(&self.stack, &self.markers);
        f(self)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Missing declared parameters are `undefined`.
fn pad_arguments<'a>(function: &Function, args: &'a [Value]) -> Cow<'a, [Value]> {
    if args.len() >= function.length() {
        return Cow::Borrowed(args);
    }
    let mut padded = args.to_vec();
    padded.resize(function.length(), Value::Undefined);
    Cow::Owned(padded)
}
