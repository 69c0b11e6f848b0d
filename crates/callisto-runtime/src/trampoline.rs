//! Frame-hiding call trampoline
//!
//! [`safe_apply`] calls a function with an explicit receiver and argument list, and while
//! that call runs, the frame that called the trampoline is left out of every captured
//! trace. Markers from outer, still-running invocations stay in place, so nested calls
//! hide the union of their callers.
//!
//! Only the synchronous part of the call is covered. An async callee's continuations run
//! later from the job queue, after the marker is gone.

use crate::context::Context;
use crate::error::RuntimeError;
use crate::function::Function;
use crate::value::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Validated `(callable, receiver, arguments)` triple for one invocation
#[derive(Debug)]
pub struct InvocationRequest<'a> {
    pub function: &'a Arc<Function>,
    pub receiver: &'a Value,
    pub args: Vec<Value>,
}

impl<'a> InvocationRequest<'a> {
    /// Check the inputs without side effects.
    pub fn validate(
        callable: &'a Value,
        receiver: &'a Value,
        args: Option<&Value>,
    ) -> Result<Self, RuntimeError> {
        let Value::Function(function) = callable else {
            debug!(type_name = callable.type_name(), "rejected non-callable target");
            return Err(RuntimeError::InvalidCallable {
                type_name: callable.type_name().to_string(),
            });
        };
        let args = argument_list(args)?;
        Ok(Self {
            function,
            receiver,
            args,
        })
    }
}

/// Argument container to argument list: omitted, `undefined` and `null` are empty.
pub fn argument_list(args: Option<&Value>) -> Result<Vec<Value>, RuntimeError> {
    match args {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(array)) => Ok(array.to_vec()),
        Some(other) => {
            debug!(type_name = other.type_name(), "rejected argument container");
            Err(RuntimeError::InvalidArguments {
                type_name: other.type_name().to_string(),
            })
        }
    }
}

/// Call `callable` with `receiver` and `args`, hiding the calling frame meanwhile.
///
/// The result and any error pass through unchanged. The marker is removed on every
/// exit path, panics included.
///
/// # Examples
///
/// ```
/// use callisto_runtime::function::FunctionBuilder;
/// use callisto_runtime::{safe_apply, Context, Value};
///
/// let ctx = Context::new();
/// let add = FunctionBuilder::new("add")
///     .with_arity(2)
///     .closure(|_, _, args| {
///         let a = args[0].as_number().unwrap_or(f64::NAN);
///         let b = args[1].as_number().unwrap_or(f64::NAN);
///         Ok(Value::Number(a + b))
///     })
///     .build()
///     .unwrap();
///
/// let args = Value::array(vec![5.into(), 3.into()]);
/// let sum = safe_apply(&ctx, &add, &Value::Null, Some(&args)).unwrap();
/// assert_eq!(sum, Value::Number(8.0));
/// assert!(ctx.markers().is_empty());
/// ```
pub fn safe_apply(
    ctx: &Context,
    callable: &Value,
    receiver: &Value,
    args: Option<&Value>,
) -> Result<Value, RuntimeError> {
    let request = InvocationRequest::validate(callable, receiver, args)?;

    let caller = ctx.current_frame();
    let _marker = ctx.markers().hide(caller);
    trace!(
        function = request.function.name(),
        caller = %caller,
        args = request.args.len(),
        "safe_apply"
    );

    ctx.call_function(request.function, request.receiver, &request.args)
}
