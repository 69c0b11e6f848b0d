//! Intrinsic methods and globals
//!
//! Every intrinsic is a native function: it pushes no frame of its own and sees its
//! receiver exactly as given, so `sort` called through the trampoline sorts the array
//! it was handed.

pub mod array;
pub mod error;
pub mod function;
pub mod generator;
pub mod promise;

use crate::context::Context;
use crate::error::RuntimeError;
use crate::function::{Function, FunctionKind};
use crate::trampoline;
use crate::value::{ObjectRef, Value};
use std::sync::Arc;

/// Name of the global object holding runtime utilities
pub const CALLISTO_GLOBAL: &str = "Callisto";

/// Shared method values; created once per context
pub(crate) struct Intrinsics {
    pub array_sort: Value,
    pub array_push: Value,
    pub array_reduce: Value,
    pub array_join: Value,
    pub function_bind: Value,
    pub function_call: Value,
    pub function_apply: Value,
    pub generator_next: Value,
    pub promise_then: Value,
    pub safe_apply: Value,
    pub error_constructor: Value,
}

impl Intrinsics {
    pub(crate) fn new() -> Self {
        Self {
            array_sort: native("sort", 1, array::sort),
            array_push: native("push", 1, array::push),
            array_reduce: native("reduce", 1, array::reduce),
            array_join: native("join", 1, array::join),
            function_bind: native("bind", 1, function::bind),
            function_call: native("call", 1, function::call),
            function_apply: native("apply", 2, function::apply),
            generator_next: native("next", 0, generator::next),
            promise_then: native("then", 2, promise::then),
            safe_apply: native("safeApply", 3, safe_apply),
            error_constructor: native("Error", 1, error::construct),
        }
    }
}

fn native<F>(name: &str, length: usize, implementation: F) -> Value
where
    F: Fn(&Context, &Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
{
    Value::Function(Arc::new(Function::new(
        name,
        length,
        FunctionKind::Native(Arc::new(implementation)),
    )))
}

/// Populate a fresh global object
pub(crate) fn install_globals(global: &ObjectRef, intrinsics: &Intrinsics) {
    let callisto = Value::object([("safeApply", intrinsics.safe_apply.clone())]);
    global.set(CALLISTO_GLOBAL, callisto);
    global.set("Error", intrinsics.error_constructor.clone());
}

/// `Callisto.safeApply(fn, thisArg, args)`
fn safe_apply(ctx: &Context, _this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    trampoline::safe_apply(ctx, arg(args, 0), arg(args, 1), args.get(2))
}

/// Argument `index`, or `undefined`
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Undefined)
}

/// Numeric conversion for comparator results and the like
pub(crate) fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        _ => f64::NAN,
    }
}

/// Property read, including intrinsic methods
pub(crate) fn get_property(ctx: &Context, target: &Value, key: &str) -> Result<Value, RuntimeError> {
    let intrinsics = ctx.intrinsics();
    let value = match target {
        Value::Undefined | Value::Null => {
            return Err(RuntimeError::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                target, key
            )))
        }
        Value::Array(array) => match key {
            "length" => Value::Number(array.len() as f64),
            "sort" => intrinsics.array_sort.clone(),
            "push" => intrinsics.array_push.clone(),
            "reduce" => intrinsics.array_reduce.clone(),
            "join" => intrinsics.array_join.clone(),
            index => index
                .parse::<usize>()
                .ok()
                .and_then(|i| array.get(i))
                .unwrap_or(Value::Undefined),
        },
        Value::Function(function) => match key {
            "name" => Value::string(function.name()),
            "length" => Value::Number(function.length() as f64),
            "bind" => intrinsics.function_bind.clone(),
            "call" => intrinsics.function_call.clone(),
            "apply" => intrinsics.function_apply.clone(),
            _ => Value::Undefined,
        },
        Value::Generator(_) => match key {
            "next" => intrinsics.generator_next.clone(),
            _ => Value::Undefined,
        },
        Value::Promise(_) => match key {
            "then" => intrinsics.promise_then.clone(),
            _ => Value::Undefined,
        },
        Value::Error(error) => error::property(error, key),
        Value::Object(object) => object.get(key).unwrap_or(Value::Undefined),
        Value::String(s) => match key {
            "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Undefined,
        },
        Value::Bool(_) | Value::Number(_) => Value::Undefined,
    };
    Ok(value)
}
