//! Function intrinsics: `bind`, `call`, `apply`

use super::arg;
use crate::context::Context;
use crate::error::RuntimeError;
use crate::function::Function;
use crate::trampoline::argument_list;
use crate::value::Value;
use std::sync::Arc;

fn this_function<'a>(this: &'a Value, method: &str) -> Result<&'a Arc<Function>, RuntimeError> {
    this.as_function().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "Function.prototype.{} called on {}",
            method,
            this.type_name()
        ))
    })
}

/// `f.bind(thisArg, ...args)`
pub fn bind(_ctx: &Context, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let function = this_function(this, "bind")?;
    let bound_args = args.get(1..).map(<[Value]>::to_vec).unwrap_or_default();
    Ok(Value::Function(function.bind(arg(args, 0).clone(), bound_args)))
}

/// `f.call(thisArg, ...args)`
pub fn call(ctx: &Context, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let function = this_function(this, "call")?;
    let rest = args.get(1..).unwrap_or_default();
    ctx.call_function(function, arg(args, 0), rest)
}

/// `f.apply(thisArg, args)`; `args` may be omitted, `undefined`, `null` or an array
pub fn apply(ctx: &Context, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let function = this_function(this, "apply")?;
    let list = argument_list(args.get(1))?;
    ctx.call_function(function, arg(args, 0), &list)
}
