//! Generator intrinsics

use crate::context::Context;
use crate::error::RuntimeError;
use crate::value::Value;

/// `generator.next()` → `{ value, done }`
pub fn next(ctx: &Context, this: &Value, _args: &[Value]) -> Result<Value, RuntimeError> {
    match this {
        Value::Generator(generator) => Ok(generator.next(ctx)?.into_value()),
        other => Err(RuntimeError::type_error(format!(
            "next method called on incompatible receiver {}",
            other.type_name()
        ))),
    }
}
