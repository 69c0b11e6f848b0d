//! Promise intrinsics

use crate::context::Context;
use crate::error::RuntimeError;
use crate::value::Value;

/// `promise.then([onFulfilled], [onRejected])`
pub fn then(ctx: &Context, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::Promise(promise) = this else {
        return Err(RuntimeError::type_error(format!(
            "Promise.prototype.then called on {}",
            this.type_name()
        )));
    };
    let derived = promise.then(ctx, args.first().cloned(), args.get(1).cloned());
    Ok(Value::Promise(derived))
}
