//! Error objects: the `Error` global and property access

use crate::context::Context;
use crate::error::RuntimeError;
use crate::value::{ErrorObject, Value};

/// `Error(message)`; the stack is captured at the caller, since natives push no frame
pub fn construct(ctx: &Context, _this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let message = match args.first() {
        None | Some(Value::Undefined) => String::new(),
        Some(other) => other.to_string(),
    };
    Ok(ctx.new_error("Error", message))
}

pub(crate) fn property(error: &ErrorObject, key: &str) -> Value {
    match key {
        "name" => Value::string(&error.name),
        "message" => Value::string(&error.message),
        "stack" => Value::string(error.stack_string()),
        _ => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionBuilder;

    #[test]
    fn test_error_properties() {
        let ctx = Context::new();
        let err = ctx.new_error("TypeError", "bad thing");
        assert_eq!(ctx.get_property(&err, "name").unwrap(), Value::string("TypeError"));
        assert_eq!(
            ctx.get_property(&err, "message").unwrap(),
            Value::string("bad thing")
        );
        assert_eq!(
            ctx.get_property(&err, "stack").unwrap(),
            Value::string("TypeError: bad thing\n    at <main>")
        );
    }

    #[test]
    fn test_constructor_captures_caller_frame() {
        let ctx = Context::new();
        let make = FunctionBuilder::new("make")
            .closure(|ctx, _, _| {
                let ctor = ctx.get_global("Error").unwrap_or(Value::Undefined);
                ctx.call(&ctor, &Value::Undefined, &[Value::string("test")])
            })
            .build()
            .unwrap();
        let err = ctx.call(&make, &Value::Undefined, &[]).unwrap();
        let error = err.as_error().unwrap();
        assert_eq!(error.message, "test");
        assert_eq!(error.stack.function_names(), vec!["make", "<main>"]);
    }
}
