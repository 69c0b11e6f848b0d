//! Shared test utilities
//!
//! Helpers that let tests read like the hosted code they stand in for.

#![allow(dead_code)]

use callisto_runtime::{Context, FunctionBuilder, RuntimeError, Value};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Closure value named `name` (empty name = anonymous)
pub fn closure<F>(name: &str, body: F) -> Value
where
    F: Fn(&Context, &Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
{
    FunctionBuilder::new(name)
        .closure(body)
        .build()
        .expect("closure builds")
}

/// `Callisto.safeApply(callable, this, args)` as hosted code calls it
pub fn hosted_safe_apply(
    ctx: &Context,
    callable: Value,
    this: Value,
    args: Value,
) -> Result<Value, RuntimeError> {
    let callisto = ctx.get_global("Callisto").expect("Callisto global installed");
    ctx.invoke_method(&callisto, "safeApply", &[callable, this, args])
}

/// `function getStack() { return new Error().stack; }`
pub fn get_stack(ctx: &Context) -> String {
    let helper = closure("getStack", |ctx, _, _| {
        let error_ctor = ctx.get_global("Error").unwrap_or(Value::Undefined);
        let err = ctx.call(&error_ctor, &Value::Undefined, &[])?;
        ctx.get_property(&err, "stack")
    });
    ctx.call(&helper, &Value::Undefined, &[])
        .expect("getStack runs")
        .to_string()
}

/// Function names from a rendered stack, innermost first
pub fn frames_of(stack: &str) -> Vec<String> {
    stack
        .lines()
        .filter_map(|line| line.strip_prefix("    at "))
        .map(String::from)
        .collect()
}

/// Empty argument array
pub fn no_args() -> Value {
    Value::array(vec![])
}
