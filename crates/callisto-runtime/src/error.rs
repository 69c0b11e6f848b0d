//! Runtime error type

use crate::context::Context;
use crate::stack::trace::StackTrace;
use crate::value::Value;
use thiserror::Error;

/// Errors surfaced by calls into the runtime.
///
/// `Thrown` carries a value thrown by hosted code unchanged; every other variant is
/// raised by the runtime itself.
#[derive(Debug, Error, Clone)]
pub enum RuntimeError {
    /// Call target is not invocable
    #[error("Invalid callable: expected a function, got {type_name}")]
    InvalidCallable { type_name: String },
    /// Argument container is neither omitted, `undefined`, `null` nor an array
    #[error("Invalid arguments: expected an array, null or undefined, got {type_name}")]
    InvalidArguments { type_name: String },
    /// Value thrown by hosted code
    #[error("Uncaught {value}")]
    Thrown { value: Value },
    /// Host type error
    #[error("Type error: {msg}")]
    TypeError { msg: String },
    /// Call depth limit exceeded
    #[error("Maximum call stack size exceeded (depth {depth})")]
    StackOverflow { depth: usize },
    /// `await_value` ran out of jobs while the promise was still pending
    #[error("Promise never settled: no pending jobs remain")]
    UnsettledPromise,
}

impl RuntimeError {
    pub fn thrown(value: Value) -> Self {
        RuntimeError::Thrown { value }
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        RuntimeError::TypeError { msg: msg.into() }
    }

    /// Message as hosted code would read it from the error.
    ///
    /// For a thrown error object this is its `message` property, untouched.
    pub fn message(&self) -> String {
        match self {
            RuntimeError::Thrown { value } => match value.as_error() {
                Some(error) => error.message.clone(),
                None => value.to_string(),
            },
            RuntimeError::TypeError { msg } => msg.clone(),
            other => other.to_string(),
        }
    }

    /// The thrown value, if hosted code threw one
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            RuntimeError::Thrown { value } => Some(value),
            _ => None,
        }
    }

    /// Stack captured by the thrown error object, if any
    pub fn stack(&self) -> Option<&StackTrace> {
        self.thrown_value()
            .and_then(Value::as_error)
            .map(|error| &error.stack)
    }

    /// Convert into a value hosted code can observe (promise rejection reasons).
    ///
    /// Runtime-raised variants become error objects whose stack is captured now.
    pub fn into_value(self, ctx: &Context) -> Value {
        let name = match &self {
            RuntimeError::Thrown { value } => return value.clone(),
            RuntimeError::StackOverflow { .. } => "RangeError",
            RuntimeError::UnsettledPromise => "Error",
            RuntimeError::InvalidCallable { .. }
            | RuntimeError::InvalidArguments { .. }
            | RuntimeError::TypeError { .. } => "TypeError",
        };
        ctx.new_error(name, self.message())
    }
}
