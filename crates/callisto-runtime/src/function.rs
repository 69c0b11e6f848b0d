//! Callable values and their builder
//!
//! Every invocable value is a [`Function`]. The [`FunctionKind`] decides how a call is
//! carried out and what kind of value it returns; nothing else about calling differs
//! between kinds.
//!
//! # Examples
//!
//! ```rust
//! use callisto_runtime::function::FunctionBuilder;
//! use callisto_runtime::{Context, Value};
//!
//! let ctx = Context::new();
//! let add = FunctionBuilder::new("add")
//!     .with_arity(2)
//!     .closure(|_ctx, _this, args| {
//!         let a = args[0].as_number().unwrap_or(f64::NAN);
//!         let b = args[1].as_number().unwrap_or(f64::NAN);
//!         Ok(Value::Number(a + b))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let sum = ctx.call(&add, &Value::Undefined, &[5.into(), 3.into()]).unwrap();
//! assert_eq!(sum, Value::Number(8.0));
//! ```

use crate::context::Context;
use crate::error::RuntimeError;
use crate::generator::GeneratorBody;
use crate::promise::Completion;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Name used in traces for functions built without one
pub const ANONYMOUS: &str = "<anonymous>";

/// Native function: runs in its caller's frame and sees the receiver exactly as given
pub type NativeFn =
    Arc<dyn Fn(&Context, &Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// Ordinary function body: gets its own frame
pub type ClosureFn =
    Arc<dyn Fn(&Context, &Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// Async function body: runs its synchronous prologue and either returns or awaits
pub type AsyncFn =
    Arc<dyn Fn(&Context, &Value, &[Value]) -> Result<Completion, RuntimeError> + Send + Sync>;

/// Generator function: builds the (not yet started) body from receiver and arguments
pub type GeneratorFn = Arc<dyn Fn(&Value, &[Value]) -> GeneratorBody + Send + Sync>;

/// How a function is called
#[derive(Clone)]
pub enum FunctionKind {
    Native(NativeFn),
    Closure(ClosureFn),
    Async(AsyncFn),
    Generator(GeneratorFn),
    Bound(BoundFunction),
}

/// Function with a pre-bound receiver and leading arguments
#[derive(Clone)]
pub struct BoundFunction {
    pub target: Arc<Function>,
    pub this: Value,
    pub args: Vec<Value>,
}

/// Invocable value
pub struct Function {
    name: Arc<str>,
    length: usize,
    kind: FunctionKind,
}

impl Function {
    pub fn new(name: impl AsRef<str>, length: usize, kind: FunctionKind) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            length,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as shown in stack frames
    pub fn frame_name(&self) -> Arc<str> {
        if self.name.is_empty() {
            Arc::from(ANONYMOUS)
        } else {
            Arc::clone(&self.name)
        }
    }

    /// Declared parameter count
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn kind(&self) -> &FunctionKind {
        &self.kind
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, FunctionKind::Native(_))
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.kind, FunctionKind::Bound(_))
    }

    /// Create a bound function; the bound receiver wins over any receiver supplied later.
    pub fn bind(self: &Arc<Self>, this: Value, args: Vec<Value>) -> Arc<Function> {
        let length = self.length.saturating_sub(args.len());
        Arc::new(Function {
            name: Arc::from(format!("bound {}", self.name)),
            length,
            kind: FunctionKind::Bound(BoundFunction {
                target: Arc::clone(self),
                this,
                args,
            }),
        })
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FunctionKind::Native(_) => "native",
            FunctionKind::Closure(_) => "closure",
            FunctionKind::Async(_) => "async",
            FunctionKind::Generator(_) => "generator",
            FunctionKind::Bound(_) => "bound",
        };
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("length", &self.length)
            .field("kind", &kind)
            .finish()
    }
}

/// Builder for function values
///
/// `with_arity(n)` declares the function's `length`. Non-native bodies called with fewer
/// arguments see the missing ones as `undefined`; natives get the arguments as passed.
pub struct FunctionBuilder {
    name: String,
    arity: Option<usize>,
    is_variadic: bool,
    kind: Option<FunctionKind>,
}

impl FunctionBuilder {
    /// Create a new builder with the given name (used in stack traces)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: None,
            is_variadic: false,
            kind: None,
        }
    }

    /// Builder for a function without a name; it shows up as `<anonymous>` in traces
    pub fn anonymous() -> Self {
        Self::new("")
    }

    /// Set the declared parameter count
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self.is_variadic = false;
        self
    }

    /// Accept any number of arguments without padding (`length` 0)
    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self.arity = None;
        self
    }

    /// Native implementation: no frame of its own, raw receiver, unpadded arguments
    pub fn native<F>(mut self, implementation: F) -> Self
    where
        F: Fn(&Context, &Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.kind = Some(FunctionKind::Native(Arc::new(implementation)));
        self
    }

    /// Ordinary function body
    pub fn closure<F>(mut self, implementation: F) -> Self
    where
        F: Fn(&Context, &Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.kind = Some(FunctionKind::Closure(Arc::new(implementation)));
        self
    }

    /// Async function body; calls return a promise
    pub fn async_fn<F>(mut self, implementation: F) -> Self
    where
        F: Fn(&Context, &Value, &[Value]) -> Result<Completion, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.kind = Some(FunctionKind::Async(Arc::new(implementation)));
        self
    }

    /// Generator function; calls return an unstarted generator
    pub fn generator<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> GeneratorBody + Send + Sync + 'static,
    {
        self.kind = Some(FunctionKind::Generator(Arc::new(factory)));
        self
    }

    /// Build the function
    pub fn build_function(self) -> Result<Arc<Function>, BuildError> {
        let kind = self
            .kind
            .ok_or_else(|| BuildError::MissingImplementation(self.name.clone()))?;
        let length = if self.is_variadic {
            0
        } else {
            self.arity.unwrap_or(0)
        };
        Ok(Arc::new(Function::new(&self.name, length, kind)))
    }

    /// Build the function as a value
    pub fn build(self) -> Result<Value, BuildError> {
        self.build_function().map(Value::Function)
    }
}

/// Errors that can occur when building a function
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// No implementation was provided
    #[error("Function '{0}' missing implementation")]
    MissingImplementation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> FunctionBuilder {
        FunctionBuilder::new("noop").native(|_, _, _| Ok(Value::Undefined))
    }

    #[test]
    fn test_builder_arity_sets_length() {
        let f = noop().with_arity(3).build_function().unwrap();
        assert_eq!(f.length(), 3);
        assert!(f.is_native());
    }

    #[test]
    fn test_builder_variadic_length_zero() {
        let f = noop().with_arity(3).variadic().build_function().unwrap();
        assert_eq!(f.length(), 0);
    }

    #[test]
    fn test_builder_missing_implementation() {
        let result = FunctionBuilder::new("test").with_arity(1).build();
        assert_eq!(
            result.unwrap_err(),
            BuildError::MissingImplementation("test".to_string())
        );
    }

    #[test]
    fn test_anonymous_frame_name() {
        let f = FunctionBuilder::anonymous()
            .closure(|_, _, _| Ok(Value::Undefined))
            .build_function()
            .unwrap();
        assert_eq!(f.frame_name().as_ref(), ANONYMOUS);
    }

    #[test]
    fn test_bind_name_and_length() {
        let f = noop().with_arity(3).build_function().unwrap();
        let bound = f.bind(Value::Null, vec![Value::Number(1.0)]);
        assert_eq!(bound.name(), "bound noop");
        assert_eq!(bound.length(), 2);
        assert!(bound.is_bound());
    }
}
