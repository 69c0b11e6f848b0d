//! Callisto Runtime - frame-hiding call trampoline
//!
//! This library provides:
//! - An execution context with a call stack and trace capture
//! - `safe_apply`, which calls a function while hiding its caller from traces
//! - The frame filter applied to every captured trace and error object
//! - Promises, generators and the intrinsic methods hosted code calls

/// Callisto runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod context;
pub mod error;
pub mod function;
pub mod generator;
pub mod promise;
pub mod stack;
pub mod stdlib;
pub mod trampoline;
pub mod value;

// Re-export commonly used types
pub use context::{Context, ContextOptions, Job};
pub use error::RuntimeError;
pub use function::{BuildError, Function, FunctionBuilder, FunctionKind};
pub use generator::{Generator, GeneratorBody, GeneratorStatus, IterResult};
pub use promise::{Completion, Promise, PromiseState, Settlement};
pub use stack::frame::{CallFrame, FrameId};
pub use stack::marker::{FrameMarker, MarkerGuard, MarkerRegistry};
pub use stack::trace::{filter_frames, StackFrame, StackTrace};
pub use stack::{CallStack, JOB_FRAME, MAIN_FRAME};
pub use trampoline::{safe_apply, InvocationRequest};
pub use value::{ErrorObject, Value};
