//! Runtime value representation
//!
//! - Undefined, Null, Bool, Number: immediate values
//! - Strings: `Arc<str>`, immutable
//! - Arrays, Objects: shared mutable storage with identity equality ([`Shared`])
//! - Functions: `Arc<Function>` (see [`crate::function`])
//! - Errors: immutable error objects carrying the filtered stack captured at creation
//! - Promises, Generators: opaque handles owned by their own modules

use crate::function::Function;
use crate::generator::Generator;
use crate::promise::Promise;
use crate::stack::trace::StackTrace;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reference semantics wrapper.
///
/// All clones point to the same underlying value and mutation through any clone is
/// visible to the others. Equality is identity: two `Shared<T>` are equal only when
/// they are the same allocation.
#[derive(Debug)]
pub struct Shared<T>(Arc<Mutex<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Shared(Arc::new(Mutex::new(value)))
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        // A poisoned lock only means a panic happened mid-mutation; the data is still usable.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the lock and apply a read function.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    /// Acquire the lock and apply a mutation function.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Mutable array with reference semantics
pub type ArrayRef = Shared<Vec<Value>>;

/// Mutable string-keyed object with reference semantics
pub type ObjectRef = Shared<BTreeMap<String, Value>>;

impl Shared<Vec<Value>> {
    pub fn len(&self) -> usize {
        self.with(|items| items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.with(|items| items.get(index).cloned())
    }

    /// Copy of the current elements. Callers must not hold the lock across calls
    /// back into hosted code, so iteration always works on a snapshot.
    pub fn to_vec(&self) -> Vec<Value> {
        self.with(|items| items.clone())
    }

    pub fn push(&self, value: Value) -> usize {
        self.with_mut(|items| {
            items.push(value);
            items.len()
        })
    }

    /// Replace the contents in place, keeping the array's identity.
    pub fn replace(&self, values: Vec<Value>) {
        self.with_mut(|items| *items = values);
    }
}

impl Shared<BTreeMap<String, Value>> {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.with(|map| map.get(key).cloned())
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.with_mut(|map| {
            map.insert(key.into(), value);
        });
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.with(|map| map.contains_key(key))
    }

    pub fn keys(&self) -> Vec<String> {
        self.with(|map| map.keys().cloned().collect())
    }
}

/// Error object (`Error`, `TypeError`, `RangeError`, ...)
///
/// The stack is captured, already filtered, when the error is created.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObject {
    pub name: String,
    pub message: String,
    pub stack: StackTrace,
}

impl ErrorObject {
    /// First line of the rendered stack: `Name: message`, or just `Name`.
    pub fn header(&self) -> String {
        if self.message.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.message)
        }
    }

    /// Rendered `stack` property
    pub fn stack_string(&self) -> String {
        self.stack.render(&self.header())
    }
}

/// Runtime value type
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    /// IEEE 754 double-precision number
    Number(f64),
    String(Arc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Arc<Function>),
    Error(Arc<ErrorObject>),
    /// Deferred result of an async function
    Promise(Promise),
    /// Lazy iterator returned by a generator function
    Generator(Generator),
}

impl Value {
    /// Create a new string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Create a new array value
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Shared::new(values))
    }

    /// Create a new object value from key/value pairs
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect::<BTreeMap<_, _>>();
        Value::Object(Shared::new(map))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Error(_) => "error",
            Value::Promise(_) => "promise",
            Value::Generator(_) => "generator",
        }
    }

    /// Whether this value can be called with a receiver and an argument list.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_function(&self) -> Option<&Arc<Function>> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorObject> {
        match self {
            Value::Error(error) => Some(error),
            _ => None,
        }
    }

    /// `undefined` or `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Get a display string representation
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Value {
    /// Strict equality: primitives by value (so `NaN != NaN`), everything else by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Arc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => a == b,
            (Value::Generator(a), Value::Generator(b)) => a == b,
            _ => false,
        }
    }
}

fn format_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}Infinity", if n < 0.0 { "-" } else { "" })
    } else if n.fract() == 0.0 {
        // also folds -0 into "0"
        write!(f, "{:.0}", n + 0.0)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => format_number(f, *n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(array) => {
                let elements: Vec<String> = array
                    .to_vec()
                    .iter()
                    .map(|v| match v {
                        Value::Undefined | Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "{}", elements.join(","))
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(function) => write!(f, "<fn {}>", function.name()),
            Value::Error(error) => write!(f, "{}", error.header()),
            Value::Promise(promise) => write!(f, "{}", promise),
            Value::Generator(generator) => write!(f, "<generator {}>", generator.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Array(array) => write!(f, "Array({:?})", array.to_vec()),
            Value::Object(object) => write!(f, "Object({:?})", object.keys()),
            Value::Function(function) => write!(f, "Function({:?})", function.name()),
            Value::Error(error) => write!(f, "Error({:?})", error.header()),
            Value::Promise(promise) => write!(f, "{:?}", promise),
            Value::Generator(generator) => write!(f, "Generator({:?})", generator.name()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string_number() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-5.0).to_string(), "-5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn test_to_string_array() {
        let arr = Value::array(vec![
            Value::Number(1.0),
            Value::Null,
            Value::string("x"),
        ]);
        assert_eq!(arr.to_string(), "1,,x");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Undefined.type_name(), "undefined");
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Number(1.0).type_name(), "number");
        assert_eq!(Value::string("hi").type_name(), "string");
        assert_eq!(Value::array(vec![]).type_name(), "array");
        assert_eq!(Value::object(Vec::<(String, Value)>::new()).type_name(), "object");
    }

    #[test]
    fn test_array_identity_equality() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = a.clone();
        let c = Value::array(vec![Value::Number(1.0)]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_array_mutation_visible_through_alias() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let alias = a.clone();
        if let Value::Array(arr) = &alias {
            arr.push(Value::Number(2.0));
        }
        assert_eq!(a.as_array().map(|arr| arr.len()), Some(2));
    }

    #[test]
    fn test_nan_is_not_equal_to_itself() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_object_get_set() {
        let obj = Value::object([("x", Value::Number(42.0))]);
        let Value::Object(map) = &obj else {
            panic!("expected object");
        };
        assert_eq!(map.get("x"), Some(Value::Number(42.0)));
        map.set("y", Value::Bool(true));
        assert!(map.contains_key("y"));
        assert_eq!(map.get("z"), None);
    }

    #[test]
    fn test_only_functions_are_callable() {
        assert!(!Value::Null.is_callable());
        assert!(!Value::Number(42.0).is_callable());
        assert!(!Value::string("function").is_callable());
        assert!(!Value::object(Vec::<(String, Value)>::new()).is_callable());
    }

    #[test]
    fn test_value_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Value>();
    }
}
