//! Array intrinsics
//!
//! Methods that take callbacks work on a snapshot of the elements; the array lock is
//! never held while hosted code runs.

use super::{arg, to_number};
use crate::context::Context;
use crate::error::RuntimeError;
use crate::value::{ArrayRef, Value};
use std::cmp::Ordering;

fn this_array<'a>(this: &'a Value, method: &str) -> Result<&'a ArrayRef, RuntimeError> {
    this.as_array().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "Array.prototype.{} called on {}",
            method,
            this.type_name()
        ))
    })
}

/// `array.sort([comparator])`, in place; returns the array itself
pub fn sort(ctx: &Context, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let array = this_array(this, "sort")?;
    let comparator = match arg(args, 0) {
        Value::Undefined => None,
        f if f.is_callable() => Some(f),
        _ => {
            return Err(RuntimeError::type_error(
                "The comparison function must be either a function or undefined",
            ))
        }
    };

    // undefined always sorts last and is never passed to the comparator
    let (mut items, undefined): (Vec<Value>, Vec<Value>) = array
        .to_vec()
        .into_iter()
        .partition(|v| !matches!(v, Value::Undefined));

    let compare = |a: &Value, b: &Value| -> Result<Ordering, RuntimeError> {
        match comparator {
            Some(f) => {
                let result = ctx.call(f, &Value::Undefined, &[a.clone(), b.clone()])?;
                let n = to_number(&result);
                Ok(if n < 0.0 {
                    Ordering::Less
                } else if n > 0.0 {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                })
            }
            None => Ok(compare_code_units(&a.to_string(), &b.to_string())),
        }
    };

    // Insertion sort: stable, and a comparator error can abort it at any step
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(&items[j], &items[j - 1])? == Ordering::Less {
            items.swap(j, j - 1);
            j -= 1;
        }
    }

    items.extend(undefined);
    array.replace(items);
    Ok(this.clone())
}

/// `array.push(...values)`; returns the new length
pub fn push(_ctx: &Context, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let array = this_array(this, "push")?;
    let len = array.with_mut(|items| {
        items.extend_from_slice(args);
        items.len()
    });
    Ok(Value::Number(len as f64))
}

/// `array.reduce(callback[, initial])`
pub fn reduce(ctx: &Context, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let array = this_array(this, "reduce")?;
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return Err(RuntimeError::type_error(format!(
            "{} is not a function",
            callback.type_name()
        )));
    }

    let items = array.to_vec();
    let mut entries = items.into_iter().enumerate();
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match entries.next() {
            Some((_, first)) => first,
            None => {
                return Err(RuntimeError::type_error(
                    "Reduce of empty array with no initial value",
                ))
            }
        },
    };

    for (index, element) in entries {
        accumulator = ctx.call(
            callback,
            &Value::Undefined,
            &[accumulator, element, Value::Number(index as f64), this.clone()],
        )?;
    }
    Ok(accumulator)
}

/// `array.join([separator])`
pub fn join(_ctx: &Context, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let array = this_array(this, "join")?;
    let separator = match arg(args, 0) {
        Value::Undefined => ",".to_string(),
        other => other.to_string(),
    };
    let parts: Vec<String> = array
        .to_vec()
        .iter()
        .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
        .collect();
    Ok(Value::string(parts.join(&separator)))
}

/// String order of the default sort: UTF-16 code units, not UTF-8 bytes
fn compare_code_units(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
