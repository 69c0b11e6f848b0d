//! Trace capture and frame filter tests
//!
//! Checks the filter against a simple model: a frame is missing from a trace exactly
//! when some still-running `safeApply` was called from it.

mod common;

use callisto_runtime::{
    filter_frames, safe_apply, CallStack, Context, ContextOptions, MarkerRegistry, StackTrace,
    Value, MAIN_FRAME,
};
use common::*;
use common::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use std::sync::{Arc, Mutex};

fn names(trace: &StackTrace) -> Vec<String> {
    trace.function_names().into_iter().map(String::from).collect()
}

fn with_limit(trace_limit: usize) -> Context {
    Context::with_options(ContextOptions {
        trace_limit,
        ..ContextOptions::default()
    })
}

type Sink = Arc<Mutex<Option<Vec<String>>>>;

/// `f{i}` calls `f{i+1}` through `safeApply` when `via_safe_apply[i+1]` is set, directly
/// otherwise; the last level records the trace it sees.
fn level(i: usize, via_safe_apply: Arc<Vec<bool>>, sink: Sink) -> Value {
    closure(&format!("f{}", i), move |ctx, _, _| {
        let next = i + 1;
        if next == via_safe_apply.len() {
            *sink.lock().unwrap() = Some(names(&ctx.capture_stack_trace()));
            return Ok(Value::Undefined);
        }
        let callee = level(next, Arc::clone(&via_safe_apply), Arc::clone(&sink));
        if via_safe_apply[next] {
            safe_apply(ctx, &callee, &Value::Null, None)
        } else {
            ctx.call(&callee, &Value::Undefined, &[])
        }
    })
}

fn expected_trace(via_safe_apply: &[bool]) -> Vec<String> {
    let chain = std::iter::once(MAIN_FRAME.to_string())
        .chain((0..via_safe_apply.len()).map(|i| format!("f{}", i)));
    // chain[i] is the caller of f{i}; the innermost frame has no callee
    let mut visible: Vec<String> = chain
        .enumerate()
        .filter(|(i, _)| !via_safe_apply.get(*i).copied().unwrap_or(false))
        .map(|(_, name)| name)
        .collect();
    visible.reverse();
    visible
}

proptest! {
    /// A frame is hidden iff it is the caller of an active `safeApply`.
    #[test]
    fn nested_calls_hide_exactly_marked_callers(
        via_safe_apply in proptest::collection::vec(any::<bool>(), 1..40)
    ) {
        let ctx = with_limit(64);
        let sink: Sink = Arc::new(Mutex::new(None));
        let pattern = Arc::new(via_safe_apply.clone());
        let root = level(0, Arc::clone(&pattern), Arc::clone(&sink));

        if via_safe_apply[0] {
            safe_apply(&ctx, &root, &Value::Null, None).unwrap();
        } else {
            ctx.call(&root, &Value::Undefined, &[]).unwrap();
        }

        let seen = sink.lock().unwrap().clone().unwrap();
        prop_assert_eq!(seen, expected_trace(&via_safe_apply));
        prop_assert!(ctx.markers().is_empty());
        prop_assert_eq!(ctx.call_stack().depth(), 1);
    }

    /// Filtering keeps unmarked frames in order and applies the limit afterwards.
    #[test]
    fn filter_keeps_order_and_limits_after_filtering(
        hidden in proptest::collection::vec(any::<bool>(), 0..30),
        limit in 0usize..40
    ) {
        let stack = CallStack::new(MAIN_FRAME, 64);
        let registry = MarkerRegistry::new();
        let mut frames = Vec::new();
        let mut markers = Vec::new();
        for (i, hide) in hidden.iter().enumerate() {
            let frame = stack.enter(Arc::from(format!("f{}", i))).unwrap();
            if *hide {
                markers.push(registry.hide(frame.id()));
            }
            frames.push(frame);
        }

        let trace = filter_frames(&stack.frames(), &registry.active(), limit);

        let mut expected: Vec<String> = hidden
            .iter()
            .enumerate()
            .filter(|(_, hide)| !**hide)
            .map(|(i, _)| format!("f{}", i))
            .collect();
        expected.insert(0, MAIN_FRAME.to_string());
        expected.reverse();
        expected.truncate(limit);

        prop_assert_eq!(names(&trace), expected);
        for frame in trace.frames() {
            prop_assert!(!registry.is_hidden(frame.id));
        }

        drop(markers);
        drop(frames);
        prop_assert!(registry.is_empty());
    }
}

#[rstest]
#[case(0, vec![])]
#[case(1, vec!["d"])]
#[case(2, vec!["d", "c"])]
#[case(3, vec!["d", "c", "a"])]
#[case(10, vec!["d", "c", "a", MAIN_FRAME])]
fn test_limit_counts_only_visible_frames(#[case] limit: usize, #[case] expected: Vec<&str>) {
    // <main> -> a -> b -> safeApply(c) -> c -> d
    let ctx = with_limit(limit);
    let sink: Sink = Arc::new(Mutex::new(None));
    let record = Arc::clone(&sink);

    let d = closure("d", move |ctx, _, _| {
        *record.lock().unwrap() = Some(names(&ctx.capture_stack_trace()));
        Ok(Value::Undefined)
    });
    let c = closure("c", move |ctx, _, _| ctx.call(&d, &Value::Undefined, &[]));
    let b = closure("b", move |ctx, _, _| safe_apply(ctx, &c, &Value::Null, None));
    let a = closure("a", move |ctx, _, _| ctx.call(&b, &Value::Undefined, &[]));

    ctx.call(&a, &Value::Undefined, &[]).unwrap();
    assert_eq!(sink.lock().unwrap().clone().unwrap(), expected);
}

#[test]
fn test_zero_limit_renders_header_only() {
    let ctx = with_limit(0);
    let err = ctx.new_error("Error", "test");
    assert_eq!(
        ctx.get_property(&err, "stack").unwrap(),
        Value::string("Error: test")
    );
}

#[test]
fn test_error_stack_is_fixed_at_creation() {
    let ctx = Context::new();
    let holder: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&holder);

    let caller = closure("caller", move |ctx, _, _| {
        let sink = Arc::clone(&sink);
        let body = closure("", move |ctx, _, _| {
            *sink.lock().unwrap() = Some(ctx.new_error("Error", "kept"));
            Ok(Value::Undefined)
        });
        safe_apply(ctx, &body, &Value::Null, None)?;
        // the marker is gone now, but the stored error keeps its filtered stack
        Ok(Value::string(get_stack(ctx)))
    });

    let later = ctx.call(&caller, &Value::Undefined, &[]).unwrap().to_string();
    assert_eq!(frames_of(&later), vec!["getStack", "caller", MAIN_FRAME]);

    let kept = holder.lock().unwrap().clone().unwrap();
    let stack = ctx.get_property(&kept, "stack").unwrap().to_string();
    assert_eq!(frames_of(&stack), vec!["<anonymous>", MAIN_FRAME]);
}

#[test]
fn test_message_untouched_by_filtering() {
    let ctx = Context::new();
    let caller = closure("caller", |ctx, _, _| {
        let thrower = closure("thrower", |ctx, _, _| Err(ctx.throw_error("caller failed")));
        safe_apply(ctx, &thrower, &Value::Null, None)
    });

    let err = ctx.call(&caller, &Value::Undefined, &[]).unwrap_err();
    assert_eq!(err.message(), "caller failed");
    let stack = err.stack().unwrap();
    assert!(!stack.contains_function("caller"));
    assert!(stack.contains_function("thrower"));
}

#[test]
fn test_rendered_stack_of_nested_invocation() {
    let ctx = Context::new();
    let outer = closure("outer", |ctx, _, _| {
        let middle = closure("middle", |ctx, _, _| {
            let inner = closure("inner", |ctx, _, _| Err(ctx.throw_error("test")));
            safe_apply(ctx, &inner, &Value::Null, None)
        });
        ctx.call(&middle, &Value::Undefined, &[])
    });

    let err = ctx.call(&outer, &Value::Undefined, &[]).unwrap_err();
    let stack = ctx
        .get_property(err.thrown_value().unwrap(), "stack")
        .unwrap()
        .to_string();
    insta::assert_snapshot!(stack, @r"
Error: test
    at inner
    at outer
    at <main>
");
}
