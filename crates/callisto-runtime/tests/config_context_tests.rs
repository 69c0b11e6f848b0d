//! Contexts built from `callisto.toml`

mod common;

use callisto_config::{ConfigLoader, NullReceiver, PROJECT_CONFIG_FILE};
use callisto_runtime::{safe_apply, Context, RuntimeError, Value};
use common::*;
use common::assert_eq;
use std::fs;
use tempfile::TempDir;

fn context_from(toml: &str) -> Context {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(PROJECT_CONFIG_FILE), toml).unwrap();
    let mut loader = ConfigLoader::with_global_path(dir.path().join("no-global.toml"));
    let config = loader.load_from_directory(dir.path()).unwrap();
    Context::from_config(&config)
}

#[test]
fn test_configured_trace_limit() {
    let ctx = context_from("[trace]\nlimit = 1\n");
    assert_eq!(ctx.options().trace_limit, 1);

    let caller = closure("caller", |ctx, _, _| {
        let body = closure("body", |ctx, _, _| Ok(Value::string(get_stack(ctx))));
        safe_apply(ctx, &body, &Value::Null, None)
    });
    let stack = ctx.call(&caller, &Value::Undefined, &[]).unwrap().to_string();
    assert_eq!(frames_of(&stack), vec!["getStack"]);
}

#[test]
fn test_configured_receiver_policy() {
    let ctx = context_from("[receiver]\nnull_receiver = \"preserve\"\n");
    assert_eq!(ctx.options().null_receiver, NullReceiver::Preserve);

    let this = closure("", |_, this, _| Ok(this.clone()));
    let seen = hosted_safe_apply(&ctx, this, Value::Undefined, no_args()).unwrap();
    assert_eq!(seen, Value::Undefined);
}

#[test]
fn test_configured_call_depth() {
    let ctx = context_from("[stack]\nmax_call_depth = 4\n");
    let recurse = closure("recurse", |ctx, _, _| {
        let me = ctx.get_global("recurse").unwrap_or(Value::Undefined);
        ctx.call(&me, &Value::Undefined, &[])
    });
    ctx.set_global("recurse", recurse.clone());

    let err = ctx.call(&recurse, &Value::Undefined, &[]).unwrap_err();
    assert!(matches!(err, RuntimeError::StackOverflow { depth: 4 }));
}
