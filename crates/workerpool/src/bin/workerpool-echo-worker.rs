// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A minimal OS-process worker, driven over stdio by [`workerpool_worker::Dispatcher`].
//!
//! Exists for `workerpool`'s own process-backend tests (`tests/`), which spawn it via
//! `env!("CARGO_BIN_EXE_workerpool-echo-worker")`, but it is otherwise an ordinary example of
//! what a `WorkerType::Process` worker binary looks like: register methods, call
//! `Dispatcher::run_stdio`.

use serde_json::{Value, json};
use workerpool_protocol::SerializedError;
use workerpool_worker::Dispatcher;

#[tokio::main]
async fn main() {
    let dispatcher = Dispatcher::builder()
        .method("echo", |params, _ctx| Ok(params.into_iter().next().unwrap_or(Value::Null)))
        .method("add", |params, _ctx| {
            let a = params.first().and_then(Value::as_i64).unwrap_or(0);
            let b = params.get(1).and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(a + b))
        })
        .method("sleep-ms", |params, _ctx| {
            let millis = params.first().and_then(Value::as_u64).unwrap_or(0);
            std::thread::sleep(std::time::Duration::from_millis(millis));
            Ok(Value::Null)
        })
        .method("exit-with", |params, _ctx| {
            let code = params.first().and_then(Value::as_i64).unwrap_or(1);
            #[allow(clippy::exit, reason = "simulates a worker crashing mid-task for tests")]
            std::process::exit(i32::try_from(code).unwrap_or(1));
        })
        .method("boom", |_params, _ctx| Err(SerializedError::new("Boom", "always fails")))
        .build();

    dispatcher.run_stdio().await;
}
