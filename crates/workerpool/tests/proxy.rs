// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde_json::json;
use workerpool::{Pool, PoolError, WorkerType};

fn echo_worker_path() -> &'static str {
    env!("CARGO_BIN_EXE_workerpool-echo-worker")
}

#[tokio::test]
async fn proxy_discovers_methods_over_the_process_backend_and_calls_through() {
    let pool = Pool::builder()
        .worker_type(WorkerType::Process)
        .max_workers(1)
        .process_command(echo_worker_path(), vec![], vec![])
        .build()
        .unwrap();

    let proxy = pool.proxy().await.unwrap();
    assert_eq!(proxy.methods(), &["add", "boom", "echo", "exit-with", "sleep-ms"]);

    let sum = proxy.call("add", vec![json!(2), json!(5)]).await.unwrap();
    assert_eq!(sum, json!(7));

    let err = proxy.call("does-not-exist", vec![]).await.unwrap_err();
    assert!(matches!(err, PoolError::Validation(_)));
}
