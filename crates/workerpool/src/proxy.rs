// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`MethodProxy`]: a convenience over [`Pool::exec`][crate::Pool::exec] whose calls are
//! validated against a worker's own registered method names instead of only discovered as a
//! `MethodNotFound` error after a round trip.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{PoolError, ValidationError};
use crate::future::{self, PoolFuture};
use crate::pool::{ExecOptions, Pool};

/// A snapshot of one worker's registered methods, obtained once via the
/// `__workerpool-methods__` introspection call and cached by [`Pool::proxy`][crate::Pool::proxy].
///
/// Every method still runs as an ordinary [`Pool::exec`] call; the only thing a `MethodProxy`
/// adds is rejecting calls to names the worker never registered, synchronously and without a
/// round trip.
pub struct MethodProxy {
    pool: Pool,
    methods: Arc<[String]>,
}

impl MethodProxy {
    pub(crate) fn new(pool: Pool, methods: Arc<[String]>) -> Self {
        Self { pool, methods }
    }

    /// The worker's registered method names, sorted, as reported by the introspection call.
    #[must_use]
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// Whether `name` was among the registered methods at the time the proxy was populated.
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|method| method == name)
    }

    /// Calls `method` with default [`ExecOptions`], rejecting immediately if `method` was not in
    /// the cached method list rather than dispatching a call the worker would refuse anyway.
    #[must_use]
    pub fn call(&self, method: impl Into<String>, params: Vec<Value>) -> PoolFuture<Value> {
        self.call_with(method, params, ExecOptions::default())
    }

    /// Like [`call`][Self::call], with the same per-call overrides [`Pool::exec_with`] accepts.
    #[must_use]
    pub fn call_with(&self, method: impl Into<String>, params: Vec<Value>, options: ExecOptions) -> PoolFuture<Value> {
        let method = method.into();
        if !self.has_method(&method) {
            let (future, settler) = future::root(self.pool.clock());
            settler.reject(PoolError::Validation(ValidationError::new(format!(
                "'{method}' is not among the worker's registered methods: {:?}",
                self.methods
            ))));
            return future;
        }
        self.pool.exec_with(method, params, options)
    }
}

impl std::fmt::Debug for MethodProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodProxy").field("methods", &self.methods).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::{DispatcherFactory, WorkerType};

    fn proxy_pool() -> Pool {
        let factory: DispatcherFactory = Arc::new(|| {
            workerpool_worker::Dispatcher::builder()
                .method("add", |params, _ctx| {
                    let a = params.first().and_then(Value::as_i64).unwrap_or(0);
                    let b = params.get(1).and_then(Value::as_i64).unwrap_or(0);
                    Ok(json!(a + b))
                })
                .build()
        });
        Pool::builder().worker_type(WorkerType::Thread).max_workers(1).dispatcher_factory(factory).build().unwrap()
    }

    #[tokio::test]
    async fn proxy_discovers_and_calls_a_registered_method() {
        let pool = proxy_pool();
        let proxy = pool.proxy().await.unwrap();

        assert_eq!(proxy.methods(), &["add".to_owned()]);
        assert!(proxy.has_method("add"));

        let result = proxy.call("add", vec![json!(2), json!(3)]).await.unwrap();
        assert_eq!(result, json!(5));
    }

    #[tokio::test]
    async fn proxy_rejects_unregistered_methods_without_a_round_trip() {
        let pool = proxy_pool();
        let proxy = pool.proxy().await.unwrap();

        let err = proxy.call("subtract", vec![]).await.unwrap_err();
        assert!(matches!(err, PoolError::Validation(_)));
    }

    #[tokio::test]
    async fn proxy_is_cached_across_calls() {
        let pool = proxy_pool();
        let first = pool.proxy().await.unwrap();
        let second = pool.proxy().await.unwrap();
        assert_eq!(first.methods(), second.methods());
    }
}
