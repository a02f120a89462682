// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A cross-runtime worker pool: offload CPU-bound work from a host event loop onto a managed
//! set of thread- or process-isolated workers, exposed as cancellable, timeout-bearing futures.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use workerpool::{Pool, WorkerType};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Pool::builder()
//!     .worker_type(WorkerType::Thread)
//!     .max_workers(4)
//!     .dispatcher_factory(Arc::new(|| {
//!         workerpool_worker::Dispatcher::builder()
//!             .method("add", |params, _ctx| {
//!                 let a = params[0].as_i64().unwrap_or_default();
//!                 let b = params[1].as_i64().unwrap_or_default();
//!                 Ok(json!(a + b))
//!             })
//!             .build()
//!     }))
//!     .build()?;
//!
//! let sum = pool.exec("add", vec![json!(3), json!(4)]).await?;
//! assert_eq!(sum, json!(7));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod events;
mod future;
mod handler;
mod options;
mod pool;
mod proxy;
mod queue;
mod stats;
mod task;
mod transport;

pub use error::{
    CancellationError, PoolError, QueueFullError, TaskError, TerminateError, TimeoutError, ValidationError, WorkerError,
};
pub use events::{EventReceiver, PoolEvent};
pub use future::PoolFuture;
pub use handler::{HandlerEvent, HandlerState, WorkerHandler};
pub use options::{CreateWorkerHook, MinWorkers, PoolOptions, WorkerSpawnOverrides};
pub use pool::{ExecOptions, Pool, PoolBuilder};
pub use proxy::MethodProxy;
pub use queue::{Comparator, Prioritized, QueueStrategy, TaskQueue};
pub use stats::PoolStats;
pub use task::{EventSink, Method, PrioritizedTask, Task};
pub use transport::{DispatcherFactory, WorkerType};

pub use workerpool_protocol::{SerializedError, Transfer, TransferHandle};

#[cfg(test)]
static_assertions::assert_impl_all!(Pool: Send, Sync, Clone);
#[cfg(test)]
static_assertions::assert_impl_all!(PoolFuture<serde_json::Value>: Send);
#[cfg(test)]
static_assertions::assert_impl_all!(PoolError: Send, Sync, std::error::Error);
