// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`PoolOptions`]: the validated configuration bag for a [`Pool`][crate::Pool].

use std::sync::Arc;
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::queue::QueueStrategy;
use crate::transport::WorkerType;

/// Default grace period a [`crate::handler::WorkerHandler`] waits for a worker to acknowledge
/// cleanup before force-terminating it.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Eager worker warmup floor: either a fixed count, or the literal `"max"`, meaning "warm up to
/// `max_workers`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinWorkers {
    /// Warm up exactly this many workers on start.
    Count(usize),
    /// Warm up to `max_workers` workers on start.
    Max,
}

impl MinWorkers {
    /// Resolves this against a concrete `max_workers` bound.
    #[must_use]
    pub const fn resolve(self, max_workers: usize) -> usize {
        match self {
            Self::Count(count) => count,
            Self::Max => max_workers,
        }
    }
}

impl Default for MinWorkers {
    fn default() -> Self {
        Self::Count(0)
    }
}

impl From<usize> for MinWorkers {
    fn from(count: usize) -> Self {
        Self::Count(count)
    }
}

impl Serialize for MinWorkers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(count) => serializer.serialize_u64(*count as u64),
            Self::Max => serializer.serialize_str("max"),
        }
    }
}

impl<'de> Deserialize<'de> for MinWorkers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Count(usize),
            Literal(String),
        }
        match Wire::deserialize(deserializer)? {
            Wire::Count(count) => Ok(Self::Count(count)),
            Wire::Literal(literal) if literal == "max" => Ok(Self::Max),
            Wire::Literal(other) => Err(D::Error::custom(format!(
                "invalid min_workers value {other:?}: expected a non-negative integer or the string \"max\""
            ))),
        }
    }
}

/// Overrides an `on_create_worker` hook may apply before a new process-backed handler is
/// spawned. There is no thread-side equivalent because an in-process thread has nothing
/// comparable to fork arguments beyond its stack size, which is configured once on
/// [`PoolOptions`] instead.
#[derive(Debug, Clone, Default)]
pub struct WorkerSpawnOverrides {
    /// Extra arguments appended after [`PoolOptions::process_args`].
    pub extra_process_args: Vec<String>,
    /// Extra environment variables appended after [`PoolOptions::process_envs`].
    pub extra_envs: Vec<(String, String)>,
}

/// Called before each process-backed worker is spawned, to let the caller adjust its
/// command-line/environment on a per-worker basis (for example, assigning a shard index).
pub type CreateWorkerHook = Arc<dyn Fn(u64) -> WorkerSpawnOverrides + Send + Sync>;

/// Validated, plain-data configuration for a [`Pool`][crate::Pool].
///
/// Every field here is serializable so a caller may load options from a config file via
/// [`serde`]; `#[serde(deny_unknown_fields)]` rejects typo'd or unrecognized keys. Callers
/// building a `Pool` programmatically go through [`PoolBuilder`][crate::pool::PoolBuilder]
/// instead, which is already statically checked by the compiler and does not need this defence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolOptions {
    /// Workers eagerly constructed on pool start: a fixed count, or [`MinWorkers::Max`] to warm
    /// up to `max_workers`. Defaults to `0` (fully lazy).
    #[serde(default)]
    pub min_workers: MinWorkers,
    /// Upper bound on concurrently live workers. Must be `>= 1`.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Upper bound on queued-but-undispatched tasks. `None` means unbounded.
    #[serde(default)]
    pub max_queue_size: Option<usize>,
    /// Dequeue discipline for tasks waiting on a worker.
    #[serde(default)]
    pub queue_strategy: QueueStrategy,
    /// Isolation backend new workers use.
    #[serde(default)]
    pub worker_type: WorkerType,
    /// How long a handler waits for `CleanupComplete` before force-terminating the worker.
    #[serde(default = "default_grace_period_ms", rename = "grace_period_ms")]
    pub grace_period_ms: u64,
    /// Program to launch for [`WorkerType::Process`] workers. Required (validated) when
    /// `worker_type` resolves to `Process`.
    #[serde(default)]
    pub process_program: Option<String>,
    /// Fixed arguments passed to every spawned worker process, before any
    /// [`WorkerSpawnOverrides::extra_process_args`].
    #[serde(default)]
    pub process_args: Vec<String>,
    /// Fixed environment variables passed to every spawned worker process.
    #[serde(default)]
    pub process_envs: Vec<(String, String)>,
}

const fn default_max_workers() -> usize {
    4
}

const fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD.as_millis() as u64
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            min_workers: MinWorkers::default(),
            max_workers: default_max_workers(),
            max_queue_size: None,
            queue_strategy: QueueStrategy::default(),
            worker_type: WorkerType::default(),
            grace_period_ms: default_grace_period_ms(),
            process_program: None,
            process_args: Vec::new(),
            process_envs: Vec::new(),
        }
    }
}

impl PoolOptions {
    /// This option's grace period as a [`Duration`].
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Rejects non-positive worker counts, a `min_workers` above `max_workers`, an unsupported
    /// backend, or a process backend with no configured program. `max_queue_size: Some(0)` is a
    /// legitimate bound (every task rejects synchronously) and is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_workers == 0 {
            return Err(ValidationError::out_of_range("max_workers", "at least 1"));
        }
        if self.min_workers.resolve(self.max_workers) > self.max_workers {
            return Err(ValidationError::out_of_range("min_workers", "no greater than max_workers"));
        }
        if matches!(self.worker_type, WorkerType::Web) {
            return Err(ValidationError::unsupported_backend("web"));
        }
        if matches!(self.worker_type, WorkerType::Process) && self.process_program.is_none() {
            return Err(ValidationError::new(
                "worker_type is 'process' but no process_program was configured",
            ));
        }
        Ok(())
    }
}
