// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`PoolStats`]: a point-in-time snapshot of a [`Pool`][crate::Pool]'s load.

/// A snapshot of [`Pool`][crate::Pool] load at the moment [`Pool::stats`][crate::Pool::stats]
/// was called. Not kept consistent with subsequent pool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Worker handlers currently tracked by the pool, in any state.
    pub total_workers: usize,
    /// Handlers whose processing set is non-empty.
    pub busy_workers: usize,
    /// Handlers that are ready and idle.
    pub idle_workers: usize,
    /// Tasks waiting in the queue, not yet assigned to a handler.
    pub pending_tasks: usize,
    /// Tasks currently in some handler's processing set.
    pub active_tasks: usize,
    /// Best-effort estimate of the queue's retained JSON payload size, when the pool is
    /// configured to track it. `None` by default: tracking this exactly would mean
    /// re-serializing every queued task's params on every stats call, which this crate does not
    /// do unasked.
    pub queued_bytes_estimate: Option<u64>,
}
