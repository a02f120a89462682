// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Method names reserved by the protocol itself, never dispatched to user code.

/// Sent (as a legacy-shape method name) to ask a worker to exit gracefully.
pub const RESERVED_TERMINATE: &str = "__workerpool-terminate__";

/// Sent (as a legacy-shape method name) to run the abort listeners for a task.
pub const RESERVED_CLEANUP: &str = "__workerpool-cleanup__";

/// Sent periodically to confirm the worker's message loop is still alive.
pub const RESERVED_HEARTBEAT: &str = "__workerpool-heartbeat__";

/// A well-known method name, callable like any other task, that a dispatcher answers with the
/// sorted list of its registered method names. Unlike the other reserved names this one *is*
/// dispatched as a task (so [`Pool::proxy`][pool] can populate itself over the same wire path
/// used for ordinary calls) rather than rejected by [`is_reserved_method`].
///
/// [pool]: https://docs.rs/workerpool/latest/workerpool/struct.Pool.html#method.proxy
pub const RESERVED_METHODS: &str = "__workerpool-methods__";

/// Returns whether `method` names one of the reserved, protocol-internal operations.
#[must_use]
pub fn is_reserved_method(method: &str) -> bool {
    matches!(
        method,
        RESERVED_TERMINATE | RESERVED_CLEANUP | RESERVED_HEARTBEAT
    )
}
