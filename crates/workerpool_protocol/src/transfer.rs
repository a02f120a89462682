// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// A buffer handed off with zero-copy semantics when the backend supports it.
///
/// For the in-process thread backend, the bytes are moved (not cloned) across the channel
/// boundary and `handles` are cleared on the sender side after the hand-off, mirroring the
/// "becomes unusable on the sender side" rule. For the OS-process backend there is no shared
/// address space to move bytes into, so the core falls back to copying the bytes into the
/// wire frame; the zero-copy contract only binds where the backend can actually honour it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferHandle {
    /// The raw bytes being handed off.
    pub bytes: Vec<u8>,
}

impl TransferHandle {
    /// Wraps `bytes` for hand-off.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Takes the bytes out, leaving an empty handle behind — used on the sender side of the
    /// thread backend to make the original handle unusable after transfer.
    #[must_use]
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

/// A value paired with a list of buffers to transfer alongside it.
///
/// Constructed by callers via `Transfer::new(value, handles)` and unwrapped by the
/// [`WorkerHandler`][handler] before it reaches the backend's native transfer mechanism.
///
/// [handler]: https://docs.rs/workerpool/latest/workerpool/struct.WorkerHandler.html
#[derive(Debug, Clone)]
pub struct Transfer<T> {
    /// The payload.
    pub value: T,
    /// Buffers to move (rather than copy) alongside the payload, where the backend allows it.
    pub handles: Vec<TransferHandle>,
}

impl<T> Transfer<T> {
    /// Wraps `value` together with the buffers that should be handed off with it.
    #[must_use]
    pub const fn new(value: T, handles: Vec<TransferHandle>) -> Self {
        Self { value, handles }
    }

    /// Wraps `value` with no transferable buffers — equivalent to a plain value.
    #[must_use]
    pub const fn without_transfer(value: T) -> Self {
        Self { value, handles: Vec::new() }
    }
}
