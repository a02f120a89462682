// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(missing_docs)]

//! The worker side of workerpool: a method registry and RPC loop that a worker binary (spawned
//! as an OS process) or a worker thread (spawned in-process by the host) runs to answer
//! [`workerpool_protocol`] requests.
//!
//! A [`Dispatcher`] is built once with its callable methods registered, then driven either by
//! [`Dispatcher::run_stdio`] (newline-delimited JSON over stdin/stdout, for the OS-process
//! backend) or [`Dispatcher::run_channel`] (typed messages over an [`async_channel`] pair, for
//! the in-process thread backend). Both share one [`Dispatcher::handle_one`] core so the two
//! transports can never drift in behaviour.

mod context;
mod dispatcher;
mod registry;

pub use context::TaskContext;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use registry::MethodFn;
