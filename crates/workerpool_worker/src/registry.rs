// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use workerpool_protocol::SerializedError;

use crate::context::TaskContext;

/// A registered method: takes the call's positional params and a [`TaskContext`] for abort
/// listener registration and event emission, and returns either a result value or a thrown
/// value serialized per the [`SerializedError`] protocol.
pub type MethodFn =
    Arc<dyn Fn(Vec<Value>, &TaskContext) -> Result<Value, SerializedError> + Send + Sync>;

#[derive(Default, Clone)]
pub(crate) struct Registry {
    methods: HashMap<String, MethodFn>,
}

impl Registry {
    pub(crate) fn insert(&mut self, name: String, method: MethodFn) {
        self.methods.insert(name, method);
    }

    pub(crate) fn get(&self, name: &str) -> Option<&MethodFn> {
        self.methods.get(name)
    }

    /// Registered method names, sorted for a stable introspection reply.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
