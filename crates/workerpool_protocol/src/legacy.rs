// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{HostMessage, ProtocolError, SerializedError, WorkerMessage};

/// The historical, untagged wire shape: a single struct whose field presence (not a `type`
/// tag) determines what the message means. Kept only for decoding messages from older worker
/// scripts; the host and the `workerpool_worker` dispatcher always encode the tagged shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyMessage {
    /// Correlates a request to its response.
    pub id: u64,
    /// Present on a request that names a registered method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Present on a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
    /// Present on a successful response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on a failed response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

impl LegacyMessage {
    /// Interprets field presence as a [`HostMessage`].
    ///
    /// Only ever produces [`HostMessage::Task`]: the legacy shape predates cleanup/terminate
    /// messages, so those are not representable in it.
    #[must_use]
    pub fn into_host_message(self) -> HostMessage {
        HostMessage::Task {
            id: self.id,
            method: self.method.unwrap_or_default(),
            params: self.params.unwrap_or_default(),
            transfer: Vec::new(),
        }
    }

    /// Interprets field presence as a [`WorkerMessage`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if neither `result` nor `error` is present, since
    /// the legacy shape cannot represent `Ready`/`Event`/stream-capture messages.
    pub fn into_worker_message(self) -> Result<WorkerMessage, ProtocolError> {
        if let Some(error) = self.error {
            return Ok(WorkerMessage::Error { id: self.id, error });
        }
        if let Some(result) = self.result {
            return Ok(WorkerMessage::Success {
                id: self.id,
                result,
                transfer: Vec::new(),
            });
        }
        use serde::de::Error as _;

        Err(ProtocolError::Malformed(serde_json::Error::custom(
            "legacy message has neither result nor error",
        )))
    }
}
