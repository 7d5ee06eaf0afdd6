/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `EventChannel` traffic: native lifecycle events and the document<->host
//! RPC bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{DocumentId, MessageId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentRequestInit {
    pub id: DocumentId,
    pub url: String,
    pub disable_cache: bool,
    pub is_preview: bool,
    pub run_scripts: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum DocumentEventType {
    Loaded,
    DomContentLoaded,
    Crashed,
    /// The document's process exited cleanly (hive `OnExit` with exit code
    /// 0). Distinct from `Loaded`: a clean exit is not a load milestone, it
    /// is the runtime-visible counterpart of `close()`/`dispose()` (spec §7
    /// "the host observes a close event via the native-event target").
    Closed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentEvent {
    pub document_id: DocumentId,
    pub event_type: DocumentEventType,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    pub message_id: MessageId,
    pub document_id: DocumentId,
    pub method: String,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub message_id: MessageId,
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcResponse {
    pub fn ok(message_id: MessageId, data: Option<Value>) -> Self {
        Self {
            message_id,
            success: true,
            message: String::new(),
            data,
        }
    }

    pub fn failed(message_id: MessageId, message: impl Into<String>) -> Self {
        Self {
            message_id,
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// A host-to-document notification outside the request/response RPC flow
/// (spec §6 `dispatchNativeEvent(type, detail)`), e.g. visibility or
/// device-orientation changes the embedder wants every started document to
/// observe without a matching reply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NativeEvent {
    pub event_type: String,
    pub detail: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventMessage {
    DocumentRequest(DocumentRequestInit),
    DocumentEvent(DocumentEvent),
    RpcRequest(RpcRequest),
    RpcResponse(RpcResponse),
    NativeEvent(NativeEvent),
}
