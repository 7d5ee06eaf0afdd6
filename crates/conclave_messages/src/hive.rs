/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `HiveCommandChannel` traffic: the host<->hive-daemon protocol that is the
//! only path by which a document process comes into existence.

use serde::{Deserialize, Serialize};

use crate::ids::DocumentId;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum HiveCommand {
    CreateClient {
        document_id: DocumentId,
        url: String,
        disable_cache: bool,
        is_preview: bool,
        run_scripts: bool,
    },
    TerminateClient {
        document_id: DocumentId,
    },
    Ping,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum HiveEvent {
    OnServerReady,
    CreateClientResponse {
        document_id: DocumentId,
        pid: Option<u32>,
    },
    TerminateClientResponse {
        document_id: DocumentId,
        found: bool,
    },
    OnExit {
        document_id: DocumentId,
        exit_code: i32,
    },
    OnLogEntry {
        document_id: DocumentId,
        pid: u32,
        level: LogLevel,
        text: String,
        timestamp: f64,
    },
}
