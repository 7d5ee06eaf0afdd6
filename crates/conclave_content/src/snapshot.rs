/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Plain serializable snapshot types that back the out-of-scope inspector's
//! `/contents` endpoint without pulling its HTTP server into this crate.

use serde::Serialize;

use conclave_messages::DocumentId;

#[derive(Clone, Debug, Serialize)]
pub struct ContentSnapshot {
    pub id: DocumentId,
    pub pid: Option<u32>,
    pub used: bool,
    pub url: String,
    pub disable_cache: bool,
    pub devtools_frontend_url: String,
    pub web_socket_debugger_url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RuntimeSnapshot {
    pub version: String,
    pub uptime_seconds: f64,
    pub contents: Vec<ContentSnapshot>,
}
