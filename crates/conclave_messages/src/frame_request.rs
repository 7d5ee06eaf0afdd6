/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `FrameRequestChannel` traffic: host-to-document notification that a new
//! animation frame (and, if the document has an active XR session, a new XR
//! frame) is available to draw.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FrameRequestMessage {
    AnimationFrame { time: f64 },
    XrFrame { time: f64, session_id: SessionId },
}
