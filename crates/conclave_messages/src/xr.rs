/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `XRCommandChannel` traffic and the device/session vocabulary shared by
//! the XR device (L3) and the scheduler (L6).

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum XrSessionMode {
    ImmersiveAr,
    ImmersiveVr,
    Inline,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum StereoRenderingMode {
    MultiPass,
    SinglePass,
    SinglePassInstanced,
    SinglePassMultiview,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum XrCommand {
    IsSessionSupported {
        mode: XrSessionMode,
    },
    RequestSession {
        mode: XrSessionMode,
    },
    EndSession {
        session_id: SessionId,
    },
    UpdateBaseLayer {
        session_id: SessionId,
        framebuffer_width: i32,
        framebuffer_height: i32,
        depth_near: f32,
        depth_far: f32,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum XrResponse {
    SessionSupported(bool),
    /// `SessionId::INVALID` iff the host refused the request.
    SessionCreated(SessionId),
    Ack,
}
