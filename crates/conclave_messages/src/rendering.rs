/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Types describing *which* eye and frame a command buffer belongs to.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// Index of the eye a stereo command targets. `0` is left/primary, `1` is
/// right/secondary. Kept as a newtype rather than a bare index so that
/// accidentally indexing a two-element array with a `u8` meant for something
/// else doesn't compile.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct ViewIndex(pub u8);

impl ViewIndex {
    pub const LEFT: ViewIndex = ViewIndex(0);
    pub const RIGHT: ViewIndex = ViewIndex(1);

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Carried by every command buffer that targets a stereo frame rather than
/// the default queue. Absence of this (`None` at the call site) means the
/// command belongs to the default, non-XR queue.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct RenderingInfo {
    pub session_id: SessionId,
    pub stereo_id: u32,
    pub view_index: ViewIndex,
}

/// Which system-supplied matrix a placeholder uniform should resolve to.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum SystemMatrix {
    Projection,
    View,
    ViewRelativeToLocal,
    ViewRelativeToLocalFloor,
    ViewProjection,
}

/// Handedness convention the document declared for its placeholder uniforms.
/// See `conclave_scheduler::placeholder` for how this is reconciled against
/// the host's own (always right-handed, GL-clip-space) convention.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum Handedness {
    RightHanded,
    LeftHanded,
}
