/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `StereoFrame`: the unit of XR rendering (spec §3). Holds two per-eye
//! command-buffer lists plus the four per-eye flags the selection rules in
//! §4.7 switch on.

use conclave_messages::{CommandBuffer, MessageId, SessionId};

/// A command buffer paired with the id of the request that produced it, so a
/// query's `GlResponse` can be sent back correlated (spec §4.2). Most
/// commands carry no live reply; `message_id` is still recorded uniformly so
/// ingestion doesn't need to special-case query variants.
#[derive(Clone, Debug)]
pub struct QueuedCommand {
    pub message_id: MessageId,
    pub buffer: CommandBuffer,
}

#[derive(Clone, Debug, Default)]
pub struct EyeState {
    pub commands: Vec<QueuedCommand>,
    pub started: bool,
    pub flush_pending: bool,
    pub ended: bool,
    pub finished: bool,
    pub idempotent: bool,
}

#[derive(Clone, Debug)]
pub struct StereoFrame {
    pub stereo_id: u32,
    pub session_id: SessionId,
    pub eyes: [EyeState; 2],
    /// Cleared the moment the frame's last eye is reaped (spec §3: "A
    /// stereo frame is never destroyed while any eye still has `finished ==
    /// false` and `available == true`" — `available` flips to `false`
    /// exactly at removal, so in practice a frame is either in the queue
    /// with `available == true` or already gone).
    pub available: bool,
}

impl StereoFrame {
    pub fn new(stereo_id: u32, session_id: SessionId) -> Self {
        Self {
            stereo_id,
            session_id,
            eyes: [EyeState::default(), EyeState::default()],
            available: true,
        }
    }

    pub fn both_ended(&self) -> bool {
        self.eyes[0].ended && self.eyes[1].ended
    }

    pub fn is_empty(&self) -> bool {
        self.eyes[0].commands.is_empty() && self.eyes[1].commands.is_empty()
    }

    pub fn start_frame(&mut self, view_index: usize) {
        self.eyes[view_index].started = true;
    }
}
