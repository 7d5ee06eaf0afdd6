/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `MediaCommandChannel` traffic: document-to-host audio operations and the
//! host-to-document media events that answer them.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct MediaId(pub u32);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MediaCommand {
    Create {
        id: MediaId,
    },
    Play {
        id: MediaId,
    },
    Pause {
        id: MediaId,
    },
    Seek {
        id: MediaId,
        time: f64,
    },
    SetData {
        id: MediaId,
        bytes: Vec<u8>,
    },
    SetVolume {
        id: MediaId,
        volume: f32,
    },
    SetLooping {
        id: MediaId,
        looping: bool,
    },
    EnableSpatialization {
        id: MediaId,
        enabled: bool,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum MediaEventType {
    LoadStart,
    LoadedMetadata,
    Ended,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaEvent {
    pub id: MediaId,
    pub event_type: MediaEventType,
}
