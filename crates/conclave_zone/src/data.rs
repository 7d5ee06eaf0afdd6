/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The three zone payload shapes named in spec §3/§4.3: `DeviceContext`,
//! `InputSources`, and one `SessionContext` per XR session. Every field is
//! `Copy`/`repr(C)` plain data so a whole value can be memcpy'd by
//! `ZoneServer::sync_data` and read back by value on the client side.

pub type Mat4 = [f32; 16];

pub const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// One eye's worth of the device context's current stereo frame (§3
/// `DeviceContext`).
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct XrView {
    pub viewport: [i32; 4],
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub view_framebuffer_id: u32,
}

impl Default for XrView {
    fn default() -> Self {
        Self {
            viewport: [0; 4],
            view_matrix: IDENTITY,
            projection_matrix: IDENTITY,
            view_framebuffer_id: 0,
        }
    }
}

/// Published to every document via a single shared zone (§4.4).
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct DeviceContextZone {
    pub enabled: u32,
    pub stereo_mode: u32,
    pub recommended_fov: f32,
    pub viewer_base_matrix: Mat4,
    pub views: [XrView; 2],
    pub framebuffer_width: i32,
    pub framebuffer_height: i32,
}

impl Default for DeviceContextZone {
    fn default() -> Self {
        Self {
            enabled: 0,
            stereo_mode: 0,
            recommended_fov: 90.0,
            viewer_base_matrix: IDENTITY,
            views: [XrView::default(); 2],
            framebuffer_width: 0,
            framebuffer_height: 0,
        }
    }
}

pub const NUM_HAND_JOINTS: usize = 25;

/// Discriminant for `InputSourceSlot::kind`. A plain `u32` rather than a
/// Rust enum so the slot stays `Copy`/`repr(C)` without a tag-union dance;
/// `0` means the slot is unoccupied.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u32)]
pub enum InputSourceKind {
    Empty = 0,
    Gaze = 1,
    MainController = 2,
    TransientPointer = 3,
    HandLeft = 4,
    HandRight = 5,
    Screen = 6,
}

#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct HandJoint {
    pub transform: Mat4,
    pub radius: f32,
}

impl Default for HandJoint {
    fn default() -> Self {
        Self {
            transform: IDENTITY,
            radius: 0.0,
        }
    }
}

/// One `InputSource` (§3). Sized to the union of every variant's fields;
/// `joints` is only meaningful when `kind` is `HandLeft`/`HandRight`.
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct InputSourceSlot {
    pub kind: InputSourceKind,
    pub enabled: u32,
    pub screen_index: u32,
    pub target_ray: Mat4,
    pub grip: Mat4,
    pub has_hit_test_result: u32,
    pub hit_test_matrix: Mat4,
    pub primary_pressed: u32,
    pub squeeze_pressed: u32,
    pub joints: [HandJoint; NUM_HAND_JOINTS],
}

impl Default for InputSourceSlot {
    fn default() -> Self {
        Self {
            kind: InputSourceKind::Empty,
            enabled: 0,
            screen_index: 0,
            target_ray: IDENTITY,
            grip: IDENTITY,
            has_hit_test_result: 0,
            hit_test_matrix: IDENTITY,
            primary_pressed: 0,
            squeeze_pressed: 0,
            joints: [HandJoint::default(); NUM_HAND_JOINTS],
        }
    }
}

pub const MAX_INPUT_SOURCES: usize = 16;

/// Single zone shared by every document in the process (§3 "InputSource").
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct InputSourcesZone {
    pub slots: [InputSourceSlot; MAX_INPUT_SOURCES],
}

impl Default for InputSourcesZone {
    fn default() -> Self {
        Self {
            slots: [InputSourceSlot::default(); MAX_INPUT_SOURCES],
        }
    }
}

/// One per `XRSession`, keyed by filename published over the XR command
/// channel response (§3 `XRSession`, §4.7 "backpressure").
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct SessionContextZone {
    pub session_id: u32,
    pub local_base_matrix: Mat4,
    pub collision_min: [f32; 3],
    pub collision_max: [f32; 3],
    /// Count of fully-committed (both eyes `ended`) but not-yet-replayed
    /// stereo frames, published each tick so the document's XR loop can
    /// throttle `requestAnimationFrame` (§4.7 "Stereo-frame counting for
    /// backpressure").
    pub pending_stereo_frames_count: u32,
    /// Whether the session's collision box, placed in world space by
    /// `local_base_matrix`, intersects the device's current merged
    /// stereoscopic frustum (§4.4 "Frustum maintenance"). `1` until the
    /// device has never computed a frustum (no right-eye view matrix set
    /// yet), matching "assume visible until proven otherwise".
    pub visible: u32,
}

impl Default for SessionContextZone {
    fn default() -> Self {
        Self {
            session_id: 0,
            local_base_matrix: IDENTITY,
            collision_min: [0.0; 3],
            collision_max: [0.0; 3],
            pending_stereo_frames_count: 0,
            visible: 1,
        }
    }
}
