/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! One `XRSession` (spec §3). Owned by the `ContentRuntime` that opened it
//! (see `conclave_content`); `XrDevice` only keeps a weak reference keyed by
//! `SessionId` so the cycle breaks cleanly on runtime teardown (§9 "Cyclic
//! ownership").

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use conclave_messages::{SessionId, XrSessionMode};
use conclave_zone::{Mat4, SessionContextZone, ZoneServer};
use parking_lot::Mutex;

use crate::error::Result;

/// Framebuffer/depth-range info recorded by the most recent
/// `UpdateBaseLayer` XR command (spec §4.4).
#[derive(Copy, Clone, Debug, Default)]
pub struct BaseLayer {
    pub framebuffer_width: i32,
    pub framebuffer_height: i32,
    pub depth_near: f32,
    pub depth_far: f32,
}

pub struct XrSession {
    pub session_id: SessionId,
    pub mode: XrSessionMode,
    zone: Mutex<ZoneServer<SessionContextZone>>,
    stereo_id: AtomicU32,
    base_layer: Mutex<Option<BaseLayer>>,
}

impl XrSession {
    pub(crate) fn new(session_id: SessionId, mode: XrSessionMode, zone_path: PathBuf) -> Result<Self> {
        let zone = ZoneServer::create(
            zone_path,
            SessionContextZone {
                session_id: session_id.0,
                ..Default::default()
            },
        )?;
        Ok(Self {
            session_id,
            mode,
            zone: Mutex::new(zone),
            stereo_id: AtomicU32::new(0),
            base_layer: Mutex::new(None),
        })
    }

    pub fn zone_path(&self) -> PathBuf {
        self.zone.lock().path().to_path_buf()
    }

    /// Allocates the next `stereoId` for a newly started stereo frame
    /// (spec §3: "a monotonically increasing stereoId").
    pub fn next_stereo_id(&self) -> u32 {
        self.stereo_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn set_local_base_matrix(&self, m: Mat4) {
        self.zone.lock().staging_mut().local_base_matrix = m;
    }

    pub fn local_base_matrix(&self) -> Mat4 {
        self.zone.lock().staging().local_base_matrix
    }

    pub fn set_collision_box(&self, min: [f32; 3], max: [f32; 3]) {
        let mut zone = self.zone.lock();
        zone.staging_mut().collision_min = min;
        zone.staging_mut().collision_max = max;
    }

    pub fn collision_box(&self) -> ([f32; 3], [f32; 3]) {
        let zone = self.zone.lock();
        (zone.staging().collision_min, zone.staging().collision_max)
    }

    pub fn set_pending_stereo_frames_count(&self, count: u32) {
        self.zone.lock().staging_mut().pending_stereo_frames_count = count;
    }

    /// Backs the per-session visibility check spec §4.4 derives from the
    /// device's merged frustum (`XrDevice::frustum`); `None` (no frustum
    /// computed yet) leaves the session visible.
    pub fn update_visibility(&self, frustum: Option<&[crate::matrix::Plane; 6]>) {
        let mut zone = self.zone.lock();
        let staging = zone.staging();
        let (min, max, local_base_matrix) = (staging.collision_min, staging.collision_max, staging.local_base_matrix);
        let visible = match frustum {
            Some(frustum) => crate::matrix::aabb_intersects_frustum(frustum, &local_base_matrix, min, max),
            None => true,
        };
        zone.staging_mut().visible = visible as u32;
    }

    pub fn set_base_layer(&self, layer: BaseLayer) {
        *self.base_layer.lock() = Some(layer);
    }

    pub fn base_layer(&self) -> Option<BaseLayer> {
        *self.base_layer.lock()
    }

    /// Commits every field staged since the last tick. Called once per
    /// host tick by the content manager (§3 zone invariant: the host is
    /// the sole writer, committing whole structs).
    pub fn commit(&self) {
        self.zone.lock().sync_data();
    }
}

