/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L3: the single process-wide XR device state (spec §4.4).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use conclave_messages::{SessionId, StereoRenderingMode, ViewIndex, XrSessionMode};
use conclave_zone::{DeviceContextZone, InputSourceKind, InputSourcesZone, Mat4, ZoneServer};
use parking_lot::{Mutex, RwLock};
use rand::Rng;

use crate::error::{Result, XrError};
use crate::matrix::{self, Plane};
use crate::session::XrSession;

const SESSION_ID_RETRIES: usize = 10;

/// `InputSource`'s primary/squeeze action, named independently of the
/// wire-level `XrCommand` vocabulary since input-source state is host-API
/// driven, not document-driven (spec §6).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InputAction {
    Primary,
    Squeeze,
}

/// Which hand a `setHandJointPose` call targets (spec §6, §3 `Hand(Left|Right)`).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Handedness {
    Left,
    Right,
}

/// In-memory mirror of the device-context zone's logical fields (the zone
/// itself only stores the plain-data projection of this, committed once
/// per tick by `commit`).
struct DeviceState {
    active: bool,
    stereo_mode: StereoRenderingMode,
    recommended_fov: f32,
    viewer_base_matrix: Mat4,
    views: [conclave_zone::XrView; 2],
    active_eye: ViewIndex,
    frustum: Option<[Plane; 6]>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            active: false,
            stereo_mode: StereoRenderingMode::MultiPass,
            recommended_fov: 90.0,
            viewer_base_matrix: conclave_zone::IDENTITY,
            views: [conclave_zone::XrView::default(); 2],
            active_eye: ViewIndex::LEFT,
            frustum: None,
        }
    }
}

fn stereo_mode_tag(mode: StereoRenderingMode) -> u32 {
    match mode {
        StereoRenderingMode::MultiPass => 0,
        StereoRenderingMode::SinglePass => 1,
        StereoRenderingMode::SinglePassInstanced => 2,
        StereoRenderingMode::SinglePassMultiview => 3,
    }
}

/// Owns the device-context and input-sources zones plus every live
/// `XRSession`'s weak handle. Constructed once per host instance (§9
/// "Global state": `ProcessSingleton<XrDevice>`).
pub struct XrDevice {
    state: Mutex<DeviceState>,
    device_zone: Mutex<ZoneServer<DeviceContextZone>>,
    input_zone: Mutex<ZoneServer<InputSourcesZone>>,
    sessions: RwLock<HashMap<SessionId, Weak<XrSession>>>,
    next_session_id: AtomicU32,
    zones_dir: PathBuf,
}

impl XrDevice {
    /// `zones_dir` is `<applicationCacheDirectory>/zones/` (spec §6).
    pub fn new(zones_dir: impl Into<PathBuf>) -> Result<Self> {
        let zones_dir = zones_dir.into();
        let device_zone = ZoneServer::create(zones_dir.join("device-context.zone"), DeviceContextZone::default())?;
        let input_zone = ZoneServer::create(zones_dir.join("input-sources.zone"), InputSourcesZone::default())?;
        Ok(Self {
            state: Mutex::new(DeviceState::default()),
            device_zone: Mutex::new(device_zone),
            input_zone: Mutex::new(input_zone),
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU32::new(1),
            zones_dir,
        })
    }

    pub fn device_zone_path(&self) -> PathBuf {
        self.device_zone.lock().path().to_path_buf()
    }

    pub fn input_zone_path(&self) -> PathBuf {
        self.input_zone.lock().path().to_path_buf()
    }

    /// `configureXrDevice` (spec §6 `XRDeviceInit`).
    pub fn configure(&self, enabled: bool, active: bool, stereo_mode: StereoRenderingMode, recommended_fov: f32) {
        let mut state = self.state.lock();
        state.active = enabled && active;
        state.stereo_mode = stereo_mode;
        state.recommended_fov = recommended_fov;
        let mut zone = self.device_zone.lock();
        zone.staging_mut().enabled = enabled as u32;
        zone.staging_mut().stereo_mode = stereo_mode_tag(stereo_mode);
        zone.staging_mut().recommended_fov = recommended_fov;
    }

    pub fn enabled(&self) -> bool {
        self.state.lock().active
    }

    /// `IsSessionSupported` (spec §4.4): every mode is supported once the
    /// device itself is enabled. There is no per-mode capability negotiation
    /// in this runtime — that lives in the out-of-scope device backend.
    pub fn is_session_supported(&self, _mode: XrSessionMode) -> bool {
        self.enabled()
    }

    pub fn stereo_mode(&self) -> StereoRenderingMode {
        self.state.lock().stereo_mode
    }

    pub fn update_viewport(&self, width: i32, height: i32) {
        let mut zone = self.device_zone.lock();
        zone.staging_mut().framebuffer_width = width;
        zone.staging_mut().framebuffer_height = height;
    }

    pub fn update_fov(&self, fov: f32) {
        self.state.lock().recommended_fov = fov;
        self.device_zone.lock().staging_mut().recommended_fov = fov;
    }

    pub fn update_viewer_base_matrix(&self, m: Mat4) {
        self.state.lock().viewer_base_matrix = m;
        self.device_zone.lock().staging_mut().viewer_base_matrix = m;
    }

    /// `eye` is `0` (left) or `1` (right); recomputes the merged frustum
    /// after the right eye's view matrix is set (spec §4.4).
    pub fn update_view_matrix(&self, eye: ViewIndex, m: Mat4) -> Result<()> {
        if eye.as_usize() > 1 {
            return Err(XrError::InvalidEye(eye.0));
        }
        let mut state = self.state.lock();
        state.views[eye.as_usize()].view_matrix = m;
        state.active_eye = eye;
        if eye == ViewIndex::RIGHT {
            let left = matrix::mul(&state.views[0].projection_matrix, &state.views[0].view_matrix);
            let right = matrix::mul(&state.views[1].projection_matrix, &state.views[1].view_matrix);
            let left_planes = matrix::frustum_planes(&left);
            let right_planes = matrix::frustum_planes(&right);
            state.frustum = Some(matrix::merge_frustums(&left_planes, &right_planes));
        }
        let view = state.views[eye.as_usize()];
        drop(state);
        let mut zone = self.device_zone.lock();
        zone.staging_mut().views[eye.as_usize()].view_matrix = view.view_matrix;
        Ok(())
    }

    pub fn update_projection_matrix(&self, eye: ViewIndex, m: Mat4) -> Result<()> {
        if eye.as_usize() > 1 {
            return Err(XrError::InvalidEye(eye.0));
        }
        self.state.lock().views[eye.as_usize()].projection_matrix = m;
        self.device_zone.lock().staging_mut().views[eye.as_usize()].projection_matrix = m;
        Ok(())
    }

    /// The eye most recently targeted by `update_view_matrix`; consulted by
    /// the scheduler in multipass mode (spec §4.4 "Active-eye tracking").
    pub fn active_eye(&self) -> ViewIndex {
        self.state.lock().active_eye
    }

    pub fn frustum(&self) -> Option<[Plane; 6]> {
        self.state.lock().frustum
    }

    pub fn view(&self, eye: ViewIndex) -> conclave_zone::XrView {
        self.state.lock().views[eye.as_usize()]
    }

    pub fn viewer_base_matrix(&self) -> Mat4 {
        self.state.lock().viewer_base_matrix
    }

    /// Allocates a fresh `SessionId`, retrying on collision up to
    /// `SESSION_ID_RETRIES` times (spec §4.4), and creates its zone.
    /// Ownership of the returned `Arc` belongs to the caller (normally a
    /// `ContentRuntime`); the device keeps only a weak reference.
    pub fn request_session(&self, mode: XrSessionMode) -> Result<Arc<XrSession>> {
        let mut sessions = self.sessions.write();
        let mut rng = rand::thread_rng();
        for _ in 0..SESSION_ID_RETRIES {
            let candidate = if sessions.is_empty() {
                SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed))
            } else {
                SessionId(rng.gen::<u32>().max(1))
            };
            if candidate.is_valid() && !sessions.contains_key(&candidate) {
                let zone_path = self.zones_dir.join(format!("session-{}.zone", candidate.0));
                let session = Arc::new(XrSession::new(candidate, mode, zone_path)?);
                sessions.insert(candidate, Arc::downgrade(&session));
                return Ok(session);
            }
        }
        Err(XrError::SessionIdExhausted)
    }

    /// Tears down a session's zone registration. The `ContentRuntime` still
    /// owns dropping the `Arc` itself; this only removes the device's
    /// lookup entry (spec §4.4 `EndSession`).
    pub fn end_session(&self, session_id: SessionId) {
        self.sessions.write().remove(&session_id);
    }

    pub fn session(&self, session_id: SessionId) -> Option<Arc<XrSession>> {
        self.sessions.read().get(&session_id)?.upgrade()
    }

    /// Drops weak entries whose `Arc` has already gone away, e.g. because
    /// the owning `ContentRuntime` was destroyed without an explicit
    /// `EndSession` (spec §9 "Cyclic ownership").
    pub fn reap_dead_sessions(&self) {
        self.sessions.write().retain(|_, weak| weak.strong_count() > 0);
    }

    pub fn set_input_source(&self, slot_index: usize, slot: conclave_zone::InputSourceSlot) {
        if slot_index < conclave_zone::MAX_INPUT_SOURCES {
            self.input_zone.lock().staging_mut().slots[slot_index] = slot;
        }
    }

    pub fn clear_input_source(&self, slot_index: usize) {
        if slot_index < conclave_zone::MAX_INPUT_SOURCES {
            self.input_zone.lock().staging_mut().slots[slot_index] = conclave_zone::InputSourceSlot {
                kind: InputSourceKind::Empty,
                ..conclave_zone::InputSourceSlot::default()
            };
        }
    }

    /// The two hand variants of `InputSource` (spec §3) live at fixed slots
    /// rather than a host-chosen index, since there are at most two hands
    /// and a document can't distinguish "hand slot 4" from "hand slot 9".
    pub const HAND_LEFT_SLOT: usize = 0;
    pub const HAND_RIGHT_SLOT: usize = 1;

    fn with_slot(&self, slot_index: usize, f: impl FnOnce(&mut conclave_zone::InputSourceSlot)) -> bool {
        if slot_index >= conclave_zone::MAX_INPUT_SOURCES {
            return false;
        }
        let mut zone = self.input_zone.lock();
        f(&mut zone.staging_mut().slots[slot_index]);
        true
    }

    pub fn set_input_source_enabled(&self, slot_index: usize, kind: InputSourceKind, enabled: bool) -> bool {
        self.with_slot(slot_index, |slot| {
            slot.kind = kind;
            slot.enabled = enabled as u32;
        })
    }

    pub fn set_input_source_ray_pose(&self, slot_index: usize, m: Mat4) -> bool {
        self.with_slot(slot_index, |slot| slot.target_ray = m)
    }

    pub fn set_input_source_grip_pose(&self, slot_index: usize, m: Mat4) -> bool {
        self.with_slot(slot_index, |slot| slot.grip = m)
    }

    pub fn set_input_source_hit_test(&self, slot_index: usize, result: Option<Mat4>) -> bool {
        self.with_slot(slot_index, |slot| match result {
            Some(m) => {
                slot.has_hit_test_result = 1;
                slot.hit_test_matrix = m;
            }
            None => slot.has_hit_test_result = 0,
        })
    }

    /// `setInputSourceActionState(id, action, state)` (spec §6); `Primary`
    /// and `Squeeze` are tracked as independent pressed flags on the slot.
    pub fn set_input_source_action_state(&self, slot_index: usize, action: InputAction, pressed: bool) -> bool {
        self.with_slot(slot_index, |slot| match action {
            InputAction::Primary => slot.primary_pressed = pressed as u32,
            InputAction::Squeeze => slot.squeeze_pressed = pressed as u32,
        })
    }

    /// `setHandJointPose(handness, joint, t, r, radius)` (spec §6): resolves
    /// `handedness` to its fixed slot, marks that slot occupied as the
    /// matching `Hand(Left|Right)` variant if it wasn't already, and writes
    /// one of the 25 fixed joint poses (spec §3 "InputSource").
    pub fn set_hand_joint_pose(&self, handedness: Handedness, joint_index: usize, transform: Mat4, radius: f32) -> bool {
        if joint_index >= conclave_zone::NUM_HAND_JOINTS {
            return false;
        }
        let slot_index = match handedness {
            Handedness::Left => Self::HAND_LEFT_SLOT,
            Handedness::Right => Self::HAND_RIGHT_SLOT,
        };
        let kind = match handedness {
            Handedness::Left => InputSourceKind::HandLeft,
            Handedness::Right => InputSourceKind::HandRight,
        };
        self.with_slot(slot_index, |slot| {
            slot.kind = kind;
            slot.enabled = 1;
            slot.joints[joint_index] = conclave_zone::HandJoint { transform, radius };
        })
    }

    /// Commits both zones. Called once per host tick.
    pub fn commit(&self) {
        self.device_zone.lock().sync_data();
        self.input_zone.lock().sync_data();
    }
}
