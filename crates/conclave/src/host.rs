/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `Host`: the embedder-facing struct that owns every other layer and
//! exposes spec §6's Host API as inherent methods — no trait indirection,
//! since there is exactly one implementation (matches `Servo`'s top-level
//! struct in `components/servo`, not a trait-per-backend abstraction).

use std::path::Path;
use std::sync::Arc;

use conclave_content::{ContentManager, ManagerConfig, OpenInit};
use conclave_gl::GlContext;
use conclave_messages::{
    DocumentEvent, DocumentId, FrameRequestMessage, RpcRequest, RpcResponse, SessionId, ViewIndex,
};
use conclave_scheduler::Scheduler;
use conclave_xr::{Handedness, InputAction, XrDevice};
use conclave_zone::{InputSourceKind, Mat4};
use log::warn;
use parking_lot::Mutex;

use crate::config::{HostConfig, XrDeviceInit};
use crate::error::{HostApiError, Result};

/// `VirtualGlState::capture`'s texture-unit count, fixed rather than
/// configured: the scheduler snapshots every unit on every tick regardless
/// of how many a particular document actually binds, and the WebGL2
/// floor (`MAX_COMBINED_TEXTURE_IMAGE_UNITS` >= 32) is a safe upper bound
/// for any document this runtime can host.
const DEFAULT_TEXTURE_UNITS: u32 = 32;

pub struct Host {
    content: ContentManager,
    xr_device: Arc<XrDevice>,
    scheduler: Arc<Scheduler>,
    xr_supported: bool,
    time: Mutex<f64>,
}

impl Host {
    /// Parses the one startup JSON blob (spec §6 "Configuration intake"),
    /// then launches the hive daemon and binds every channel server.
    pub fn new(daemon_path: &Path, config_json: &str) -> Result<Self> {
        let _ = env_logger::try_init();
        let config: HostConfig = serde_json::from_str(config_json)?;

        let xr_device = Arc::new(XrDevice::new(config.application_cache_directory.join("zones"))?);
        let scheduler = Arc::new(Scheduler::new(Arc::clone(&xr_device), None, DEFAULT_TEXTURE_UNITS));

        let manager_config = ManagerConfig {
            application_cache_directory: config.application_cache_directory.clone(),
            https_proxy_server: config.https_proxy_server.clone(),
            enable_v8_profiling: config.enable_v8_profiling,
            ..ManagerConfig::default()
        };
        let content = ContentManager::new(daemon_path, manager_config, Arc::clone(&xr_device), Arc::clone(&scheduler))?;

        Ok(Self {
            content,
            xr_device,
            scheduler,
            xr_supported: config.is_xr_supported,
            time: Mutex::new(0.0),
        })
    }

    pub fn open(&self, url: impl Into<String>, init: OpenInit) -> DocumentId {
        self.content.open(url, init)
    }

    pub fn close(&self, document_id: DocumentId) -> bool {
        self.content.close(document_id)
    }

    /// Pauses frame delivery and replay for one runtime.
    pub fn pause(&self, document_id: DocumentId) -> bool {
        self.content.pause(document_id)
    }

    pub fn resume(&self, document_id: DocumentId) -> bool {
        self.content.resume(document_id)
    }

    pub fn set_drawing_viewport(&self, width: i32, height: i32) {
        self.xr_device.update_viewport(width, height);
    }

    pub fn set_recommended_fov(&self, fov: f32) {
        self.xr_device.update_fov(fov);
    }

    pub fn set_time(&self, time: f64) {
        *self.time.lock() = time;
    }

    /// `isXRSupported` (from the startup config) gates this unconditionally:
    /// a host built without XR support can't be enabled at runtime by a
    /// later `configureXrDevice` call.
    pub fn configure_xr_device(&self, init: XrDeviceInit) {
        self.xr_device.configure(
            init.enabled && self.xr_supported,
            init.active,
            init.stereo_rendering_mode,
            init.recommended_fov,
        );
    }

    pub fn update_viewer_base_matrix(&self, m: Mat4) {
        self.xr_device.update_viewer_base_matrix(m);
    }

    pub fn update_view_matrix(&self, eye: ViewIndex, m: Mat4) -> Result<()> {
        self.xr_device.update_view_matrix(eye, m).map_err(HostApiError::from)
    }

    pub fn update_projection_matrix(&self, eye: ViewIndex, m: Mat4) -> Result<()> {
        self.xr_device.update_projection_matrix(eye, m).map_err(HostApiError::from)
    }

    pub fn update_local_transform_by_session_id(&self, session_id: SessionId, m: Mat4) -> bool {
        match self.xr_device.session(session_id) {
            Some(session) => {
                session.set_local_base_matrix(m);
                true
            }
            None => false,
        }
    }

    pub fn update_local_transform_by_document_id(&self, document_id: DocumentId, m: Mat4) -> bool {
        self.content.update_local_transform_by_document_id(document_id, m)
    }

    pub fn get_collision_box_by_document_id(&self, document_id: DocumentId) -> Option<([f32; 3], [f32; 3])> {
        self.content.collision_box(document_id)
    }

    pub fn set_input_source_enabled(&self, slot_index: usize, kind: InputSourceKind, enabled: bool) -> bool {
        self.xr_device.set_input_source_enabled(slot_index, kind, enabled)
    }

    pub fn set_input_source_ray_pose(&self, slot_index: usize, m: Mat4) -> bool {
        self.xr_device.set_input_source_ray_pose(slot_index, m)
    }

    pub fn set_input_source_grip_pose(&self, slot_index: usize, m: Mat4) -> bool {
        self.xr_device.set_input_source_grip_pose(slot_index, m)
    }

    pub fn set_input_source_action_state(&self, slot_index: usize, action: InputAction, pressed: bool) -> bool {
        self.xr_device.set_input_source_action_state(slot_index, action, pressed)
    }

    pub fn set_hand_joint_pose(&self, handedness: Handedness, joint_index: usize, transform: Mat4, radius: f32) -> bool {
        self.xr_device.set_hand_joint_pose(handedness, joint_index, transform, radius)
    }

    pub fn dispatch_native_event(&self, document_id: DocumentId, event_type: impl Into<String>, detail: serde_json::Value) -> bool {
        self.content.dispatch_native_event(document_id, event_type, detail)
    }

    /// Backs `getEvent`/`getEventData`: those are a query-size-then-copy
    /// pair because the C ABI they were designed for has no owned return
    /// value, but a Rust inherent method does, so the two collapse into one
    /// call that hands back an owned `RpcRequest`.
    pub fn poll_event(&self) -> Option<RpcRequest> {
        self.content.poll_rpc_request()
    }

    pub fn reply_event(&self, document_id: DocumentId, response: RpcResponse) -> bool {
        self.content.reply_rpc(document_id, response)
    }

    /// A single render tick (spec §6 `onFrame()`): services the hive and
    /// document lifecycle, requests a new animation (or XR) frame from
    /// every started and unpaused document, then replays each document's
    /// pending command buffers against `gl`. Returns after one full pass,
    /// carrying the lifecycle events (`Loaded`/`DomContentLoaded`/`Crashed`)
    /// observed this tick.
    pub fn on_frame(&self, gl: &dyn GlContext) -> Vec<DocumentEvent> {
        let lifecycle_events = self.content.tick();
        let time = *self.time.lock();

        for document_id in self.content.active_document_ids() {
            let session_id = self
                .content
                .find(document_id)
                .and_then(|runtime| runtime.sessions().first().map(|session| session.session_id));
            let frame_message = match session_id {
                Some(session_id) => FrameRequestMessage::XrFrame { time, session_id },
                None => FrameRequestMessage::AnimationFrame { time },
            };
            self.content.send_frame_request(document_id, frame_message);

            match self.scheduler.tick(document_id, gl) {
                Ok(outcome) => {
                    for (message_id, response) in outcome.responses {
                        self.content.reply_command_buffer(document_id, message_id, response);
                    }
                    if outcome.wedged {
                        warn!("document {document_id} exceeded its GL error budget; closing");
                        self.content.close(document_id);
                    }
                }
                Err(e) => warn!("scheduler tick failed for {document_id}: {e}"),
            }

            // spec §4.7 "Stereo-frame counting for backpressure": publish the
            // count of fully-committed-but-not-yet-replayed frames so the
            // document's XR loop can decide whether to skip its next frame
            // request.
            let pending = self.scheduler.pending_stereo_frame_count(document_id) as u32;
            if let Some(runtime) = self.content.find(document_id) {
                for session in runtime.sessions() {
                    session.set_pending_stereo_frames_count(pending);
                    session.commit();
                }
            }
        }

        self.xr_device.commit();
        lifecycle_events
    }

    /// Backs the out-of-scope inspector's `/contents` endpoint.
    pub fn snapshot(&self) -> conclave_content::RuntimeSnapshot {
        self.content.snapshot(env!("CARGO_PKG_VERSION"))
    }
}
