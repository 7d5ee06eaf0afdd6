/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L6: the command-buffer scheduler (spec §4.7). Owns per-document queues,
//! the stereo-frame selection rules, and per-`GlCall` replay against a real
//! `GlContext`. Kept as its own crate for the same reason `canvas` and
//! `canvas_traits` are split in the teacher codebase: the wire vocabulary
//! (`conclave_messages`) and the GL dispatch surface (`conclave_gl`) are
//! reusable on their own; only the scheduling policy lives here.

#![deny(unsafe_code)]

mod document;
mod error;
mod frame;
mod placeholder;
mod replay;
mod shader_fixup;

pub use document::DocumentScheduler;
pub use error::{Result, SchedulerError};
pub use frame::{EyeState, QueuedCommand, StereoFrame};
pub use placeholder::PlaceholderContext;
pub use replay::{Scheduler, TickOutcome};
pub use shader_fixup::rewrite_version_directive;

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use conclave_gl::testing::RecordingGlContext;
    use conclave_messages::{
        ClientId, CommandBuffer, DocumentId, GlCall, GlObjectKind, MessageId, RenderingInfo, SessionId, ViewIndex,
        XrSessionMode,
    };
    use conclave_xr::XrDevice;

    use super::*;

    fn xr_device() -> Arc<XrDevice> {
        let dir = tempfile::tempdir().expect("tempdir");
        Arc::new(XrDevice::new(dir.keep()).expect("device"))
    }

    fn scheduler(device: Arc<XrDevice>) -> Scheduler {
        Scheduler::new(device, None, 1)
    }

    fn ingest_default(sched: &Scheduler, doc: DocumentId, call: GlCall) {
        sched
            .ingest(doc, MessageId(1), CommandBuffer::default_queue(call))
            .expect("ingest");
    }

    #[test]
    fn document_isolation_yields_distinct_real_names_for_the_same_client_id() {
        let device = xr_device();
        let sched = scheduler(device);
        let gl = RecordingGlContext::new();
        let docs = [DocumentId(1), DocumentId(2), DocumentId(3)];
        for &doc in &docs {
            sched.register_document(doc);
            ingest_default(
                &sched,
                doc,
                GlCall::CreateObject { kind: GlObjectKind::Shader, client_id: ClientId(42) },
            );
        }
        let mut names = Vec::new();
        for &doc in &docs {
            sched.tick(doc, &gl).expect("tick");
        }
        for call in gl.calls() {
            if call.starts_with("create_object") {
                names.push(call);
            }
        }
        assert_eq!(names.len(), 3);
        assert_eq!(names.iter().collect::<std::collections::HashSet<_>>().len(), 3);
    }

    fn start_stereo_frame(sched: &Scheduler, doc: DocumentId, stereo_id: u32, session_id: SessionId) {
        for (eye, idx) in [(ViewIndex::LEFT, 0u8), (ViewIndex::RIGHT, 1u8)] {
            let info = RenderingInfo { session_id, stereo_id, view_index: eye };
            sched
                .ingest(doc, MessageId(idx as u32), CommandBuffer::stereo(info, GlCall::XrFrameStart))
                .expect("start");
            sched
                .ingest(
                    doc,
                    MessageId(idx as u32),
                    CommandBuffer::stereo(
                        info,
                        GlCall::DrawArrays { mode: 0x0004, first: 0, count: 3 },
                    ),
                )
                .expect("draw");
            sched
                .ingest(doc, MessageId(idx as u32), CommandBuffer::stereo(info, GlCall::XrFrameEnd))
                .expect("end");
        }
    }

    #[test]
    fn stereo_frames_replay_in_stereo_id_order_within_one_eye() {
        let device = xr_device();
        device.configure(true, true, conclave_messages::StereoRenderingMode::SinglePass, 90.0);
        let sched = scheduler(device);
        let doc = DocumentId(1);
        sched.register_document(doc);
        let session = SessionId(1);

        start_stereo_frame(&sched, doc, 1, session);
        start_stereo_frame(&sched, doc, 2, session);

        let gl = RecordingGlContext::new();
        sched.tick(doc, &gl).expect("tick 1");
        let first_pass: Vec<_> = gl.calls().into_iter().filter(|c| c.starts_with("draw_arrays")).collect();
        assert_eq!(first_pass.len(), 2, "both eyes of frame 1 replay on the first tick");

        sched.tick(doc, &gl).expect("tick 2");
        let second_pass: Vec<_> = gl
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("draw_arrays"))
            .collect();
        assert_eq!(second_pass.len(), 4, "frame 2 replays only after frame 1 is gone");
    }

    #[test]
    fn right_eye_never_replays_before_the_left_eye_finishes() {
        let device = xr_device();
        device.configure(true, true, conclave_messages::StereoRenderingMode::MultiPass, 90.0);
        let sched = scheduler(device);
        let doc = DocumentId(1);
        sched.register_document(doc);
        let session = SessionId(1);
        start_stereo_frame(&sched, doc, 1, session);

        let gl = RecordingGlContext::new();
        // MultiPass only replays the device's active eye; left is active by default.
        sched.tick(doc, &gl).expect("tick left");
        assert_eq!(gl.calls().into_iter().filter(|c| c.starts_with("draw_arrays")).count(), 1);
    }

    #[test]
    fn idempotent_frame_falls_back_to_an_identical_backup_sequence() {
        let device = xr_device();
        device.configure(true, true, conclave_messages::StereoRenderingMode::SinglePass, 90.0);
        let sched = scheduler(device);
        let doc = DocumentId(1);
        sched.register_document(doc);
        let session = SessionId(1);
        start_stereo_frame(&sched, doc, 1, session);

        let gl = RecordingGlContext::new();
        sched.tick(doc, &gl).expect("tick 1");
        let first: Vec<_> = gl.calls().into_iter().filter(|c| c.starts_with("draw_arrays")).collect();

        // No new frame arrives; the next tick has nothing to replay and
        // should fall back to the backup frame's identical sequence.
        sched.tick(doc, &gl).expect("tick 2");
        let calls = gl.calls();
        let second = &calls[calls.len() - first.len()..];
        assert_eq!(second, first.as_slice());
    }

    #[test]
    fn host_state_is_restored_after_a_tick() {
        let device = xr_device();
        let sched = scheduler(device);
        let gl = RecordingGlContext::new();
        let doc = DocumentId(1);
        sched.register_document(doc);
        ingest_default(&sched, doc, GlCall::Viewport { x: 1, y: 2, width: 3, height: 4 });
        sched.tick(doc, &gl).expect("tick");
        let calls = gl.calls();
        // viewport(...) is called once to apply the document's state and
        // again at the very end to restore the host's (identical, in this
        // test) snapshot.
        assert!(calls.iter().filter(|c| c.starts_with("viewport(")).count() >= 2);
    }

    #[test]
    fn twenty_one_errors_wedge_the_document_but_twenty_do_not() {
        let device = xr_device();
        let sched = scheduler(device);
        let doc = DocumentId(1);
        sched.register_document(doc);
        let gl = RecordingGlContext::new();
        for _ in 0..20 {
            gl.queue_error(0x0502); // GL_INVALID_OPERATION
            ingest_default(&sched, doc, GlCall::GetError);
        }
        let outcome = sched.tick(doc, &gl).expect("tick");
        assert!(!outcome.wedged);

        for _ in 0..21 {
            gl.queue_error(0x0502);
            ingest_default(&sched, doc, GlCall::GetError);
        }
        let outcome = sched.tick(doc, &gl).expect("tick 2");
        assert!(outcome.wedged);
    }
}
