/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L3: the process-wide XR device — stereo view/projection state per eye,
//! viewport, viewer base matrix, merged frustum, active-eye tracking, and
//! session bookkeeping. Input sources and the device context are published
//! to documents through `conclave_zone`.

#![deny(unsafe_code)]

mod device;
mod error;
pub mod matrix;
mod session;

pub use device::{Handedness, InputAction, XrDevice};
pub use error::{Result, XrError};
pub use session::{BaseLayer, XrSession};

#[cfg(test)]
mod test {
    use super::*;
    use conclave_messages::{SessionId, ViewIndex, XrSessionMode};
    use conclave_zone::IDENTITY;

    #[test]
    fn request_session_assigns_distinct_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = XrDevice::new(dir.path()).expect("device");
        let a = device.request_session(XrSessionMode::ImmersiveVr).expect("session a");
        let b = device.request_session(XrSessionMode::ImmersiveVr).expect("session b");
        assert_ne!(a.session_id, b.session_id);
        assert!(device.session(a.session_id).is_some());
    }

    #[test]
    fn ending_a_session_removes_the_lookup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = XrDevice::new(dir.path()).expect("device");
        let session = device.request_session(XrSessionMode::Inline).expect("session");
        let id = session.session_id;
        device.end_session(id);
        assert!(device.session(id).is_none());
    }

    #[test]
    fn dropping_the_owning_arc_without_end_session_is_reaped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = XrDevice::new(dir.path()).expect("device");
        let id = {
            let session = device.request_session(XrSessionMode::Inline).expect("session");
            session.session_id
        };
        device.reap_dead_sessions();
        assert!(device.session(id).is_none());
        let _ = SessionId(0);
    }

    #[test]
    fn active_eye_tracks_the_most_recent_update_view_matrix_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = XrDevice::new(dir.path()).expect("device");
        device.update_view_matrix(ViewIndex::LEFT, IDENTITY).expect("left");
        assert_eq!(device.active_eye(), ViewIndex::LEFT);
        device.update_view_matrix(ViewIndex::RIGHT, IDENTITY).expect("right");
        assert_eq!(device.active_eye(), ViewIndex::RIGHT);
        assert!(device.frustum().is_some());
    }

    #[test]
    fn session_support_tracks_device_enablement() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = XrDevice::new(dir.path()).expect("device");
        assert!(!device.is_session_supported(XrSessionMode::ImmersiveVr));
        device.configure(true, true, conclave_messages::StereoRenderingMode::MultiPass, 90.0);
        assert!(device.is_session_supported(XrSessionMode::ImmersiveVr));
    }

    #[test]
    fn invalid_eye_index_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = XrDevice::new(dir.path()).expect("device");
        assert!(device.update_view_matrix(ViewIndex(2), IDENTITY).is_err());
    }

    #[test]
    fn hand_joint_pose_is_rejected_for_an_out_of_range_joint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = XrDevice::new(dir.path()).expect("device");
        assert!(!device.set_hand_joint_pose(Handedness::Left, conclave_zone::NUM_HAND_JOINTS, IDENTITY, 0.01));
        assert!(device.set_hand_joint_pose(Handedness::Left, 0, IDENTITY, 0.01));
    }

    #[test]
    fn input_source_setters_reject_an_out_of_range_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = XrDevice::new(dir.path()).expect("device");
        assert!(!device.set_input_source_enabled(conclave_zone::MAX_INPUT_SOURCES, conclave_zone::InputSourceKind::Gaze, true));
        assert!(device.set_input_source_enabled(2, conclave_zone::InputSourceKind::Gaze, true));
        assert!(device.set_input_source_action_state(2, InputAction::Primary, true));
    }
}
