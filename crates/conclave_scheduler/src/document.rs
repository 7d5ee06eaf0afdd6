/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-document scheduler state.

use conclave_gl::{GlObjectManager, VirtualGlState};

use crate::frame::{QueuedCommand, StereoFrame};

/// Everything the scheduler tracks for one document between ticks. Lives
/// behind the same lock that guards `stereoFrames` — ingestion threads take
/// it unique to push commands, the render thread takes it unique once per
/// tick to replay.
#[derive(Default)]
pub struct DocumentScheduler {
    pub default_queue: Vec<QueuedCommand>,
    pub stereo_frames: Vec<StereoFrame>,
    pub backup_frame: Option<StereoFrame>,
    pub gl_context: VirtualGlState,
    pub gl_context_for_backup: VirtualGlState,
    pub objects: GlObjectManager,
    /// Set the first time this document issues an `XRFrameStart`; gates
    /// whether `tick` even looks at `stereo_frames` (spec §4.7 "only if the
    /// document has used XR at least once").
    pub used: bool,
    /// Draw calls issued this tick, reset at the start of every `tick`.
    pub draw_calls_this_tick: u32,
    /// Non-OOM GL errors observed this tick.
    pub last_frame_errors_count: u32,
    pub last_frame_has_oom: bool,
}

impl DocumentScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the per-tick counters (spec §4.7: "reset at each host tick").
    pub fn reset_tick_counters(&mut self) {
        self.draw_calls_this_tick = 0;
        self.last_frame_errors_count = 0;
        self.last_frame_has_oom = false;
    }

    /// True once the tick's error/OOM counters cross the wedged-document
    /// threshold (spec §4.7 "Errors and OOM").
    pub fn is_wedged(&self) -> bool {
        self.last_frame_has_oom || self.last_frame_errors_count > 20
    }

    pub fn find_stereo_frame_mut(&mut self, stereo_id: u32) -> Option<&mut StereoFrame> {
        self.stereo_frames.iter_mut().find(|f| f.stereo_id == stereo_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wedged_threshold_is_exclusive_of_twenty() {
        let mut doc = DocumentScheduler::new();
        doc.last_frame_errors_count = 20;
        assert!(!doc.is_wedged());
        doc.last_frame_errors_count = 21;
        assert!(doc.is_wedged());
    }

    #[test]
    fn oom_alone_wedges_regardless_of_error_count() {
        let mut doc = DocumentScheduler::new();
        doc.last_frame_has_oom = true;
        assert!(doc.is_wedged());
    }

    #[test]
    fn reset_tick_counters_clears_everything() {
        let mut doc = DocumentScheduler::new();
        doc.draw_calls_this_tick = 5;
        doc.last_frame_errors_count = 3;
        doc.last_frame_has_oom = true;
        doc.reset_tick_counters();
        assert_eq!(doc.draw_calls_this_tick, 0);
        assert_eq!(doc.last_frame_errors_count, 0);
        assert!(!doc.last_frame_has_oom);
    }
}
