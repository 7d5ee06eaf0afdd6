/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Resolution of placeholder uniform matrices (spec §4.7 "Uniform matrix
//! placeholders", §9 "handedness" open question).
//!
//! Only multipass mode resolves a placeholder against live XR state; every
//! other mode (or a stereo frame whose `session_id` no longer resolves to a
//! live session) falls back to the document-supplied explicit value, per
//! spec wording.

use conclave_messages::{Handedness, StereoRenderingMode, SystemMatrix};
use conclave_xr::matrix;
use conclave_zone::Mat4;

/// The fixed "origin" transform spec §4.7 mentions without pinning down a
/// value. Resolved here as the identity: the local base matrix already
/// carries the session's full world-space placement (spec §3
/// `XRSession.localBaseMatrix`), so composing it with anything but identity
/// would double-apply an offset. Recorded as an explicit Open Question
/// resolution in DESIGN.md.
const ORIGIN_TRANSFORM: Mat4 = conclave_zone::IDENTITY;

pub struct PlaceholderContext {
    pub stereo_mode: StereoRenderingMode,
    pub session_local_base_matrix: Option<Mat4>,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Resolves one placeholder uniform to its 16-float value.
///
/// Handedness resolution (§9 open question): a `RightHanded`-declared
/// placeholder is the document's world-space computation and gets the
/// host's `scale(-1,1,-1)` clip-space flip applied (spec §6 "coordinates
/// convention"); a `LeftHanded`-declared placeholder is assumed already
/// expressed in the host's GL clip-space convention and passes through
/// unchanged.
pub fn resolve(matrix: SystemMatrix, handedness: Handedness, fallback: Mat4, ctx: &PlaceholderContext) -> Mat4 {
    if ctx.stereo_mode != StereoRenderingMode::MultiPass {
        return fallback;
    }
    let Some(local_base) = ctx.session_local_base_matrix else {
        return fallback;
    };
    let base = matrix::mul(&local_base, &ORIGIN_TRANSFORM);
    let view_relative_to_local = matrix::mul(&ctx.view, &base);
    let value = match matrix {
        SystemMatrix::Projection => ctx.projection,
        SystemMatrix::View => ctx.view,
        SystemMatrix::ViewRelativeToLocal => view_relative_to_local,
        // No floor-offset is tracked anywhere in the data model (spec §3
        // carries only `localBaseMatrix`, not a separate floor transform),
        // so this resolves identically to `ViewRelativeToLocal`.
        SystemMatrix::ViewRelativeToLocalFloor => view_relative_to_local,
        SystemMatrix::ViewProjection => matrix::mul(&ctx.projection, &view_relative_to_local),
    };
    match handedness {
        Handedness::RightHanded => matrix::mul(&matrix::right_to_left_handed(), &value),
        Handedness::LeftHanded => value,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use conclave_zone::IDENTITY;

    #[test]
    fn non_multipass_always_uses_fallback() {
        let ctx = PlaceholderContext {
            stereo_mode: StereoRenderingMode::SinglePass,
            session_local_base_matrix: Some(IDENTITY),
            view: IDENTITY,
            projection: IDENTITY,
        };
        let fallback = [9.0; 16];
        let resolved = resolve(SystemMatrix::ViewProjection, Handedness::RightHanded, fallback, &ctx);
        assert_eq!(resolved, fallback);
    }

    #[test]
    fn missing_session_uses_fallback_even_in_multipass() {
        let ctx = PlaceholderContext {
            stereo_mode: StereoRenderingMode::MultiPass,
            session_local_base_matrix: None,
            view: IDENTITY,
            projection: IDENTITY,
        };
        let fallback = [3.0; 16];
        let resolved = resolve(SystemMatrix::View, Handedness::LeftHanded, fallback, &ctx);
        assert_eq!(resolved, fallback);
    }

    #[test]
    fn right_handed_placeholder_gets_the_clip_space_flip() {
        let ctx = PlaceholderContext {
            stereo_mode: StereoRenderingMode::MultiPass,
            session_local_base_matrix: Some(IDENTITY),
            view: IDENTITY,
            projection: IDENTITY,
        };
        let resolved = resolve(SystemMatrix::View, Handedness::RightHanded, [0.0; 16], &ctx);
        assert_eq!(resolved[0], -1.0);
        assert_eq!(resolved[10], -1.0);
    }
}
