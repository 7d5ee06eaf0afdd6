/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Minimal column-major 4x4 matrix helpers. The scheduler and the device
//! only ever need multiply, a handedness-flip, and a frustum extraction;
//! pulling in `euclid`'s full `Transform3D` for that would mean threading
//! its generic unit parameters through every wire type, so this crate
//! works in the same flat `[f32; 16]` the wire format already uses.

use conclave_zone::Mat4;

/// Column-major `a * b`, matching the convention `v' = M * v` used
/// throughout the XR device and scheduler.
pub fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [0.0f32; 16];
    for col in 0..4 {
        for row in 0..4 {
            let mut sum = 0.0f32;
            for k in 0..4 {
                sum += a[k * 4 + row] * b[col * 4 + k];
            }
            out[col * 4 + row] = sum;
        }
    }
    out
}

/// Composes a translation, a unit quaternion rotation `[x, y, z, w]`, and a
/// uniform world-scale factor into a column-major TRS matrix (spec §6:
/// "the right-handed matrices produced by `makeMatrixFromTRS` scale
/// translation by a world-scaling factor"). Only the translation is scaled,
/// matching the source: rotation and the unit basis are left alone, so a
/// non-1.0 `world_scale` changes where content sits without changing its
/// rotational orientation or its own local scale.
pub fn from_trs(translation: [f32; 3], rotation: [f32; 4], world_scale: f32) -> Mat4 {
    let [x, y, z, w] = rotation;
    let (x2, y2, z2) = (x + x, y + y, z + z);
    let (xx, xy, xz) = (x * x2, x * y2, x * z2);
    let (yy, yz, zz) = (y * y2, y * z2, z * z2);
    let (wx, wy, wz) = (w * x2, w * y2, w * z2);

    [
        1.0 - (yy + zz),
        xy + wz,
        xz - wy,
        0.0,
        xy - wz,
        1.0 - (xx + zz),
        yz + wx,
        0.0,
        xz + wy,
        yz - wx,
        1.0 - (xx + yy),
        0.0,
        translation[0] * world_scale,
        translation[1] * world_scale,
        translation[2] * world_scale,
        1.0,
    ]
}

/// `scale(-1, 1, -1)`: right-handed world space to GL's left-handed clip
/// space, applied when resolving a `RightHanded`-declared placeholder
/// uniform (spec §6, "coordinates convention").
pub fn right_to_left_handed() -> Mat4 {
    [
        -1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, -1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// One plane of a view frustum, `ax + by + cz + d = 0` with `(a,b,c)`
/// normalized to point inward.
#[derive(Copy, Clone, Debug, Default)]
pub struct Plane {
    pub normal: [f32; 3],
    pub d: f32,
}

fn normalize_plane(mut p: Plane) -> Plane {
    let len = (p.normal[0] * p.normal[0] + p.normal[1] * p.normal[1] + p.normal[2] * p.normal[2])
        .sqrt();
    if len > f32::EPSILON {
        p.normal[0] /= len;
        p.normal[1] /= len;
        p.normal[2] /= len;
        p.d /= len;
    }
    p
}

/// The six Gribb-Hartmann planes of a combined `projection * view` matrix.
/// Order: left, right, bottom, top, near, far.
pub fn frustum_planes(view_projection: &Mat4) -> [Plane; 6] {
    let m = view_projection;
    let row = |i: usize| [m[i], m[4 + i], m[8 + i], m[12 + i]];
    let r0 = row(0);
    let r1 = row(1);
    let r2 = row(2);
    let r3 = row(3);

    let combine = |a: [f32; 4], sign: f32, b: [f32; 4]| Plane {
        normal: [a[0] + sign * b[0], a[1] + sign * b[1], a[2] + sign * b[2]],
        d: a[3] + sign * b[3],
    };

    [
        normalize_plane(combine(r3, 1.0, r0)),  // left
        normalize_plane(combine(r3, -1.0, r0)), // right
        normalize_plane(combine(r3, 1.0, r1)),  // bottom
        normalize_plane(combine(r3, -1.0, r1)), // top
        normalize_plane(combine(r3, 1.0, r2)),  // near
        normalize_plane(combine(r3, -1.0, r2)), // far
    ]
}

/// Merges two per-eye frustums into the loosest box that contains both, by
/// taking, per plane slot, whichever of the two planes is farther out (the
/// one with the more negative signed distance to the origin extends the
/// merged frustum). Used by `XrDevice` after every `update_view_matrix` on
/// the right eye (spec §4.4 "Frustum maintenance").
pub fn merge_frustums(left: &[Plane; 6], right: &[Plane; 6]) -> [Plane; 6] {
    let mut merged = *left;
    for i in 0..6 {
        if right[i].d < left[i].d {
            merged[i] = right[i];
        }
    }
    merged
}

/// Whether a world-space-transformed collision box intersects `frustum`:
/// the box is culled only if every one of its 8 corners lies on the
/// negative side of some plane (the separating-axis short-circuit used for
/// view-frustum AABB culling generally). Backs the per-session visibility
/// check spec §4.4 says the merged frustum exists for ("this is used by the
/// visibility check a session exposes to the client").
pub fn aabb_intersects_frustum(frustum: &[Plane; 6], local_base_matrix: &Mat4, min: [f32; 3], max: [f32; 3]) -> bool {
    let corners = [
        [min[0], min[1], min[2]],
        [max[0], min[1], min[2]],
        [min[0], max[1], min[2]],
        [max[0], max[1], min[2]],
        [min[0], min[1], max[2]],
        [max[0], min[1], max[2]],
        [min[0], max[1], max[2]],
        [max[0], max[1], max[2]],
    ];
    let world_corners = corners.map(|c| {
        let v = [c[0], c[1], c[2], 1.0];
        let mut out = [0.0f32; 3];
        for row in 0..3 {
            out[row] = local_base_matrix[row] * v[0]
                + local_base_matrix[4 + row] * v[1]
                + local_base_matrix[8 + row] * v[2]
                + local_base_matrix[12 + row] * v[3];
        }
        out
    });
    for plane in frustum {
        let all_outside = world_corners.iter().all(|c| {
            plane.normal[0] * c[0] + plane.normal[1] * c[1] + plane.normal[2] * c[2] + plane.d < 0.0
        });
        if all_outside {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod test {
    use super::*;
    use conclave_zone::IDENTITY;

    #[test]
    fn identity_times_identity_is_identity() {
        assert_eq!(mul(&IDENTITY, &IDENTITY), IDENTITY);
    }

    #[test]
    fn from_trs_with_no_rotation_places_translation_scaled_by_world_scale() {
        let m = from_trs([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0], 2.0);
        assert_eq!([m[12], m[13], m[14]], [2.0, 4.0, 6.0]);
        // unrotated basis is left as the identity's
        assert_eq!([m[0], m[5], m[10]], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn from_trs_with_identity_rotation_and_unit_scale_is_a_pure_translation() {
        let m = from_trs([1.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0], 1.0);
        let moved = mul(&m, &IDENTITY);
        assert_eq!(moved[12], 1.0);
    }

    #[test]
    fn handedness_flip_negates_x_and_z() {
        let flip = right_to_left_handed();
        let v = mul(&flip, &IDENTITY);
        assert_eq!(v[0], -1.0);
        assert_eq!(v[5], 1.0);
        assert_eq!(v[10], -1.0);
    }

    /// A simple orthographic-ish frustum: `|x| <= 1`, `|y| <= 1`, `0 <= z <= 1`.
    fn unit_frustum() -> [Plane; 6] {
        [
            Plane { normal: [1.0, 0.0, 0.0], d: 1.0 },  // left: x >= -1
            Plane { normal: [-1.0, 0.0, 0.0], d: 1.0 }, // right: x <= 1
            Plane { normal: [0.0, 1.0, 0.0], d: 1.0 },  // bottom: y >= -1
            Plane { normal: [0.0, -1.0, 0.0], d: 1.0 }, // top: y <= 1
            Plane { normal: [0.0, 0.0, 1.0], d: 0.0 },  // near: z >= 0
            Plane { normal: [0.0, 0.0, -1.0], d: 1.0 }, // far: z <= 1
        ]
    }

    #[test]
    fn a_box_inside_the_frustum_is_visible() {
        let frustum = unit_frustum();
        assert!(aabb_intersects_frustum(&frustum, &IDENTITY, [-0.1, -0.1, 0.4], [0.1, 0.1, 0.6]));
    }

    #[test]
    fn a_box_entirely_past_the_far_plane_is_not_visible() {
        let frustum = unit_frustum();
        assert!(!aabb_intersects_frustum(&frustum, &IDENTITY, [-0.1, -0.1, 5.0], [0.1, 0.1, 5.2]));
    }

    #[test]
    fn translating_the_box_out_of_frustum_via_the_base_matrix_culls_it() {
        let frustum = unit_frustum();
        let moved = from_trs([10.0, 0.0, 0.5], [0.0, 0.0, 0.0, 1.0], 1.0);
        assert!(!aabb_intersects_frustum(&frustum, &moved, [-0.1, -0.1, -0.1], [0.1, 0.1, 0.1]));
    }
}
