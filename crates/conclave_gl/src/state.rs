/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The document's view of GL state (`glContext` in spec §4.7) and the
//! digest used to decide whether replaying a batch of commands actually
//! changed anything observable (the "idempotence" check).

use std::collections::{HashMap, HashSet};

use conclave_messages::{ClientId, GlCall, GlObjectKind};

use crate::gl_context::GlContext;

const NONE: ClientId = ClientId(0);

// Queried pnames used only by `VirtualGlState::capture` (host-state
// snapshot, spec testable property 7).
mod pname {
    pub const VIEWPORT: u32 = 0x0BA2;
    pub const CURRENT_PROGRAM: u32 = 0x8B8D;
    pub const ARRAY_BUFFER_BINDING: u32 = 0x8894;
    pub const ELEMENT_ARRAY_BUFFER_BINDING: u32 = 0x8895;
    pub const FRAMEBUFFER_BINDING: u32 = 0x8CA6;
    pub const RENDERBUFFER_BINDING: u32 = 0x8CA7;
    pub const VERTEX_ARRAY_BINDING: u32 = 0x85B5;
    pub const ACTIVE_TEXTURE: u32 = 0x84E0;
    pub const TEXTURE_BINDING_2D: u32 = 0x8069;
    pub const CULL_FACE: u32 = 0x0B44;
    pub const FRONT_FACE: u32 = 0x0B46;
    pub const DEPTH_FUNC: u32 = 0x0B74;
    pub const DEPTH_WRITEMASK: u32 = 0x0B72;
}

/// Everything the scheduler needs to restore a document's GL state before
/// replaying its commands, and to snapshot it again afterwards for the
/// idempotence check (spec §4.7 "State changed").
#[derive(Clone, Debug)]
pub struct VirtualGlState {
    pub viewport: [i32; 4],
    pub current_program: ClientId,
    pub array_buffer: ClientId,
    pub element_array_buffer: ClientId,
    pub framebuffer: ClientId,
    pub renderbuffer: ClientId,
    pub vertex_array: ClientId,
    pub active_texture_unit: u32,
    pub texture_bindings: HashMap<(u32, u32), ClientId>,
    pub enabled_caps: HashSet<u32>,
    pub cull_face_mode: u32,
    pub front_face_mode: u32,
    pub blend_func: (u32, u32),
    pub blend_func_separate: Option<(u32, u32, u32, u32)>,
    pub depth_func: u32,
    pub depth_mask: bool,
    pub stencil_func: (u32, i32, u32),
    pub stencil_op: (u32, u32, u32),
    pub stencil_mask: u32,
    pub color_mask: (bool, bool, bool, bool),
    objects: HashMap<GlObjectKind, HashSet<ClientId>>,
    dirty: bool,
}

impl Default for VirtualGlState {
    fn default() -> Self {
        Self {
            viewport: [0; 4],
            current_program: NONE,
            array_buffer: NONE,
            element_array_buffer: NONE,
            framebuffer: NONE,
            renderbuffer: NONE,
            vertex_array: NONE,
            active_texture_unit: 0,
            texture_bindings: HashMap::new(),
            enabled_caps: HashSet::new(),
            cull_face_mode: 0,
            front_face_mode: 0,
            blend_func: (1, 0), // GL_ONE, GL_ZERO
            blend_func_separate: None,
            depth_func: 0x0201, // GL_LESS
            depth_mask: true,
            stencil_func: (0x0207, 0, 0xffff_ffff), // GL_ALWAYS
            stencil_op: (0x1E00, 0x1E00, 0x1E00),   // GL_KEEP
            stencil_mask: 0xffff_ffff,
            color_mask: (true, true, true, true),
            objects: HashMap::new(),
            dirty: false,
        }
    }
}

/// A comparable projection of `VirtualGlState`, taken before and after
/// replaying a batch of commands. Equal digests mean the batch was
/// idempotent from the document's point of view (spec §4.7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateDigest {
    current_program: ClientId,
    array_buffer: ClientId,
    element_array_buffer: ClientId,
    framebuffer: ClientId,
    texture_bindings: Vec<((u32, u32), ClientId)>,
    objects: Vec<(GlObjectKind, Vec<ClientId>)>,
}

impl VirtualGlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one command's side effects to the tracked state (spec §4.7
    /// "for every GL-call variant... records side effects into
    /// `doc.glContext`"). Draw calls, uniform sets, and buffer-data upload
    /// calls have no tracked side effect here.
    pub fn record_call(&mut self, call: &GlCall) {
        if call.always_dirties_program() {
            self.dirty = true;
        }
        match call {
            GlCall::CreateObject { kind, client_id } => {
                self.objects.entry(*kind).or_default().insert(*client_id);
            }
            GlCall::DeleteObject { kind, client_id } => {
                self.objects.entry(*kind).or_default().remove(client_id);
                if *kind == GlObjectKind::Program && self.current_program == *client_id {
                    self.current_program = NONE;
                }
            }
            GlCall::UseProgram { client_id } => self.current_program = *client_id,
            GlCall::BindBuffer { target, client_id } => {
                // GL_ARRAY_BUFFER = 0x8892, GL_ELEMENT_ARRAY_BUFFER = 0x8893
                match *target {
                    0x8892 => self.array_buffer = *client_id,
                    0x8893 => self.element_array_buffer = *client_id,
                    _ => {}
                }
            }
            GlCall::BindFramebuffer { client_id, .. } => self.framebuffer = *client_id,
            GlCall::BindRenderbuffer { client_id } => self.renderbuffer = *client_id,
            GlCall::BindVertexArray { client_id } => self.vertex_array = *client_id,
            GlCall::BindTexture {
                unit,
                target,
                client_id,
            } => {
                self.texture_bindings.insert((*unit, *target), *client_id);
            }
            GlCall::ActiveTexture { unit } => self.active_texture_unit = *unit,
            GlCall::Enable { capability } => {
                self.enabled_caps.insert(*capability);
            }
            GlCall::Disable { capability } => {
                self.enabled_caps.remove(capability);
            }
            GlCall::CullFace { mode } => self.cull_face_mode = *mode,
            GlCall::FrontFace { mode } => self.front_face_mode = *mode,
            GlCall::BlendFunc { src, dst } => {
                self.blend_func = (*src, *dst);
                self.blend_func_separate = None;
            }
            GlCall::BlendFuncSeparate {
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            } => self.blend_func_separate = Some((*src_rgb, *dst_rgb, *src_alpha, *dst_alpha)),
            GlCall::DepthFunc { func } => self.depth_func = *func,
            GlCall::DepthMask { enabled } => self.depth_mask = *enabled,
            GlCall::StencilFunc {
                func,
                reference,
                mask,
            } => self.stencil_func = (*func, *reference, *mask),
            GlCall::StencilOp { fail, zfail, zpass } => self.stencil_op = (*fail, *zfail, *zpass),
            GlCall::StencilMask { mask } => self.stencil_mask = *mask,
            GlCall::ColorMask { r, g, b, a } => self.color_mask = (*r, *g, *b, *a),
            GlCall::Viewport {
                x,
                y,
                width,
                height,
            } => self.viewport = [*x, *y, *width, *height],
            _ => {}
        }
    }

    /// True for calls whose execution mutated program internals
    /// (`linkProgram`, `attachShader`, ...), independent of any field diff
    /// this tick. Reset by the caller at the start of each diffed batch.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Reads the host's current real GL state into a fresh
    /// `VirtualGlState` (spec §4.7: "snapshot = hostGL.record()"). Only the
    /// fields testable property 7 names are queried; per-document object
    /// presence (`objects`) has no host-side equivalent and is left empty.
    pub fn capture(gl: &dyn GlContext, texture_units: u32) -> Self {
        let mut state = Self::new();
        state.viewport = gl.get_viewport();
        state.current_program = ClientId(gl.get_integer(pname::CURRENT_PROGRAM) as u32);
        state.array_buffer = ClientId(gl.get_integer(pname::ARRAY_BUFFER_BINDING) as u32);
        state.element_array_buffer = ClientId(gl.get_integer(pname::ELEMENT_ARRAY_BUFFER_BINDING) as u32);
        state.framebuffer = ClientId(gl.get_integer(pname::FRAMEBUFFER_BINDING) as u32);
        state.renderbuffer = ClientId(gl.get_integer(pname::RENDERBUFFER_BINDING) as u32);
        state.vertex_array = ClientId(gl.get_integer(pname::VERTEX_ARRAY_BINDING) as u32);
        state.active_texture_unit = gl.get_integer(pname::ACTIVE_TEXTURE) as u32;
        for unit in 0..texture_units {
            gl.active_texture(unit);
            let bound = gl.get_integer(pname::TEXTURE_BINDING_2D) as u32;
            state.texture_bindings.insert((unit, 0x0DE1 /* GL_TEXTURE_2D */), ClientId(bound));
        }
        gl.active_texture(state.active_texture_unit);
        if gl.get_integer(pname::CULL_FACE) != 0 {
            state.enabled_caps.insert(0x0B44);
        }
        state.front_face_mode = gl.get_integer(pname::FRONT_FACE) as u32;
        state.depth_func = gl.get_integer(pname::DEPTH_FUNC) as u32;
        state.depth_mask = gl.get_integer(pname::DEPTH_WRITEMASK) != 0;
        state
    }

    /// Reinstalls this state onto the real context (spec §4.7:
    /// "doc.glContext.restore()" / the final "hostGL.restore()").
    pub fn restore(&self, gl: &dyn GlContext) {
        gl.viewport(self.viewport[0], self.viewport[1], self.viewport[2], self.viewport[3]);
        gl.use_program(self.current_program.0);
        gl.bind_buffer(0x8892, self.array_buffer.0);
        gl.bind_buffer(0x8893, self.element_array_buffer.0);
        gl.bind_framebuffer(0x8D40 /* GL_FRAMEBUFFER */, self.framebuffer.0);
        gl.bind_renderbuffer(self.renderbuffer.0);
        gl.bind_vertex_array(self.vertex_array.0);
        for (&(unit, target), &client_id) in &self.texture_bindings {
            gl.active_texture(unit);
            gl.bind_texture(unit, target, client_id.0);
        }
        gl.active_texture(self.active_texture_unit);
        if self.enabled_caps.contains(&0x0B44) {
            gl.enable(0x0B44);
        } else {
            gl.disable(0x0B44);
        }
        gl.cull_face(self.cull_face_mode);
        gl.front_face(self.front_face_mode);
        gl.blend_func(self.blend_func.0, self.blend_func.1);
        if let Some((sr, dr, sa, da)) = self.blend_func_separate {
            gl.blend_func_separate(sr, dr, sa, da);
        }
        gl.depth_func(self.depth_func);
        gl.depth_mask(self.depth_mask);
        gl.stencil_func(self.stencil_func.0, self.stencil_func.1, self.stencil_func.2);
        gl.stencil_op(self.stencil_op.0, self.stencil_op.1, self.stencil_op.2);
        gl.stencil_mask(self.stencil_mask);
        gl.color_mask(self.color_mask.0, self.color_mask.1, self.color_mask.2, self.color_mask.3);
    }

    pub fn digest(&self) -> StateDigest {
        let mut texture_bindings: Vec<_> = self.texture_bindings.iter().map(|(k, v)| (*k, *v)).collect();
        texture_bindings.sort_by_key(|(k, _)| *k);
        let mut objects: Vec<_> = self
            .objects
            .iter()
            .map(|(kind, ids)| {
                let mut ids: Vec<_> = ids.iter().copied().collect();
                ids.sort_by_key(|id| id.0);
                (*kind, ids)
            })
            .collect();
        objects.sort_by_key(|(kind, _)| format!("{kind:?}"));
        StateDigest {
            current_program: self.current_program,
            array_buffer: self.array_buffer,
            element_array_buffer: self.element_array_buffer,
            framebuffer: self.framebuffer,
            texture_bindings,
            objects,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn use_program_is_tracked_and_reset_on_delete() {
        let mut state = VirtualGlState::new();
        state.record_call(&GlCall::CreateObject {
            kind: GlObjectKind::Program,
            client_id: ClientId(5),
        });
        state.record_call(&GlCall::UseProgram { client_id: ClientId(5) });
        assert_eq!(state.current_program, ClientId(5));
        state.record_call(&GlCall::DeleteObject {
            kind: GlObjectKind::Program,
            client_id: ClientId(5),
        });
        assert_eq!(state.current_program, NONE);
    }

    #[test]
    fn digest_is_stable_across_equivalent_states() {
        let mut a = VirtualGlState::new();
        let mut b = VirtualGlState::new();
        a.record_call(&GlCall::BindBuffer {
            target: 0x8892,
            client_id: ClientId(3),
        });
        b.record_call(&GlCall::BindBuffer {
            target: 0x8892,
            client_id: ClientId(3),
        });
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn draw_calls_never_dirty_program_state() {
        let mut state = VirtualGlState::new();
        let before = state.digest();
        state.record_call(&GlCall::DrawArrays {
            mode: 4,
            first: 0,
            count: 3,
        });
        assert_eq!(before, state.digest());
        assert!(!state.take_dirty());
    }

    #[test]
    fn link_program_marks_dirty_even_without_a_tracked_field_change() {
        let mut state = VirtualGlState::new();
        state.record_call(&GlCall::LinkProgram { client_id: ClientId(1) });
        assert!(state.take_dirty());
        assert!(!state.take_dirty());
    }
}
