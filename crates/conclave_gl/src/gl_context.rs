/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The narrow surface of real GL calls the scheduler needs to replay a
//! command buffer. Kept as our own trait, rather than calling a GL binding
//! crate directly, so the replay logic in `conclave_scheduler` can be
//! exercised against a recording test double without a live GL context. A
//! production implementation forwarding each method to a real bound context
//! (`gleam::gl::Gl` or equivalent) is host-engine–specific embedder glue and
//! lives with the embedder, outside this crate (spec §1 "host-engine–
//! specific embedder glue ... out of scope").

pub type GlEnum = u32;
pub type GlName = u32;

pub trait GlContext {
    fn create_object(&self, kind: conclave_messages::GlObjectKind) -> GlName;
    fn delete_object(&self, kind: conclave_messages::GlObjectKind, name: GlName);

    fn bind_buffer(&self, target: GlEnum, name: GlName);
    fn bind_framebuffer(&self, target: GlEnum, name: GlName);
    fn bind_renderbuffer(&self, name: GlName);
    fn bind_vertex_array(&self, name: GlName);
    fn bind_texture(&self, unit: GlEnum, target: GlEnum, name: GlName);
    fn active_texture(&self, unit: GlEnum);

    fn shader_source(&self, name: GlName, source: &str);
    fn compile_shader(&self, name: GlName);
    fn attach_shader(&self, program: GlName, shader: GlName);
    fn detach_shader(&self, program: GlName, shader: GlName);
    fn link_program(&self, name: GlName);
    fn use_program(&self, name: GlName);

    fn buffer_data(&self, target: GlEnum, bytes: &[u8], usage: GlEnum);
    fn buffer_sub_data(&self, target: GlEnum, offset: i64, bytes: &[u8]);

    fn renderbuffer_storage(&self, internal_format: GlEnum, width: i32, height: i32);
    fn framebuffer_texture_2d(&self, attachment: GlEnum, tex_target: GlEnum, texture: GlName, level: i32);
    fn framebuffer_renderbuffer(&self, attachment: GlEnum, renderbuffer: GlName);

    fn tex_image_2d(
        &self,
        target: GlEnum,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: GlEnum,
        data_type: GlEnum,
        bytes: &[u8],
    );
    fn tex_parameteri(&self, target: GlEnum, pname: GlEnum, value: i32);
    fn generate_mipmap(&self, target: GlEnum);

    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: GlEnum,
        normalized: bool,
        stride: i32,
        offset: i64,
    );

    fn uniform1f(&self, location: u32, v0: f32);
    fn uniform2f(&self, location: u32, v0: f32, v1: f32);
    fn uniform3f(&self, location: u32, v0: f32, v1: f32, v2: f32);
    fn uniform4f(&self, location: u32, v0: f32, v1: f32, v2: f32, v3: f32);
    fn uniform1i(&self, location: u32, v0: i32);
    fn uniform_matrix4fv(&self, location: u32, transpose: bool, value: &[f32; 16]);

    fn draw_arrays(&self, mode: GlEnum, first: i32, count: i32);
    fn draw_elements(&self, mode: GlEnum, count: i32, data_type: GlEnum, offset: i64);
    fn draw_arrays_instanced(&self, mode: GlEnum, first: i32, count: i32, instance_count: i32);
    fn draw_elements_instanced(
        &self,
        mode: GlEnum,
        count: i32,
        data_type: GlEnum,
        offset: i64,
        instance_count: i32,
    );

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    fn enable(&self, capability: GlEnum);
    fn disable(&self, capability: GlEnum);
    fn blend_func(&self, src: GlEnum, dst: GlEnum);
    fn blend_func_separate(&self, src_rgb: GlEnum, dst_rgb: GlEnum, src_alpha: GlEnum, dst_alpha: GlEnum);
    fn depth_func(&self, func: GlEnum);
    fn depth_mask(&self, enabled: bool);
    fn cull_face(&self, mode: GlEnum);
    fn front_face(&self, mode: GlEnum);
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool);
    fn stencil_func(&self, func: GlEnum, reference: i32, mask: u32);
    fn stencil_op(&self, fail: GlEnum, zfail: GlEnum, zpass: GlEnum);
    fn stencil_mask(&self, mask: u32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: GlEnum);
    fn pixel_storei(&self, pname: GlEnum, param: i32);

    fn get_error(&self) -> GlEnum;
    fn get_shader_parameter(&self, name: GlName, pname: GlEnum) -> i32;
    fn get_program_parameter(&self, name: GlName, pname: GlEnum) -> i32;
    fn get_shader_info_log(&self, name: GlName) -> String;
    fn get_program_info_log(&self, name: GlName) -> String;
    fn get_attrib_location(&self, program: GlName, name: &str) -> i32;
    fn get_uniform_location(&self, program: GlName, name: &str) -> i32;
    fn check_framebuffer_status(&self, target: GlEnum) -> GlEnum;

    /// Used only by `VirtualGlState::capture` to read back the handful of
    /// integer-valued state queries needed for the host-state snapshot
    /// (spec testable property 7).
    fn get_integer(&self, pname: GlEnum) -> i32;
    fn get_viewport(&self) -> [i32; 4];
}

pub const GL_NO_ERROR: GlEnum = 0;
pub const GL_OUT_OF_MEMORY: GlEnum = 0x0505;
