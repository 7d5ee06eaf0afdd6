/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A recording `GlContext` test double. Exercises the scheduler's replay
//! logic without a live GL context: every call is appended to a log and
//! object creation hands out sequential names, which is enough to assert
//! on document isolation (spec testable property 3) and replay ordering
//! (properties 4-6) without ever touching real GL.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use conclave_messages::GlObjectKind;

use crate::gl_context::{GlContext, GlEnum, GlName, GL_NO_ERROR};

#[derive(Default)]
pub struct RecordingGlContext {
    pub calls: Mutex<Vec<String>>,
    next_name: AtomicU32,
    next_error: Mutex<Vec<GlEnum>>,
}

impl RecordingGlContext {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_name: AtomicU32::new(1),
            next_error: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    /// Queues an error to be returned by the next `get_error()` call
    /// (used to exercise the OOM/error-count gate, spec §4.7 "Errors and
    /// OOM").
    pub fn queue_error(&self, error: GlEnum) {
        self.next_error.lock().expect("lock").push(error);
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().expect("lock").push(call.into());
    }
}

impl GlContext for RecordingGlContext {
    fn create_object(&self, kind: GlObjectKind) -> GlName {
        let name = self.next_name.fetch_add(1, Ordering::Relaxed);
        self.log(format!("create_object({kind:?}) -> {name}"));
        name
    }

    fn delete_object(&self, kind: GlObjectKind, name: GlName) {
        self.log(format!("delete_object({kind:?}, {name})"));
    }

    fn bind_buffer(&self, target: GlEnum, name: GlName) {
        self.log(format!("bind_buffer({target:#x}, {name})"));
    }
    fn bind_framebuffer(&self, target: GlEnum, name: GlName) {
        self.log(format!("bind_framebuffer({target:#x}, {name})"));
    }
    fn bind_renderbuffer(&self, name: GlName) {
        self.log(format!("bind_renderbuffer({name})"));
    }
    fn bind_vertex_array(&self, name: GlName) {
        self.log(format!("bind_vertex_array({name})"));
    }
    fn bind_texture(&self, unit: GlEnum, target: GlEnum, name: GlName) {
        self.log(format!("bind_texture({unit}, {target:#x}, {name})"));
    }
    fn active_texture(&self, unit: GlEnum) {
        self.log(format!("active_texture({unit})"));
    }

    fn shader_source(&self, name: GlName, source: &str) {
        self.log(format!("shader_source({name}, {} bytes)", source.len()));
    }
    fn compile_shader(&self, name: GlName) {
        self.log(format!("compile_shader({name})"));
    }
    fn attach_shader(&self, program: GlName, shader: GlName) {
        self.log(format!("attach_shader({program}, {shader})"));
    }
    fn detach_shader(&self, program: GlName, shader: GlName) {
        self.log(format!("detach_shader({program}, {shader})"));
    }
    fn link_program(&self, name: GlName) {
        self.log(format!("link_program({name})"));
    }
    fn use_program(&self, name: GlName) {
        self.log(format!("use_program({name})"));
    }

    fn buffer_data(&self, target: GlEnum, bytes: &[u8], usage: GlEnum) {
        self.log(format!("buffer_data({target:#x}, {} bytes, {usage:#x})", bytes.len()));
    }
    fn buffer_sub_data(&self, target: GlEnum, offset: i64, bytes: &[u8]) {
        self.log(format!("buffer_sub_data({target:#x}, {offset}, {} bytes)", bytes.len()));
    }

    fn renderbuffer_storage(&self, internal_format: GlEnum, width: i32, height: i32) {
        self.log(format!("renderbuffer_storage({internal_format:#x}, {width}, {height})"));
    }
    fn framebuffer_texture_2d(&self, attachment: GlEnum, tex_target: GlEnum, texture: GlName, level: i32) {
        self.log(format!(
            "framebuffer_texture_2d({attachment:#x}, {tex_target:#x}, {texture}, {level})"
        ));
    }
    fn framebuffer_renderbuffer(&self, attachment: GlEnum, renderbuffer: GlName) {
        self.log(format!("framebuffer_renderbuffer({attachment:#x}, {renderbuffer})"));
    }

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
    ) {
        self.log(format!(
            "tex_image_2d({target:#x}, {level}, {internal_format}, {width}, {height}, {format:#x}, {data_type:#x}, {} bytes)",
            bytes.len()
        ));
    }
    fn tex_parameteri(&self, target: GlEnum, pname: GlEnum, value: i32) {
        self.log(format!("tex_parameteri({target:#x}, {pname:#x}, {value})"));
    }
    fn generate_mipmap(&self, target: GlEnum) {
        self.log(format!("generate_mipmap({target:#x})"));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.log(format!("enable_vertex_attrib_array({index})"));
    }
    fn disable_vertex_attrib_array(&self, index: u32) {
        self.log(format!("disable_vertex_attrib_array({index})"));
    }
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: GlEnum,
        normalized: bool,
        stride: i32,
        offset: i64,
    ) {
        self.log(format!(
            "vertex_attrib_pointer({index}, {size}, {data_type:#x}, {normalized}, {stride}, {offset})"
        ));
    }

    fn uniform1f(&self, location: u32, v0: f32) {
        self.log(format!("uniform1f({location}, {v0})"));
    }
    fn uniform2f(&self, location: u32, v0: f32, v1: f32) {
        self.log(format!("uniform2f({location}, {v0}, {v1})"));
    }
    fn uniform3f(&self, location: u32, v0: f32, v1: f32, v2: f32) {
        self.log(format!("uniform3f({location}, {v0}, {v1}, {v2})"));
    }
    fn uniform4f(&self, location: u32, v0: f32, v1: f32, v2: f32, v3: f32) {
        self.log(format!("uniform4f({location}, {v0}, {v1}, {v2}, {v3})"));
    }
    fn uniform1i(&self, location: u32, v0: i32) {
        self.log(format!("uniform1i({location}, {v0})"));
    }
    fn uniform_matrix4fv(&self, location: u32, transpose: bool, value: &[f32; 16]) {
        self.log(format!("uniform_matrix4fv({location}, {transpose}, {value:?})"));
    }

    fn draw_arrays(&self, mode: GlEnum, first: i32, count: i32) {
        self.log(format!("draw_arrays({mode:#x}, {first}, {count})"));
    }
    fn draw_elements(&self, mode: GlEnum, count: i32, data_type: GlEnum, offset: i64) {
        self.log(format!("draw_elements({mode:#x}, {count}, {data_type:#x}, {offset})"));
    }
    fn draw_arrays_instanced(&self, mode: GlEnum, first: i32, count: i32, instance_count: i32) {
        self.log(format!(
            "draw_arrays_instanced({mode:#x}, {first}, {count}, {instance_count})"
        ));
    }
    fn draw_elements_instanced(
        &self,
        mode: GlEnum,
        count: i32,
        data_type: GlEnum,
        offset: i64,
        instance_count: i32,
    ) {
        self.log(format!(
            "draw_elements_instanced({mode:#x}, {count}, {data_type:#x}, {offset}, {instance_count})"
        ));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.log(format!("viewport({x}, {y}, {width}, {height})"));
    }
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.log(format!("scissor({x}, {y}, {width}, {height})"));
    }
    fn enable(&self, capability: GlEnum) {
        self.log(format!("enable({capability:#x})"));
    }
    fn disable(&self, capability: GlEnum) {
        self.log(format!("disable({capability:#x})"));
    }
    fn blend_func(&self, src: GlEnum, dst: GlEnum) {
        self.log(format!("blend_func({src:#x}, {dst:#x})"));
    }
    fn blend_func_separate(&self, src_rgb: GlEnum, dst_rgb: GlEnum, src_alpha: GlEnum, dst_alpha: GlEnum) {
        self.log(format!(
            "blend_func_separate({src_rgb:#x}, {dst_rgb:#x}, {src_alpha:#x}, {dst_alpha:#x})"
        ));
    }
    fn depth_func(&self, func: GlEnum) {
        self.log(format!("depth_func({func:#x})"));
    }
    fn depth_mask(&self, enabled: bool) {
        self.log(format!("depth_mask({enabled})"));
    }
    fn cull_face(&self, mode: GlEnum) {
        self.log(format!("cull_face({mode:#x})"));
    }
    fn front_face(&self, mode: GlEnum) {
        self.log(format!("front_face({mode:#x})"));
    }
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        self.log(format!("color_mask({r}, {g}, {b}, {a})"));
    }
    fn stencil_func(&self, func: GlEnum, reference: i32, mask: u32) {
        self.log(format!("stencil_func({func:#x}, {reference}, {mask:#x})"));
    }
    fn stencil_op(&self, fail: GlEnum, zfail: GlEnum, zpass: GlEnum) {
        self.log(format!("stencil_op({fail:#x}, {zfail:#x}, {zpass:#x})"));
    }
    fn stencil_mask(&self, mask: u32) {
        self.log(format!("stencil_mask({mask:#x})"));
    }
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.log(format!("clear_color({r}, {g}, {b}, {a})"));
    }
    fn clear(&self, mask: GlEnum) {
        self.log(format!("clear({mask:#x})"));
    }
    fn pixel_storei(&self, pname: GlEnum, param: i32) {
        self.log(format!("pixel_storei({pname:#x}, {param})"));
    }

    fn get_error(&self) -> GlEnum {
        self.next_error.lock().expect("lock").pop().unwrap_or(GL_NO_ERROR)
    }
    fn get_shader_parameter(&self, _name: GlName, _pname: GlEnum) -> i32 {
        1
    }
    fn get_program_parameter(&self, _name: GlName, _pname: GlEnum) -> i32 {
        1
    }
    fn get_shader_info_log(&self, _name: GlName) -> String {
        String::new()
    }
    fn get_program_info_log(&self, _name: GlName) -> String {
        String::new()
    }
    fn get_attrib_location(&self, _program: GlName, _name: &str) -> i32 {
        0
    }
    fn get_uniform_location(&self, _program: GlName, _name: &str) -> i32 {
        0
    }
    fn check_framebuffer_status(&self, _target: GlEnum) -> GlEnum {
        0x8CD5 // GL_FRAMEBUFFER_COMPLETE
    }
    fn get_integer(&self, _pname: GlEnum) -> i32 {
        0
    }
    fn get_viewport(&self) -> [i32; 4] {
        [0, 0, 0, 0]
    }
}
