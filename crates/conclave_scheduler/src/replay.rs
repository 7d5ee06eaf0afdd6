/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-tick replay: the default queue, the stereo-frame selection rules, and
//! per-`GlCall` dispatch against a real `GlContext` (spec §4.7).

use std::collections::HashMap;
use std::sync::Arc;

use conclave_gl::{GlContext, GlObjectManager, VirtualGlState, GL_NO_ERROR, GL_OUT_OF_MEMORY};
use conclave_messages::{
    ClientId, CommandBuffer, DocumentId, GlCall, GlObjectKind, GlResponse, MatrixSource, MessageId, SessionId,
    StereoRenderingMode, ViewIndex,
};
use conclave_xr::XrDevice;
use parking_lot::RwLock;

use crate::document::DocumentScheduler;
use crate::error::{Result, SchedulerError};
use crate::frame::{QueuedCommand, StereoFrame};
use crate::placeholder::{self, PlaceholderContext};
use crate::shader_fixup;

const GL_FRAMEBUFFER: u32 = 0x8D40;

fn resolve_name(objects: &GlObjectManager, kind: GlObjectKind, client_id: ClientId) -> u32 {
    if client_id.0 == 0 {
        return 0;
    }
    objects.lookup(kind, client_id).unwrap_or(0)
}

struct ExecOutcome {
    response: Option<GlResponse>,
    error: u32,
    draw_call: bool,
}

/// Dispatches one `GlCall` against `gl`, translating client ids through
/// `objects` and recording side effects into `state` (spec §4.7 "Per-command
/// replay"). Always reads back the real GL error afterwards, except for
/// `GetError` itself where the query result doubles as that read.
fn execute_one(
    gl: &dyn GlContext,
    objects: &mut GlObjectManager,
    state: &mut VirtualGlState,
    placeholder_ctx: Option<&PlaceholderContext>,
    shader_target_version: Option<&str>,
    call: &GlCall,
) -> ExecOutcome {
    state.record_call(call);
    let mut response = None;
    let mut draw_call = false;
    match call {
        GlCall::CreateObject { kind, client_id } => {
            let name = gl.create_object(*kind);
            objects.insert(*kind, *client_id, name);
        }
        GlCall::DeleteObject { kind, client_id } => {
            if let Some(name) = objects.remove(*kind, *client_id) {
                gl.delete_object(*kind, name);
            }
        }
        GlCall::BindBuffer { target, client_id } => {
            gl.bind_buffer(*target, resolve_name(objects, GlObjectKind::Buffer, *client_id));
        }
        GlCall::BindFramebuffer { target, client_id } => {
            gl.bind_framebuffer(*target, resolve_name(objects, GlObjectKind::Framebuffer, *client_id));
        }
        GlCall::BindRenderbuffer { client_id } => {
            gl.bind_renderbuffer(resolve_name(objects, GlObjectKind::Renderbuffer, *client_id));
        }
        GlCall::BindVertexArray { client_id } => {
            gl.bind_vertex_array(resolve_name(objects, GlObjectKind::VertexArray, *client_id));
        }
        GlCall::BindTexture { unit, target, client_id } => {
            gl.bind_texture(*unit, *target, resolve_name(objects, GlObjectKind::Texture, *client_id));
        }
        GlCall::ShaderSource { client_id, source } => {
            let name = resolve_name(objects, GlObjectKind::Shader, *client_id);
            match shader_target_version {
                Some(target) => gl.shader_source(name, &shader_fixup::rewrite_version_directive(source, target)),
                None => gl.shader_source(name, source),
            }
        }
        GlCall::CompileShader { client_id } => {
            gl.compile_shader(resolve_name(objects, GlObjectKind::Shader, *client_id));
        }
        GlCall::AttachShader { program, shader } => gl.attach_shader(
            resolve_name(objects, GlObjectKind::Program, *program),
            resolve_name(objects, GlObjectKind::Shader, *shader),
        ),
        GlCall::DetachShader { program, shader } => gl.detach_shader(
            resolve_name(objects, GlObjectKind::Program, *program),
            resolve_name(objects, GlObjectKind::Shader, *shader),
        ),
        GlCall::LinkProgram { client_id } => gl.link_program(resolve_name(objects, GlObjectKind::Program, *client_id)),
        GlCall::UseProgram { client_id } => gl.use_program(resolve_name(objects, GlObjectKind::Program, *client_id)),
        GlCall::BufferData { target, bytes, usage } => gl.buffer_data(*target, bytes, *usage),
        GlCall::BufferSubData { target, offset, bytes } => gl.buffer_sub_data(*target, *offset, bytes),
        GlCall::RenderbufferStorage { internal_format, width, height } => {
            gl.renderbuffer_storage(*internal_format, *width, *height);
        }
        GlCall::FramebufferTexture2d { attachment, tex_target, texture, level } => gl.framebuffer_texture_2d(
            *attachment,
            *tex_target,
            resolve_name(objects, GlObjectKind::Texture, *texture),
            *level,
        ),
        GlCall::FramebufferRenderbuffer { attachment, renderbuffer } => {
            gl.framebuffer_renderbuffer(*attachment, resolve_name(objects, GlObjectKind::Renderbuffer, *renderbuffer));
        }
        GlCall::TexImage2d {
            target,
            level,
            internal_format,
            width,
            height,
            format,
            data_type,
            bytes,
        } => gl.tex_image_2d(*target, *level, *internal_format, *width, *height, *format, *data_type, bytes),
        GlCall::TexParameteri { target, pname, value } => gl.tex_parameteri(*target, *pname, *value),
        GlCall::GenerateMipmap { target } => gl.generate_mipmap(*target),
        GlCall::EnableVertexAttribArray { index } => gl.enable_vertex_attrib_array(*index),
        GlCall::DisableVertexAttribArray { index } => gl.disable_vertex_attrib_array(*index),
        GlCall::VertexAttribPointer { index, size, data_type, normalized, stride, offset } => {
            gl.vertex_attrib_pointer(*index, *size, *data_type, *normalized, *stride, *offset);
        }
        GlCall::Uniform1f { location, v0 } => gl.uniform1f(*location, *v0),
        GlCall::Uniform2f { location, v0, v1 } => gl.uniform2f(*location, *v0, *v1),
        GlCall::Uniform3f { location, v0, v1, v2 } => gl.uniform3f(*location, *v0, *v1, *v2),
        GlCall::Uniform4f { location, v0, v1, v2, v3 } => gl.uniform4f(*location, *v0, *v1, *v2, *v3),
        GlCall::Uniform1i { location, v0 } => gl.uniform1i(*location, *v0),
        GlCall::UniformMatrix4fv { location, transpose, value } => {
            let resolved = match value {
                MatrixSource::Explicit(v) => *v,
                MatrixSource::Placeholder { matrix, handedness, fallback } => match placeholder_ctx {
                    Some(ctx) => placeholder::resolve(*matrix, *handedness, *fallback, ctx),
                    None => *fallback,
                },
            };
            gl.uniform_matrix4fv(*location, *transpose, &resolved);
        }
        GlCall::DrawArrays { mode, first, count } => {
            gl.draw_arrays(*mode, *first, *count);
            draw_call = true;
        }
        GlCall::DrawElements { mode, count, data_type, offset } => {
            gl.draw_elements(*mode, *count, *data_type, *offset);
            draw_call = true;
        }
        GlCall::DrawArraysInstanced { mode, first, count, instance_count } => {
            gl.draw_arrays_instanced(*mode, *first, *count, *instance_count);
            draw_call = true;
        }
        GlCall::DrawElementsInstanced { mode, count, data_type, offset, instance_count } => {
            gl.draw_elements_instanced(*mode, *count, *data_type, *offset, *instance_count);
            draw_call = true;
        }
        GlCall::Viewport { x, y, width, height } => gl.viewport(*x, *y, *width, *height),
        GlCall::Scissor { x, y, width, height } => gl.scissor(*x, *y, *width, *height),
        GlCall::Enable { capability } => gl.enable(*capability),
        GlCall::Disable { capability } => gl.disable(*capability),
        GlCall::BlendFunc { src, dst } => gl.blend_func(*src, *dst),
        GlCall::BlendFuncSeparate { src_rgb, dst_rgb, src_alpha, dst_alpha } => {
            gl.blend_func_separate(*src_rgb, *dst_rgb, *src_alpha, *dst_alpha);
        }
        GlCall::DepthFunc { func } => gl.depth_func(*func),
        GlCall::DepthMask { enabled } => gl.depth_mask(*enabled),
        GlCall::CullFace { mode } => gl.cull_face(*mode),
        GlCall::FrontFace { mode } => gl.front_face(*mode),
        GlCall::ColorMask { r, g, b, a } => gl.color_mask(*r, *g, *b, *a),
        GlCall::StencilFunc { func, reference, mask } => gl.stencil_func(*func, *reference, *mask),
        GlCall::StencilOp { fail, zfail, zpass } => gl.stencil_op(*fail, *zfail, *zpass),
        GlCall::StencilMask { mask } => gl.stencil_mask(*mask),
        GlCall::ClearColor { r, g, b, a } => gl.clear_color(*r, *g, *b, *a),
        GlCall::Clear { mask } => gl.clear(*mask),
        GlCall::ActiveTexture { unit } => gl.active_texture(*unit),
        GlCall::PixelStorei { pname, param } => gl.pixel_storei(*pname, *param),
        GlCall::GetError => response = Some(GlResponse::Error(gl.get_error())),
        GlCall::GetShaderParameter { client_id, pname } => {
            let name = resolve_name(objects, GlObjectKind::Shader, *client_id);
            response = Some(GlResponse::Int(gl.get_shader_parameter(name, *pname)));
        }
        GlCall::GetProgramParameter { client_id, pname } => {
            let name = resolve_name(objects, GlObjectKind::Program, *client_id);
            response = Some(GlResponse::Int(gl.get_program_parameter(name, *pname)));
        }
        GlCall::GetShaderInfoLog { client_id } => {
            let name = resolve_name(objects, GlObjectKind::Shader, *client_id);
            response = Some(GlResponse::Str(gl.get_shader_info_log(name)));
        }
        GlCall::GetProgramInfoLog { client_id } => {
            let name = resolve_name(objects, GlObjectKind::Program, *client_id);
            response = Some(GlResponse::Str(gl.get_program_info_log(name)));
        }
        GlCall::GetAttribLocation { program, name } => {
            let program = resolve_name(objects, GlObjectKind::Program, *program);
            response = Some(GlResponse::Int(gl.get_attrib_location(program, name)));
        }
        GlCall::GetUniformLocation { program, name } => {
            let program = resolve_name(objects, GlObjectKind::Program, *program);
            let location = gl.get_uniform_location(program, name);
            response = Some(GlResponse::IntOrNone(if location >= 0 { Some(location) } else { None }));
        }
        GlCall::CheckFramebufferStatus { target } => {
            response = Some(GlResponse::Int(gl.check_framebuffer_status(*target) as i32));
        }
        GlCall::XrFrameStart | GlCall::XrFrameFlush | GlCall::XrFrameEnd => {}
    }
    let error = match (call, &response) {
        (GlCall::GetError, Some(GlResponse::Error(code))) => *code,
        _ => gl.get_error(),
    };
    ExecOutcome { response, error, draw_call }
}

pub(crate) struct BatchOutcome {
    pub responses: Vec<(MessageId, GlResponse)>,
    pub errors: u32,
    pub had_oom: bool,
    pub draw_calls: u32,
    pub state_changed: bool,
}

/// Replays `commands` in order, diffing `state` before and after to decide
/// "state changed" (spec §4.7, the paragraph right after the selection
/// rules).
pub(crate) fn execute_batch(
    gl: &dyn GlContext,
    objects: &mut GlObjectManager,
    state: &mut VirtualGlState,
    placeholder_ctx: Option<&PlaceholderContext>,
    shader_target_version: Option<&str>,
    commands: &[QueuedCommand],
) -> BatchOutcome {
    let before = state.digest();
    state.take_dirty();
    let mut outcome = BatchOutcome {
        responses: Vec::new(),
        errors: 0,
        had_oom: false,
        draw_calls: 0,
        state_changed: false,
    };
    for cmd in commands {
        let result = execute_one(gl, objects, state, placeholder_ctx, shader_target_version, &cmd.buffer.call);
        if let Some(response) = result.response {
            outcome.responses.push((cmd.message_id, response));
        }
        if result.draw_call {
            outcome.draw_calls += 1;
        }
        if result.error == GL_OUT_OF_MEMORY {
            outcome.had_oom = true;
        } else if result.error != GL_NO_ERROR {
            outcome.errors += 1;
        }
    }
    let dirtied = state.take_dirty();
    let after = state.digest();
    outcome.state_changed = dirtied || before != after;
    outcome
}

fn tally(doc: &mut DocumentScheduler, outcome: &BatchOutcome, responses: &mut Vec<(MessageId, GlResponse)>) {
    doc.draw_calls_this_tick += outcome.draw_calls;
    doc.last_frame_errors_count += outcome.errors;
    if outcome.had_oom {
        doc.last_frame_has_oom = true;
    }
    responses.extend(outcome.responses.iter().cloned());
}

fn build_placeholder_ctx(xr_device: &XrDevice, session_id: SessionId, view_index: ViewIndex) -> Option<PlaceholderContext> {
    let session = xr_device.session(session_id)?;
    let view = xr_device.view(view_index);
    Some(PlaceholderContext {
        stereo_mode: xr_device.stereo_mode(),
        session_local_base_matrix: Some(session.local_base_matrix()),
        view: view.view_matrix,
        projection: view.projection_matrix,
    })
}

/// Implements `executeStereo(viewIndex)`'s stereo-frame selection rules
/// (spec §4.7). Returns the query responses produced and whether a frame was
/// actually replayed this call — `false` means the caller should fall back
/// to the backup frame.
fn execute_stereo(
    gl: &dyn GlContext,
    xr_device: &XrDevice,
    shader_target_version: Option<&str>,
    doc: &mut DocumentScheduler,
    view_index: ViewIndex,
) -> (Vec<(MessageId, GlResponse)>, bool) {
    let idx = view_index.as_usize();
    let mut responses = Vec::new();
    let mut replayed = false;
    let mut i = 0;
    loop {
        if i >= doc.stereo_frames.len() {
            return (responses, replayed);
        }

        // Rule 1: skip and drop unavailable frames.
        if !doc.stereo_frames[i].available {
            doc.stereo_frames.remove(i);
            continue;
        }

        if !doc.stereo_frames[i].both_ended() {
            let flush_pending = doc.stereo_frames[i].eyes[idx].flush_pending;
            let gate_ok = idx == 0 || doc.stereo_frames[i].eyes[0].ended;
            if flush_pending && gate_ok {
                let commands = std::mem::take(&mut doc.stereo_frames[i].eyes[idx].commands);
                let session_id = doc.stereo_frames[i].session_id;
                let ctx = build_placeholder_ctx(xr_device, session_id, view_index);
                let outcome = execute_batch(
                    gl,
                    &mut doc.objects,
                    &mut doc.gl_context,
                    ctx.as_ref(),
                    shader_target_version,
                    &commands,
                );
                tally(doc, &outcome, &mut responses);
                doc.stereo_frames[i].eyes[idx].flush_pending = false;
                replayed = true;
                i += 1;
                continue;
            }
            // Rule 2 "otherwise": this frame isn't ready; stereoId order
            // means no later frame may jump ahead of it either.
            return (responses, replayed);
        }

        // Rule 3: drop if ended on both eyes but carries no commands.
        if doc.stereo_frames[i].is_empty() {
            doc.stereo_frames.remove(i);
            continue;
        }

        // Rule 4: the right eye never renders ahead of the left.
        if idx == 1 && !doc.stereo_frames[i].eyes[0].finished {
            return (responses, replayed);
        }

        // Rule 5: replay this frame's commands for `view_index`.
        let commands = doc.stereo_frames[i].eyes[idx].commands.clone();
        let session_id = doc.stereo_frames[i].session_id;
        let ctx = build_placeholder_ctx(xr_device, session_id, view_index);
        let outcome = execute_batch(gl, &mut doc.objects, &mut doc.gl_context, ctx.as_ref(), shader_target_version, &commands);
        tally(doc, &outcome, &mut responses);
        doc.stereo_frames[i].eyes[idx].finished = true;
        doc.stereo_frames[i].eyes[idx].idempotent = !outcome.state_changed;
        replayed = true;

        if idx == 1 {
            let both_idempotent = doc.stereo_frames[i].eyes[0].idempotent && doc.stereo_frames[i].eyes[1].idempotent;
            let frame = doc.stereo_frames.remove(i);
            doc.backup_frame = if both_idempotent { Some(frame) } else { None };
        }
        // Rule 6: stop after replaying one eye of one frame.
        return (responses, replayed);
    }
}

/// Replays `backupFrame`'s commands for `view_index` against
/// `gl_context_for_backup`, used when `execute_stereo` found nothing to
/// replay this tick (spec §4.7 `TrBackupGLContextScope`).
fn execute_backup(
    gl: &dyn GlContext,
    xr_device: &XrDevice,
    shader_target_version: Option<&str>,
    doc: &mut DocumentScheduler,
    view_index: ViewIndex,
) -> Vec<(MessageId, GlResponse)> {
    let Some(backup) = doc.backup_frame.as_ref() else {
        return Vec::new();
    };
    let commands = backup.eyes[view_index.as_usize()].commands.clone();
    let session_id = backup.session_id;
    let ctx = build_placeholder_ctx(xr_device, session_id, view_index);
    let mut responses = Vec::new();
    let outcome = execute_batch(
        gl,
        &mut doc.objects,
        &mut doc.gl_context_for_backup,
        ctx.as_ref(),
        shader_target_version,
        &commands,
    );
    tally(doc, &outcome, &mut responses);
    responses
}

pub(crate) fn run_stereo_eye(
    gl: &dyn GlContext,
    xr_device: &XrDevice,
    shader_target_version: Option<&str>,
    doc: &mut DocumentScheduler,
    view_index: ViewIndex,
) -> Vec<(MessageId, GlResponse)> {
    let (mut responses, replayed) = execute_stereo(gl, xr_device, shader_target_version, doc, view_index);
    if !replayed {
        responses.extend(execute_backup(gl, xr_device, shader_target_version, doc, view_index));
    }
    responses
}

/// Result of one `Scheduler::tick` call for a single document.
pub struct TickOutcome {
    pub responses: Vec<(MessageId, GlResponse)>,
    /// True if the document's error/OOM counters crossed the wedged
    /// threshold this tick; the caller (`conclave_content`) is expected to
    /// dispose the owning runtime (spec §4.7 "Errors and OOM").
    pub wedged: bool,
}

/// Owns every document's scheduler state plus the shared XR device handle
/// needed to resolve placeholder uniforms (spec §4.7, §4.4).
pub struct Scheduler {
    documents: RwLock<HashMap<DocumentId, DocumentScheduler>>,
    xr_device: Arc<XrDevice>,
    shader_target_version: Option<String>,
    texture_units: u32,
}

impl Scheduler {
    pub fn new(xr_device: Arc<XrDevice>, shader_target_version: Option<String>, texture_units: u32) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            xr_device,
            shader_target_version,
            texture_units,
        }
    }

    pub fn register_document(&self, document_id: DocumentId) {
        self.documents.write().entry(document_id).or_insert_with(DocumentScheduler::new);
    }

    pub fn remove_document(&self, document_id: DocumentId) {
        self.documents.write().remove(&document_id);
    }

    /// Routes one received command buffer (spec §4.7 "Command-buffer
    /// ingestion").
    pub fn ingest(&self, document_id: DocumentId, message_id: MessageId, buffer: CommandBuffer) -> Result<()> {
        let mut documents = self.documents.write();
        let doc = documents
            .get_mut(&document_id)
            .ok_or(SchedulerError::UnknownDocument(document_id))?;

        if buffer.rendering_info.is_none() && !buffer.call.is_frame_boundary() {
            doc.default_queue.push(QueuedCommand { message_id, buffer });
            return Ok(());
        }

        let Some(info) = buffer.rendering_info else {
            return Ok(());
        };
        doc.used = true;

        if matches!(buffer.call, GlCall::XrFrameStart) && info.view_index == ViewIndex::LEFT {
            doc.stereo_frames.push(StereoFrame::new(info.stereo_id, info.session_id));
        }

        let Some(frame) = doc.find_stereo_frame_mut(info.stereo_id) else {
            return Ok(());
        };
        let idx = info.view_index.as_usize();
        match &buffer.call {
            GlCall::XrFrameStart => frame.start_frame(idx),
            GlCall::XrFrameFlush => frame.eyes[idx].flush_pending = true,
            GlCall::XrFrameEnd => frame.eyes[idx].ended = true,
            _ => {
                if !frame.eyes[idx].ended {
                    frame.eyes[idx].commands.push(QueuedCommand { message_id, buffer });
                }
            }
        }
        Ok(())
    }

    /// Replays one document's pending work against `gl` (spec §4.7 "Per-tick
    /// replay"). Caller supplies the real GL context; typically called once
    /// per document, per host render tick.
    pub fn tick(&self, document_id: DocumentId, gl: &dyn GlContext) -> Result<TickOutcome> {
        let mut documents = self.documents.write();
        let doc = documents
            .get_mut(&document_id)
            .ok_or(SchedulerError::UnknownDocument(document_id))?;
        doc.reset_tick_counters();

        let host_snapshot = VirtualGlState::capture(gl, self.texture_units);
        doc.gl_context.restore(gl);

        let mut responses = Vec::new();
        let default_commands = std::mem::take(&mut doc.default_queue);
        let default_outcome = execute_batch(
            gl,
            &mut doc.objects,
            &mut doc.gl_context,
            None,
            self.shader_target_version.as_deref(),
            &default_commands,
        );
        tally(doc, &default_outcome, &mut responses);

        if self.xr_device.enabled() && doc.used {
            let stereo_mode = self.xr_device.stereo_mode();
            let primary_eye = match stereo_mode {
                StereoRenderingMode::MultiPass => self.xr_device.active_eye(),
                _ => ViewIndex::LEFT,
            };
            let xr_view = self.xr_device.view(primary_eye);
            gl.bind_framebuffer(GL_FRAMEBUFFER, xr_view.view_framebuffer_id);

            match stereo_mode {
                StereoRenderingMode::MultiPass => {
                    let eye = self.xr_device.active_eye();
                    responses.extend(run_stereo_eye(gl, &self.xr_device, self.shader_target_version.as_deref(), doc, eye));
                }
                StereoRenderingMode::SinglePass
                | StereoRenderingMode::SinglePassInstanced
                | StereoRenderingMode::SinglePassMultiview => {
                    responses.extend(run_stereo_eye(
                        gl,
                        &self.xr_device,
                        self.shader_target_version.as_deref(),
                        doc,
                        ViewIndex::LEFT,
                    ));
                    responses.extend(run_stereo_eye(
                        gl,
                        &self.xr_device,
                        self.shader_target_version.as_deref(),
                        doc,
                        ViewIndex::RIGHT,
                    ));
                }
            }

            gl.bind_framebuffer(GL_FRAMEBUFFER, host_snapshot.framebuffer.0);
        }

        host_snapshot.restore(gl);
        Ok(TickOutcome { responses, wedged: doc.is_wedged() })
    }

    /// Per §4.7 "Stereo-frame counting for backpressure": frames fully
    /// committed (`ended` on both eyes) but not yet replayed, for one
    /// document's session.
    pub fn pending_stereo_frame_count(&self, document_id: DocumentId) -> usize {
        let documents = self.documents.read();
        documents
            .get(&document_id)
            .map(|doc| doc.stereo_frames.iter().filter(|f| f.both_ended()).count())
            .unwrap_or(0)
    }
}
