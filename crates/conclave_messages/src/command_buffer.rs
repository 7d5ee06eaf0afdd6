/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The wire shape of a single marshalled GL call or query, plus the small
//! amount of bookkeeping (`RenderingInfo`) that tells the scheduler which
//! queue it belongs to.
//!
//! `GlObjectKind` covers every named-object type a document can create;
//! `ClientId` is the document's own handle for one such object (never a real
//! GL name — the scheduler owns the client-id -> GL-name mapping).

use serde::{Deserialize, Serialize};

use crate::rendering::{Handedness, RenderingInfo, SystemMatrix};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct ClientId(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum GlObjectKind {
    Program,
    Shader,
    Buffer,
    Framebuffer,
    Renderbuffer,
    VertexArray,
    Texture,
    Sampler,
}

/// A uniform-matrix-set call whose 16 floats are either the literal value
/// the document computed, or a stand-in resolved by the scheduler from the
/// active XR session (see `conclave_scheduler::placeholder`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MatrixSource {
    Explicit([f32; 16]),
    Placeholder {
        matrix: SystemMatrix,
        handedness: Handedness,
        /// The value the document itself computed, used as-is when the
        /// device is single-pass or `session_id` on the enclosing
        /// `RenderingInfo` doesn't resolve to a live session (spec §4.7
        /// "Uniform matrix placeholders").
        fallback: [f32; 16],
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GlCall {
    // -- object lifecycle: create/delete/bind, one shape per object kind --
    CreateObject {
        kind: GlObjectKind,
        client_id: ClientId,
    },
    DeleteObject {
        kind: GlObjectKind,
        client_id: ClientId,
    },
    BindBuffer {
        target: u32,
        client_id: ClientId,
    },
    BindFramebuffer {
        target: u32,
        client_id: ClientId,
    },
    BindRenderbuffer {
        client_id: ClientId,
    },
    BindVertexArray {
        client_id: ClientId,
    },
    BindTexture {
        unit: u32,
        target: u32,
        client_id: ClientId,
    },

    // -- shader/program pipeline --
    ShaderSource {
        client_id: ClientId,
        source: String,
    },
    CompileShader {
        client_id: ClientId,
    },
    AttachShader {
        program: ClientId,
        shader: ClientId,
    },
    DetachShader {
        program: ClientId,
        shader: ClientId,
    },
    LinkProgram {
        client_id: ClientId,
    },
    UseProgram {
        client_id: ClientId,
    },

    // -- buffer data --
    BufferData {
        target: u32,
        bytes: Vec<u8>,
        usage: u32,
    },
    BufferSubData {
        target: u32,
        offset: i64,
        bytes: Vec<u8>,
    },

    // -- framebuffer / renderbuffer setup --
    RenderbufferStorage {
        internal_format: u32,
        width: i32,
        height: i32,
    },
    FramebufferTexture2d {
        attachment: u32,
        tex_target: u32,
        texture: ClientId,
        level: i32,
    },
    FramebufferRenderbuffer {
        attachment: u32,
        renderbuffer: ClientId,
    },

    // -- texture setup --
    TexImage2d {
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        data_type: u32,
        bytes: Vec<u8>,
    },
    TexParameteri {
        target: u32,
        pname: u32,
        value: i32,
    },
    GenerateMipmap {
        target: u32,
    },

    // -- vertex attributes --
    EnableVertexAttribArray {
        index: u32,
    },
    DisableVertexAttribArray {
        index: u32,
    },
    VertexAttribPointer {
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i64,
    },

    // -- uniforms --
    Uniform1f {
        location: u32,
        v0: f32,
    },
    Uniform2f {
        location: u32,
        v0: f32,
        v1: f32,
    },
    Uniform3f {
        location: u32,
        v0: f32,
        v1: f32,
        v2: f32,
    },
    Uniform4f {
        location: u32,
        v0: f32,
        v1: f32,
        v2: f32,
        v3: f32,
    },
    Uniform1i {
        location: u32,
        v0: i32,
    },
    UniformMatrix4fv {
        location: u32,
        transpose: bool,
        value: MatrixSource,
    },

    // -- draw calls --
    DrawArrays {
        mode: u32,
        first: i32,
        count: i32,
    },
    DrawElements {
        mode: u32,
        count: i32,
        data_type: u32,
        offset: i64,
    },
    DrawArraysInstanced {
        mode: u32,
        first: i32,
        count: i32,
        instance_count: i32,
    },
    DrawElementsInstanced {
        mode: u32,
        count: i32,
        data_type: u32,
        offset: i64,
        instance_count: i32,
    },

    // -- state --
    Viewport {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    Scissor {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    Enable {
        capability: u32,
    },
    Disable {
        capability: u32,
    },
    BlendFunc {
        src: u32,
        dst: u32,
    },
    BlendFuncSeparate {
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
    },
    DepthFunc {
        func: u32,
    },
    DepthMask {
        enabled: bool,
    },
    CullFace {
        mode: u32,
    },
    FrontFace {
        mode: u32,
    },
    ColorMask {
        r: bool,
        g: bool,
        b: bool,
        a: bool,
    },
    StencilFunc {
        func: u32,
        reference: i32,
        mask: u32,
    },
    StencilOp {
        fail: u32,
        zfail: u32,
        zpass: u32,
    },
    StencilMask {
        mask: u32,
    },
    ClearColor {
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    },
    Clear {
        mask: u32,
    },
    ActiveTexture {
        unit: u32,
    },
    PixelStorei {
        pname: u32,
        param: i32,
    },

    // -- queries, paired with `GlResponse` on the same channel --
    GetError,
    GetShaderParameter {
        client_id: ClientId,
        pname: u32,
    },
    GetProgramParameter {
        client_id: ClientId,
        pname: u32,
    },
    GetShaderInfoLog {
        client_id: ClientId,
    },
    GetProgramInfoLog {
        client_id: ClientId,
    },
    GetAttribLocation {
        program: ClientId,
        name: String,
    },
    GetUniformLocation {
        program: ClientId,
        name: String,
    },
    CheckFramebufferStatus {
        target: u32,
    },

    // -- stereo frame boundaries, routed by the scheduler's ingestion path
    //    rather than replayed as a GL call --
    XrFrameStart,
    XrFrameFlush,
    XrFrameEnd,
}

impl GlCall {
    /// True for calls the spec routes through ingestion specially (they
    /// never reach `execute_one` — see `conclave_scheduler::ingest`).
    pub fn is_frame_boundary(&self) -> bool {
        matches!(
            self,
            GlCall::XrFrameStart | GlCall::XrFrameFlush | GlCall::XrFrameEnd
        )
    }

    /// True for calls that mutate program internals and therefore force a
    /// "state changed" verdict regardless of any other diffing (§4.7).
    pub fn always_dirties_program(&self) -> bool {
        matches!(
            self,
            GlCall::LinkProgram { .. }
                | GlCall::AttachShader { .. }
                | GlCall::ShaderSource { .. }
                | GlCall::CompileShader { .. }
                | GlCall::DetachShader { .. }
        )
    }

    /// True for the `GetXyz` family that must be answered with a
    /// `GlResponse` on the same channel.
    pub fn expects_response(&self) -> bool {
        matches!(
            self,
            GlCall::GetError
                | GlCall::GetShaderParameter { .. }
                | GlCall::GetProgramParameter { .. }
                | GlCall::GetShaderInfoLog { .. }
                | GlCall::GetProgramInfoLog { .. }
                | GlCall::GetAttribLocation { .. }
                | GlCall::GetUniformLocation { .. }
                | GlCall::CheckFramebufferStatus { .. }
        )
    }
}

/// One command buffer as received from a document's command-buffer channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandBuffer {
    pub rendering_info: Option<RenderingInfo>,
    pub call: GlCall,
}

impl CommandBuffer {
    pub fn default_queue(call: GlCall) -> Self {
        Self {
            rendering_info: None,
            call,
        }
    }

    pub fn stereo(rendering_info: RenderingInfo, call: GlCall) -> Self {
        Self {
            rendering_info: Some(rendering_info),
            call,
        }
    }
}

/// Replies to `GetXyz` queries, sent back on the command-buffer channel and
/// correlated with the request by `MessageId`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GlResponse {
    Error(u32),
    Int(i32),
    IntOrNone(Option<i32>),
    Bool(bool),
    Str(String),
}

#[cfg(test)]
mod test {
    use super::*;

    fn roundtrip(call: GlCall) {
        let buf = CommandBuffer::default_queue(call);
        let bytes = bincode::serialize(&buf).expect("serialize");
        let back: CommandBuffer = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(format!("{:?}", buf), format!("{:?}", back));
    }

    #[test]
    fn command_buffers_round_trip_through_bincode() {
        roundtrip(GlCall::ClearColor {
            r: 0.1,
            g: 0.2,
            b: 0.3,
            a: 1.0,
        });
        roundtrip(GlCall::DrawElements {
            mode: 0x0004,
            count: 3,
            data_type: 0x1403,
            offset: 0,
        });
        roundtrip(GlCall::UniformMatrix4fv {
            location: 7,
            transpose: false,
            value: MatrixSource::Placeholder {
                matrix: SystemMatrix::ViewProjection,
                handedness: Handedness::RightHanded,
                fallback: [0.0; 16],
            },
        });
    }

    #[test]
    fn program_mutators_always_dirty() {
        assert!(GlCall::LinkProgram {
            client_id: ClientId(1)
        }
        .always_dirties_program());
        assert!(!GlCall::DrawArrays {
            mode: 4,
            first: 0,
            count: 3
        }
        .always_dirties_program());
    }
}
