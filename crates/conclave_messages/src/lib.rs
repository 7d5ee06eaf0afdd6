/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Wire vocabulary shared by every typed channel. Kept free of any IO or
//! threading concern — `conclave_transport` and `conclave_channel` own the
//! framing and the channel-kind plumbing; this crate only describes what
//! goes *inside* a frame.

#![deny(unsafe_code)]

pub mod command_buffer;
pub mod event;
pub mod frame_request;
pub mod hive;
pub mod ids;
pub mod media;
pub mod rendering;
pub mod xr;

pub use command_buffer::{ClientId, CommandBuffer, GlCall, GlObjectKind, GlResponse, MatrixSource};
pub use event::{DocumentEvent, DocumentEventType, DocumentRequestInit, EventMessage, NativeEvent, RpcRequest, RpcResponse};
pub use frame_request::FrameRequestMessage;
pub use hive::{HiveCommand, HiveEvent, LogLevel};
pub use ids::{DocumentId, DocumentIdGenerator, MessageId, MessageIdGenerator, SessionId};
pub use media::{MediaCommand, MediaEvent, MediaEventType, MediaId};
pub use rendering::{Handedness, RenderingInfo, SystemMatrix, ViewIndex};
pub use xr::{StereoRenderingMode, XrCommand, XrResponse, XrSessionMode};
