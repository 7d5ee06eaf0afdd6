/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! One type alias per channel kind named in spec §4.2. Each is a distinct
//! monomorphization of `TypedChannel`/`ChannelClient` — they do not share
//! wire space, matching "Each channel kind is a distinct type".

use conclave_messages::{CommandBuffer, EventMessage, FrameRequestMessage, GlResponse, HiveCommand, HiveEvent, MediaCommand, MediaEvent, XrCommand, XrResponse};

use crate::channel::{ChannelClient, TypedChannel};

/// Native events between host and documents: `DocumentRequest`,
/// `DocumentEvent`, `RpcRequest`/`RpcResponse`. Symmetric: both directions
/// carry the same enum.
pub type EventChannel = TypedChannel<EventMessage, EventMessage>;
pub type EventChannelClient = ChannelClient<EventMessage, EventMessage>;

/// Host-to-document only; the document side never replies on this channel.
pub type FrameRequestChannel = TypedChannel<(), FrameRequestMessage>;
pub type FrameRequestChannelClient = ChannelClient<(), FrameRequestMessage>;

/// Document-to-host GL command buffers; host-to-document responses for
/// query commands.
pub type CommandBufferChannel = TypedChannel<CommandBuffer, GlResponse>;
pub type CommandBufferChannelClient = ChannelClient<CommandBuffer, GlResponse>;

/// Document-to-host audio operations; host-to-document media events.
pub type MediaCommandChannel = TypedChannel<MediaCommand, MediaEvent>;
pub type MediaCommandChannelClient = ChannelClient<MediaCommand, MediaEvent>;

/// Document-to-host WebXR operations; host-to-document responses.
pub type XrCommandChannel = TypedChannel<XrCommand, XrResponse>;
pub type XrCommandChannelClient = ChannelClient<XrCommand, XrResponse>;

/// Host-to-daemon commands; daemon-to-host events. The one channel kind
/// with exactly one peer (the hive daemon), so `document_id` on its
/// envelopes is always `DocumentId::INVALID`.
pub type HiveCommandChannel = TypedChannel<HiveEvent, HiveCommand>;
pub type HiveCommandChannelClient = ChannelClient<HiveEvent, HiveCommand>;
