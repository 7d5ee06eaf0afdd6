/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L1: the generic typed wrapper over L0 (spec §4.2). One `TypedChannel<Recv,
//! Send>` instantiation per channel kind — the six kinds never share wire
//! space because each is its own monomorphization, not a shared buffer.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use conclave_messages::{DocumentId, MessageId};
use conclave_transport::{Peer, Server as TransportServer};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope::Envelope;
use crate::error::{ChannelError, Result};

/// Process-wide message id source (spec SPEC_FULL §4.2 addition): shared by
/// every channel kind so that responses racing in from different channels
/// never collide on id.
static NEXT_MESSAGE_ID: AtomicU32 = AtomicU32::new(1);

pub fn next_message_id() -> MessageId {
    MessageId(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
}

/// The listening half of one channel kind.
pub struct TypedChannel<Recv, Send> {
    transport: TransportServer,
    _marker: PhantomData<(Recv, Send)>,
}

impl<Recv, Send> TypedChannel<Recv, Send>
where
    Recv: DeserializeOwned,
    Send: Serialize,
{
    pub fn listen() -> Result<Self> {
        Ok(Self {
            transport: TransportServer::listen()?,
            _marker: PhantomData,
        })
    }

    pub fn port(&self) -> u16 {
        self.transport.port()
    }

    /// Polls for one pending connection; on success, hands the caller a
    /// bound `ChannelClient`. The caller is expected to read the client's
    /// first message to learn which `DocumentId` it belongs to (spec §4.5:
    /// "the document connects in turn on each channel kind, carrying its
    /// DocumentId").
    pub fn try_accept(
        &self,
        timeout_ms: i64,
        mut on_client: impl FnMut(Result<ChannelClient<Recv, Send>>),
    ) -> Result<bool> {
        let accepted = self.transport.try_accept(timeout_ms, |result| {
            on_client(result.map(ChannelClient::new).map_err(ChannelError::from));
        })?;
        Ok(accepted)
    }
}

/// One connected peer on a typed channel.
pub struct ChannelClient<Recv, Send> {
    peer: Peer,
    _marker: PhantomData<(Recv, Send)>,
}

impl<Recv, Send> ChannelClient<Recv, Send>
where
    Recv: DeserializeOwned,
    Send: Serialize,
{
    fn new(peer: Peer) -> Self {
        Self {
            peer,
            _marker: PhantomData,
        }
    }

    /// Used by `conclave_transport::connect` callers (document-side stand-ins
    /// in tests) that already have a handshaked peer.
    pub fn from_peer(peer: Peer) -> Self {
        Self::new(peer)
    }

    pub fn is_valid(&self) -> bool {
        self.peer.is_valid()
    }

    pub fn peer_pid(&self) -> u32 {
        self.peer.peer_pid
    }

    pub fn send(&self, document_id: DocumentId, body: Send) -> Result<MessageId> {
        let message_id = next_message_id();
        self.reply(message_id, document_id, body)?;
        Ok(message_id)
    }

    /// Sends `body` back with a caller-chosen `message_id` rather than
    /// allocating a fresh one, so a query response can echo the id of the
    /// request it answers (spec §4.2: "responses echo the request id so the
    /// caller can correlate").
    pub fn reply(&self, message_id: MessageId, document_id: DocumentId, body: Send) -> Result<()> {
        let envelope = Envelope {
            message_id,
            document_id,
            body,
        };
        let bytes = bincode::serialize(&envelope).map_err(ChannelError::Encode)?;
        self.peer.send_frame(&bytes)?;
        Ok(())
    }

    pub fn try_recv(&self, timeout_ms: i64) -> Result<Option<Envelope<Recv>>> {
        match self.peer.try_recv_frame(timeout_ms)? {
            None => Ok(None),
            Some(buf) => {
                let envelope = bincode::deserialize(&buf).map_err(ChannelError::Decode)?;
                Ok(Some(envelope))
            }
        }
    }

    /// Drains every message currently buffered without blocking, mirroring
    /// `EmbedderReceiver::try_recv_embedder_msg`'s repeated-poll style
    /// (SPEC_FULL §4.2 addition). Used by the per-runtime ingestion thread
    /// so it doesn't loop on individual `recv` calls itself.
    pub fn try_recv_all(&self) -> Result<Vec<Envelope<Recv>>> {
        let mut out = Vec::new();
        while let Some(envelope) = self.try_recv(0)? {
            out.push(envelope);
        }
        Ok(out)
    }
}
