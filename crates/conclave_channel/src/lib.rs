/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L1: typed channels built on top of `conclave_transport`'s framed byte
//! pipe. Every message is `(MessageId, DocumentId, variant)`; segments and
//! the fixed "base" header from spec §3 are collapsed into one serde value
//! per message, since `bincode` already gives a compact binary encoding of
//! that shape without hand-rolling length-prefixed segment lists.

#![deny(unsafe_code)]

mod channel;
mod envelope;
mod error;
mod kinds;

pub use channel::{next_message_id, ChannelClient, TypedChannel};
pub use envelope::Envelope;
pub use error::{ChannelError, Result};
pub use kinds::{
    CommandBufferChannel, CommandBufferChannelClient, EventChannel, EventChannelClient,
    FrameRequestChannel, FrameRequestChannelClient, HiveCommandChannel, HiveCommandChannelClient,
    MediaCommandChannel, MediaCommandChannelClient, XrCommandChannel, XrCommandChannelClient,
};

#[cfg(test)]
mod test {
    use super::*;
    use conclave_messages::{DocumentId, EventMessage, RpcRequest};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn a_sent_message_is_received_with_the_same_document_id() {
        let server = EventChannel::listen().expect("listen");
        let port = server.port();
        let (tx, rx) = mpsc::channel();

        let client_thread = thread::spawn(move || {
            let peer = conclave_transport::connect(port, 999).expect("connect");
            let client = EventChannelClient::from_peer(peer);
            client
                .send(
                    DocumentId(7),
                    EventMessage::RpcRequest(RpcRequest {
                        message_id: crate::next_message_id(),
                        document_id: DocumentId(7),
                        method: "echo".into(),
                        args: vec!["hi".into()],
                    }),
                )
                .expect("send");
        });

        thread::sleep(Duration::from_millis(20));
        server
            .try_accept(1000, |result| {
                tx.send(result).expect("send to test thread");
            })
            .expect("try_accept");
        let client = rx.recv().expect("recv").expect("client");
        let envelope = client.try_recv(1000).expect("recv frame").expect("some frame");
        assert_eq!(envelope.document_id, DocumentId(7));
        match envelope.body {
            EventMessage::RpcRequest(req) => {
                assert_eq!(req.method, "echo");
                assert_eq!(req.args, vec!["hi".to_string()]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        client_thread.join().expect("client thread");
    }

    #[test]
    fn try_recv_all_drains_every_buffered_message() {
        let server = EventChannel::listen().expect("listen");
        let port = server.port();
        let (tx, rx) = mpsc::channel();

        let client_thread = thread::spawn(move || {
            let peer = conclave_transport::connect(port, 1000).expect("connect");
            let client = EventChannelClient::from_peer(peer);
            for i in 0..5 {
                client
                    .send(
                        DocumentId(1),
                        EventMessage::RpcRequest(RpcRequest {
                            message_id: crate::next_message_id(),
                            document_id: DocumentId(1),
                            method: format!("m{i}"),
                            args: vec![],
                        }),
                    )
                    .expect("send");
            }
        });

        thread::sleep(Duration::from_millis(20));
        server
            .try_accept(1000, |result| tx.send(result).expect("send"))
            .expect("try_accept");
        let client = rx.recv().expect("recv").expect("client");
        client_thread.join().expect("client thread");
        thread::sleep(Duration::from_millis(20));
        let all = client.try_recv_all().expect("drain");
        assert_eq!(all.len(), 5);
    }
}
