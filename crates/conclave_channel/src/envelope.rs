/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The metadata every typed-channel message carries alongside its payload
//! (spec §3 "Message framing": "`[...][message_id][...]` the base is the
//! fixed-size header, segments are the variable payload"). `conclave_channel`
//! collapses that into one serde-serializable envelope per message rather
//! than hand-rolling the segment list, since every payload here is already
//! a plain Rust value `bincode` can encode directly.

use conclave_messages::{DocumentId, MessageId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message_id: MessageId,
    /// `DocumentId::INVALID` on channels with a single, unambiguous peer
    /// (the hive command channel has exactly one client: the daemon).
    pub document_id: DocumentId,
    pub body: T,
}
