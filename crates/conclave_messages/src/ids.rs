/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Stable identities shared by every IPC frame and shared-memory zone.
//!
//! `DocumentId` is generated once per document by the host and never reused
//! within a process lifetime. `SessionId` and `MessageId` follow the same
//! "newtype wrapping a plain integer" convention so that the wire format
//! (a bare `u32`) and the type-checked in-process handle stay in lock step.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Identity of a document, stable across its entire lifetime.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct DocumentId(pub u32);

impl DocumentId {
    /// The sentinel returned by `open()` on failure; never a live document.
    pub const INVALID: DocumentId = DocumentId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "doc:{}", self.0)
    }
}

/// Process-wide monotonic generator for `DocumentId`. The host is the only
/// producer; document processes only ever echo ids assigned to them.
#[derive(Default)]
pub struct DocumentIdGenerator(AtomicU32);

impl DocumentIdGenerator {
    pub const fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    pub fn next(&self) -> DocumentId {
        DocumentId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a WebXR session, distinct from the `DocumentId` of the
/// document that opened it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl SessionId {
    pub const INVALID: SessionId = SessionId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Identity used to correlate a request with its response across a typed
/// channel. Allocated from a single process-wide counter so that responses
/// racing in from different channel kinds never collide.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct MessageId(pub u32);

#[derive(Default)]
pub struct MessageIdGenerator(AtomicU32);

impl MessageIdGenerator {
    pub const fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    pub fn next(&self) -> MessageId {
        MessageId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_ids_are_distinct_and_monotonic() {
        let gen = DocumentIdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert_ne!(a, b);
        assert!(a.0 < b.0);
        assert!(a.is_valid());
        assert!(!DocumentId::INVALID.is_valid());
    }

    #[test]
    fn message_ids_never_collide_under_interleaving() {
        let gen = MessageIdGenerator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(gen.next()));
        }
    }
}
