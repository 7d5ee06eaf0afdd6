/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Length-prefixed, magic-tagged byte frames.
//!
//! A frame on the wire is `[magic: u16][content_size: u64][content_size bytes]`.
//! The "content" is whatever the typed-channel layer above already encoded
//! (message id plus the serialized variant); this layer only has to get
//! those bytes across reliably and cheaply.

use std::ops::Deref;

use crate::error::{Result, TransportError};

/// Frames up to this size are copied into a fixed stack buffer instead of
/// allocating, matching the corpus's "small messages are the common case"
/// assumption for per-call IPC traffic.
pub const INLINE_CAPACITY: usize = 1024;

pub const FRAME_MAGIC: u16 = 0x1c15;

/// A received frame's payload, avoiding a heap allocation for the common
/// small-message case.
pub enum FrameBuffer {
    Inline([u8; INLINE_CAPACITY], usize),
    Heap(Vec<u8>),
}

impl FrameBuffer {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() <= INLINE_CAPACITY {
            let mut buf = [0u8; INLINE_CAPACITY];
            buf[..bytes.len()].copy_from_slice(bytes);
            FrameBuffer::Inline(buf, bytes.len())
        } else {
            FrameBuffer::Heap(bytes.to_vec())
        }
    }

    pub fn empty_of_len(len: usize) -> Self {
        if len <= INLINE_CAPACITY {
            FrameBuffer::Inline([0u8; INLINE_CAPACITY], len)
        } else {
            FrameBuffer::Heap(vec![0u8; len])
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            FrameBuffer::Inline(buf, len) => &mut buf[..*len],
            FrameBuffer::Heap(v) => v.as_mut_slice(),
        }
    }
}

impl Deref for FrameBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FrameBuffer::Inline(buf, len) => &buf[..*len],
            FrameBuffer::Heap(v) => v.as_slice(),
        }
    }
}

/// Encodes `content` as a full wire frame: magic, length prefix, payload.
pub fn encode_frame(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + content.len());
    out.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
    out.extend_from_slice(&(content.len() as u64).to_le_bytes());
    out.extend_from_slice(content);
    out
}

/// Decodes the fixed `[magic][len]` header from the front of a byte stream.
/// Returns the declared content length; the caller is responsible for then
/// reading that many bytes (see `Peer::try_recv_raw` in `peer.rs`).
pub fn decode_header(header: &[u8; 10]) -> Result<usize> {
    let magic = u16::from_le_bytes([header[0], header[1]]);
    if magic != FRAME_MAGIC {
        return Err(TransportError::BadMagic {
            expected: FRAME_MAGIC,
            actual: magic,
        });
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&header[2..10]);
    Ok(u64::from_le_bytes(len_bytes) as usize)
}

pub const HEADER_LEN: usize = 10;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inline_path_used_at_and_under_the_cap() {
        let bytes = vec![7u8; INLINE_CAPACITY];
        let buf = FrameBuffer::from_bytes(&bytes);
        assert!(matches!(buf, FrameBuffer::Inline(_, _)));
        assert_eq!(&*buf, bytes.as_slice());
    }

    #[test]
    fn heap_path_used_just_over_the_cap() {
        let bytes = vec![7u8; INLINE_CAPACITY + 1];
        let buf = FrameBuffer::from_bytes(&bytes);
        assert!(matches!(buf, FrameBuffer::Heap(_)));
        assert_eq!(&*buf, bytes.as_slice());
    }

    #[test]
    fn header_round_trips() {
        let payload = b"hello frame";
        let frame = encode_frame(payload);
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&frame[..HEADER_LEN]);
        let len = decode_header(&header).expect("valid header");
        assert_eq!(len, payload.len());
        assert_eq!(&frame[HEADER_LEN..], payload);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut header = [0u8; HEADER_LEN];
        header[0] = 0xff;
        header[1] = 0xff;
        assert!(decode_header(&header).is_err());
    }

    #[test]
    fn write_into_buffer_is_usable_for_reads() {
        let mut buf = FrameBuffer::empty_of_len(4);
        buf.as_mut_slice().copy_from_slice(b"ABCD");
        assert_eq!(&*buf, b"ABCD");
    }
}
