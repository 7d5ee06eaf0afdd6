/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A single accepted (or connected) socket, plus the poll/retry plumbing
//! every caller needs around it.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use socket2::Socket;

use crate::error::{Result, TransportError};
use crate::frame::{self, FrameBuffer, HEADER_LEN};

/// The peer-supplied pid captured during the handshake (§4.1). Used by the
/// content manager to correlate a freshly connected socket with the runtime
/// slot that is waiting on it.
pub type PeerPid = u32;

pub struct Peer {
    stream: TcpStream,
    valid: AtomicBool,
    pub peer_pid: PeerPid,
}

impl Peer {
    pub(crate) fn new(stream: TcpStream, peer_pid: PeerPid) -> Result<Self> {
        stream.set_nonblocking(true).map_err(TransportError::Io)?;
        let socket = Socket::from(stream.try_clone().map_err(TransportError::Io)?);
        socket
            .set_linger(Some(Duration::from_secs(30)))
            .map_err(TransportError::Io)?;
        Ok(Self {
            stream,
            valid: AtomicBool::new(true),
            peer_pid,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    fn poll_readable(&self, timeout_ms: i64) -> Result<bool> {
        let fd = self.stream.as_raw_fd();
        loop {
            let mut pollfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            let rc = unsafe { libc::poll(&mut pollfd, 1, timeout_ms as libc::c_int) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(TransportError::Io(err));
            }
            return Ok(rc > 0 && (pollfd.revents & libc::POLLIN) != 0);
        }
    }

    /// Writes the full buffer, looping on short writes and retryable
    /// errors; terminal errors invalidate the peer (§4.1, §7 item 1).
    pub fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        let mut written = 0usize;
        while written < bytes.len() {
            match (&self.stream).write(&bytes[written..]) {
                Ok(0) => {
                    self.invalidate();
                    return Err(TransportError::Closed);
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.invalidate();
                    return Err(TransportError::Io(e));
                }
            }
        }
        Ok(())
    }

    /// Blocks (bounded by `timeout_ms` per poll cycle) until `dst` has been
    /// filled, or returns `Ok(false)` if nothing became readable within the
    /// timeout.
    pub fn try_recv_raw(&self, dst: &mut [u8], timeout_ms: i64) -> Result<bool> {
        if !self.poll_readable(timeout_ms)? {
            return Ok(false);
        }
        let mut read = 0usize;
        while read < dst.len() {
            match (&self.stream).read(&mut dst[read..]) {
                Ok(0) => {
                    self.invalidate();
                    return Err(TransportError::Closed);
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if !self.poll_readable(timeout_ms)? {
                        continue;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.invalidate();
                    return Err(TransportError::Io(e));
                }
            }
        }
        Ok(true)
    }

    /// Sends one length-prefixed frame.
    pub fn send_frame(&self, content: &[u8]) -> Result<()> {
        self.send_raw(&frame::encode_frame(content))
    }

    /// Polls for and, if present, returns one complete frame's payload.
    pub fn try_recv_frame(&self, timeout_ms: i64) -> Result<Option<FrameBuffer>> {
        let mut header = [0u8; HEADER_LEN];
        if !self.try_recv_raw(&mut header, timeout_ms)? {
            return Ok(None);
        }
        let len = frame::decode_header(&header)?;
        let mut buf = FrameBuffer::empty_of_len(len);
        let slice = match &mut buf {
            FrameBuffer::Inline(b, l) => &mut b[..*l],
            FrameBuffer::Heap(v) => v.as_mut_slice(),
        };
        // The header already told us a frame is coming; block (within one
        // more timeout window) until the body arrives rather than dropping it.
        if !self.try_recv_raw(slice, timeout_ms.max(1))? {
            return Err(TransportError::Closed);
        }
        Ok(Some(buf))
    }
}
