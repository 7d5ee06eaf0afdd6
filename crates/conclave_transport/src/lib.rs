/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L0: reliably carries opaque byte frames between the host and each
//! document process over loopback TCP. Everything above this layer
//! (typed channels, shared-memory zone filenames) treats a `Peer` as an
//! ordered byte pipe with a pid attached.

// `libc::poll` on raw fds is unavoidable at this layer; every other crate in
// the workspace denies unsafe code instead.
#![allow(unsafe_code)]

pub mod error;
pub mod frame;
pub mod handshake;
pub mod listener;
pub mod peer;

pub use error::{Result, TransportError};
pub use frame::{FrameBuffer, INLINE_CAPACITY};
pub use listener::Server;
pub use peer::{Peer, PeerPid};

use std::net::TcpStream;

/// Connects to a server previously returned by `Server::listen`'s port and
/// performs the client side of the handshake. Used by document processes
/// (and by tests standing in for one).
pub fn connect(port: u16, our_pid: u32) -> Result<Peer> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).map_err(TransportError::Io)?;
    handshake::perform_handshake(&mut stream, our_pid)?;
    Peer::new(stream, our_pid)
}
