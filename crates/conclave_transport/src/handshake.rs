/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The six-byte handshake that opens every connection: the client announces
//! its pid, the server echoes it back verbatim within 1000 ms. Anything
//! else is a failed handshake and closes the connection (§4.1, S6).

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::peer::PeerPid;

const HANDSHAKE_TAG: [u8; 2] = [0x03, 0x07];
const HANDSHAKE_LEN: usize = 6;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(1000);

fn encode(pid: u32) -> [u8; HANDSHAKE_LEN] {
    let mut buf = [0u8; HANDSHAKE_LEN];
    buf[0..2].copy_from_slice(&HANDSHAKE_TAG);
    buf[2..6].copy_from_slice(&pid.to_le_bytes());
    buf
}

/// Server side: read the client's handshake, verify the tag, echo it back.
/// Returns the pid the client announced.
pub fn accept_handshake(stream: &mut TcpStream) -> Result<PeerPid> {
    stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .map_err(TransportError::Io)?;
    let mut buf = [0u8; HANDSHAKE_LEN];
    stream.read_exact(&mut buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
            TransportError::HandshakeTimeout
        }
        _ => TransportError::Io(e),
    })?;
    if buf[0..2] != HANDSHAKE_TAG {
        return Err(TransportError::HandshakeMismatch(buf.to_vec()));
    }
    let mut pid_bytes = [0u8; 4];
    pid_bytes.copy_from_slice(&buf[2..6]);
    let pid = u32::from_le_bytes(pid_bytes);
    stream.write_all(&buf).map_err(TransportError::Io)?;
    Ok(pid)
}

/// Client side: announce our pid, expect the same bytes echoed back.
pub fn perform_handshake(stream: &mut TcpStream, our_pid: u32) -> Result<()> {
    stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .map_err(TransportError::Io)?;
    let sent = encode(our_pid);
    stream.write_all(&sent).map_err(TransportError::Io)?;
    let mut echoed = [0u8; HANDSHAKE_LEN];
    stream.read_exact(&mut echoed).map_err(|e| match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
            TransportError::HandshakeTimeout
        }
        _ => TransportError::Io(e),
    })?;
    if echoed != sent {
        return Err(TransportError::HandshakeMismatch(echoed.to_vec()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn handshake_round_trips_the_pid() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            accept_handshake(&mut stream).expect("server handshake")
        });
        let mut client = TcpStream::connect(addr).expect("connect");
        perform_handshake(&mut client, 4242).expect("client handshake");
        let observed_pid = server.join().expect("server thread");
        assert_eq!(observed_pid, 4242);
    }

    #[test]
    fn bad_tag_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            accept_handshake(&mut stream)
        });
        let mut client = TcpStream::connect(addr).expect("connect");
        // [0x03, 0x08, pid] instead of the expected [0x03, 0x07, pid] (S6).
        let mut bad = [0u8; HANDSHAKE_LEN];
        bad[0] = 0x03;
        bad[1] = 0x08;
        client.write_all(&bad).expect("write");
        let result = server.join().expect("server thread");
        assert!(result.is_err());
    }
}
