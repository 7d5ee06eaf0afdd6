/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The listening half of L0: binds one loopback port, accepts connections
//! without blocking the caller for longer than a bounded poll timeout, and
//! runs the handshake before handing a usable `Peer` to the caller.

use std::io;
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;

use log::{debug, warn};

use crate::error::{Result, TransportError};
use crate::handshake;
use crate::peer::Peer;

pub struct Server {
    listener: TcpListener,
    port: u16,
}

impl Server {
    /// Picks a free loopback port and starts listening on it.
    pub fn listen() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").map_err(TransportError::Bind)?;
        listener.set_nonblocking(true).map_err(TransportError::Bind)?;
        let port = listener.local_addr().map_err(TransportError::Bind)?.port();
        debug!("listening on 127.0.0.1:{port}");
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn poll_readable(&self, timeout_ms: i64) -> Result<bool> {
        let fd = self.listener.as_raw_fd();
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

    /// Polls for a pending connection; if one arrives within `timeout_ms`,
    /// performs the handshake and invokes `on_client` with the result
    /// (success or handshake failure, so the caller can log either way).
    pub fn try_accept(
        &self,
        timeout_ms: i64,
        mut on_client: impl FnMut(Result<Peer>),
    ) -> Result<bool> {
        if !self.poll_readable(timeout_ms)? {
            return Ok(false);
        }
        let mut stream: TcpStream = loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => break stream,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }
        };
        let result = handshake::accept_handshake(&mut stream).and_then(|pid| Peer::new(stream, pid));
        if let Err(ref e) = result {
            warn!("handshake failed: {e}");
        }
        on_client(result);
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::TcpStream as StdTcpStream;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn accept_invokes_callback_with_peer_pid() {
        let server = Server::listen().expect("listen");
        let port = server.port();
        let (tx, rx) = mpsc::channel();

        let client = thread::spawn(move || {
            let mut stream = StdTcpStream::connect(("127.0.0.1", port)).expect("connect");
            crate::handshake::perform_handshake(&mut stream, 777).expect("handshake");
            stream
        });

        // Give the client a moment to connect before polling.
        thread::sleep(Duration::from_millis(20));
        let accepted = server
            .try_accept(1000, |result| {
                tx.send(result.map(|p| p.peer_pid)).expect("send");
            })
            .expect("try_accept");
        assert!(accepted);
        let pid = rx.recv().expect("recv").expect("peer");
        assert_eq!(pid, 777);
        client.join().expect("client thread");
    }

    #[test]
    fn try_accept_times_out_with_no_connection() {
        let server = Server::listen().expect("listen");
        let accepted = server.try_accept(10, |_| {}).expect("try_accept");
        assert!(!accepted);
    }
}
