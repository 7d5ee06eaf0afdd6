/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::io;

/// Transport-layer failures. Per the error taxonomy, every variant here
/// marks the owning peer invalid; none of them panic the render thread.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("failed to bind a loopback listener: {0}")]
    Bind(#[source] io::Error),

    #[error("io error on transport: {0}")]
    Io(#[source] io::Error),

    #[error("peer closed the connection")]
    Closed,

    #[error("handshake timed out waiting for peer reply")]
    HandshakeTimeout,

    #[error("handshake rejected: expected magic bytes, got {0:?}")]
    HandshakeMismatch(Vec<u8>),

    #[error("frame magic mismatch: expected {expected:#06x}, got {actual:#06x}")]
    BadMagic { expected: u16, actual: u16 },
}

pub type Result<T> = std::result::Result<T, TransportError>;
