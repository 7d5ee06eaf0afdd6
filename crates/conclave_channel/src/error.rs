/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(#[from] conclave_transport::TransportError),

    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] bincode::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
