/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#[derive(thiserror::Error, Debug)]
pub enum XrError {
    #[error("zone error: {0}")]
    Zone(#[from] conclave_zone::ZoneError),

    #[error("no free session id after 10 collision retries")]
    SessionIdExhausted,

    #[error("unknown session id {0}")]
    UnknownSession(u32),

    #[error("eye index {0} is out of range (must be 0 or 1)")]
    InvalidEye(u8),
}

pub type Result<T> = std::result::Result<T, XrError>;
