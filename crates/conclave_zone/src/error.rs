/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ZoneError {
    #[error("failed to create zone file {0}: {1}")]
    Create(PathBuf, #[source] io::Error),

    #[error("failed to open zone file {0}: {1}")]
    Open(PathBuf, #[source] io::Error),

    #[error("zone file too small: expected at least {expected} bytes, found {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, ZoneError>;
