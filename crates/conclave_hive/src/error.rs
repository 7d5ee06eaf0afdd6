/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum HiveError {
    #[error("failed to spawn the hive daemon at {0}: {1}")]
    Spawn(PathBuf, #[source] io::Error),

    #[error("failed to install daemon executable to {0}: {1}")]
    Install(PathBuf, #[source] io::Error),

    #[error("channel error: {0}")]
    Channel(#[from] conclave_channel::ChannelError),

    #[error("the daemon has not connected back on the hive command channel yet")]
    NotConnected,

    #[error("failed to serialize hive startup config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HiveError>;
