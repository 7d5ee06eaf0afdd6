/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use conclave_messages::DocumentId;

#[derive(thiserror::Error, Debug)]
pub enum ContentError {
    #[error("transport error: {0}")]
    Transport(#[from] conclave_transport::TransportError),

    #[error("channel error: {0}")]
    Channel(#[from] conclave_channel::ChannelError),

    #[error("hive error: {0}")]
    Hive(#[from] conclave_hive::HiveError),

    #[error("xr error: {0}")]
    Xr(#[from] conclave_xr::XrError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] conclave_scheduler::SchedulerError),

    #[error("unknown document id {0}")]
    UnknownDocument(DocumentId),
}

pub type Result<T> = std::result::Result<T, ContentError>;
