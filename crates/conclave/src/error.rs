/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#[derive(thiserror::Error, Debug)]
pub enum HostApiError {
    #[error("invalid host configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("content runtime error: {0}")]
    Content(#[from] conclave_content::ContentError),

    #[error("xr error: {0}")]
    Xr(#[from] conclave_xr::XrError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] conclave_scheduler::SchedulerError),
}

pub type Result<T> = std::result::Result<T, HostApiError>;
