/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("no scheduler state registered for document {0:?}")]
    UnknownDocument(conclave_messages::DocumentId),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
