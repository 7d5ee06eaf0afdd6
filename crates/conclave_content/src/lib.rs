/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L4: the content runtime layer. Binds together the typed channels
//! (`conclave_channel`), the hive daemon (`conclave_hive`), the XR device
//! (`conclave_xr`), and the GL scheduler (`conclave_scheduler`) into one
//! `ContentManager` that the host-facing `conclave` crate drives.

#![deny(unsafe_code)]

mod error;
mod manager;
mod runtime;
mod snapshot;

pub use error::{ContentError, Result};
pub use manager::{ContentManager, ManagerConfig, OpenInit};
pub use runtime::{ContentRuntime, RuntimeState};
pub use snapshot::{ContentSnapshot, RuntimeSnapshot};
