/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The GL-call surface and state-tracking types shared by the scheduler:
//! `GlObjectManager` (client id -> real GL name) and `VirtualGlState` (a
//! document's, or the host's, view of bindings/enables/state), plus the
//! `GlContext` trait the scheduler replays calls through. Kept in its own
//! crate so `conclave_scheduler` stays focused on queue and replay policy —
//! the same split `canvas`/`canvas_traits` draw between GL dispatch and
//! shared message/id types.

#![deny(unsafe_code)]

mod gl_context;
mod object_manager;
mod state;
pub mod testing;

pub use gl_context::{GlContext, GlEnum, GlName, GL_NO_ERROR, GL_OUT_OF_MEMORY};
pub use object_manager::GlObjectManager;
pub use state::{StateDigest, VirtualGlState};
