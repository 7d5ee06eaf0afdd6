/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L2: mmap-backed single-writer/multi-reader publication of a fixed-size
//! struct between the host and one document.
//!
//! There is no lock (§3 invariants, §5 "shared-resource policy"). The host
//! is the sole writer and commits a whole struct at once with `syncData`;
//! the document reads directly from the mapping. This crate is the one
//! place in the workspace where that "whole-struct memcpy" commit is done
//! with a raw pointer, since `memmap2`'s safe API hands back `&[u8]`/`&mut
//! [u8]`, not a typed view.

#![allow(unsafe_code)]

mod data;
mod error;

pub use data::{
    DeviceContextZone, HandJoint, InputSourceKind, InputSourceSlot, InputSourcesZone, Mat4,
    SessionContextZone, XrView, MAX_INPUT_SOURCES, NUM_HAND_JOINTS,
};
pub use error::{Result, ZoneError};

use std::fs::{File, OpenOptions};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

/// Server (writer) half of a zone. Owns a process-local staging value and
/// commits it to the mapping with `sync_data`. Not `Sync`: only the host's
/// single render thread is expected to touch it (§5).
pub struct ZoneServer<T: Copy> {
    path: PathBuf,
    mmap: MmapMut,
    staging: T,
    _marker: PhantomData<T>,
}

impl<T: Copy> ZoneServer<T> {
    /// Creates (or truncates) the backing file at `path`, sized to exactly
    /// fit `T`, and maps it writable. `initial` becomes both the first
    /// committed value and the staging value returned by `staging_mut`.
    pub fn create(path: impl AsRef<Path>, initial: T) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ZoneError::Create(path.clone(), e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| ZoneError::Create(path.clone(), e))?;
        file.set_len(std::mem::size_of::<T>() as u64)
            .map_err(|e| ZoneError::Create(path.clone(), e))?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file) }
            .map_err(|e| ZoneError::Create(path.clone(), e))?;
        let mut zone = Self {
            path,
            mmap,
            staging: initial,
            _marker: PhantomData,
        };
        zone.sync_data();
        Ok(zone)
    }

    /// The filename published to documents via the channel that created
    /// this zone (§4.3).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mutable access to the staging value. Changes are invisible to
    /// readers until `sync_data` is called.
    pub fn staging_mut(&mut self) -> &mut T {
        &mut self.staging
    }

    pub fn staging(&self) -> &T {
        &self.staging
    }

    /// Commits the staging value to the mapping as one atomic-looking
    /// memcpy from the reader's point of view (no partial-write ordering
    /// is guaranteed across the copy, matching the source's "no lock"
    /// design — see `conclave`'s DESIGN.md for the open question about
    /// strengthening this with a sequence counter).
    pub fn sync_data(&mut self) {
        let bytes = unsafe {
            std::slice::from_raw_parts(
                &self.staging as *const T as *const u8,
                std::mem::size_of::<T>(),
            )
        };
        self.mmap[..bytes.len()].copy_from_slice(bytes);
    }
}

/// Client (reader) half of a zone. Opened by a document against the
/// filename it was told about over a channel.
pub struct ZoneClient<T: Copy> {
    mmap: memmap2::Mmap,
    _marker: PhantomData<T>,
}

impl<T: Copy> ZoneClient<T> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ZoneError::Open(path.to_path_buf(), e))?;
        let mmap =
            unsafe { memmap2::Mmap::map(&file) }.map_err(|e| ZoneError::Open(path.to_path_buf(), e))?;
        if mmap.len() < std::mem::size_of::<T>() {
            return Err(ZoneError::SizeMismatch {
                expected: std::mem::size_of::<T>(),
                actual: mmap.len(),
            });
        }
        Ok(Self {
            mmap,
            _marker: PhantomData,
        })
    }

    /// Snapshots the current contents of the mapping by value. Readers get
    /// whatever the host last committed; there is no guarantee of reading
    /// a torn write mid-`sync_data`, which the zone design accepts (§3).
    pub fn read(&self) -> T {
        unsafe { std::ptr::read_unaligned(self.mmap.as_ptr() as *const T) }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq)]
    #[repr(C)]
    struct Point {
        x: f32,
        y: f32,
        generation: u32,
    }

    #[test]
    fn client_reads_last_committed_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("point.zone");
        let mut server = ZoneServer::create(
            &path,
            Point {
                x: 0.0,
                y: 0.0,
                generation: 0,
            },
        )
        .expect("create");
        let client = ZoneClient::<Point>::open(&path).expect("open");
        assert_eq!(
            client.read(),
            Point {
                x: 0.0,
                y: 0.0,
                generation: 0
            }
        );

        server.staging_mut().x = 1.5;
        server.staging_mut().generation = 1;
        // Not committed yet.
        assert_eq!(client.read().generation, 0);

        server.sync_data();
        let observed = client.read();
        assert_eq!(observed.x, 1.5);
        assert_eq!(observed.generation, 1);
    }

    #[test]
    fn open_rejects_undersized_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("too_small.zone");
        std::fs::write(&path, [0u8; 2]).expect("write");
        let result = ZoneClient::<Point>::open(&path);
        assert!(matches!(result, Err(ZoneError::SizeMismatch { .. })));
    }
}
