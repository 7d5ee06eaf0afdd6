/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Installs the document/daemon executable under `runtimeDirectory`,
//! reinstalling only when its `.md5` sidecar is missing, mismatched, or the
//! installed file lost its executable bit (spec §6 "Persisted state on
//! disk").

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::error::{HiveError, Result};

fn sidecar_path(dest: &Path) -> PathBuf {
    let mut path = dest.as_os_str().to_owned();
    path.push(".md5");
    PathBuf::from(path)
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o111 != 0)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> io::Result<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Copies `src` to `dest` and writes/refreshes `dest`'s `.md5` sidecar iff
/// the sidecar is stale or the installed file isn't executable. Returns
/// the path documents/the daemon should be `exec`'d from (`dest`).
pub fn ensure_installed(src: &Path, dest: &Path) -> Result<PathBuf> {
    let content = fs::read(src).map_err(|e| HiveError::Install(dest.to_path_buf(), e))?;
    let fresh_digest = hex_digest(&content);
    let sidecar = sidecar_path(dest);

    let needs_install = match fs::read_to_string(&sidecar) {
        Ok(installed_digest) => {
            installed_digest.trim() != fresh_digest || !is_executable(dest).unwrap_or(false)
        }
        Err(_) => true,
    };

    if needs_install {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| HiveError::Install(dest.to_path_buf(), e))?;
        }
        fs::write(dest, &content).map_err(|e| HiveError::Install(dest.to_path_buf(), e))?;
        mark_executable(dest).map_err(|e| HiveError::Install(dest.to_path_buf(), e))?;
        fs::write(&sidecar, &fresh_digest).map_err(|e| HiveError::Install(dest.to_path_buf(), e))?;
    }
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reinstalls_when_sidecar_is_missing_and_not_on_the_second_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src-bin");
        let dest = dir.path().join("installed/bin");
        fs::write(&src, b"executable bytes v1").expect("write src");

        ensure_installed(&src, &dest).expect("install once");
        let sidecar_mtime_1 = fs::metadata(sidecar_path(&dest)).expect("sidecar").modified().expect("mtime");

        ensure_installed(&src, &dest).expect("install again");
        let sidecar_mtime_2 = fs::metadata(sidecar_path(&dest)).expect("sidecar").modified().expect("mtime");
        assert_eq!(sidecar_mtime_1, sidecar_mtime_2);
        assert_eq!(fs::read(&dest).expect("dest"), b"executable bytes v1");
    }

    #[test]
    fn reinstalls_when_source_content_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src-bin");
        let dest = dir.path().join("installed/bin");
        fs::write(&src, b"v1").expect("write src");
        ensure_installed(&src, &dest).expect("install v1");

        fs::write(&src, b"v2, a longer payload").expect("write src v2");
        ensure_installed(&src, &dest).expect("install v2");
        assert_eq!(fs::read(&dest).expect("dest"), b"v2, a longer payload");
    }
}
