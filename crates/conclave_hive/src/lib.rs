/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! L5: the hive daemon supervisor. The hive is the sole path by which a
//! per-document client process comes into existence (spec §4.6) — the host
//! never forks a document directly, it asks the hive to over
//! `HiveCommandChannel`.

#![deny(unsafe_code)]

mod daemon;
mod error;
mod install;

pub use daemon::{HiveDaemon, HiveStartupConfig};
pub use error::{HiveError, Result};
pub use install::ensure_installed;

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_stub_daemon(path: &std::path::Path) {
        let script = "#!/bin/sh\nwhile true; do sleep 3600; done\n";
        fs::write(path, script).expect("write stub");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path).expect("metadata").permissions();
            perms.set_mode(perms.mode() | 0o755);
            fs::set_permissions(path, perms).expect("chmod");
        }
    }

    #[test]
    #[cfg(unix)]
    fn spawning_a_daemon_that_never_connects_times_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stub-daemon.sh");
        write_stub_daemon(&path);

        let config = HiveStartupConfig {
            application_cache_directory: dir.path().to_path_buf(),
            https_proxy_server: None,
            enable_v8_profiling: false,
            event_port: 0,
            frame_request_port: 0,
            media_command_port: 0,
            command_buffer_port: 0,
            hive_command_port: 0,
            xr_command_port: 0,
            xr: None,
        };
        let result = daemon::HiveDaemon::spawn(&path, &config);
        assert!(result.is_err(), "stub daemon never connects back, spawn should time out");
    }

    #[test]
    fn ensure_installed_round_trips_through_the_sidecar() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("payload");
        let mut file = fs::File::create(&src).expect("create src");
        file.write_all(b"daemon binary bytes").expect("write src");
        drop(file);

        let dest = dir.path().join("runtime/daemon");
        let installed = ensure_installed(&src, &dest).expect("install");
        assert_eq!(installed, dest);
        assert_eq!(fs::read(&dest).expect("read dest"), b"daemon binary bytes");
    }
}
