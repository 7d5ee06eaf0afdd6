/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Host-API-level integration tests that don't need a live document
//! process, following the per-crate `tests/` convention used for
//! cross-component properties elsewhere in the workspace.

use std::fs;
use std::path::Path;

use conclave::{Host, OpenInit};
use conclave_messages::DocumentId;

fn write_stub_daemon(path: &Path) {
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

fn startup_config(cache_dir: &Path) -> String {
    format!(
        r#"{{"application_cache_directory": {:?}, "https_proxy_server": null, "is_xr_supported": true, "enable_v8_profiling": false}}"#,
        cache_dir.to_string_lossy()
    )
}

#[test]
#[cfg(unix)]
fn host_construction_fails_fast_when_the_daemon_never_comes_up() {
    let dir = tempfile::tempdir().expect("tempdir");
    let daemon_path = dir.path().join("stub-daemon.sh");
    write_stub_daemon(&daemon_path);

    let result = Host::new(&daemon_path, &startup_config(dir.path()));
    assert!(result.is_err(), "a daemon that never connects back should not produce a usable Host");
}

#[test]
fn malformed_startup_config_is_rejected_before_anything_is_spawned() {
    let dir = tempfile::tempdir().expect("tempdir");
    let daemon_path = dir.path().join("daemon-that-is-never-run");
    let result = Host::new(&daemon_path, "{}");
    assert!(result.is_err(), "a config missing required keys should fail to parse, not panic");
}

#[test]
fn open_init_defaults_run_scripts_to_false() {
    // `OpenInit::default()` is what `open(url, init)` falls back to when an
    // embedder only cares about the url; matches `DocumentRequestInit`'s own
    // conservative default of not executing scripts until asked.
    let init = OpenInit::default();
    assert!(!init.run_scripts);
    assert!(!init.disable_cache);
    assert!(!init.is_preview);
}

#[test]
fn document_id_invalid_is_the_open_failure_sentinel() {
    assert_eq!(DocumentId::INVALID, DocumentId(0));
    assert!(!DocumentId::INVALID.is_valid());
}
