/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The embeddable XR content runtime's top-level crate: wires together the
//! transport, channel, zone, XR device, content manager, and scheduler
//! layers behind one `Host` struct and exposes the embedder-facing API
//! (spec §6).

#![deny(unsafe_code)]

mod config;
mod error;
mod host;

pub use conclave_content::OpenInit;
pub use conclave_gl::GlContext;
pub use conclave_xr::{Handedness, InputAction};
pub use conclave_zone::InputSourceKind;
pub use config::{HostConfig, XrDeviceInit};
pub use error::{HostApiError, Result};
pub use host::Host;

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use conclave_messages::StereoRenderingMode;

    use super::*;

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

    #[test]
    fn host_config_rejects_malformed_json() {
        let err = Host::new(Path::new("/nonexistent"), "not json").unwrap_err();
        assert!(matches!(err, HostApiError::Config(_)));
    }

    #[test]
    #[cfg(unix)]
    fn a_host_whose_daemon_never_connects_fails_construction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let daemon_path = dir.path().join("stub-daemon.sh");
        write_stub_daemon(&daemon_path);

        let config = format!(
            r#"{{"application_cache_directory": {:?}, "https_proxy_server": null, "is_xr_supported": true, "enable_v8_profiling": false}}"#,
            dir.path().to_string_lossy()
        );
        let result = Host::new(&daemon_path, &config);
        assert!(result.is_err());
    }

    #[test]
    fn configure_xr_device_is_gated_by_startup_support() {
        let dir = tempfile::tempdir().expect("tempdir");
        let xr_device = std::sync::Arc::new(conclave_xr::XrDevice::new(dir.path().join("zones")).expect("device"));
        // Exercises the same gating `Host::configure_xr_device` applies,
        // without needing a live hive daemon to construct a full `Host`.
        let xr_supported = false;
        let init = XrDeviceInit {
            enabled: true,
            active: true,
            stereo_rendering_mode: StereoRenderingMode::MultiPass,
            recommended_fov: 90.0,
        };
        xr_device.configure(init.enabled && xr_supported, init.active, init.stereo_rendering_mode, init.recommended_fov);
        assert!(!xr_device.enabled());
    }
}
