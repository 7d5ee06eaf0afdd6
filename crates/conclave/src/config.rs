/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The one startup JSON blob the embedder hands the host (spec §6
//! "Configuration intake"), plus `XRDeviceInit`, the payload of
//! `configureXrDevice`.

use std::path::PathBuf;

use conclave_messages::StereoRenderingMode;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct HostConfig {
    pub application_cache_directory: PathBuf,
    pub https_proxy_server: Option<String>,
    pub is_xr_supported: bool,
    pub enable_v8_profiling: bool,
}

/// Payload of `configureXrDevice` (spec §6).
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct XrDeviceInit {
    pub enabled: bool,
    pub active: bool,
    pub stereo_rendering_mode: StereoRenderingMode,
    pub recommended_fov: f32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn host_config_parses_from_json() {
        let json = r#"{
            "application_cache_directory": "/tmp/conclave",
            "https_proxy_server": null,
            "is_xr_supported": true,
            "enable_v8_profiling": false
        }"#;
        let config: HostConfig = serde_json::from_str(json).expect("parse");
        assert_eq!(config.application_cache_directory, PathBuf::from("/tmp/conclave"));
        assert!(config.is_xr_supported);
        assert!(config.https_proxy_server.is_none());
    }
}
