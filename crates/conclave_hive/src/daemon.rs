/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `HiveDaemon`: the host's handle to the forked hive process, the sole
//! path by which per-document client processes come into existence (spec
//! §4.6, L5). Bookkeeping mirrors `process_manager.rs`'s
//! `Process`/`ProcessManager` pair, generalized from "one list, one
//! `crossbeam_channel::Select`" to "one daemon, one drain thread feeding a
//! bounded event queue" since there is exactly one hive per host instance.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use conclave_channel::{HiveCommandChannel, HiveCommandChannelClient};
use conclave_messages::{DocumentId, HiveCommand, HiveEvent};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::error::{HiveError, Result};

/// The subset of `HostConfig` (SPEC_FULL §6) the daemon needs at startup.
/// Sent as a single JSON blob on the command line, matching
/// `servo_config::opts`'s "parsed-once options" split.
#[derive(Clone, Debug, Serialize)]
pub struct HiveStartupConfig {
    pub application_cache_directory: PathBuf,
    pub https_proxy_server: Option<String>,
    pub enable_v8_profiling: bool,
    /// Every channel port a freshly forked document process needs to dial
    /// back into (spec §4.6 "the host passes a JSON blob with every
    /// channel port"). `hive_command_port` is also implied by the
    /// `--hive-port` argument; it is repeated here so the whole startup
    /// picture lives in one serialized blob.
    pub event_port: u16,
    pub frame_request_port: u16,
    pub media_command_port: u16,
    pub command_buffer_port: u16,
    pub hive_command_port: u16,
    pub xr_command_port: u16,
    pub xr: Option<XrStartupConfig>,
}

/// XR configuration forwarded to newly forked documents (spec §4.6).
#[derive(Clone, Debug, Serialize)]
pub struct XrStartupConfig {
    pub stereo_mode: conclave_messages::StereoRenderingMode,
    pub zones_directory: PathBuf,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const ACCEPT_POLL_MS: i64 = 50;

pub struct HiveDaemon {
    child: Child,
    client: Arc<HiveCommandChannelClient>,
    events: Receiver<HiveEvent>,
    shutdown: Arc<AtomicBool>,
    drain_thread: Option<JoinHandle<()>>,
    tail_threads: Vec<JoinHandle<()>>,
}

impl HiveDaemon {
    /// Spawns `daemon_path` with the command channel's port on its command
    /// line, blocks (bounded by `CONNECT_TIMEOUT`) until it connects back,
    /// and starts the tail/drain threads.
    pub fn spawn(daemon_path: &std::path::Path, config: &HiveStartupConfig) -> Result<Self> {
        let channel = HiveCommandChannel::listen()?;
        let config_json = serde_json::to_string(config)?;

        let mut child = Command::new(daemon_path)
            .arg("--hive-port")
            .arg(channel.port().to_string())
            .arg("--config")
            .arg(&config_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HiveError::Spawn(daemon_path.to_path_buf(), e))?;

        let mut tail_threads = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            tail_threads.push(spawn_tail_thread(stdout, log::Level::Debug));
        }
        if let Some(stderr) = child.stderr.take() {
            tail_threads.push(spawn_tail_thread(stderr, log::Level::Warn));
        }

        let client = Arc::new(accept_within(&channel, CONNECT_TIMEOUT)?);

        let (tx, rx) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let drain_thread = Some(spawn_drain_thread(Arc::clone(&client), tx, Arc::clone(&shutdown)));

        Ok(Self {
            child,
            client,
            events: rx,
            shutdown,
            drain_thread,
            tail_threads,
        })
    }

    /// Sends one command to the daemon; `document_id` is
    /// `DocumentId::INVALID` since this channel has exactly one peer.
    pub fn send_command(&self, command: HiveCommand) -> Result<()> {
        self.client.send(DocumentId::INVALID, command)?;
        Ok(())
    }

    pub fn request_create_client(
        &self,
        document_id: DocumentId,
        url: String,
        disable_cache: bool,
        is_preview: bool,
        run_scripts: bool,
    ) -> Result<()> {
        self.send_command(HiveCommand::CreateClient {
            document_id,
            url,
            disable_cache,
            is_preview,
            run_scripts,
        })
    }

    pub fn request_terminate_client(&self, document_id: DocumentId) -> Result<()> {
        self.send_command(HiveCommand::TerminateClient { document_id })
    }

    /// Non-blocking drain of every `HiveEvent` received since the last call.
    pub fn poll_events(&self) -> Vec<HiveEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for HiveDaemon {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.drain_thread.take() {
            let _ = handle.join();
        }
        for handle in self.tail_threads.drain(..) {
            let _ = handle.join();
        }
    }
}

fn accept_within(channel: &HiveCommandChannel, timeout: Duration) -> Result<HiveCommandChannelClient> {
    let deadline = Instant::now() + timeout;
    loop {
        let mut accepted = None;
        channel.try_accept(ACCEPT_POLL_MS, |result| accepted = Some(result))?;
        if let Some(result) = accepted {
            return result.map_err(HiveError::from);
        }
        if Instant::now() >= deadline {
            return Err(HiveError::NotConnected);
        }
    }
}

fn spawn_tail_thread(pipe: impl std::io::Read + Send + 'static, level: log::Level) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(pipe).lines().map_while(std::result::Result::ok) {
            log::log!(level, "hive daemon: {line}");
        }
    })
}

fn spawn_drain_thread(
    client: Arc<HiveCommandChannelClient>,
    tx: Sender<HiveEvent>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) && client.is_valid() {
            match client.try_recv(100) {
                Ok(Some(envelope)) => {
                    if tx.send(envelope.body).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(_) => break,
            }
        }
    })
}
