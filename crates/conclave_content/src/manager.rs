/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `ContentManager`: owns the four per-document-kind channel servers
//! (event, media, command-buffer, XR-command — plus a frame-request
//! server, which needs an owner just the same even though nothing replies
//! on it), the hive daemon handle, and the `Vec<Arc<ContentRuntime>>` list,
//! modeled on `WebViewManager`'s id-keyed map plus auxiliary ordering state
//! (here: pre-warm reuse order, not focus order; see `webview_manager.rs`).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use conclave_channel::{
    CommandBufferChannel, CommandBufferChannelClient, EventChannel, EventChannelClient, FrameRequestChannel,
    FrameRequestChannelClient, MediaCommandChannel, MediaCommandChannelClient, XrCommandChannel,
    XrCommandChannelClient,
};
use conclave_hive::{HiveDaemon, HiveStartupConfig, XrStartupConfig};
use conclave_messages::{
    DocumentEvent, DocumentEventType, DocumentId, DocumentIdGenerator, DocumentRequestInit, EventMessage, HiveEvent,
    LogLevel, MediaEvent, RpcResponse, SessionId, XrCommand, XrResponse,
};
use conclave_scheduler::Scheduler;
use conclave_xr::{BaseLayer, XrDevice};
use log::{info, warn};
use parking_lot::RwLock;

use crate::error::{ContentError, Result};
use crate::runtime::{ContentRuntime, RuntimeState};
use crate::snapshot::{ContentSnapshot, RuntimeSnapshot};

/// The host-configuration keys this layer needs at startup.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    pub application_cache_directory: PathBuf,
    pub https_proxy_server: Option<String>,
    pub enable_v8_profiling: bool,
    /// Off by default; §4.5's "keep one pre-warmed runtime" behaviour.
    pub prewarm_enabled: bool,
    pub prewarm_delay: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            application_cache_directory: PathBuf::from("."),
            https_proxy_server: None,
            enable_v8_profiling: false,
            prewarm_enabled: false,
            prewarm_delay: Duration::from_secs(3),
        }
    }
}

/// Parameters for `ContentManager::open`, mirroring `DocumentRequestInit`
/// minus the id and url the manager assigns itself.
#[derive(Clone, Debug, Default)]
pub struct OpenInit {
    pub disable_cache: bool,
    pub is_preview: bool,
    pub run_scripts: bool,
}

const HIVE_READY_TIMEOUT: Duration = Duration::from_secs(5);
const HIVE_READY_POLL: Duration = Duration::from_millis(20);

pub struct ContentManager {
    runtimes: Arc<RwLock<Vec<Arc<ContentRuntime>>>>,
    hive: RwLock<HiveDaemon>,
    xr_device: Arc<XrDevice>,
    scheduler: Arc<Scheduler>,
    document_ids: DocumentIdGenerator,
    config: ManagerConfig,
    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    last_close: RwLock<Option<Instant>>,
    start_time: Instant,
}

impl ContentManager {
    /// Launches the hive daemon, binds every channel server, and starts
    /// the per-channel accept/drain threads.
    pub fn new(
        daemon_path: &Path,
        config: ManagerConfig,
        xr_device: Arc<XrDevice>,
        scheduler: Arc<Scheduler>,
    ) -> Result<Self> {
        let event_server = EventChannel::listen()?;
        let frame_request_server = FrameRequestChannel::listen()?;
        let command_buffer_server = CommandBufferChannel::listen()?;
        let media_server = MediaCommandChannel::listen()?;
        let xr_server = XrCommandChannel::listen()?;

        let hive_config = HiveStartupConfig {
            application_cache_directory: config.application_cache_directory.clone(),
            https_proxy_server: config.https_proxy_server.clone(),
            enable_v8_profiling: config.enable_v8_profiling,
            event_port: event_server.port(),
            frame_request_port: frame_request_server.port(),
            media_command_port: media_server.port(),
            command_buffer_port: command_buffer_server.port(),
            hive_command_port: 0, // filled in by `HiveDaemon::spawn` itself
            xr_command_port: xr_server.port(),
            xr: Some(XrStartupConfig {
                stereo_mode: xr_device.stereo_mode(),
                zones_directory: config.application_cache_directory.join("zones"),
            }),
        };

        let mut hive = HiveDaemon::spawn(daemon_path, &hive_config)?;
        wait_for_server_ready(&mut hive)?;

        let runtimes: Arc<RwLock<Vec<Arc<ContentRuntime>>>> = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut threads = Vec::new();
        threads.push(spawn_event_thread(event_server, Arc::clone(&runtimes), Arc::clone(&shutdown)));
        threads.push(spawn_frame_request_thread(frame_request_server, Arc::clone(&runtimes), Arc::clone(&shutdown)));
        threads.push(spawn_command_buffer_thread(
            command_buffer_server,
            Arc::clone(&runtimes),
            Arc::clone(&scheduler),
            Arc::clone(&shutdown),
        ));
        threads.push(spawn_media_thread(media_server, Arc::clone(&runtimes), Arc::clone(&shutdown)));
        threads.push(spawn_xr_thread(xr_server, Arc::clone(&runtimes), Arc::clone(&xr_device), Arc::clone(&shutdown)));

        Ok(Self {
            runtimes,
            hive: RwLock::new(hive),
            xr_device,
            scheduler,
            document_ids: DocumentIdGenerator::new(),
            config,
            shutdown,
            threads,
            last_close: RwLock::new(None),
            start_time: Instant::now(),
        })
    }

    /// Opens `url` as a new document: reuses an idle pre-warmed runtime if
    /// one is ready, otherwise allocates a fresh one and asks the hive to
    /// fork a process for it.
    pub fn open(&self, url: impl Into<String>, init: OpenInit) -> DocumentId {
        let url = url.into();
        let document_id = self.document_ids.next();

        if let Some(runtime) = self.find_idle_prewarmed() {
            let prewarm_id = runtime.document_id();
            runtime.bind(document_id, url.clone(), init.disable_cache, init.is_preview, init.run_scripts);
            self.scheduler.remove_document(prewarm_id);
            self.scheduler.register_document(document_id);
            let request = DocumentRequestInit {
                id: document_id,
                url,
                disable_cache: init.disable_cache,
                is_preview: init.is_preview,
                run_scripts: init.run_scripts,
            };
            if let Some(client) = runtime.event_client.lock().as_ref() {
                if let Err(e) = client.send(document_id, EventMessage::DocumentRequest(request)) {
                    warn!("failed to navigate pre-warmed runtime: {e}");
                    runtime.flag_destroy();
                    return DocumentId::INVALID;
                }
            }
            return document_id;
        }

        let runtime = ContentRuntime::new(document_id);
        runtime.bind(document_id, url.clone(), init.disable_cache, init.is_preview, init.run_scripts);
        runtime.set_state(RuntimeState::PreStarting);
        self.runtimes.write().push(Arc::clone(&runtime));
        self.scheduler.register_document(document_id);

        let mut hive = self.hive.write();
        if let Err(e) = hive.request_create_client(document_id, url, init.disable_cache, init.is_preview, init.run_scripts) {
            warn!("failed to ask the hive to create a client: {e}");
            runtime.flag_destroy();
            return DocumentId::INVALID;
        }
        document_id
    }

    /// Closes a document: two-phase — flags the runtime and asks the hive
    /// to terminate the process; the runtime itself is reaped on the next
    /// `tick`.
    pub fn close(&self, document_id: DocumentId) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        runtime.flag_destroy();
        let mut hive = self.hive.write();
        let _ = hive.request_terminate_client(document_id);
        *self.last_close.write() = Some(Instant::now());
        true
    }

    pub fn pause(&self, document_id: DocumentId) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        if matches!(runtime.state(), RuntimeState::Disposing | RuntimeState::Destroyed) {
            return false;
        }
        runtime.set_state(RuntimeState::Paused);
        true
    }

    pub fn resume(&self, document_id: DocumentId) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        if !matches!(runtime.state(), RuntimeState::Paused) {
            return false;
        }
        runtime.set_state(RuntimeState::Started);
        true
    }

    /// `DocumentId`s of every runtime currently eligible for a scheduler
    /// tick this render frame: started, not paused.
    pub fn active_document_ids(&self) -> Vec<DocumentId> {
        self.runtimes
            .read()
            .iter()
            .filter(|r| r.state() == RuntimeState::Started)
            .map(|r| r.document_id())
            .collect()
    }

    pub fn find(&self, document_id: DocumentId) -> Option<Arc<ContentRuntime>> {
        self.runtimes.read().iter().find(|r| r.document_id() == document_id).cloned()
    }

    fn find_idle_prewarmed(&self) -> Option<Arc<ContentRuntime>> {
        self.runtimes
            .read()
            .iter()
            .find(|r| r.state() == RuntimeState::Started && r.is_unused())
            .cloned()
    }

    /// Backs `getCollisionBoxByDocumentId`: reports the first XR session
    /// the document has open. A document may hold more than one session,
    /// but the host API only ever asks for a document's collision box as a
    /// whole, so the first live session stands in for all of them.
    pub fn collision_box(&self, document_id: DocumentId) -> Option<([f32; 3], [f32; 3])> {
        let runtime = self.find(document_id)?;
        runtime.sessions().first().map(|s| s.collision_box())
    }

    pub fn update_local_transform_by_document_id(&self, document_id: DocumentId, m: conclave_zone::Mat4) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        for session in runtime.sessions() {
            session.set_local_base_matrix(m);
        }
        true
    }

    /// One host-tick's worth of non-GL bookkeeping: service the hive,
    /// surface lifecycle events, sweep flagged runtimes, and maintain the
    /// pre-warm slot. The GL replay itself
    /// (`conclave_scheduler::Scheduler::tick`) is driven separately by the
    /// `conclave` crate's host loop over `active_document_ids()`.
    pub fn tick(&self) -> Vec<DocumentEvent> {
        self.tick_hive();
        let mut lifecycle_events = Vec::new();
        for runtime in self.runtimes.read().iter() {
            if runtime.state() == RuntimeState::PreStarting && runtime.all_channels_wired() {
                runtime.set_state(RuntimeState::Started);
            }
            let frustum = self.xr_device.frustum();
            for session in runtime.sessions() {
                session.update_visibility(frustum.as_ref());
                session.commit();
            }
            lifecycle_events.extend(runtime.drain_document_events());
        }
        self.sweep_destroyed();
        self.maybe_prewarm();
        lifecycle_events
    }

    fn tick_hive(&self) {
        let mut hive = self.hive.write();
        if !hive.is_alive() {
            warn!("hive daemon exited; flagging every live runtime for destruction");
            for runtime in self.runtimes.read().iter() {
                runtime.flag_destroy();
            }
            return;
        }
        for event in hive.poll_events() {
            match event {
                HiveEvent::OnServerReady => {}
                HiveEvent::CreateClientResponse { document_id, pid } => match pid {
                    Some(pid) => {
                        if let Some(runtime) = self.find(document_id) {
                            runtime.set_pid(pid);
                        }
                    }
                    None => {
                        if let Some(runtime) = self.find(document_id) {
                            warn!("hive refused to create a process for {document_id}");
                            runtime.flag_destroy();
                        }
                    }
                },
                HiveEvent::TerminateClientResponse { document_id, found } => {
                    if !found {
                        warn!("hive had no process to terminate for {document_id}");
                    }
                }
                HiveEvent::OnExit { document_id, exit_code } => {
                    if let Some(runtime) = self.find(document_id) {
                        // `Loaded` is the document-emitted startup milestone
                        // (spec §4.6/S1); a process exit is never one, clean
                        // or not. Report `Closed` for a clean exit and
                        // `Crashed` otherwise — the runtime transition to
                        // `Disposing` is what actually drives teardown.
                        runtime.push_document_event(DocumentEvent {
                            document_id,
                            event_type: if exit_code == 0 {
                                DocumentEventType::Closed
                            } else {
                                DocumentEventType::Crashed
                            },
                        });
                        runtime.flag_destroy();
                    }
                }
                HiveEvent::OnLogEntry { document_id, pid, level, text, .. } => {
                    let target = format!("document[{document_id}]@{pid}");
                    match level {
                        LogLevel::Debug => log::debug!(target: "conclave_content::document", "{target}: {text}"),
                        LogLevel::Info => log::info!(target: "conclave_content::document", "{target}: {text}"),
                        LogLevel::Warn => log::warn!(target: "conclave_content::document", "{target}: {text}"),
                        LogLevel::Error => log::error!(target: "conclave_content::document", "{target}: {text}"),
                    }
                }
            }
        }
    }

    /// Two-phase destruction's second phase: runs under the list's unique
    /// lock, removing every runtime flagged since the last tick.
    fn sweep_destroyed(&self) {
        let mut runtimes = self.runtimes.write();
        runtimes.retain(|runtime| {
            if runtime.should_destroy() {
                for session in runtime.sessions() {
                    self.xr_device.end_session(session.session_id);
                }
                self.scheduler.remove_document(runtime.document_id());
                runtime.set_state(RuntimeState::Destroyed);
                false
            } else {
                true
            }
        });
        self.xr_device.reap_dead_sessions();
    }

    /// Part of the per-frame tick: if enabled and no unused runtime exists,
    /// fork one `prewarm_delay` after the last close.
    fn maybe_prewarm(&self) {
        if !self.config.prewarm_enabled {
            return;
        }
        if self.find_idle_prewarmed().is_some() {
            return;
        }
        let ready = match *self.last_close.read() {
            Some(last) => last.elapsed() >= self.config.prewarm_delay,
            None => true,
        };
        if !ready {
            return;
        }
        let document_id = self.document_ids.next();
        let runtime = ContentRuntime::new(document_id);
        runtime.reset_as_prewarm(document_id);
        runtime.set_state(RuntimeState::PreStarting);
        self.runtimes.write().push(Arc::clone(&runtime));
        self.scheduler.register_document(document_id);
        let mut hive = self.hive.write();
        if let Err(e) = hive.request_create_client(document_id, "about:blank".into(), false, false, true) {
            warn!("failed to pre-warm a runtime: {e}");
            runtime.flag_destroy();
        }
        *self.last_close.write() = Some(Instant::now() + self.config.prewarm_delay);
    }

    /// `getEvent`/`getEventData`-backing primitive: pops the oldest
    /// pending `RpcRequest` across every started runtime.
    pub fn poll_rpc_request(&self) -> Option<conclave_messages::RpcRequest> {
        for runtime in self.runtimes.read().iter() {
            if let Some(request) = runtime.pop_rpc_request() {
                return Some(request);
            }
        }
        None
    }

    pub fn reply_rpc(&self, document_id: DocumentId, response: RpcResponse) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        let guard = runtime.event_client.lock();
        match guard.as_ref() {
            Some(client) => client.send(document_id, EventMessage::RpcResponse(response)).is_ok(),
            None => false,
        }
    }

    /// `dispatchNativeEvent(type, detail)` (spec §6): pushes one
    /// host-to-document notification on the event channel, outside the
    /// request/response RPC flow.
    pub fn dispatch_native_event(&self, document_id: DocumentId, event_type: impl Into<String>, detail: serde_json::Value) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        let guard = runtime.event_client.lock();
        match guard.as_ref() {
            Some(client) => client
                .send(
                    document_id,
                    EventMessage::NativeEvent(conclave_messages::NativeEvent { event_type: event_type.into(), detail }),
                )
                .is_ok(),
            None => false,
        }
    }

    pub fn send_media_event(&self, document_id: DocumentId, event: MediaEvent) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        let guard = runtime.media_client.lock();
        match guard.as_ref() {
            Some(client) => client.send(document_id, event).is_ok(),
            None => false,
        }
    }

    /// Notifies one document that a new animation (or XR) frame is
    /// available to draw (§4.2 `FrameRequestChannel`). Driven once per host
    /// tick by the `conclave` crate's render loop, for every started and
    /// unpaused runtime.
    pub fn send_frame_request(&self, document_id: DocumentId, message: conclave_messages::FrameRequestMessage) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        let guard = runtime.frame_request_client.lock();
        match guard.as_ref() {
            Some(client) => client.send(document_id, message).is_ok(),
            None => false,
        }
    }

    /// Sends a query command's result back on the command-buffer channel,
    /// echoing the request's message id so the document can correlate it
    /// (spec §3 "Query variants ... require a paired Response message").
    pub fn reply_command_buffer(
        &self,
        document_id: DocumentId,
        message_id: conclave_messages::MessageId,
        response: conclave_messages::GlResponse,
    ) -> bool {
        let Some(runtime) = self.find(document_id) else {
            return false;
        };
        let guard = runtime.command_buffer_client.lock();
        match guard.as_ref() {
            Some(client) => client.reply(message_id, document_id, response).is_ok(),
            None => false,
        }
    }

    pub fn poll_media_commands(&self, document_id: DocumentId) -> Vec<conclave_messages::MediaCommand> {
        self.find(document_id).map(|r| r.drain_media_commands()).unwrap_or_default()
    }

    /// Backs the out-of-scope inspector's `/contents` endpoint.
    pub fn snapshot(&self, version: impl Into<String>) -> RuntimeSnapshot {
        let contents = self
            .runtimes
            .read()
            .iter()
            .map(|r| ContentSnapshot {
                id: r.document_id(),
                pid: r.pid(),
                used: !r.is_unused(),
                url: r.url(),
                disable_cache: r.disable_cache(),
                devtools_frontend_url: String::new(),
                web_socket_debugger_url: String::new(),
            })
            .collect();
        RuntimeSnapshot {
            version: version.into(),
            uptime_seconds: self.start_time.elapsed().as_secs_f64(),
            contents,
        }
    }
}

impl Drop for ContentManager {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

fn wait_for_server_ready(hive: &mut HiveDaemon) -> Result<()> {
    let deadline = Instant::now() + HIVE_READY_TIMEOUT;
    loop {
        for event in hive.poll_events() {
            if matches!(event, HiveEvent::OnServerReady) {
                info!("hive daemon ready");
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            return Err(ContentError::Hive(conclave_hive::HiveError::NotConnected));
        }
        std::thread::sleep(HIVE_READY_POLL);
    }
}

const ACCEPT_POLL_MS: i64 = 100;

/// Attaches any staged (connected-but-not-yet-matched) clients to the
/// runtime waiting on that pid, returning the clients still unmatched.
fn match_staged<C>(
    staged: Vec<(u32, C)>,
    runtimes: &RwLock<Vec<Arc<ContentRuntime>>>,
    slot: impl Fn(&ContentRuntime) -> &parking_lot::Mutex<Option<C>>,
) -> Vec<(u32, C)> {
    let mut unmatched = Vec::new();
    for (pid, client) in staged {
        let runtimes_guard = runtimes.read();
        match runtimes_guard.iter().find(|r| r.pid() == Some(pid)) {
            Some(runtime) => *slot(runtime).lock() = Some(client),
            None => unmatched.push((pid, client)),
        }
    }
    unmatched
}

fn spawn_event_thread(
    server: EventChannel,
    runtimes: Arc<RwLock<Vec<Arc<ContentRuntime>>>>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut staged: Vec<(u32, EventChannelClient)> = Vec::new();
        while !shutdown.load(Ordering::Relaxed) {
            let _ = server.try_accept(ACCEPT_POLL_MS, |result| match result {
                Ok(client) => staged.push((client.peer_pid(), client)),
                Err(e) => warn!("event channel handshake failed: {e}"),
            });
            staged = match_staged(staged, &runtimes, |r| &r.event_client);

            for runtime in runtimes.read().iter() {
                let guard = runtime.event_client.lock();
                let Some(client) = guard.as_ref() else { continue };
                if !client.is_valid() {
                    drop(guard);
                    runtime.flag_destroy();
                    continue;
                }
                match client.try_recv_all() {
                    Ok(envelopes) => {
                        drop(guard);
                        for envelope in envelopes {
                            match envelope.body {
                                EventMessage::DocumentEvent(event) => runtime.push_document_event(event),
                                EventMessage::RpcRequest(request) => runtime.push_rpc_request(request),
                                EventMessage::DocumentRequest(_) | EventMessage::RpcResponse(_) | EventMessage::NativeEvent(_) => {
                                    warn!("document sent a host-to-document event message; dropping");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        drop(guard);
                        runtime.record_protocol_error();
                        warn!("event channel decode error: {e}");
                    }
                }
            }
        }
    })
}

fn spawn_frame_request_thread(
    server: FrameRequestChannel,
    runtimes: Arc<RwLock<Vec<Arc<ContentRuntime>>>>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut staged: Vec<(u32, FrameRequestChannelClient)> = Vec::new();
        while !shutdown.load(Ordering::Relaxed) {
            let _ = server.try_accept(ACCEPT_POLL_MS, |result| match result {
                Ok(client) => staged.push((client.peer_pid(), client)),
                Err(e) => warn!("frame-request channel handshake failed: {e}"),
            });
            staged = match_staged(staged, &runtimes, |r| &r.frame_request_client);

            // Host-to-document only; still drain to detect a dead peer.
            for runtime in runtimes.read().iter() {
                let guard = runtime.frame_request_client.lock();
                let Some(client) = guard.as_ref() else { continue };
                if !client.is_valid() {
                    drop(guard);
                    runtime.flag_destroy();
                    continue;
                }
                let _ = client.try_recv_all();
            }
        }
    })
}

fn spawn_command_buffer_thread(
    server: CommandBufferChannel,
    runtimes: Arc<RwLock<Vec<Arc<ContentRuntime>>>>,
    scheduler: Arc<Scheduler>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut staged: Vec<(u32, CommandBufferChannelClient)> = Vec::new();
        while !shutdown.load(Ordering::Relaxed) {
            let _ = server.try_accept(ACCEPT_POLL_MS, |result| match result {
                Ok(client) => staged.push((client.peer_pid(), client)),
                Err(e) => warn!("command-buffer channel handshake failed: {e}"),
            });
            staged = match_staged(staged, &runtimes, |r| &r.command_buffer_client);

            for runtime in runtimes.read().iter() {
                let guard = runtime.command_buffer_client.lock();
                let Some(client) = guard.as_ref() else { continue };
                if !client.is_valid() {
                    drop(guard);
                    runtime.flag_destroy();
                    continue;
                }
                match client.try_recv_all() {
                    Ok(envelopes) => {
                        drop(guard);
                        let document_id = runtime.document_id();
                        for envelope in envelopes {
                            if let Err(e) = scheduler.ingest(document_id, envelope.message_id, envelope.body) {
                                warn!("dropping command buffer for unknown document {document_id}: {e}");
                            }
                        }
                    }
                    Err(e) => {
                        drop(guard);
                        runtime.record_protocol_error();
                        warn!("command-buffer channel decode error: {e}");
                    }
                }
            }
        }
    })
}

fn spawn_media_thread(
    server: MediaCommandChannel,
    runtimes: Arc<RwLock<Vec<Arc<ContentRuntime>>>>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut staged: Vec<(u32, MediaCommandChannelClient)> = Vec::new();
        while !shutdown.load(Ordering::Relaxed) {
            let _ = server.try_accept(ACCEPT_POLL_MS, |result| match result {
                Ok(client) => staged.push((client.peer_pid(), client)),
                Err(e) => warn!("media channel handshake failed: {e}"),
            });
            staged = match_staged(staged, &runtimes, |r| &r.media_client);

            for runtime in runtimes.read().iter() {
                let guard = runtime.media_client.lock();
                let Some(client) = guard.as_ref() else { continue };
                if !client.is_valid() {
                    drop(guard);
                    runtime.flag_destroy();
                    continue;
                }
                match client.try_recv_all() {
                    Ok(envelopes) => {
                        drop(guard);
                        for envelope in envelopes {
                            runtime.push_media_command(envelope.body);
                        }
                    }
                    Err(e) => {
                        drop(guard);
                        runtime.record_protocol_error();
                        warn!("media channel decode error: {e}");
                    }
                }
            }
        }
    })
}

fn spawn_xr_thread(
    server: XrCommandChannel,
    runtimes: Arc<RwLock<Vec<Arc<ContentRuntime>>>>,
    xr_device: Arc<XrDevice>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut staged: Vec<(u32, XrCommandChannelClient)> = Vec::new();
        while !shutdown.load(Ordering::Relaxed) {
            let _ = server.try_accept(ACCEPT_POLL_MS, |result| match result {
                Ok(client) => staged.push((client.peer_pid(), client)),
                Err(e) => warn!("XR command channel handshake failed: {e}"),
            });
            staged = match_staged(staged, &runtimes, |r| &r.xr_client);

            for runtime in runtimes.read().iter() {
                let guard = runtime.xr_client.lock();
                let Some(client) = guard.as_ref() else { continue };
                if !client.is_valid() {
                    drop(guard);
                    runtime.flag_destroy();
                    continue;
                }
                match client.try_recv_all() {
                    Ok(envelopes) => {
                        for envelope in envelopes {
                            let response = dispatch_xr_command(&xr_device, runtime, envelope.body);
                            if let Err(e) = client.reply(envelope.message_id, runtime.document_id(), response) {
                                warn!("failed to reply on XR command channel: {e}");
                            }
                        }
                    }
                    Err(e) => {
                        runtime.record_protocol_error();
                        warn!("XR command channel decode error: {e}");
                    }
                }
            }
        }
    })
}

/// §4.4 "XR command dispatch": every request is handled synchronously
/// against the shared `XrDevice`, with session ownership recorded on the
/// requesting runtime.
fn dispatch_xr_command(xr_device: &XrDevice, runtime: &ContentRuntime, command: XrCommand) -> XrResponse {
    match command {
        XrCommand::IsSessionSupported { mode } => XrResponse::SessionSupported(xr_device.is_session_supported(mode)),
        XrCommand::RequestSession { mode } => match xr_device.request_session(mode) {
            Ok(session) => {
                let session_id = session.session_id;
                runtime.add_session(session);
                XrResponse::SessionCreated(session_id)
            }
            Err(e) => {
                warn!("session request refused: {e}");
                XrResponse::SessionCreated(SessionId::INVALID)
            }
        },
        XrCommand::EndSession { session_id } => {
            xr_device.end_session(session_id);
            runtime.remove_session(session_id);
            XrResponse::Ack
        }
        XrCommand::UpdateBaseLayer { session_id, framebuffer_width, framebuffer_height, depth_near, depth_far } => {
            match runtime.session(session_id) {
                Some(session) => session.set_base_layer(BaseLayer {
                    framebuffer_width,
                    framebuffer_height,
                    depth_near,
                    depth_far,
                }),
                None => warn!("UpdateBaseLayer for unknown session {session_id} on document {}", runtime.document_id()),
            }
            XrResponse::Ack
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use std::io::Write;

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

    fn xr_device(dir: &Path) -> Arc<XrDevice> {
        Arc::new(XrDevice::new(dir.join("zones")).expect("device"))
    }

    #[test]
    #[cfg(unix)]
    fn a_stub_daemon_that_never_connects_fails_construction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let daemon_path = dir.path().join("stub-daemon.sh");
        write_stub_daemon(&daemon_path);

        let device = xr_device(dir.path());
        let scheduler = Arc::new(Scheduler::new(Arc::clone(&device), None, 1));
        let config = ManagerConfig {
            application_cache_directory: dir.path().to_path_buf(),
            ..Default::default()
        };
        let result = ContentManager::new(&daemon_path, config, device, scheduler);
        assert!(result.is_err());
    }
}
