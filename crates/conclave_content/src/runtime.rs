/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `ContentRuntime`: the lifecycle state of one document process. Mutated
//! only on the host main loop and the channel watcher threads; destruction
//! is two-phase (`flag_destroy` then `ContentManager::sweep_destroyed`) so
//! the hot path never contends on the runtime list's unique lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use conclave_channel::{
    CommandBufferChannelClient, EventChannelClient, FrameRequestChannelClient, MediaCommandChannelClient,
    XrCommandChannelClient,
};
use conclave_messages::{DocumentEvent, DocumentId, MediaCommand, RpcRequest};
use conclave_xr::XrSession;
use parking_lot::Mutex;

/// `ContentRuntime`'s state machine.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RuntimeState {
    Allocated,
    PreStarting,
    Started,
    Paused,
    Disposing,
    Destroyed,
}

pub struct ContentRuntime {
    document_id: Mutex<DocumentId>,
    state: Mutex<RuntimeState>,
    pid: Mutex<Option<u32>>,
    url: Mutex<String>,
    disable_cache: AtomicBool,
    is_preview: AtomicBool,
    run_scripts: AtomicBool,
    /// False while this runtime is an idle pre-warmed slot; set the moment
    /// `open()` hands it a document.
    used: AtomicBool,
    should_destroy: AtomicBool,
    created_at: Instant,
    protocol_errors: AtomicU32,

    pub(crate) event_client: Mutex<Option<EventChannelClient>>,
    pub(crate) frame_request_client: Mutex<Option<FrameRequestChannelClient>>,
    pub(crate) command_buffer_client: Mutex<Option<CommandBufferChannelClient>>,
    pub(crate) media_client: Mutex<Option<MediaCommandChannelClient>>,
    pub(crate) xr_client: Mutex<Option<XrCommandChannelClient>>,

    document_events: Mutex<VecDeque<DocumentEvent>>,
    rpc_requests: Mutex<VecDeque<RpcRequest>>,
    media_commands: Mutex<VecDeque<MediaCommand>>,

    sessions: Mutex<Vec<Arc<XrSession>>>,
}

impl ContentRuntime {
    pub fn new(document_id: DocumentId) -> Arc<Self> {
        Arc::new(Self {
            document_id: Mutex::new(document_id),
            state: Mutex::new(RuntimeState::Allocated),
            pid: Mutex::new(None),
            url: Mutex::new(String::new()),
            disable_cache: AtomicBool::new(false),
            is_preview: AtomicBool::new(false),
            run_scripts: AtomicBool::new(true),
            used: AtomicBool::new(false),
            should_destroy: AtomicBool::new(false),
            created_at: Instant::now(),
            protocol_errors: AtomicU32::new(0),
            event_client: Mutex::new(None),
            frame_request_client: Mutex::new(None),
            command_buffer_client: Mutex::new(None),
            media_client: Mutex::new(None),
            xr_client: Mutex::new(None),
            document_events: Mutex::new(VecDeque::new()),
            rpc_requests: Mutex::new(VecDeque::new()),
            media_commands: Mutex::new(VecDeque::new()),
            sessions: Mutex::new(Vec::new()),
        })
    }

    pub fn document_id(&self) -> DocumentId {
        *self.document_id.lock()
    }

    pub fn state(&self) -> RuntimeState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: RuntimeState) {
        *self.state.lock() = state;
    }

    pub fn pid(&self) -> Option<u32> {
        *self.pid.lock()
    }

    pub fn set_pid(&self, pid: u32) {
        *self.pid.lock() = Some(pid);
    }

    pub fn url(&self) -> String {
        self.url.lock().clone()
    }

    pub fn disable_cache(&self) -> bool {
        self.disable_cache.load(Ordering::Relaxed)
    }

    pub fn is_preview(&self) -> bool {
        self.is_preview.load(Ordering::Relaxed)
    }

    pub fn run_scripts(&self) -> bool {
        self.run_scripts.load(Ordering::Relaxed)
    }

    pub fn is_unused(&self) -> bool {
        !self.used.load(Ordering::Relaxed)
    }

    /// Rebinds this runtime to a fresh document: reassigns its
    /// `DocumentId` and navigation parameters and marks it used. Used both
    /// for a brand-new runtime and for handing a pre-warmed one its first
    /// real document.
    pub fn bind(&self, document_id: DocumentId, url: String, disable_cache: bool, is_preview: bool, run_scripts: bool) {
        *self.document_id.lock() = document_id;
        *self.url.lock() = url;
        self.disable_cache.store(disable_cache, Ordering::Relaxed);
        self.is_preview.store(is_preview, Ordering::Relaxed);
        self.run_scripts.store(run_scripts, Ordering::Relaxed);
        self.used.store(true, Ordering::Relaxed);
    }

    /// Prepares a freshly allocated runtime as an idle pre-warmed slot: it
    /// gets a real `DocumentId` (the hive still needs one to fork against)
    /// but stays `is_unused()` until `open()` actually hands it a document.
    pub fn reset_as_prewarm(&self, document_id: DocumentId) {
        *self.document_id.lock() = document_id;
        *self.url.lock() = "about:blank".to_string();
        self.disable_cache.store(false, Ordering::Relaxed);
        self.is_preview.store(false, Ordering::Relaxed);
        self.run_scripts.store(true, Ordering::Relaxed);
        self.used.store(false, Ordering::Relaxed);
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Sets the shared flag consulted by `ContentManager::sweep_destroyed`,
    /// the second phase of this runtime's two-phase destruction.
    pub fn flag_destroy(&self) {
        self.should_destroy.store(true, Ordering::Release);
        self.set_state(RuntimeState::Disposing);
    }

    pub fn should_destroy(&self) -> bool {
        self.should_destroy.load(Ordering::Acquire)
    }

    pub fn record_protocol_error(&self) -> u32 {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn push_document_event(&self, event: DocumentEvent) {
        self.document_events.lock().push_back(event);
    }

    pub fn drain_document_events(&self) -> Vec<DocumentEvent> {
        self.document_events.lock().drain(..).collect()
    }

    pub fn push_rpc_request(&self, request: RpcRequest) {
        self.rpc_requests.lock().push_back(request);
    }

    /// Pops one pending `RpcRequest`, the backing primitive for the host
    /// API's `getEvent`/`getEventData`.
    pub fn pop_rpc_request(&self) -> Option<RpcRequest> {
        self.rpc_requests.lock().pop_front()
    }

    pub fn push_media_command(&self, command: MediaCommand) {
        self.media_commands.lock().push_back(command);
    }

    pub fn drain_media_commands(&self) -> Vec<MediaCommand> {
        self.media_commands.lock().drain(..).collect()
    }

    pub fn add_session(&self, session: Arc<XrSession>) {
        self.sessions.lock().push(session);
    }

    pub fn remove_session(&self, session_id: conclave_messages::SessionId) -> Option<Arc<XrSession>> {
        let mut sessions = self.sessions.lock();
        let index = sessions.iter().position(|s| s.session_id == session_id)?;
        Some(sessions.remove(index))
    }

    pub fn sessions(&self) -> Vec<Arc<XrSession>> {
        self.sessions.lock().clone()
    }

    pub fn session(&self, session_id: conclave_messages::SessionId) -> Option<Arc<XrSession>> {
        self.sessions.lock().iter().find(|s| s.session_id == session_id).cloned()
    }

    /// True once the document process has connected on every channel kind,
    /// as it does in turn while starting up. Flips `PreStarting` ->
    /// `Started`.
    pub fn all_channels_wired(&self) -> bool {
        self.event_client.lock().is_some()
            && self.frame_request_client.lock().is_some()
            && self.command_buffer_client.lock().is_some()
            && self.media_client.lock().is_some()
            && self.xr_client.lock().is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn a_fresh_runtime_is_allocated_and_unused() {
        let runtime = ContentRuntime::new(DocumentId(1));
        assert_eq!(runtime.state(), RuntimeState::Allocated);
        assert!(runtime.is_unused());
        assert!(runtime.pid().is_none());
    }

    #[test]
    fn bind_marks_the_runtime_used_with_the_new_document_id() {
        let runtime = ContentRuntime::new(DocumentId(1));
        runtime.bind(DocumentId(7), "file:///a.xsml".into(), true, false, true);
        assert_eq!(runtime.document_id(), DocumentId(7));
        assert!(!runtime.is_unused());
        assert_eq!(runtime.url(), "file:///a.xsml");
        assert!(runtime.disable_cache());
    }

    #[test]
    fn flag_destroy_is_observable_without_removing_the_runtime() {
        let runtime = ContentRuntime::new(DocumentId(1));
        assert!(!runtime.should_destroy());
        runtime.flag_destroy();
        assert!(runtime.should_destroy());
        assert_eq!(runtime.state(), RuntimeState::Disposing);
    }

    #[test]
    fn rpc_requests_drain_in_fifo_order() {
        let runtime = ContentRuntime::new(DocumentId(1));
        for i in 0..3 {
            runtime.push_rpc_request(RpcRequest {
                message_id: conclave_messages::MessageId(i),
                document_id: DocumentId(1),
                method: format!("m{i}"),
                args: vec![],
            });
        }
        assert_eq!(runtime.pop_rpc_request().expect("first").method, "m0");
        assert_eq!(runtime.pop_rpc_request().expect("second").method, "m1");
        assert_eq!(runtime.pop_rpc_request().expect("third").method, "m2");
        assert!(runtime.pop_rpc_request().is_none());
    }
}
