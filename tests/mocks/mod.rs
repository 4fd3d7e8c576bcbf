//! In-memory engine for driving a negotiator in tests.
//!
//! Descriptions are validated against the JSEP signaling table, and every
//! local offer or answer starts a short simulated ICE gathering run that
//! reports one host candidate.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use polite_peer::error::{Error, Result};
use polite_peer::ice_transport::ice_candidate::RTCIceCandidateInit;
use polite_peer::ice_transport::ice_connection_state::RTCIceConnectionState;
use polite_peer::ice_transport::ice_gathering_state::RTCIceGatheringState;
use polite_peer::peer_connection::sdp::sdp_type::RTCSdpType;
use polite_peer::peer_connection::sdp::session_description::RTCSessionDescription;
use polite_peer::peer_connection::signaling_state::{
    next_signaling_state, RTCSignalingState, StateChangeOp,
};
use polite_peer::peer_connection::{PeerConnectionEngine, PeerConnectionEventHandler};

/// Engine calls in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    CreateOffer,
    CreateAnswer,
    SetLocal(RTCSdpType),
    SetRemote(RTCSdpType),
    AddIceCandidate,
    Close,
}

/// session_sdp is a small two-section session whose origin line carries
/// `name`, so tests can tell whose description was applied.
pub fn session_sdp(name: &str) -> String {
    [
        "v=0".to_owned(),
        format!("o={name} 4611731400430051336 2 IN IP4 127.0.0.1"),
        "s=-".to_owned(),
        "t=0 0".to_owned(),
        "a=group:BUNDLE 0 1".to_owned(),
        "a=ice-options:trickle".to_owned(),
        "m=audio 9 UDP/TLS/RTP/SAVPF 111".to_owned(),
        "c=IN IP4 0.0.0.0".to_owned(),
        "a=mid:0".to_owned(),
        "a=rtpmap:111 opus/48000/2".to_owned(),
        "a=fmtp:111 minptime=10;useinbandfec=1".to_owned(),
        "m=video 9 UDP/TLS/RTP/SAVPF 96 97 98".to_owned(),
        "c=IN IP4 0.0.0.0".to_owned(),
        "a=mid:1".to_owned(),
        "a=rtpmap:96 VP8/90000".to_owned(),
        "a=rtpmap:97 rtx/90000".to_owned(),
        "a=fmtp:97 apt=96".to_owned(),
        "a=rtpmap:98 H264/90000".to_owned(),
        "a=fmtp:98 profile-level-id=42e01f".to_owned(),
        String::new(),
    ]
    .join("\r\n")
}

struct MockState {
    signaling_state: RTCSignalingState,
    gathering_state: RTCIceGatheringState,
    connection_state: RTCIceConnectionState,
    local: Option<RTCSessionDescription>,
    remote: Option<RTCSessionDescription>,
    candidates: Vec<String>,
    generation: u32,
    closed: bool,
}

type SharedHandler = Arc<Mutex<Option<Arc<dyn PeerConnectionEventHandler>>>>;

pub struct MockEngine {
    name: String,
    auto_gather: bool,
    keep_handler: bool,
    state: Arc<Mutex<MockState>>,
    calls: Mutex<Vec<EngineCall>>,
    offer_gate: Mutex<Option<oneshot::Receiver<()>>>,
    handler: SharedHandler,
}

impl MockEngine {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, true, false))
    }

    /// An engine that never starts ICE gathering on its own.
    pub fn without_gathering(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, false, false))
    }

    /// An engine that holds on to its handler after close, for its whole
    /// lifetime.
    pub fn keeping_handler(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, true, true))
    }

    fn build(name: &str, auto_gather: bool, keep_handler: bool) -> Self {
        MockEngine {
            name: name.to_owned(),
            auto_gather,
            keep_handler,
            state: Arc::new(Mutex::new(MockState {
                signaling_state: RTCSignalingState::Stable,
                gathering_state: RTCIceGatheringState::New,
                connection_state: RTCIceConnectionState::New,
                local: None,
                remote: None,
                candidates: vec![],
                generation: 0,
                closed: false,
            })),
            calls: Mutex::new(vec![]),
            offer_gate: Mutex::new(None),
            handler: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_handler(&self, handler: Arc<dyn PeerConnectionEventHandler>) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    /// The next create_offer call suspends until the returned sender fires
    /// or is dropped.
    pub fn gate_offer(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.offer_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn remote_description(&self) -> Option<RTCSessionDescription> {
        self.state.lock().unwrap().remote.clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn current_handler(&self) -> Option<Arc<dyn PeerConnectionEventHandler>> {
        self.handler.lock().unwrap().clone()
    }

    fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn take_offer_gate(&self) -> Option<oneshot::Receiver<()>> {
        self.offer_gate.lock().unwrap().take()
    }

    /// apply moves the signaling state and stores the description. It
    /// returns the new state and, for local offers and answers, the
    /// generation of the gathering run to start.
    fn apply(
        &self,
        op: StateChangeOp,
        desc: RTCSessionDescription,
    ) -> Result<(RTCSignalingState, Option<u32>)> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(Error::ErrConnectionClosed);
        }

        let next = next_signaling_state(state.signaling_state, op, desc.sdp_type)?;
        state.signaling_state = next;

        let mut generation = None;
        match (op, desc.sdp_type) {
            (StateChangeOp::SetLocal, RTCSdpType::Rollback) => state.local = None,
            (StateChangeOp::SetRemote, RTCSdpType::Rollback) => state.remote = None,
            (StateChangeOp::SetLocal, _) => {
                state.local = Some(desc);
                state.candidates.clear();
                state.gathering_state = RTCIceGatheringState::New;
                state.generation += 1;
                generation = Some(state.generation);
            }
            (StateChangeOp::SetRemote, _) => state.remote = Some(desc),
        }

        Ok((next, generation))
    }

    async fn apply_and_notify(&self, op: StateChangeOp, desc: RTCSessionDescription) -> Result<()> {
        let (next, generation) = self.apply(op, desc)?;

        if let Some(generation) = generation {
            if self.auto_gather {
                self.spawn_gathering(generation);
            }
        }
        if let Some(handler) = self.current_handler() {
            handler.on_signaling_state_change(next).await;
        }
        Ok(())
    }

    fn spawn_gathering(&self, generation: u32) {
        let state = Arc::clone(&self.state);
        let handler = self.current_handler();
        let candidate = RTCIceCandidateInit {
            candidate: format!(
                "candidate:{generation} 1 udp 2122260223 192.168.1.{generation} 5000{generation} typ host"
            ),
            sdp_mid: Some("0".to_owned()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        };

        tokio::spawn(async move {
            let Some(handler) = handler else { return };

            tokio::task::yield_now().await;
            if !advance(&state, generation, |s| {
                s.gathering_state = RTCIceGatheringState::Gathering
            }) {
                return;
            }
            handler
                .on_ice_gathering_state_change(RTCIceGatheringState::Gathering)
                .await;

            tokio::task::yield_now().await;
            let line = candidate.candidate.clone();
            if !advance(&state, generation, |s| s.candidates.push(line)) {
                return;
            }
            handler.on_ice_candidate(Some(candidate)).await;

            tokio::task::yield_now().await;
            if !advance(&state, generation, |s| {
                s.gathering_state = RTCIceGatheringState::Complete
            }) {
                return;
            }
            handler.on_ice_candidate(None).await;
            handler
                .on_ice_gathering_state_change(RTCIceGatheringState::Complete)
                .await;
        });
    }
}

/// advance runs `f` unless the engine closed or a newer gathering run
/// started.
fn advance(
    state: &Mutex<MockState>,
    generation: u32,
    f: impl FnOnce(&mut MockState),
) -> bool {
    let mut state = state.lock().unwrap();
    if state.closed || state.generation != generation {
        return false;
    }
    f(&mut state);
    true
}

#[async_trait::async_trait]
impl PeerConnectionEngine for MockEngine {
    async fn create_offer(&self) -> Result<RTCSessionDescription> {
        self.record(EngineCall::CreateOffer);
        if let Some(gate) = self.take_offer_gate() {
            let _ = gate.await;
        }
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }
        Ok(RTCSessionDescription::offer(session_sdp(&self.name)))
    }

    async fn create_answer(&self) -> Result<RTCSessionDescription> {
        self.record(EngineCall::CreateAnswer);
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }
        if self.signaling_state() != RTCSignalingState::HaveRemoteOffer {
            return Err(Error::ErrIncorrectSignalingState);
        }
        Ok(RTCSessionDescription::answer(session_sdp(&self.name)))
    }

    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        self.record(EngineCall::SetLocal(desc.sdp_type));
        self.apply_and_notify(StateChangeOp::SetLocal, desc).await
    }

    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()> {
        self.record(EngineCall::SetRemote(desc.sdp_type));
        self.apply_and_notify(StateChangeOp::SetRemote, desc).await
    }

    async fn add_ice_candidate(&self, _candidate: RTCIceCandidateInit) -> Result<()> {
        self.record(EngineCall::AddIceCandidate);
        let state = self.state.lock().unwrap();
        if state.closed {
            Err(Error::ErrConnectionClosed)
        } else if state.remote.is_none() {
            Err(Error::ErrNoRemoteDescription)
        } else {
            Ok(())
        }
    }

    async fn local_description(&self) -> Option<RTCSessionDescription> {
        let state = self.state.lock().unwrap();
        let mut desc = state.local.clone()?;
        for candidate in &state.candidates {
            desc.sdp.push_str(&format!("a={candidate}\r\n"));
        }
        Some(desc)
    }

    fn signaling_state(&self) -> RTCSignalingState {
        self.state.lock().unwrap().signaling_state
    }

    fn ice_gathering_state(&self) -> RTCIceGatheringState {
        self.state.lock().unwrap().gathering_state
    }

    fn ice_connection_state(&self) -> RTCIceConnectionState {
        self.state.lock().unwrap().connection_state
    }

    async fn close(&self) -> Result<()> {
        self.record(EngineCall::Close);
        {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            state.signaling_state = RTCSignalingState::Closed;
            state.connection_state = RTCIceConnectionState::Closed;
        }
        if !self.keep_handler {
            self.handler.lock().unwrap().take();
        }
        Ok(())
    }
}
