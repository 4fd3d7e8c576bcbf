//! Perfect negotiation over a [`PeerConnectionEngine`].
//!
//! Both peers may start a renegotiation at any time. Collisions are settled
//! by a role fixed at construction: the impolite peer ignores an offer that
//! collides with its own, the polite peer rolls its own offer back and
//! answers. No sequence numbers or extra round-trips are involved.
//!
//! <https://w3c.github.io/webrtc-pc/#perfect-negotiation-example>

pub mod negotiation_config;
pub mod signal;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_gathering_state::RTCIceGatheringState;
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::peer_connection::signaling_state::RTCSignalingState;
use crate::peer_connection::{PeerConnectionEngine, PeerConnectionEventHandler};
use crate::quality::QualityPolicy;

pub use negotiation_config::NegotiationConfig;
pub use signal::{NegotiationEvent, SignalMessage};

struct NegotiatorInternal<E: PeerConnectionEngine> {
    engine: Arc<E>,
    polite: bool,
    quality: QualityPolicy,

    offers_in_flight: AtomicUsize,
    ignore_offer: AtomicBool,
    trickle: AtomicBool,
    ready: AtomicBool,
    is_closed: AtomicBool,

    gathering_state: watch::Sender<RTCIceGatheringState>,
    closed: watch::Sender<bool>,
    events_tx: mpsc::UnboundedSender<NegotiationEvent>,
}

/// Negotiator drives offer/answer exchange for one session.
///
/// It is a cheap handle; clones share the same session. Outbound signaling
/// data, readiness and teardown are reported on the event receiver returned
/// by [`Negotiator::new`]. Engine notifications come in through the
/// [`PeerConnectionEventHandler`] implementation.
pub struct Negotiator<E: PeerConnectionEngine> {
    internal: Arc<NegotiatorInternal<E>>,
}

impl<E: PeerConnectionEngine> Clone for Negotiator<E> {
    fn clone(&self) -> Self {
        Negotiator {
            internal: Arc::clone(&self.internal),
        }
    }
}

impl<E: PeerConnectionEngine> Negotiator<E> {
    pub fn new(
        engine: Arc<E>,
        config: NegotiationConfig,
    ) -> (Self, mpsc::UnboundedReceiver<NegotiationEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (gathering_state, _) = watch::channel(engine.ice_gathering_state());
        let (closed, _) = watch::channel(false);

        let negotiator = Negotiator {
            internal: Arc::new(NegotiatorInternal {
                engine,
                polite: config.polite,
                quality: config.quality,
                offers_in_flight: AtomicUsize::new(0),
                ignore_offer: AtomicBool::new(false),
                trickle: AtomicBool::new(config.trickle),
                ready: AtomicBool::new(false),
                is_closed: AtomicBool::new(false),
                gathering_state,
                closed,
                events_tx,
            }),
        };

        (negotiator, events_rx)
    }

    /// handler returns the event handler to register with the engine.
    ///
    /// The handler refers to the session weakly: an engine that keeps it
    /// forever does not keep the negotiator (and so itself) alive. Once every
    /// `Negotiator` handle is dropped its callbacks do nothing.
    pub fn handler(&self) -> Arc<dyn PeerConnectionEventHandler> {
        Arc::new(NegotiatorHandler {
            internal: Arc::downgrade(&self.internal),
        })
    }

    pub fn polite(&self) -> bool {
        self.internal.polite
    }

    /// True strictly between the start of offer creation and the commit (or
    /// abandonment) of that offer, for as long as any round is in flight.
    pub fn making_offer(&self) -> bool {
        self.internal.offers_in_flight.load(Ordering::SeqCst) > 0
    }

    /// Whether the most recent remote offer was dropped as a collision.
    pub fn ignore_offer(&self) -> bool {
        self.internal.ignore_offer.load(Ordering::SeqCst)
    }

    pub fn trickle(&self) -> bool {
        self.internal.trickle.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.internal.is_closed.load(Ordering::SeqCst)
    }

    pub fn signaling_state(&self) -> RTCSignalingState {
        self.internal.engine.signaling_state()
    }

    /// negotiate runs one local renegotiation round: create an offer,
    /// rewrite it, commit it if the engine is still stable, then emit it.
    pub async fn negotiate(&self) {
        if self.is_closed() {
            return;
        }

        let gathering = self.internal.gathering_state.subscribe();
        let committed = {
            let _in_flight = OfferInFlight::new(&self.internal.offers_in_flight);
            self.make_offer().await
        };

        match committed {
            Ok(Some(offer)) => {
                let reference = self.internal.engine.ice_gathering_state();
                self.emit_local_description(offer, gathering, reference)
                    .await;
            }
            Ok(None) => {}
            Err(err) => log::warn!("failed to make offer: {err}"),
        }
    }

    async fn make_offer(&self) -> Result<Option<RTCSessionDescription>> {
        let engine = &self.internal.engine;

        let offer = engine.create_offer().await?;
        if self.is_closed() {
            return Ok(None);
        }

        // a remote offer may have been accepted while ours was being created
        let state = engine.signaling_state();
        if state != RTCSignalingState::Stable {
            log::debug!("abandoning local offer, signaling state is {state}");
            return Ok(None);
        }

        let offer = offer.with_quality(&self.internal.quality);
        engine.set_local_description(offer.clone()).await?;
        if self.is_closed() {
            return Ok(None);
        }

        Ok(Some(offer))
    }

    /// signal accepts a message from the remote peer. Nothing is returned to
    /// the caller: collisions, stale descriptions and candidate failures are
    /// absorbed and logged.
    pub async fn signal(&self, message: SignalMessage) {
        if self.is_closed() {
            log::trace!("session closed, dropping inbound signal");
            return;
        }

        match message {
            SignalMessage::Description(description) => {
                self.handle_remote_description(description).await
            }
            SignalMessage::Candidate(candidate) => {
                if let Err(err) = self.internal.engine.add_ice_candidate(candidate).await {
                    log::debug!("ignoring remote candidate: {err}");
                }
            }
        }
    }

    /// signal_json is [`Negotiator::signal`] for the serialized form.
    pub async fn signal_json(&self, data: &str) {
        match SignalMessage::from_json(data) {
            Ok(message) => self.signal(message).await,
            Err(err) => log::warn!("discarding inbound signal: {err}"),
        }
    }

    async fn handle_remote_description(&self, description: RTCSessionDescription) {
        let engine = &self.internal.engine;
        let sdp_type = description.sdp_type;

        let offer_collision = sdp_type == RTCSdpType::Offer
            && (self.making_offer() || engine.signaling_state() != RTCSignalingState::Stable);

        let ignore_offer = !self.polite() && offer_collision;
        self.internal
            .ignore_offer
            .store(ignore_offer, Ordering::SeqCst);
        if ignore_offer {
            log::debug!("ignoring colliding remote offer");
            return;
        }

        if offer_collision {
            if let Err(err) = self.accept_colliding_offer(description).await {
                log::warn!("failed to accept colliding remote offer: {err}");
                return;
            }
        } else if sdp_type == RTCSdpType::Answer
            && engine.signaling_state() == RTCSignalingState::Stable
        {
            log::debug!("ignoring remote answer, signaling state is already stable");
            return;
        } else if let Err(err) = engine.set_remote_description(description).await {
            log::debug!("failed to apply remote {sdp_type}: {err}");
            return;
        }

        if sdp_type == RTCSdpType::Offer && !self.is_closed() {
            self.answer().await;
        }
    }

    /// accept_colliding_offer discards our pending local offer and applies
    /// the remote one. While our offer is still being created the engine is
    /// stable and there is nothing to roll back; the in-flight offer is
    /// abandoned by the stable check in `make_offer`.
    async fn accept_colliding_offer(&self, description: RTCSessionDescription) -> Result<()> {
        let engine = &self.internal.engine;

        if engine.signaling_state() == RTCSignalingState::Stable {
            return engine.set_remote_description(description).await;
        }

        log::debug!("offer collision, rolling back local offer");
        let (rollback, remote) = tokio::join!(
            engine.set_local_description(RTCSessionDescription::rollback()),
            engine.set_remote_description(description),
        );
        rollback.and(remote)
    }

    async fn answer(&self) {
        let gathering = self.internal.gathering_state.subscribe();
        match self.make_answer().await {
            // some engines leave the gathering state at complete after an
            // answer, so always wait for the next completion
            Ok(Some(answer)) => {
                self.emit_local_description(answer, gathering, RTCIceGatheringState::New)
                    .await
            }
            Ok(None) => {}
            Err(err) => log::warn!("failed to answer remote offer: {err}"),
        }
    }

    async fn make_answer(&self) -> Result<Option<RTCSessionDescription>> {
        let engine = &self.internal.engine;

        let answer = engine.create_answer().await?;
        if self.is_closed() {
            return Ok(None);
        }

        let answer = answer.with_quality(&self.internal.quality);
        engine.set_local_description(answer.clone()).await?;
        if self.is_closed() {
            return Ok(None);
        }

        Ok(Some(answer))
    }

    /// emit_local_description sends a committed description right away in
    /// trickle mode. Otherwise it waits for ICE gathering to complete and
    /// sends one consolidated description without trickle markers.
    async fn emit_local_description(
        &self,
        committed: RTCSessionDescription,
        gathering: watch::Receiver<RTCIceGatheringState>,
        reference: RTCIceGatheringState,
    ) {
        if self.trickle() {
            let description = self
                .internal
                .engine
                .local_description()
                .await
                .unwrap_or(committed);
            self.emit(SignalMessage::Description(description));
            return;
        }

        if let Err(err) = self.wait_for_gathering_complete(gathering, reference).await {
            log::debug!("not sending local {}: {err}", committed.sdp_type);
            return;
        }

        let description = self
            .internal
            .engine
            .local_description()
            .await
            .unwrap_or(committed);
        self.emit(SignalMessage::Description(description.without_trickle()));
    }

    async fn wait_for_gathering_complete(
        &self,
        mut gathering: watch::Receiver<RTCIceGatheringState>,
        reference: RTCIceGatheringState,
    ) -> Result<()> {
        if reference == RTCIceGatheringState::Complete {
            return Ok(());
        }

        let closed = self.internal.closed.subscribe();
        tokio::select! {
            result = async {
                loop {
                    if gathering.changed().await.is_err() {
                        return Err(Error::ErrIceGatheringAborted);
                    }
                    if *gathering.borrow_and_update() == RTCIceGatheringState::Complete {
                        return Ok(());
                    }
                }
            } => result,
            _ = wait_closed(closed) => Err(Error::ErrConnectionClosed),
        }
    }

    fn emit(&self, message: SignalMessage) {
        if self.is_closed() {
            return;
        }
        if self
            .internal
            .events_tx
            .send(NegotiationEvent::Signal(message))
            .is_err()
        {
            log::warn!("negotiation event receiver dropped, signal lost");
        }
    }

    /// destroy tears the session down: engine notifications and inbound
    /// signals are ignored from now on, results of engine calls still in
    /// flight are discarded and the engine is closed. Calling it again does
    /// nothing.
    pub async fn destroy(&self) {
        if self.internal.is_closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.internal.closed.send_replace(true);

        if let Err(err) = self.internal.engine.close().await {
            log::warn!("failed to close engine: {err}");
        }
        let _ = self.internal.events_tx.send(NegotiationEvent::Closed);
    }
}

/// OfferInFlight counts one offer round in `offers_in_flight` until it is
/// dropped, including when the round's future is cancelled.
struct OfferInFlight<'a>(&'a AtomicUsize);

impl<'a> OfferInFlight<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        OfferInFlight(counter)
    }
}

impl Drop for OfferInFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn wait_closed(mut closed: watch::Receiver<bool>) {
    loop {
        if *closed.borrow_and_update() {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}

#[async_trait::async_trait]
impl<E: PeerConnectionEngine> PeerConnectionEventHandler for Negotiator<E> {
    async fn on_negotiation_needed(&self) {
        self.negotiate().await;
    }

    async fn on_ice_candidate(&self, candidate: Option<RTCIceCandidateInit>) {
        if self.is_closed() {
            return;
        }
        match candidate {
            Some(candidate) if !candidate.is_end_of_candidates() => {
                if self.trickle() {
                    self.emit(SignalMessage::Candidate(candidate));
                }
            }
            _ => {}
        }
    }

    async fn on_signaling_state_change(&self, state: RTCSignalingState) {
        log::trace!("signaling state changed to {state}");
    }

    async fn on_ice_connection_state_change(&self, state: RTCIceConnectionState) {
        log::trace!("ice connection state changed to {state}");
        if state.is_terminal() && !self.is_closed() {
            log::debug!("ice connection {state}, tearing down session");
            self.destroy().await;
        }
    }

    async fn on_ice_gathering_state_change(&self, state: RTCIceGatheringState) {
        if self.is_closed() {
            return;
        }
        log::trace!("ice gathering state changed to {state}");
        self.internal.gathering_state.send_replace(state);
    }

    async fn on_data_channel_open(&self) {
        if self.is_closed() {
            return;
        }
        // from here on the direct channel carries candidates
        self.internal.trickle.store(true, Ordering::SeqCst);
        if !self.internal.ready.swap(true, Ordering::SeqCst) {
            let _ = self.internal.events_tx.send(NegotiationEvent::Ready);
        }
    }
}

/// NegotiatorHandler is the handler the engine holds.
struct NegotiatorHandler<E: PeerConnectionEngine> {
    internal: Weak<NegotiatorInternal<E>>,
}

impl<E: PeerConnectionEngine> NegotiatorHandler<E> {
    fn negotiator(&self) -> Option<Negotiator<E>> {
        let internal = self.internal.upgrade();
        if internal.is_none() {
            log::trace!("negotiator dropped, ignoring engine event");
        }
        internal.map(|internal| Negotiator { internal })
    }
}

#[async_trait::async_trait]
impl<E: PeerConnectionEngine> PeerConnectionEventHandler for NegotiatorHandler<E> {
    async fn on_negotiation_needed(&self) {
        if let Some(negotiator) = self.negotiator() {
            negotiator.on_negotiation_needed().await;
        }
    }

    async fn on_ice_candidate(&self, candidate: Option<RTCIceCandidateInit>) {
        if let Some(negotiator) = self.negotiator() {
            negotiator.on_ice_candidate(candidate).await;
        }
    }

    async fn on_signaling_state_change(&self, state: RTCSignalingState) {
        if let Some(negotiator) = self.negotiator() {
            negotiator.on_signaling_state_change(state).await;
        }
    }

    async fn on_ice_connection_state_change(&self, state: RTCIceConnectionState) {
        if let Some(negotiator) = self.negotiator() {
            negotiator.on_ice_connection_state_change(state).await;
        }
    }

    async fn on_ice_gathering_state_change(&self, state: RTCIceGatheringState) {
        if let Some(negotiator) = self.negotiator() {
            negotiator.on_ice_gathering_state_change(state).await;
        }
    }

    async fn on_data_channel_open(&self) {
        if let Some(negotiator) = self.negotiator() {
            negotiator.on_data_channel_open().await;
        }
    }
}
