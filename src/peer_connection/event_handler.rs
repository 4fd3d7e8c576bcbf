//! Event handler trait for engine notifications

use super::*;

/// Trait for handling engine events asynchronously
///
/// The engine invokes these callbacks as its internal state evolves. All
/// methods are async and have default no-op implementations. Handlers may
/// suspend for as long as a negotiation round takes (including waiting for
/// ICE gathering to complete), so engines must not serialize gathering-state
/// notifications behind an outstanding `on_negotiation_needed` call.
///
/// # Example
///
/// ```no_run
/// use polite_peer::ice_transport::ice_candidate::RTCIceCandidateInit;
/// use polite_peer::peer_connection::PeerConnectionEventHandler;
///
/// struct MyHandler;
///
/// #[async_trait::async_trait]
/// impl PeerConnectionEventHandler for MyHandler {
///     async fn on_ice_candidate(&self, candidate: Option<RTCIceCandidateInit>) {
///         println!("New ICE candidate: {:?}", candidate);
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait PeerConnectionEventHandler: Send + Sync + 'static {
    /// Called when the engine wants a new offer/answer round
    async fn on_negotiation_needed(&self) {}

    /// Called when a new local ICE candidate is discovered; `None` marks the
    /// end of gathering
    async fn on_ice_candidate(&self, _candidate: Option<RTCIceCandidateInit>) {}

    /// Called when the signaling state changes
    async fn on_signaling_state_change(&self, _state: RTCSignalingState) {}

    /// Called when the ICE connection state changes
    async fn on_ice_connection_state_change(&self, _state: RTCIceConnectionState) {}

    /// Called when the ICE gathering state changes
    async fn on_ice_gathering_state_change(&self, _state: RTCIceGatheringState) {}

    /// Called once the negotiated data channel between the peers is open
    async fn on_data_channel_open(&self) {}
}
