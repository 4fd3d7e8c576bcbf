use super::*;

/// PeerConnectionEngine is the media/transport engine a negotiation runs on.
///
/// It owns ICE, DTLS, SCTP and codec negotiation; the controller only drives
/// its description-exchange primitives and reads its state. Every async
/// method is a suspension point during which the signaling state may change.
#[async_trait::async_trait]
pub trait PeerConnectionEngine: Send + Sync + 'static {
    /// create_offer starts the PeerConnection and generates the localDescription
    async fn create_offer(&self) -> Result<RTCSessionDescription>;

    /// create_answer generates an answer to the currently applied remote offer
    async fn create_answer(&self) -> Result<RTCSessionDescription>;

    /// set_local_description applies a local offer, answer or rollback
    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()>;

    /// set_remote_description applies a description received from the peer
    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()>;

    /// add_ice_candidate hands a remote candidate to the ICE agent
    async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()>;

    /// local_description returns the pending local description if there is
    /// one, otherwise the current one, including gathered candidates
    async fn local_description(&self) -> Option<RTCSessionDescription>;

    fn signaling_state(&self) -> RTCSignalingState;

    fn ice_gathering_state(&self) -> RTCIceGatheringState;

    fn ice_connection_state(&self) -> RTCIceConnectionState;

    /// close ends the session. Calling it on a closed engine is a no-op.
    async fn close(&self) -> Result<()>;
}
