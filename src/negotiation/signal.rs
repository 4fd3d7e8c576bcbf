use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;

/// SignalMessage is what travels between the two peers over the signaling
/// transport: either a description or a single candidate, never both.
///
/// On the wire it is `{"description":{...}}` or `{"candidate":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMessage {
    Description(RTCSessionDescription),
    Candidate(RTCIceCandidateInit),
}

/// The loose inbound shape, where both fields are optional and a present
/// description wins.
#[derive(Deserialize)]
struct RawSignal {
    description: Option<RTCSessionDescription>,
    candidate: Option<RTCIceCandidateInit>,
}

impl SignalMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let raw: RawSignal = serde_json::from_str(data)?;
        match (raw.description, raw.candidate) {
            (Some(description), _) => Ok(SignalMessage::Description(description)),
            (None, Some(candidate)) => Ok(SignalMessage::Candidate(candidate)),
            (None, None) => Err(Error::ErrEmptySignal),
        }
    }
}

/// NegotiationEvent is everything the controller reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationEvent {
    /// Outbound signaling data to transmit to the remote peer.
    Signal(SignalMessage),
    /// The direct data channel is open; the signaling transport may be
    /// retired.
    Ready,
    /// The session was torn down, by `destroy()` or by ICE failure.
    Closed,
}
