use std::fmt;

use crate::error::{Error, Result};
use crate::peer_connection::sdp::sdp_type::RTCSdpType;

/// StateChangeOp names which side of the session a description is applied to.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateChangeOp {
    #[default]
    SetLocal,
    SetRemote,
}

impl fmt::Display for StateChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StateChangeOp::SetLocal => write!(f, "SetLocal"),
            StateChangeOp::SetRemote => write!(f, "SetRemote"),
        }
    }
}

/// SignalingState mirrors the offer/answer state of the underlying engine.
///
/// ## Specifications
///
/// * [MDN]
/// * [W3C]
///
/// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCPeerConnection/signalingState
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-peerconnection-signaling-state
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCSignalingState {
    #[default]
    Unspecified = 0,

    /// No offer/answer exchange is in progress. This is also the initial
    /// state, before any description has been applied.
    Stable,

    /// A local description of type "offer" has been applied.
    HaveLocalOffer,

    /// A remote description of type "offer" has been applied.
    HaveRemoteOffer,

    /// A remote offer and a local pranswer have been applied.
    HaveLocalPranswer,

    /// A local offer and a remote pranswer have been applied.
    HaveRemotePranswer,

    /// The session has been closed.
    Closed,
}

const SIGNALING_STATE_STABLE_STR: &str = "stable";
const SIGNALING_STATE_HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const SIGNALING_STATE_HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";
const SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR: &str = "have-local-pranswer";
const SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR: &str = "have-remote-pranswer";
const SIGNALING_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCSignalingState {
    fn from(raw: &str) -> Self {
        match raw {
            SIGNALING_STATE_STABLE_STR => RTCSignalingState::Stable,
            SIGNALING_STATE_HAVE_LOCAL_OFFER_STR => RTCSignalingState::HaveLocalOffer,
            SIGNALING_STATE_HAVE_REMOTE_OFFER_STR => RTCSignalingState::HaveRemoteOffer,
            SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR => RTCSignalingState::HaveLocalPranswer,
            SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR => RTCSignalingState::HaveRemotePranswer,
            SIGNALING_STATE_CLOSED_STR => RTCSignalingState::Closed,
            _ => RTCSignalingState::Unspecified,
        }
    }
}

impl fmt::Display for RTCSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCSignalingState::Stable => SIGNALING_STATE_STABLE_STR,
            RTCSignalingState::HaveLocalOffer => SIGNALING_STATE_HAVE_LOCAL_OFFER_STR,
            RTCSignalingState::HaveRemoteOffer => SIGNALING_STATE_HAVE_REMOTE_OFFER_STR,
            RTCSignalingState::HaveLocalPranswer => SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR,
            RTCSignalingState::HaveRemotePranswer => SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR,
            RTCSignalingState::Closed => SIGNALING_STATE_CLOSED_STR,
            RTCSignalingState::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// check_next_signaling_state validates a proposed transition against the
/// JSEP state table (section 4.3.1), including rollback back to stable.
///
/// Engine implementations use it to reject descriptions that arrive in a
/// state where they cannot be applied; the negotiation controller never
/// calls it directly and instead relies on the engine's verdict.
pub fn check_next_signaling_state(
    cur: RTCSignalingState,
    next: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    if sdp_type == RTCSdpType::Rollback {
        return match cur {
            RTCSignalingState::Stable => Err(Error::ErrSignalingStateCannotRollback),
            RTCSignalingState::Closed | RTCSignalingState::Unspecified => {
                Err(Error::ErrSignalingStateProposedTransitionInvalid {
                    from: cur,
                    applying: sdp_type,
                    is_local: op == StateChangeOp::SetLocal,
                })
            }
            _ if next == RTCSignalingState::Stable => Ok(next),
            _ => Err(Error::ErrSignalingStateProposedTransitionInvalid {
                from: cur,
                applying: sdp_type,
                is_local: op == StateChangeOp::SetLocal,
            }),
        };
    }

    let allowed = match (cur, op, sdp_type) {
        // stable->SetLocal(offer)->have-local-offer
        (RTCSignalingState::Stable, StateChangeOp::SetLocal, RTCSdpType::Offer) => {
            next == RTCSignalingState::HaveLocalOffer
        }
        // stable->SetRemote(offer)->have-remote-offer
        (RTCSignalingState::Stable, StateChangeOp::SetRemote, RTCSdpType::Offer) => {
            next == RTCSignalingState::HaveRemoteOffer
        }
        // have-local-offer->SetLocal(offer)->have-local-offer
        (RTCSignalingState::HaveLocalOffer, StateChangeOp::SetLocal, RTCSdpType::Offer) => {
            next == RTCSignalingState::HaveLocalOffer
        }
        // have-local-offer->SetRemote(answer)->stable
        (RTCSignalingState::HaveLocalOffer, StateChangeOp::SetRemote, RTCSdpType::Answer) => {
            next == RTCSignalingState::Stable
        }
        // have-local-offer->SetRemote(pranswer)->have-remote-pranswer
        (RTCSignalingState::HaveLocalOffer, StateChangeOp::SetRemote, RTCSdpType::Pranswer) => {
            next == RTCSignalingState::HaveRemotePranswer
        }
        // have-remote-pranswer->SetRemote(answer)->stable
        (RTCSignalingState::HaveRemotePranswer, StateChangeOp::SetRemote, RTCSdpType::Answer) => {
            next == RTCSignalingState::Stable
        }
        // have-remote-offer->SetLocal(answer)->stable
        (RTCSignalingState::HaveRemoteOffer, StateChangeOp::SetLocal, RTCSdpType::Answer) => {
            next == RTCSignalingState::Stable
        }
        // have-remote-offer->SetLocal(pranswer)->have-local-pranswer
        (RTCSignalingState::HaveRemoteOffer, StateChangeOp::SetLocal, RTCSdpType::Pranswer) => {
            next == RTCSignalingState::HaveLocalPranswer
        }
        // have-local-pranswer->SetLocal(answer)->stable
        (RTCSignalingState::HaveLocalPranswer, StateChangeOp::SetLocal, RTCSdpType::Answer) => {
            next == RTCSignalingState::Stable
        }
        _ => false,
    };

    if allowed {
        Ok(next)
    } else {
        Err(Error::ErrSignalingStateProposedTransitionInvalid {
            from: cur,
            applying: sdp_type,
            is_local: op == StateChangeOp::SetLocal,
        })
    }
}

/// next_signaling_state returns the state a successful application of
/// `sdp_type` on side `op` leads to, validated against the JSEP table.
pub fn next_signaling_state(
    cur: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    let next = match (op, sdp_type) {
        (_, RTCSdpType::Rollback) | (_, RTCSdpType::Answer) => RTCSignalingState::Stable,
        (StateChangeOp::SetLocal, RTCSdpType::Offer) => RTCSignalingState::HaveLocalOffer,
        (StateChangeOp::SetRemote, RTCSdpType::Offer) => RTCSignalingState::HaveRemoteOffer,
        (StateChangeOp::SetLocal, RTCSdpType::Pranswer) => RTCSignalingState::HaveLocalPranswer,
        (StateChangeOp::SetRemote, RTCSdpType::Pranswer) => RTCSignalingState::HaveRemotePranswer,
        (_, RTCSdpType::Unspecified) => {
            return Err(Error::ErrSignalingStateProposedTransitionInvalid {
                from: cur,
                applying: sdp_type,
                is_local: op == StateChangeOp::SetLocal,
            })
        }
    };
    check_next_signaling_state(cur, next, op, sdp_type)
}
