pub mod engine;
pub mod event_handler;
pub mod sdp;
pub mod signaling_state;

pub use engine::PeerConnectionEngine;
pub use event_handler::PeerConnectionEventHandler;

use crate::error::Result;
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_gathering_state::RTCIceGatheringState;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::peer_connection::signaling_state::RTCSignalingState;
