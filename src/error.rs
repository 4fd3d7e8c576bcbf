use thiserror::Error;

use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::peer_connection::signaling_state::RTCSignalingState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// ErrConnectionClosed indicates an operation executed after the session
    /// has already been torn down.
    #[error("connection closed")]
    ErrConnectionClosed,

    /// ErrNoRemoteDescription indicates that an operation was rejected because
    /// the remote description is not set
    #[error("remote description is not set")]
    ErrNoRemoteDescription,

    /// ErrIncorrectSignalingState indicates that the signaling state of the
    /// engine does not allow the requested operation
    #[error("operation can not be run in current signaling state")]
    ErrIncorrectSignalingState,

    #[error("can't rollback from stable state")]
    ErrSignalingStateCannotRollback,

    #[error(
        "invalid proposed signaling state transition from {} applying {} {}",
        from,
        if *is_local { "local" } else { "remote" },
        applying
    )]
    ErrSignalingStateProposedTransitionInvalid {
        from: RTCSignalingState,
        applying: RTCSdpType,
        is_local: bool,
    },

    /// ErrIceGatheringAborted indicates that the wait for ICE gathering to
    /// complete ended without the gathering state reaching complete.
    #[error("ice gathering aborted before completion")]
    ErrIceGatheringAborted,

    /// ErrEmptySignal indicates a signal message carrying neither a
    /// description nor a candidate.
    #[error("signal carries neither description nor candidate")]
    ErrEmptySignal,

    #[error("malformed signal message: {0}")]
    ErrMalformedSignal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ErrMalformedSignal(e.to_string())
    }
}
