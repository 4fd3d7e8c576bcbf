#![warn(rust_2018_idioms)]

//! Perfect negotiation and SDP quality rewriting for two-party WebRTC
//! sessions.
//!
//! [`negotiation::Negotiator`] runs the offer/answer exchange over any
//! [`peer_connection::PeerConnectionEngine`]. [`quality::set_quality`]
//! rewrites locally generated descriptions for codec preference and
//! bitrate before they are committed.

pub mod error;
pub mod ice_transport;
pub mod negotiation;
pub mod peer_connection;
pub mod quality;

pub use error::Error;
pub use negotiation::{NegotiationConfig, NegotiationEvent, Negotiator, SignalMessage};
pub use quality::{set_quality, QualityPolicy};

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";
