use serde::{Deserialize, Serialize};

use crate::ice_transport::ice_server::{default_ice_servers, RTCIceServer};
use crate::quality::QualityPolicy;

/// NegotiationConfig fixes the role and exchange mode of one session.
///
/// Exactly one of the two peers must be polite; which one is agreed on out
/// of band (the pairing layer makes the sender polite).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// polite peers roll back their own offer when offers collide, impolite
    /// peers ignore the incoming one.
    pub polite: bool,

    /// trickle sends candidates as they are discovered. When false, local
    /// descriptions are held back until ICE gathering completes. Forced on
    /// once the data channel opens.
    pub trickle: bool,

    /// quality is applied to every locally generated offer and answer.
    pub quality: QualityPolicy,

    /// ice_servers are handed to whoever builds the engine; the controller
    /// itself never reads them.
    pub ice_servers: Vec<RTCIceServer>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        NegotiationConfig {
            polite: true,
            trickle: true,
            quality: QualityPolicy::default(),
            ice_servers: default_ice_servers(),
        }
    }
}
