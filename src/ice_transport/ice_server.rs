use serde::{Deserialize, Serialize};

/// ICEServer describes a single STUN and TURN server that can be used by
/// the engine's ICE agent to establish a connection with a peer.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub credential: String,
}

/// The public STUN servers used when no ice servers are configured.
pub fn default_ice_servers() -> Vec<RTCIceServer> {
    vec![RTCIceServer {
        urls: vec![
            "stun:stun.l.google.com:19302".to_owned(),
            "stun:global.stun.twilio.com:3478".to_owned(),
        ],
        ..Default::default()
    }]
}
