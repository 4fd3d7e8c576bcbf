use serde::{Deserialize, Serialize};

use super::sdp_type::RTCSdpType;

pub(crate) const ICE_OPTIONS_TRICKLE: &str = "a=ice-options:trickle";

/// SessionDescription carries a local or remote session description
/// together with its offer/answer role.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCSessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,

    #[serde(default)]
    pub sdp: String,
}

impl RTCSessionDescription {
    /// Given SDP representing an offer, wrap it in an RTCSessionDescription.
    pub fn offer(sdp: String) -> Self {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Offer,
            sdp,
        }
    }

    /// Given SDP representing an answer, wrap it in an RTCSessionDescription.
    pub fn answer(sdp: String) -> Self {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Answer,
            sdp,
        }
    }

    /// The pseudo-description that discards a pending local offer.
    pub fn rollback() -> Self {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Rollback,
            sdp: String::new(),
        }
    }

    /// without_trickle returns a copy with every `a=ice-options:trickle`
    /// line removed, for peers that receive all candidates in one
    /// consolidated description. Line endings of the remaining lines are
    /// left untouched.
    pub fn without_trickle(&self) -> Self {
        let sdp = self
            .sdp
            .split_inclusive('\n')
            .filter(|line| line.trim_end() != ICE_OPTIONS_TRICKLE)
            .collect();

        RTCSessionDescription {
            sdp_type: self.sdp_type,
            sdp,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_session_description_json() {
        let tests = vec![
            (
                RTCSessionDescription::offer("sdp".to_owned()),
                r#"{"type":"offer","sdp":"sdp"}"#,
            ),
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Pranswer,
                    sdp: "sdp".to_owned(),
                },
                r#"{"type":"pranswer","sdp":"sdp"}"#,
            ),
            (
                RTCSessionDescription::answer("sdp".to_owned()),
                r#"{"type":"answer","sdp":"sdp"}"#,
            ),
            (
                RTCSessionDescription::rollback(),
                r#"{"type":"rollback","sdp":""}"#,
            ),
        ];

        for (desc, expected_string) in tests {
            let desc_data = serde_json::to_string(&desc).unwrap();
            assert_eq!(desc_data, expected_string, "string is not expected");

            let sd = serde_json::from_str::<RTCSessionDescription>(&desc_data).unwrap();
            assert_eq!(sd, desc);
        }
    }

    #[test]
    fn test_rollback_without_sdp_field() {
        let sd = serde_json::from_str::<RTCSessionDescription>(r#"{"type":"rollback"}"#).unwrap();
        assert_eq!(sd, RTCSessionDescription::rollback());
    }

    #[test]
    fn test_without_trickle() {
        let desc = RTCSessionDescription::offer(
            "v=0\r\na=ice-options:trickle\r\na=group:BUNDLE 0\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=ice-options:trickle\r\n"
                .to_owned(),
        );

        let stripped = desc.without_trickle();
        assert_eq!(stripped.sdp_type, RTCSdpType::Offer);
        assert_eq!(
            stripped.sdp,
            "v=0\r\na=group:BUNDLE 0\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\n"
        );

        // other ice-options stay
        let desc = RTCSessionDescription::answer("a=ice-options:trickle renomination\r\n".to_owned());
        assert_eq!(desc.without_trickle(), desc);
    }
}
