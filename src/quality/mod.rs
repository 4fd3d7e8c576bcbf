//! Session description rewriting for codec preference and bitrate policy.
//!
//! [`set_quality`] parses the SDP into lines, rewrites the first video
//! section's codec order and bitrate directives and the Opus format
//! parameters, and marshals the result. Lines the policy does not address
//! are reproduced byte for byte.


mod audio;
pub mod quality_policy;
mod sdp_lines;
mod video;

pub use quality_policy::{AudioQuality, QualityPolicy, VideoQuality};

use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use sdp_lines::SdpLines;

/// set_quality applies `policy` to `sdp`. It is pure: the same input always
/// yields the same output, and applying it to its own output changes nothing.
pub fn set_quality(sdp: &str, policy: &QualityPolicy) -> String {
    if sdp.is_empty() || policy.is_empty() {
        return sdp.to_owned();
    }

    let mut lines = SdpLines::parse(sdp);
    if let Some(video) = &policy.video {
        video::apply_video(&mut lines, video);
    }
    if let Some(audio) = &policy.audio {
        audio::apply_audio(&mut lines, audio);
    }
    lines.marshal()
}

impl RTCSessionDescription {
    /// with_quality returns the description rewritten by [`set_quality`].
    pub fn with_quality(mut self, policy: &QualityPolicy) -> Self {
        self.sdp = set_quality(&self.sdp, policy);
        self
    }
}
