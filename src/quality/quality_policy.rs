use serde::{Deserialize, Serialize};

/// QualityPolicy describes the codec preference and bitrate settings every
/// locally generated description is rewritten to. A media kind without a
/// policy is left untouched.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioQuality>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoQuality {
    /// Minimum and maximum bitrate hint applied to every primary video codec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    /// Codec names in order of preference. Codecs missing from this list
    /// keep their relative order after the listed ones.
    pub codecs: Vec<String>,
}

/// AudioQuality holds Opus format parameters. Only `stereo` and
/// `sprop-stereo` are always written (defaulting to 1); every other field
/// is written only when set.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioQuality {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stereo: Option<u8>,
    #[serde(rename = "sprop-stereo", skip_serializing_if = "Option::is_none")]
    pub sprop_stereo: Option<u8>,
    #[serde(rename = "maxaveragebitrate", skip_serializing_if = "Option::is_none")]
    pub max_average_bitrate: Option<u32>,
    #[serde(rename = "maxplaybackrate", skip_serializing_if = "Option::is_none")]
    pub max_playback_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cbr: Option<u8>,
    #[serde(rename = "useinbandfec", skip_serializing_if = "Option::is_none")]
    pub use_inband_fec: Option<u8>,
    #[serde(rename = "usedtx", skip_serializing_if = "Option::is_none")]
    pub use_dtx: Option<u8>,
    #[serde(rename = "maxptime", skip_serializing_if = "Option::is_none")]
    pub max_ptime: Option<u32>,
    #[serde(rename = "minptime", skip_serializing_if = "Option::is_none")]
    pub min_ptime: Option<u32>,
}

impl QualityPolicy {
    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    /// high_quality is the preset used for casting sessions: full-band
    /// stereo Opus and a 2 Mbit/s video floor preferring H264.
    pub fn high_quality() -> Self {
        QualityPolicy {
            video: Some(VideoQuality {
                bitrate: Some(2_000_000),
                codecs: vec!["H264".to_owned(), "VP9".to_owned(), "VP8".to_owned()],
            }),
            audio: Some(AudioQuality {
                stereo: Some(1),
                sprop_stereo: Some(1),
                max_average_bitrate: Some(510_000),
                max_playback_rate: Some(510_000),
                cbr: Some(0),
                use_inband_fec: Some(1),
                use_dtx: Some(1),
                max_ptime: Some(20),
                min_ptime: Some(10),
            }),
        }
    }
}
