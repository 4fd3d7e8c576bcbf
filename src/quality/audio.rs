use super::quality_policy::AudioQuality;
use super::sdp_lines::{Fmtp, RtpMap, SdpLines};

const MEDIA_KIND_AUDIO: &str = "audio";
const OPUS_CODEC: &str = "opus";
const OPUS_CLOCK_RATE: u32 = 48000;
const OPUS_CHANNELS: &str = "2";

/// Written in place of a zero bitrate cap: 128 KiB in bits.
pub(crate) const DEFAULT_OPUS_BITRATE_CAP: u32 = 128 * 1024 * 8;

fn is_opus(rtpmap: &RtpMap) -> bool {
    rtpmap.name.eq_ignore_ascii_case(OPUS_CODEC)
        && rtpmap.clock_rate == OPUS_CLOCK_RATE
        && rtpmap.encoding_parameters.as_deref() == Some(OPUS_CHANNELS)
}

/// opus_parameters builds the fmtp value in its fixed field order.
pub(crate) fn opus_parameters(policy: &AudioQuality) -> String {
    let mut params = format!(
        "stereo={};sprop-stereo={}",
        policy.stereo.unwrap_or(1),
        policy.sprop_stereo.unwrap_or(1)
    );

    let cap = |v: u32| if v == 0 { DEFAULT_OPUS_BITRATE_CAP } else { v };
    if let Some(v) = policy.max_average_bitrate {
        params.push_str(&format!("; maxaveragebitrate={}", cap(v)));
    }
    if let Some(v) = policy.max_playback_rate {
        params.push_str(&format!("; maxplaybackrate={}", cap(v)));
    }
    if let Some(v) = policy.cbr {
        params.push_str(&format!("; cbr={v}"));
    }
    if let Some(v) = policy.use_inband_fec {
        params.push_str(&format!("; useinbandfec={v}"));
    }
    if let Some(v) = policy.use_dtx {
        params.push_str(&format!("; usedtx={v}"));
    }
    if let Some(v) = policy.max_ptime {
        params.push_str(&format!("; maxptime={v}"));
    }
    if let Some(v) = policy.min_ptime {
        params.push_str(&format!("; minptime={v}"));
    }

    params
}

/// apply_audio replaces the format parameters of the first stereo Opus
/// entry with ones built from `policy`. Descriptions without such an entry,
/// or where it has no fmtp line, are left alone.
pub(crate) fn apply_audio(sdp: &mut SdpLines, policy: &AudioQuality) {
    let target = sdp
        .media_sections()
        .into_iter()
        .filter(|section| section.kind == MEDIA_KIND_AUDIO)
        .find_map(|section| {
            let lines = &sdp.lines()[section.range()];
            let opus = lines
                .iter()
                .filter_map(|line| RtpMap::parse(&line.text))
                .find(is_opus)?;
            let index = lines.iter().position(|line| {
                Fmtp::parse(&line.text).is_some_and(|fmtp| fmtp.payload_type == opus.payload_type)
            })?;
            Some((section.start + index, opus.payload_type))
        });

    let Some((index, payload_type)) = target else {
        log::trace!("no opus format parameters, leaving audio untouched");
        return;
    };

    if let Some(line) = sdp.line_mut(index) {
        line.text = Fmtp::marshal(payload_type, &opus_parameters(policy));
    }
}
