use std::collections::HashSet;

use super::quality_policy::VideoQuality;
use super::sdp_lines::{Fmtp, MediaLine, RtpMap, SdpLine, SdpLines};

const MEDIA_KIND_VIDEO: &str = "video";
const VIDEO_CLOCK_RATE: u32 = 90000;
const RTX_CODEC: &str = "rtx";
const MIN_BITRATE_PARAM: &str = "x-google-min-bitrate";
const MAX_BITRATE_PARAM: &str = "x-google-max-bitrate";

/// CodecBucket groups the payload types of one codec name together with the
/// retransmission payload types that follow them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CodecBucket {
    pub(crate) name: String,
    pub(crate) payload_types: Vec<u8>,
}

fn is_rtx(rtpmap: &RtpMap) -> bool {
    rtpmap.name.eq_ignore_ascii_case(RTX_CODEC)
}

/// codec_buckets walks the rtpmaps in document order. A retransmission entry
/// joins the bucket of the closest preceding primary codec; one that has no
/// preceding primary forms its own bucket.
pub(crate) fn codec_buckets(rtpmaps: &[RtpMap]) -> Vec<CodecBucket> {
    let mut buckets: Vec<CodecBucket> = vec![];
    let mut last: Option<usize> = None;

    for rtpmap in rtpmaps {
        if is_rtx(rtpmap) {
            if let Some(index) = last {
                buckets[index].payload_types.push(rtpmap.payload_type);
                continue;
            }
        }

        let index = match buckets.iter().position(|b| b.name == rtpmap.name) {
            Some(index) => index,
            None => {
                buckets.push(CodecBucket {
                    name: rtpmap.name.clone(),
                    payload_types: vec![],
                });
                buckets.len() - 1
            }
        };
        buckets[index].payload_types.push(rtpmap.payload_type);
        if !is_rtx(rtpmap) {
            last = Some(index);
        }
    }

    buckets
}

/// sort_buckets orders buckets by the position of their codec in
/// `preference`. Unlisted codecs rank after every listed one and keep their
/// original relative order.
pub(crate) fn sort_buckets(buckets: &mut [CodecBucket], preference: &[String]) {
    let rank = |bucket: &CodecBucket| {
        preference
            .iter()
            .position(|codec| codec.eq_ignore_ascii_case(&bucket.name))
            .unwrap_or(preference.len())
    };
    // slice::sort_by_key is stable
    buckets.sort_by_key(rank);
}

/// A fmtp line that carries nothing but the bitrate directive. Lines like
/// this are regenerated on every rewrite rather than stacked up.
fn is_bitrate_directive(fmtp: &Fmtp<'_>) -> bool {
    let mut saw_any = false;
    for param in fmtp.parameters.split(';') {
        let key = param.split('=').next().unwrap_or_default().trim();
        if key != MIN_BITRATE_PARAM && key != MAX_BITRATE_PARAM {
            return false;
        }
        saw_any = true;
    }
    saw_any
}

pub(crate) fn bitrate_directive(payload_type: u8, bitrate: u64) -> String {
    Fmtp::marshal(
        payload_type,
        &format!("{MIN_BITRATE_PARAM}={bitrate}; {MAX_BITRATE_PARAM}={bitrate}"),
    )
}

/// apply_video reorders the codec preference list of the first video
/// section and, when a bitrate is set, places a bitrate directive in front
/// of each primary codec's format parameters.
pub(crate) fn apply_video(sdp: &mut SdpLines, policy: &VideoQuality) {
    let Some(section) = sdp.first_section(MEDIA_KIND_VIDEO) else {
        log::trace!("no video section, leaving video untouched");
        return;
    };
    let eol = sdp.default_eol().to_owned();
    let lines = &sdp.lines()[section.range()];

    let Some(media) = MediaLine::parse(&lines[0].text) else {
        return;
    };
    if media.formats.is_empty() {
        return;
    }

    let rtpmaps: Vec<RtpMap> = lines
        .iter()
        .filter_map(|line| RtpMap::parse(&line.text))
        .filter(|rtpmap| {
            rtpmap.clock_rate == VIDEO_CLOCK_RATE
                && media.formats.contains(&rtpmap.payload_type.to_string().as_str())
        })
        .collect();
    if rtpmaps.is_empty() {
        return;
    }

    let mut buckets = codec_buckets(&rtpmaps);
    sort_buckets(&mut buckets, &policy.codecs);

    // bucketed payload types refill the slots they held, in bucket order;
    // formats without a video rtpmap stay where they were
    let bucketed: HashSet<u8> = rtpmaps.iter().map(|rtpmap| rtpmap.payload_type).collect();
    let mut ordered = buckets.iter().flat_map(|b| b.payload_types.iter());
    let formats: Vec<String> = media
        .formats
        .iter()
        .map(|format| match format.parse::<u8>() {
            Ok(pt) if bucketed.contains(&pt) => ordered
                .next()
                .map(|pt| pt.to_string())
                .unwrap_or_else(|| (*format).to_owned()),
            _ => (*format).to_owned(),
        })
        .collect();

    let mut rewritten = Vec::with_capacity(lines.len() + rtpmaps.len());
    rewritten.push(SdpLine {
        text: media.marshal_with_formats(&formats),
        eol: lines[0].eol.clone(),
    });

    match policy.bitrate {
        Some(bitrate) => {
            let primaries: HashSet<u8> = rtpmaps
                .iter()
                .filter(|rtpmap| !is_rtx(rtpmap))
                .map(|rtpmap| rtpmap.payload_type)
                .collect();
            let with_fmtp: HashSet<u8> = lines
                .iter()
                .filter_map(|line| Fmtp::parse(&line.text))
                .filter(|fmtp| !is_bitrate_directive(fmtp))
                .map(|fmtp| fmtp.payload_type)
                .collect();

            for line in &lines[1..] {
                if let Some(fmtp) = Fmtp::parse(&line.text) {
                    if primaries.contains(&fmtp.payload_type) {
                        if is_bitrate_directive(&fmtp) {
                            continue;
                        }
                        rewritten.push(SdpLine::new(
                            bitrate_directive(fmtp.payload_type, bitrate),
                            &eol,
                        ));
                    }
                }

                rewritten.push(line.clone());

                if let Some(rtpmap) = RtpMap::parse(&line.text) {
                    if primaries.contains(&rtpmap.payload_type)
                        && !with_fmtp.contains(&rtpmap.payload_type)
                    {
                        rewritten.push(SdpLine::new(
                            bitrate_directive(rtpmap.payload_type, bitrate),
                            &eol,
                        ));
                    }
                }
            }
        }
        None => rewritten.extend_from_slice(&lines[1..]),
    }

    sdp.replace_range(section.range(), rewritten);
}

#[cfg(test)]
mod test {
    use super::*;

    fn rtpmap(payload_type: u8, name: &str) -> RtpMap {
        RtpMap {
            payload_type,
            name: name.to_owned(),
            clock_rate: VIDEO_CLOCK_RATE,
            encoding_parameters: None,
        }
    }

    #[test]
    fn test_codec_buckets() {
        let rtpmaps = vec![
            rtpmap(96, "VP8"),
            rtpmap(97, "rtx"),
            rtpmap(102, "H264"),
            rtpmap(103, "rtx"),
            rtpmap(104, "H264"),
            rtpmap(105, "rtx"),
            rtpmap(116, "red"),
            rtpmap(117, "rtx"),
        ];

        assert_eq!(
            codec_buckets(&rtpmaps),
            vec![
                CodecBucket {
                    name: "VP8".to_owned(),
                    payload_types: vec![96, 97],
                },
                CodecBucket {
                    name: "H264".to_owned(),
                    payload_types: vec![102, 103, 104, 105],
                },
                CodecBucket {
                    name: "red".to_owned(),
                    payload_types: vec![116, 117],
                },
            ]
        );
    }

    #[test]
    fn test_orphan_rtx_gets_own_bucket() {
        let buckets = codec_buckets(&[rtpmap(97, "rtx"), rtpmap(96, "VP8"), rtpmap(99, "rtx")]);
        assert_eq!(
            buckets,
            vec![
                CodecBucket {
                    name: "rtx".to_owned(),
                    payload_types: vec![97],
                },
                CodecBucket {
                    name: "VP8".to_owned(),
                    payload_types: vec![96, 99],
                },
            ]
        );
    }

    #[test]
    fn test_sort_buckets_is_stable_for_unlisted() {
        let mut buckets = codec_buckets(&[
            rtpmap(96, "VP8"),
            rtpmap(98, "VP9"),
            rtpmap(45, "AV1"),
            rtpmap(102, "H264"),
            rtpmap(116, "red"),
        ]);
        sort_buckets(&mut buckets, &["h264".to_owned(), "VP9".to_owned()]);

        let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["H264", "VP9", "VP8", "AV1", "red"]);
    }

    #[test]
    fn test_is_bitrate_directive() {
        let tests = vec![
            ("a=fmtp:96 x-google-min-bitrate=100; x-google-max-bitrate=100", true),
            ("a=fmtp:96 x-google-max-bitrate=100", true),
            ("a=fmtp:96 x-google-min-bitrate=100;level-asymmetry-allowed=1", false),
            ("a=fmtp:97 apt=96", false),
            ("a=fmtp:97", false),
        ];

        for (line, expected) in tests {
            let fmtp = Fmtp::parse(line).unwrap();
            assert_eq!(is_bitrate_directive(&fmtp), expected, "{line}");
        }
    }
}
