//! A line-preserving view over SDP text.
//!
//! Only the fields the quality rewriter needs are parsed (media lines,
//! rtpmap and fmtp attributes). Every other line is carried as-is together
//! with its original terminator, so marshalling an unmodified `SdpLines`
//! reproduces the input byte for byte.

use std::ops::Range;

const MEDIA_LINE_PREFIX: &str = "m=";
const RTPMAP_PREFIX: &str = "a=rtpmap:";
const FMTP_PREFIX: &str = "a=fmtp:";
const DEFAULT_EOL: &str = "\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SdpLine {
    pub(crate) text: String,
    pub(crate) eol: String,
}

impl SdpLine {
    pub(crate) fn new(text: String, eol: &str) -> Self {
        SdpLine {
            text,
            eol: eol.to_owned(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SdpLines {
    lines: Vec<SdpLine>,
}

/// MediaSection is the half-open line range `[start, end)` of one `m=`
/// block; `start` is the index of the media line itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MediaSection {
    pub(crate) kind: String,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl MediaSection {
    pub(crate) fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl SdpLines {
    pub(crate) fn parse(sdp: &str) -> Self {
        let lines = sdp
            .split_inclusive('\n')
            .map(|raw| {
                let (text, eol) = if let Some(text) = raw.strip_suffix("\r\n") {
                    (text, "\r\n")
                } else if let Some(text) = raw.strip_suffix('\n') {
                    (text, "\n")
                } else {
                    (raw, "")
                };
                SdpLine::new(text.to_owned(), eol)
            })
            .collect();

        SdpLines { lines }
    }

    pub(crate) fn marshal(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
            out.push_str(&line.eol);
        }
        out
    }

    pub(crate) fn lines(&self) -> &[SdpLine] {
        &self.lines
    }

    pub(crate) fn line_mut(&mut self, index: usize) -> Option<&mut SdpLine> {
        self.lines.get_mut(index)
    }

    /// The terminator new lines get: the first one used in the document.
    pub(crate) fn default_eol(&self) -> &str {
        self.lines
            .iter()
            .map(|line| line.eol.as_str())
            .find(|eol| !eol.is_empty())
            .unwrap_or(DEFAULT_EOL)
    }

    pub(crate) fn replace_range(&mut self, range: Range<usize>, with: Vec<SdpLine>) {
        self.lines.splice(range, with);
    }

    pub(crate) fn media_sections(&self) -> Vec<MediaSection> {
        let mut sections: Vec<MediaSection> = vec![];
        for (i, line) in self.lines.iter().enumerate() {
            if let Some(media) = MediaLine::parse(&line.text) {
                if let Some(last) = sections.last_mut() {
                    last.end = i;
                }
                sections.push(MediaSection {
                    kind: media.media.to_owned(),
                    start: i,
                    end: self.lines.len(),
                });
            }
        }
        sections
    }

    pub(crate) fn first_section(&self, kind: &str) -> Option<MediaSection> {
        self.media_sections().into_iter().find(|s| s.kind == kind)
    }
}

/// MediaLine is `m=<media> <port> <proto> <fmt> ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MediaLine<'a> {
    pub(crate) media: &'a str,
    pub(crate) port: &'a str,
    pub(crate) proto: &'a str,
    pub(crate) formats: Vec<&'a str>,
}

impl<'a> MediaLine<'a> {
    pub(crate) fn parse(line: &'a str) -> Option<Self> {
        let value = line.strip_prefix(MEDIA_LINE_PREFIX)?;
        let mut fields = value.split(' ').filter(|f| !f.is_empty());
        let media = fields.next()?;
        let port = fields.next()?;
        let proto = fields.next()?;

        Some(MediaLine {
            media,
            port,
            proto,
            formats: fields.collect(),
        })
    }

    pub(crate) fn marshal_with_formats(&self, formats: &[String]) -> String {
        let mut out = format!("{MEDIA_LINE_PREFIX}{} {} {}", self.media, self.port, self.proto);
        for format in formats {
            out.push(' ');
            out.push_str(format);
        }
        out
    }
}

/// RtpMap is `a=rtpmap:<payload type> <encoding name>/<clock rate>[/<encoding parameters>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RtpMap {
    pub(crate) payload_type: u8,
    pub(crate) name: String,
    pub(crate) clock_rate: u32,
    pub(crate) encoding_parameters: Option<String>,
}

impl RtpMap {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let value = line.strip_prefix(RTPMAP_PREFIX)?;
        let (payload_type, encoding) = value.split_once(' ')?;
        let payload_type = payload_type.parse::<u8>().ok()?;

        let mut split = encoding.trim().split('/');
        let name = split.next()?.to_owned();
        let clock_rate = split.next()?.parse::<u32>().ok()?;
        let encoding_parameters = split.next().map(str::to_owned);

        Some(RtpMap {
            payload_type,
            name,
            clock_rate,
            encoding_parameters,
        })
    }
}

/// Fmtp is `a=fmtp:<format> <format specific parameters>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fmtp<'a> {
    pub(crate) payload_type: u8,
    pub(crate) parameters: &'a str,
}

impl<'a> Fmtp<'a> {
    pub(crate) fn parse(line: &'a str) -> Option<Self> {
        let value = line.strip_prefix(FMTP_PREFIX)?;
        let (payload_type, parameters) = match value.split_once(' ') {
            Some((pt, params)) => (pt, params),
            None => (value, ""),
        };

        Some(Fmtp {
            payload_type: payload_type.parse::<u8>().ok()?,
            parameters,
        })
    }

    pub(crate) fn marshal(payload_type: u8, parameters: &str) -> String {
        format!("{FMTP_PREFIX}{payload_type} {parameters}")
    }
}
