//! Adobe FLV container parsing: the 9-byte file header followed by a tag stream, each tag
//! trailed by a 32-bit "previous tag size" field. Mirrors the sequential, single-pass style of
//! [`crate::mp4`]'s box walk, but over a flat list rather than a recursive tree.

pub mod amf0;
pub mod audio;
pub mod tag;
pub mod video;

use std::convert::TryInto;

use crate::warning::{Warning, Warnings};
use audio::AudioTag;
use tag::TagHeader;
use video::VideoTag;

#[derive(Debug)]
pub enum FlvError {
    TooShort,
    /// The file header's first 3 bytes were not (case-insensitively) `"FLV"`.
    InvalidSignature,
    /// A field violated a format constraint, e.g. a tag's `data_size == 0`.
    InvalidField(&'static str),
    Amf0UnsupportedMarker(u8),
}

impl std::fmt::Display for FlvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlvError::TooShort => write!(f, "not enough bytes remaining"),
            FlvError::InvalidSignature => write!(f, "missing 'FLV' file signature"),
            FlvError::InvalidField(msg) => write!(f, "invalid field: {}", msg),
            FlvError::Amf0UnsupportedMarker(m) => write!(f, "unsupported AMF0 marker {:#x}", m),
        }
    }
}
impl std::error::Error for FlvError {}

pub const HEADER_SIZE: usize = 9;

/// The 9-byte FLV file header.
pub struct FlvHeader {
    pub version: u8,
    pub has_audio: bool,
    pub has_video: bool,
    pub data_offset: u32,
}
impl FlvHeader {
    pub fn parse(data: &[u8]) -> Result<(FlvHeader, &[u8]), FlvError> {
        if data.len() < HEADER_SIZE {
            return Err(FlvError::TooShort);
        }
        if !data[0].eq_ignore_ascii_case(&b'F')
            || !data[1].eq_ignore_ascii_case(&b'L')
            || !data[2].eq_ignore_ascii_case(&b'V')
        {
            return Err(FlvError::InvalidSignature);
        }
        let version = data[3];
        let flags = data[4];
        let has_audio = flags & 0b0000_0100 != 0;
        let has_video = flags & 0b0000_0001 != 0;
        let data_offset = u32::from_be_bytes(data[5..9].try_into().unwrap());
        let header = FlvHeader {
            version,
            has_audio,
            has_video,
            data_offset,
        };
        let skip = (data_offset as usize).max(HEADER_SIZE).min(data.len());
        Ok((header, &data[skip..]))
    }
}

/// One tag's parsed payload, dispatched by `TagHeader::tag_type`.
pub enum TagBody<'buf> {
    Audio(AudioTag<'buf>),
    Video(VideoTag<'buf>),
    /// `(name, value)` decoded from the AMF0 payload, e.g. `("onMetaData", EcmaArray{..})`.
    Script(String, amf0::Value),
}

pub struct Tag<'buf> {
    pub header: TagHeader,
    pub body: TagBody<'buf>,
}

/// The parsed tag stream of an FLV file.
pub struct Flv<'buf> {
    pub header: FlvHeader,
    pub tags: Vec<Tag<'buf>>,
}

impl<'buf> Flv<'buf> {
    /// Parses the file header then walks every tag, collecting non-fatal problems (an unknown
    /// tag type, a `previous_tag_size` mismatch, a video tag using an unsupported codec) into
    /// `warnings` rather than aborting -- the same best-effort contract [`crate::mp4::Boxes`]
    /// follows.
    pub fn parse(data: &'buf [u8], warnings: &mut Warnings) -> Result<Flv<'buf>, FlvError> {
        let (header, mut rest) = FlvHeader::parse(data)?;
        let mut tags = Vec::new();
        let mut previous_data_size: Option<u32> = None;

        while !rest.is_empty() {
            if rest.len() < 4 {
                break;
            }
            let previous_tag_size = u32::from_be_bytes(rest[0..4].try_into().unwrap());
            if let Some(prev_data_size) = previous_data_size {
                let expected = tag::HEADER_SIZE as u32 + prev_data_size;
                if previous_tag_size != expected {
                    warnings.push(Warning::SizeMismatch {
                        expected: u64::from(expected),
                        actual: u64::from(previous_tag_size),
                    });
                }
            }
            rest = &rest[4..];
            if rest.is_empty() {
                break;
            }

            let (tag_header, body_and_rest) = match TagHeader::parse(rest) {
                Ok(v) => v,
                Err(_) => break,
            };
            if tag_header.data_size == 0 {
                warnings.push(Warning::InsufficientSize);
                break;
            }
            if body_and_rest.len() < tag_header.data_size as usize {
                warnings.push(Warning::InsufficientSize);
                break;
            }
            let (payload, next) = body_and_rest.split_at(tag_header.data_size as usize);
            previous_data_size = Some(tag_header.data_size);
            rest = next;

            if tag_header.filter {
                // Encryption filter header precedes the real payload; we don't decrypt, so the
                // tag is skipped entirely rather than misread as plaintext.
                warnings.push(Warning::UnsupportedFeature);
                continue;
            }

            let body = match tag_header.tag_type {
                tag::TAG_TYPE_AUDIO => match AudioTag::parse(payload) {
                    Ok(a) => TagBody::Audio(a),
                    Err(_) => {
                        warnings.push(Warning::InsufficientSize);
                        continue;
                    }
                },
                tag::TAG_TYPE_VIDEO => match VideoTag::parse(payload) {
                    Ok(v) => TagBody::Video(v),
                    Err(_) => {
                        warnings.push(Warning::InsufficientSize);
                        continue;
                    }
                },
                tag::TAG_TYPE_SCRIPT_DATA => {
                    match amf0::decode_name_value(payload) {
                        Ok(((name, value), _rest)) => TagBody::Script(name, value),
                        Err(_) => {
                            warnings.push(Warning::InsufficientSize);
                            continue;
                        }
                    }
                }
                other => {
                    warnings.push(Warning::UnknownTagType(other));
                    continue;
                }
            };

            tags.push(Tag {
                header: tag_header,
                body,
            });
        }

        Ok(Flv { header, tags })
    }

    /// The `AVCDecoderConfigurationRecord` bytes of the most recent sequence-header video tag at
    /// or before `tags[..=upto]`, per the cross-tag caching §4.6 describes. Modelled as a
    /// post-parse lookup (per §9's guidance) rather than a field threaded through parsing.
    pub fn avc_config_before(&self, upto: usize) -> Option<&[u8]> {
        self.tags[..=upto.min(self.tags.len().saturating_sub(1))]
            .iter()
            .rev()
            .find_map(|t| match &t.body {
                TagBody::Video(v)
                    if v.header.codec_id == video::CODEC_ID_AVC
                        && v.header.avc_packet_type == Some(video::AVC_PACKET_TYPE_SEQUENCE_HEADER) =>
                {
                    Some(v.data)
                }
                _ => None,
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_tag(tag_type: u8, timestamp_ms: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(tag_type & 0x1f);
        let data_size = payload.len() as u32;
        out.extend_from_slice(&data_size.to_be_bytes()[1..4]);
        out.extend_from_slice(&timestamp_ms.to_be_bytes()[1..4]);
        out.push((timestamp_ms >> 24) as u8);
        out.extend_from_slice(&[0, 0, 0]);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn rejects_bad_signature() {
        let data = hex!("46 4c 00" "01" "05" "00 00 00 09");
        assert!(matches!(
            FlvHeader::parse(&data),
            Err(FlvError::InvalidSignature)
        ));
    }

    #[test]
    fn parses_header_flags() {
        let data = hex!("46 4c 56" "01" "05" "00 00 00 09");
        let (header, rest) = FlvHeader::parse(&data).unwrap();
        assert!(header.has_audio);
        assert!(header.has_video);
        assert_eq!(header.data_offset, 9);
        assert!(rest.is_empty());
    }

    #[test]
    fn parses_single_audio_tag_stream() {
        let mut data = hex!("46 4c 56" "01" "04" "00 00 00 09").to_vec(); // header, audio only
        data.extend_from_slice(&hex!("00 00 00 00")); // previous tag size before tag 0
        let audio_payload = hex!("af" "01" "11 22"); // AAC raw
        let tag = make_tag(tag::TAG_TYPE_AUDIO, 0, &audio_payload);
        data.extend_from_slice(&tag);
        data.extend_from_slice(&((11 + audio_payload.len()) as u32).to_be_bytes());

        let mut warnings = Warnings::new();
        let flv = Flv::parse(&data, &mut warnings).unwrap();
        assert_eq!(flv.tags.len(), 1);
        assert!(warnings.is_empty());
        match &flv.tags[0].body {
            TagBody::Audio(a) => assert_eq!(a.data, &[0x11, 0x22]),
            _ => panic!("expected audio tag"),
        }
    }

    #[test]
    fn flags_previous_tag_size_mismatch() {
        let mut data = hex!("46 4c 56" "01" "04" "00 00 00 09").to_vec();
        data.extend_from_slice(&hex!("00 00 00 00"));
        let audio_payload = hex!("2f" "ab");
        data.extend_from_slice(&make_tag(tag::TAG_TYPE_AUDIO, 0, &audio_payload));
        data.extend_from_slice(&hex!("00 00 00 01")); // wrong, should be 11 + 2 = 13

        let mut warnings = Warnings::new();
        let flv = Flv::parse(&data, &mut warnings).unwrap();
        assert_eq!(flv.tags.len(), 1);
        assert!(!warnings.is_empty());
    }
}
