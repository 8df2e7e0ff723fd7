//! Video tag body: the `FrameType`/`CodecID` header byte, then (for AVC only) an `AVCPacketType`
//! byte and a 24-bit signed composition time, followed by the codec payload.

use crate::flv::FlvError;

pub const FRAME_TYPE_KEY: u8 = 1;
pub const FRAME_TYPE_INTER: u8 = 2;
pub const FRAME_TYPE_DISPOSABLE_INTER: u8 = 3;
pub const FRAME_TYPE_GENERATED_KEY: u8 = 4;
pub const FRAME_TYPE_COMMAND: u8 = 5;

pub const CODEC_ID_SORENSON_H263: u8 = 2;
pub const CODEC_ID_SCREEN_VIDEO: u8 = 3;
pub const CODEC_ID_VP6: u8 = 4;
pub const CODEC_ID_VP6_ALPHA: u8 = 5;
pub const CODEC_ID_SCREEN_VIDEO_V2: u8 = 6;
pub const CODEC_ID_AVC: u8 = 7;
/// Enhanced RTMP's HEVC extension reuses the legacy `CodecID` field with this value when the
/// `IsExHeader` bit (unused by plain FLV) isn't set; recognised here only so an HEVC stream is
/// reported as `UnsupportedFeature` rather than silently misparsed as AVC.
pub const CODEC_ID_HEVC: u8 = 12;

pub const AVC_PACKET_TYPE_SEQUENCE_HEADER: u8 = 0;
pub const AVC_PACKET_TYPE_NALU: u8 = 1;
pub const AVC_PACKET_TYPE_END_OF_SEQUENCE: u8 = 2;

pub struct VideoTagHeader {
    pub frame_type: u8,
    pub codec_id: u8,
    /// Only present when `codec_id == CODEC_ID_AVC`.
    pub avc_packet_type: Option<u8>,
    /// Milliseconds, only present when `codec_id == CODEC_ID_AVC`. Signed per the FLV spec even
    /// though it has no practical use outside B-frame reordering.
    pub composition_time: Option<i32>,
}

impl VideoTagHeader {
    pub fn parse(data: &[u8]) -> Result<(VideoTagHeader, &[u8]), FlvError> {
        if data.is_empty() {
            return Err(FlvError::TooShort);
        }
        let frame_type = (data[0] >> 4) & 0xf;
        let codec_id = data[0] & 0xf;
        let mut rest = &data[1..];
        let (avc_packet_type, composition_time) = if codec_id == CODEC_ID_AVC {
            if rest.len() < 4 {
                return Err(FlvError::TooShort);
            }
            let avc_packet_type = rest[0];
            let composition_time = read_i24be(&rest[1..4]);
            rest = &rest[4..];
            (Some(avc_packet_type), Some(composition_time))
        } else {
            (None, None)
        };
        Ok((
            VideoTagHeader {
                frame_type,
                codec_id,
                avc_packet_type,
                composition_time,
            },
            rest,
        ))
    }
}

fn read_i24be(b: &[u8]) -> i32 {
    let unsigned = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
    ((unsigned << 8) as i32) >> 8
}

/// `data` following the parsed header, already narrowed by `avc_packet_type` where applicable:
/// an `AVCDecoderConfigurationRecord` for a sequence header, a length-prefixed NAL sequence for
/// `Nalu`, empty for `EndOfSequence`, or the opaque codec payload for a non-AVC `codec_id`.
pub struct VideoTag<'buf> {
    pub header: VideoTagHeader,
    pub data: &'buf [u8],
}
impl<'buf> VideoTag<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<VideoTag<'buf>, FlvError> {
        let (header, data) = VideoTagHeader::parse(payload)?;
        Ok(VideoTag { header, data })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_avc_nalu_header() {
        // frame_type=1(key), codec_id=7(AVC) -> 0x17; packet_type=1(NALU); composition_time=0
        let data = hex!("17" "01" "00 00 00" "de ad be ef");
        let (header, rest) = VideoTagHeader::parse(&data).unwrap();
        assert_eq!(header.frame_type, FRAME_TYPE_KEY);
        assert_eq!(header.codec_id, CODEC_ID_AVC);
        assert_eq!(header.avc_packet_type, Some(AVC_PACKET_TYPE_NALU));
        assert_eq!(header.composition_time, Some(0));
        assert_eq!(rest, &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn parses_negative_composition_time() {
        // composition_time = -1, stored as 0xffffff
        let data = hex!("17" "01" "ff ff ff");
        let (header, _rest) = VideoTagHeader::parse(&data).unwrap();
        assert_eq!(header.composition_time, Some(-1));
    }

    #[test]
    fn non_avc_codec_has_no_packet_type() {
        // frame_type=1(key), codec_id=2(Sorenson H.263) -> 0x12
        let data = hex!("12" "ab cd ef");
        let (header, rest) = VideoTagHeader::parse(&data).unwrap();
        assert_eq!(header.codec_id, CODEC_ID_SORENSON_H263);
        assert_eq!(header.avc_packet_type, None);
        assert_eq!(header.composition_time, None);
        assert_eq!(rest, &[0xab, 0xcd, 0xef]);
    }
}
