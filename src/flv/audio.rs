//! Audio tag body: the `SoundFormat`/`SoundRate`/`SoundSize`/`SoundType` header byte, followed
//! (for AAC only) by an `AACPacketType` byte, then the raw audio payload.

use crate::flv::FlvError;

pub const SOUND_FORMAT_LINEAR_PCM_PLATFORM_ENDIAN: u8 = 0;
pub const SOUND_FORMAT_ADPCM: u8 = 1;
pub const SOUND_FORMAT_MP3: u8 = 2;
pub const SOUND_FORMAT_LINEAR_PCM_LE: u8 = 3;
pub const SOUND_FORMAT_G711_A_LAW: u8 = 7;
pub const SOUND_FORMAT_G711_MU_LAW: u8 = 8;
pub const SOUND_FORMAT_AAC: u8 = 10;
pub const SOUND_FORMAT_SPEEX: u8 = 11;
pub const SOUND_FORMAT_MP3_8KHZ: u8 = 14;
pub const SOUND_FORMAT_DEVICE_SPECIFIC: u8 = 15;

pub const AAC_PACKET_TYPE_SEQUENCE_HEADER: u8 = 0;
pub const AAC_PACKET_TYPE_RAW: u8 = 1;

pub struct AudioTagHeader {
    pub sound_format: u8,
    pub sound_rate: u8,
    pub sound_size: u8,
    pub sound_type: u8,
    /// Only present when `sound_format == SOUND_FORMAT_AAC`.
    pub aac_packet_type: Option<u8>,
}

impl AudioTagHeader {
    pub fn parse(data: &[u8]) -> Result<(AudioTagHeader, &[u8]), FlvError> {
        if data.is_empty() {
            return Err(FlvError::TooShort);
        }
        let sound_format = (data[0] >> 4) & 0xf;
        let sound_rate = (data[0] >> 2) & 0x3;
        let sound_size = (data[0] >> 1) & 0x1;
        let sound_type = data[0] & 0x1;
        let mut rest = &data[1..];
        let aac_packet_type = if sound_format == SOUND_FORMAT_AAC {
            if rest.is_empty() {
                return Err(FlvError::TooShort);
            }
            let v = rest[0];
            rest = &rest[1..];
            Some(v)
        } else {
            None
        };
        Ok((
            AudioTagHeader {
                sound_format,
                sound_rate,
                sound_size,
                sound_type,
                aac_packet_type,
            },
            rest,
        ))
    }
}

/// `data` following the parsed header: the AAC sequence header / raw frame bytes, or the raw
/// codec payload for every other `SoundFormat`.
pub struct AudioTag<'buf> {
    pub header: AudioTagHeader,
    pub data: &'buf [u8],
}
impl<'buf> AudioTag<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<AudioTag<'buf>, FlvError> {
        let (header, data) = AudioTagHeader::parse(payload)?;
        Ok(AudioTag { header, data })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_aac_header() {
        // sound_format=10(AAC), rate=3, size=1, type=1 -> 1010 11 1 1 = 0xaf
        let data = hex!("af" "00" "11 22");
        let (header, rest) = AudioTagHeader::parse(&data).unwrap();
        assert_eq!(header.sound_format, SOUND_FORMAT_AAC);
        assert_eq!(header.aac_packet_type, Some(AAC_PACKET_TYPE_SEQUENCE_HEADER));
        assert_eq!(rest, &[0x11, 0x22]);
    }

    #[test]
    fn parses_non_aac_header_without_packet_type() {
        // sound_format=2(MP3), rate=3, size=1, type=1 -> 0010 1111 = 0x2f
        let data = hex!("2f" "11 22");
        let (header, rest) = AudioTagHeader::parse(&data).unwrap();
        assert_eq!(header.sound_format, SOUND_FORMAT_MP3);
        assert_eq!(header.aac_packet_type, None);
        assert_eq!(rest, &[0x11, 0x22]);
    }
}
