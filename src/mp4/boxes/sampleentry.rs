//! Sample entries (`avc1`, `hev1`/`hvc1`, `av01`, `mp4a`) and the boxes nested inside them
//! (`avcC`, `hvcC`, `av1C`, `esds`, `pasp`, `btrt`, `colr`, `hfov`).
//!
//! Every sample entry shares an 8-byte `SampleEntry` prefix (6 reserved bytes, a 2-byte
//! `data_reference_index`), followed by a family-specific fixed block (`VisualSampleEntry` or
//! `AudioSampleEntry`), followed by the entry's child boxes.

use crate::av1::Av1CodecConfigurationRecord;
use crate::avcc::AvcDecoderConfigurationRecord;
use crate::hevc::HevcDecoderConfigurationRecord;
use crate::mp4::header::{read_full_header, BoxError, BoxHeader, BoxIter};
use std::convert::TryInto;

fn data_reference_index(entry: &[u8]) -> Result<(u16, &[u8]), BoxError> {
    if entry.len() < 8 {
        return Err(BoxError::InsufficientSize);
    }
    let idx = u16::from_be_bytes([entry[6], entry[7]]);
    Ok((idx, &entry[8..]))
}

/// The 70-byte fixed block shared by `avc1`/`hev1`/`hvc1`/`av01` (and any other visual codec).
pub struct VisualSampleEntryFixed<'buf> {
    data: &'buf [u8],
}
impl<'buf> VisualSampleEntryFixed<'buf> {
    const SIZE: usize = 70;

    fn parse(data: &'buf [u8]) -> Result<(VisualSampleEntryFixed<'buf>, &'buf [u8]), BoxError> {
        if data.len() < Self::SIZE {
            return Err(BoxError::InsufficientSize);
        }
        let (fixed, rest) = data.split_at(Self::SIZE);
        Ok((VisualSampleEntryFixed { data: fixed }, rest))
    }
    pub fn width(&self) -> u16 {
        u16::from_be_bytes([self.data[16], self.data[17]])
    }
    pub fn height(&self) -> u16 {
        u16::from_be_bytes([self.data[18], self.data[19]])
    }
    pub fn horizresolution(&self) -> f64 {
        i32::from_be_bytes(self.data[20..24].try_into().unwrap()) as f64 / 65536.0
    }
    pub fn vertresolution(&self) -> f64 {
        i32::from_be_bytes(self.data[24..28].try_into().unwrap()) as f64 / 65536.0
    }
    pub fn frame_count(&self) -> u16 {
        u16::from_be_bytes([self.data[32], self.data[33]])
    }
    /// Pascal-style string: first byte is the length, remaining 31 bytes are NUL-padded.
    pub fn compressorname(&self) -> &'buf [u8] {
        let len = self.data[34] as usize;
        &self.data[35..35 + len.min(31)]
    }
    pub fn depth(&self) -> u16 {
        u16::from_be_bytes([self.data[66], self.data[67]])
    }
}

/// The 20-byte fixed block shared by audio sample entries (`mp4a`).
pub struct AudioSampleEntryFixed<'buf> {
    data: &'buf [u8],
}
impl<'buf> AudioSampleEntryFixed<'buf> {
    const SIZE: usize = 20;

    fn parse(data: &'buf [u8]) -> Result<(AudioSampleEntryFixed<'buf>, &'buf [u8]), BoxError> {
        if data.len() < Self::SIZE {
            return Err(BoxError::InsufficientSize);
        }
        let (fixed, rest) = data.split_at(Self::SIZE);
        Ok((AudioSampleEntryFixed { data: fixed }, rest))
    }
    pub fn channelcount(&self) -> u16 {
        u16::from_be_bytes([self.data[8], self.data[9]])
    }
    pub fn samplesize(&self) -> u16 {
        u16::from_be_bytes([self.data[10], self.data[11]])
    }
    /// 16.16 fixed point; the fractional half is discarded per the format's convention.
    pub fn samplerate(&self) -> u32 {
        u32::from_be_bytes(self.data[16..20].try_into().unwrap()) >> 16
    }
}

pub struct PaspBox {
    pub h_spacing: u32,
    pub v_spacing: u32,
}
impl PaspBox {
    pub fn parse(payload: &[u8]) -> Result<PaspBox, BoxError> {
        if payload.len() < 8 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(PaspBox {
            h_spacing: u32::from_be_bytes(payload[0..4].try_into().unwrap()),
            v_spacing: u32::from_be_bytes(payload[4..8].try_into().unwrap()),
        })
    }
}

pub struct BtrtBox {
    pub buffer_size_db: u32,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
}
impl BtrtBox {
    pub fn parse(payload: &[u8]) -> Result<BtrtBox, BoxError> {
        if payload.len() < 12 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(BtrtBox {
            buffer_size_db: u32::from_be_bytes(payload[0..4].try_into().unwrap()),
            max_bitrate: u32::from_be_bytes(payload[4..8].try_into().unwrap()),
            avg_bitrate: u32::from_be_bytes(payload[8..12].try_into().unwrap()),
        })
    }
}

/// `colr`: colour information, either `nclx` (on-the-wire primaries/transfer/matrix) or an ICC
/// profile (`rICC`/`prof`), identified by its 4-byte `colour_type`.
pub struct ColrBox<'buf> {
    pub colour_type: [u8; 4],
    pub data: &'buf [u8],
}
impl<'buf> ColrBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<ColrBox<'buf>, BoxError> {
        if payload.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(ColrBox {
            colour_type: payload[0..4].try_into().unwrap(),
            data: &payload[4..],
        })
    }
}

/// `hfov`: horizontal field of view, a vendor extension carrying a single fixed-point degree
/// value. Recognised but not otherwise acted on.
pub struct HfovBox {
    pub fov: u32,
}
impl HfovBox {
    pub fn parse(payload: &[u8]) -> Result<HfovBox, BoxError> {
        if payload.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(HfovBox {
            fov: u32::from_be_bytes(payload[0..4].try_into().unwrap()),
        })
    }
}

/// `vexu`: Video Extended Usage box, a container carrying stereo/spatial video metadata (e.g. an
/// `eyes` child describing the left/right eye views). Its children are vendor-specific beyond
/// what this crate needs, so the raw payload is kept rather than decoded further.
pub struct VexuBox<'buf> {
    pub data: &'buf [u8],
}
impl<'buf> VexuBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<VexuBox<'buf>, BoxError> {
        Ok(VexuBox { data: payload })
    }
}

/// `avcC`: wraps [`AvcDecoderConfigurationRecord`].
pub struct AvcCBox<'buf> {
    pub record: AvcDecoderConfigurationRecord<'buf>,
}
/// `hvcC`: wraps [`HevcDecoderConfigurationRecord`].
pub struct HvcCBox<'buf> {
    pub record: HevcDecoderConfigurationRecord<'buf>,
}
/// `av1C`: wraps [`Av1CodecConfigurationRecord`].
pub struct Av1CBox<'buf> {
    pub record: Av1CodecConfigurationRecord<'buf>,
}

#[derive(Default)]
pub struct VisualChildBoxes<'buf> {
    pub avcc: Option<AvcCBox<'buf>>,
    pub hvcc: Option<HvcCBox<'buf>>,
    pub av1c: Option<Av1CBox<'buf>>,
    pub pasp: Option<PaspBox>,
    pub btrt: Option<BtrtBox>,
    pub colr: Option<ColrBox<'buf>>,
    pub hfov: Option<HfovBox>,
    pub vexu: Option<VexuBox<'buf>>,
}

impl<'buf> VisualChildBoxes<'buf> {
    fn parse(data: &'buf [u8]) -> VisualChildBoxes<'buf> {
        let mut out = VisualChildBoxes::default();
        for item in BoxIter::new(data) {
            let (header, payload) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"avcC" => {
                    if let Ok(record) = AvcDecoderConfigurationRecord::try_from(payload) {
                        out.avcc = Some(AvcCBox { record });
                    }
                }
                b"hvcC" => {
                    if let Ok(record) = HevcDecoderConfigurationRecord::try_from(payload) {
                        out.hvcc = Some(HvcCBox { record });
                    }
                }
                b"av1C" => {
                    if let Ok(record) = Av1CodecConfigurationRecord::try_from(payload) {
                        out.av1c = Some(Av1CBox { record });
                    }
                }
                b"pasp" => out.pasp = PaspBox::parse(payload).ok(),
                b"btrt" => out.btrt = BtrtBox::parse(payload).ok(),
                b"colr" => out.colr = ColrBox::parse(payload).ok(),
                b"hfov" => out.hfov = HfovBox::parse(payload).ok(),
                b"vexu" => out.vexu = VexuBox::parse(payload).ok(),
                _ => {}
            }
        }
        out
    }
}

use std::convert::TryFrom;

/// A visual sample entry: `avc1`, `hev1`, `hvc1` or `av01`.
pub struct VisualSampleEntry<'buf> {
    pub data_reference_index: u16,
    pub fixed: VisualSampleEntryFixed<'buf>,
    pub children: VisualChildBoxes<'buf>,
}
impl<'buf> VisualSampleEntry<'buf> {
    pub fn parse(entry: &'buf [u8]) -> Result<VisualSampleEntry<'buf>, BoxError> {
        let (data_reference_index, rest) = data_reference_index(entry)?;
        let (fixed, rest) = VisualSampleEntryFixed::parse(rest)?;
        let children = VisualChildBoxes::parse(rest);
        Ok(VisualSampleEntry {
            data_reference_index,
            fixed,
            children,
        })
    }
}

/// `esds`: Elementary Stream Descriptor box, carrying a tag-length-value descriptor tree.
/// Only the container-level framing is parsed; the embedded MPEG-4 audio config bytes
/// (`DecoderSpecificInfo`) are kept opaque.
pub struct EsdsBox<'buf> {
    pub es_id: u16,
    pub stream_priority: u8,
    pub object_type_indication: Option<u8>,
    pub stream_type: Option<u8>,
    pub buffer_size_db: Option<u32>,
    pub max_bitrate: Option<u32>,
    pub avg_bitrate: Option<u32>,
    pub decoder_specific_info: Option<&'buf [u8]>,
}

/// Reads an MPEG-4 `expandable class size` field: up to 4 bytes, each contributing 7 bits, with
/// the MSB of each byte a continuation flag.
fn read_descriptor_size(data: &[u8]) -> Option<(u32, &[u8])> {
    let mut size: u32 = 0;
    let mut rest = data;
    for _ in 0..4 {
        let (&b, tail) = rest.split_first()?;
        rest = tail;
        size = (size << 7) | u32::from(b & 0x7f);
        if b & 0x80 == 0 {
            return Some((size, rest));
        }
    }
    Some((size, rest))
}

impl<'buf> EsdsBox<'buf> {
    const TAG_ES_DESCRIPTOR: u8 = 0x03;
    const TAG_DECODER_CONFIG_DESCRIPTOR: u8 = 0x04;
    const TAG_DECODER_SPECIFIC_INFO: u8 = 0x05;
    const TAG_SL_CONFIG_DESCRIPTOR: u8 = 0x06;

    pub fn parse(payload: &'buf [u8]) -> Result<EsdsBox<'buf>, BoxError> {
        let (_version, _flags, body) = read_full_header(payload)?;
        let mut out = EsdsBox {
            es_id: 0,
            stream_priority: 0,
            object_type_indication: None,
            stream_type: None,
            buffer_size_db: None,
            max_bitrate: None,
            avg_bitrate: None,
            decoder_specific_info: None,
        };
        Self::read_descriptors(body, &mut out);
        Ok(out)
    }

    fn read_descriptors(mut data: &'buf [u8], out: &mut EsdsBox<'buf>) {
        while data.len() >= 2 {
            let tag = data[0];
            let (size, body) = match read_descriptor_size(&data[1..]) {
                Some(v) => v,
                None => return,
            };
            let size = size as usize;
            if body.len() < size {
                return;
            }
            let (content, rest) = body.split_at(size);
            match tag {
                Self::TAG_ES_DESCRIPTOR => {
                    if content.len() >= 3 {
                        out.es_id = u16::from_be_bytes([content[0], content[1]]);
                        out.stream_priority = content[2] & 0x1f;
                        Self::read_descriptors(&content[3..], out);
                    }
                }
                Self::TAG_DECODER_CONFIG_DESCRIPTOR => {
                    if content.len() >= 13 {
                        out.object_type_indication = Some(content[0]);
                        out.stream_type = Some((content[1] >> 2) & 0x3f);
                        out.buffer_size_db = Some(u32::from_be_bytes([
                            0, content[2], content[3], content[4],
                        ]));
                        out.max_bitrate = Some(u32::from_be_bytes(
                            content[5..9].try_into().unwrap(),
                        ));
                        out.avg_bitrate = Some(u32::from_be_bytes(
                            content[9..13].try_into().unwrap(),
                        ));
                        Self::read_descriptors(&content[13..], out);
                    }
                }
                Self::TAG_DECODER_SPECIFIC_INFO => {
                    out.decoder_specific_info = Some(content);
                }
                Self::TAG_SL_CONFIG_DESCRIPTOR => {
                    // predefined=0x02 layer: no further fields we need.
                }
                _ => {}
            }
            data = rest;
        }
    }
}

/// An audio sample entry: `mp4a`.
pub struct AudioSampleEntry<'buf> {
    pub data_reference_index: u16,
    pub fixed: AudioSampleEntryFixed<'buf>,
    pub esds: Option<EsdsBox<'buf>>,
}
impl<'buf> AudioSampleEntry<'buf> {
    pub fn parse(entry: &'buf [u8]) -> Result<AudioSampleEntry<'buf>, BoxError> {
        let (data_reference_index, rest) = data_reference_index(entry)?;
        let (fixed, rest) = AudioSampleEntryFixed::parse(rest)?;
        let mut esds = None;
        for item in BoxIter::new(rest) {
            let (header, payload): (BoxHeader, &[u8]) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            if &header.box_type == b"esds" {
                esds = EsdsBox::parse(payload).ok();
            }
        }
        Ok(AudioSampleEntry {
            data_reference_index,
            fixed,
            esds,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_short_descriptor_size() {
        assert_eq!(read_descriptor_size(&[0x05, 0xff]), Some((5, &[0xff][..])));
    }

    #[test]
    fn reads_multi_byte_descriptor_size() {
        // 0x81 0x02 -> continuation then terminal: (1<<7)|2 == 130
        assert_eq!(
            read_descriptor_size(&[0x81, 0x02, 0xaa]),
            Some((130, &[0xaa][..]))
        );
    }

    #[test]
    fn parses_pasp() {
        let data = hex!("00 00 00 01" "00 00 00 01");
        let pasp = PaspBox::parse(&data[..]).unwrap();
        assert_eq!(pasp.h_spacing, 1);
        assert_eq!(pasp.v_spacing, 1);
    }
}
