//! `mdia`: Media Box, and its children `mdhd` (media header) and `hdlr` (handler reference),
//! whose `handler_type` is threaded down into `minf`/`stbl`/`stsd`.

use crate::mp4::boxes::minf::MinfBox;
use crate::mp4::header::{read_full_header, BoxError, BoxIter};
use std::convert::TryInto;

/// `mdhd`: Media Header Box.
pub struct MdhdBox {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// 3 packed 5-bit characters, each biased by `0x60` -- see [`MdhdBox::language_string`].
    pub language: u16,
}
impl MdhdBox {
    pub fn parse(payload: &[u8]) -> Result<MdhdBox, BoxError> {
        let (version, _flags, body) = read_full_header(payload)?;
        let time_size = if version == 1 { 8 } else { 4 };
        let min_len = time_size * 3 + 4 + 2;
        if body.len() < min_len {
            return Err(BoxError::InsufficientSize);
        }
        let mut offset = 0;
        let read_time = |body: &[u8], offset: &mut usize| -> u64 {
            let v = if time_size == 8 {
                u64::from_be_bytes(body[*offset..*offset + 8].try_into().unwrap())
            } else {
                u64::from(u32::from_be_bytes(
                    body[*offset..*offset + 4].try_into().unwrap(),
                ))
            };
            *offset += time_size;
            v
        };
        let creation_time = read_time(body, &mut offset);
        let modification_time = read_time(body, &mut offset);
        let timescale = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let duration = read_time(body, &mut offset);
        let language = u16::from_be_bytes([body[offset], body[offset + 1]]) & 0x7fff;
        Ok(MdhdBox {
            creation_time,
            modification_time,
            timescale,
            duration,
            language,
        })
    }

    /// Decodes the packed language code back into its three ASCII characters, e.g. `"eng"`.
    pub fn language_string(&self) -> [u8; 3] {
        [
            (((self.language >> 10) & 0x1f) as u8) + 0x60,
            (((self.language >> 5) & 0x1f) as u8) + 0x60,
            ((self.language & 0x1f) as u8) + 0x60,
        ]
    }

    /// MP4 epoch (1904-01-01) converted to a Unix timestamp.
    pub fn creation_time_unix(&self) -> i64 {
        self.creation_time as i64 - 2_082_844_800
    }
}

/// `hdlr`: Handler Reference Box. `handler_type` drives sample-entry dispatch in `stsd`.
pub struct HdlrBox<'buf> {
    pub handler_type: [u8; 4],
    pub name: &'buf [u8],
}
impl<'buf> HdlrBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<HdlrBox<'buf>, BoxError> {
        let (_version, _flags, body) = read_full_header(payload)?;
        // pre_defined(4) + handler_type(4) + reserved(12) precede the name string.
        if body.len() < 20 {
            return Err(BoxError::InsufficientSize);
        }
        let handler_type: [u8; 4] = body[4..8].try_into().unwrap();
        Ok(HdlrBox {
            handler_type,
            name: &body[20..],
        })
    }
}

/// `mdia`: Media Box.
pub struct MdiaBox<'buf> {
    pub mdhd: Option<MdhdBox>,
    pub hdlr: Option<HdlrBox<'buf>>,
    pub minf: Option<MinfBox<'buf>>,
}
impl<'buf> MdiaBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> MdiaBox<'buf> {
        let mut mdhd = None;
        let mut hdlr = None;
        let mut minf_payload = None;
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"mdhd" => mdhd = MdhdBox::parse(body).ok(),
                b"hdlr" => hdlr = HdlrBox::parse(body).ok(),
                b"minf" => minf_payload = Some(body),
                _ => {}
            }
        }
        let handler_type = hdlr.as_ref().map(|h| h.handler_type).unwrap_or(*b"\0\0\0\0");
        let minf = minf_payload.map(|p| MinfBox::parse(p, &handler_type));
        MdiaBox { mdhd, hdlr, minf }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_eng_language() {
        // 'e'-0x60=5, 'n'-0x60=14, 'g'-0x60=7 -> packed as 5<<10 | 14<<5 | 7
        let packed: u16 = (5 << 10) | (14 << 5) | 7;
        let mdhd = MdhdBox {
            creation_time: 0,
            modification_time: 0,
            timescale: 1000,
            duration: 0,
            language: packed,
        };
        assert_eq!(&mdhd.language_string(), b"eng");
    }
}
