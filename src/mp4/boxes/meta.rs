//! `meta`/`ilst`/`data`: iTunes-style metadata, nested under `moov.udta.meta` (or occasionally
//! directly under `moov`/`trak`).

use crate::mp4::header::{read_full_header, BoxError, BoxIter};
use std::convert::TryInto;

/// `data`: a single metadata value, tagged with a `type_indicator` (1 = UTF-8 text, 21 = signed
/// integer, 0 = reserved/binary, per the iTunes metadata convention).
pub struct DataBox<'buf> {
    pub type_indicator: u32,
    pub locale: u32,
    pub value: &'buf [u8],
}
impl<'buf> DataBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<DataBox<'buf>, BoxError> {
        if payload.len() < 8 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(DataBox {
            type_indicator: u32::from_be_bytes(payload[0..4].try_into().unwrap()),
            locale: u32::from_be_bytes(payload[4..8].try_into().unwrap()),
            value: &payload[8..],
        })
    }

    /// Interprets the value as UTF-8 text, lossily, regardless of `type_indicator`.
    pub fn as_text(&self) -> std::borrow::Cow<'buf, str> {
        String::from_utf8_lossy(self.value)
    }
}

/// One entry of an `ilst` box: a four-character (or reverse-DNS `----`) key with a `data` child.
pub struct IlstEntry<'buf> {
    pub key: [u8; 4],
    pub data: Option<DataBox<'buf>>,
}

/// `ilst`: Item List Box -- a sequence of metadata key/value entries.
pub struct IlstBox<'buf> {
    pub entries: Vec<IlstEntry<'buf>>,
}
impl<'buf> IlstBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> IlstBox<'buf> {
        let mut entries = Vec::new();
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            let mut data = None;
            for inner in BoxIter::new(body) {
                let (inner_header, inner_body) = match inner {
                    Ok(v) => v,
                    Err(_) => break,
                };
                if &inner_header.box_type == b"data" {
                    data = DataBox::parse(inner_body).ok();
                }
            }
            entries.push(IlstEntry {
                key: header.box_type,
                data,
            });
        }
        IlstBox { entries }
    }
}

/// `meta`: Metadata Box. Unlike most full boxes, some legacy writers omit the version/flags
/// prefix; this implementation assumes the standard ISO form (4-byte prefix present).
pub struct MetaBox<'buf> {
    pub ilst: Option<IlstBox<'buf>>,
}
impl<'buf> MetaBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<MetaBox<'buf>, BoxError> {
        let (_version, _flags, body) = read_full_header(payload)?;
        let mut ilst = None;
        for item in BoxIter::new(body) {
            let (header, inner) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            if &header.box_type == b"ilst" {
                ilst = Some(IlstBox::parse(inner));
            }
        }
        Ok(MetaBox { ilst })
    }
}
