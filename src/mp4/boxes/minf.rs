//! `minf`: Media Information Box, and its direct children `smhd`/`vmhd` (media-type-specific
//! header), `dinf`/`dref` (data reference), and `stbl`.

use crate::mp4::boxes::stbl::StblBox;
use crate::mp4::header::{read_full_header, BoxError, BoxIter};
use std::convert::TryInto;

/// `smhd`: Sound Media Header Box.
pub struct SmhdBox {
    pub balance: i16,
}
impl SmhdBox {
    pub fn parse(payload: &[u8]) -> Result<SmhdBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() < 2 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(SmhdBox {
            balance: i16::from_be_bytes([body[0], body[1]]),
        })
    }
}

/// `vmhd`: Video Media Header Box.
pub struct VmhdBox {
    pub graphicsmode: u16,
    pub opcolor: [u16; 3],
}
impl VmhdBox {
    pub fn parse(payload: &[u8]) -> Result<VmhdBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() < 8 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(VmhdBox {
            graphicsmode: u16::from_be_bytes([body[0], body[1]]),
            opcolor: [
                u16::from_be_bytes([body[2], body[3]]),
                u16::from_be_bytes([body[4], body[5]]),
                u16::from_be_bytes([body[6], body[7]]),
            ],
        })
    }
}

/// `url `/`urn `: a data-reference entry pointing at media data, either in-place (`self_contained`
/// flag set, no location) or via a URL/URN string pair.
pub struct DataEntryBox<'buf> {
    pub is_urn: bool,
    pub self_contained: bool,
    pub location: &'buf [u8],
}
impl<'buf> DataEntryBox<'buf> {
    fn parse(is_urn: bool, payload: &'buf [u8]) -> Result<DataEntryBox<'buf>, BoxError> {
        let (_v, flags, body) = read_full_header(payload)?;
        Ok(DataEntryBox {
            is_urn,
            self_contained: flags & 0x1 != 0,
            location: body,
        })
    }
}

/// `dref`: Data Reference Box -- a list of `url `/`urn ` entries.
pub struct DrefBox<'buf> {
    pub entries: Vec<DataEntryBox<'buf>>,
}
impl<'buf> DrefBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<DrefBox<'buf>, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        let mut entries = Vec::new();
        for item in BoxIter::new(&body[4..]) {
            let (header, entry_payload) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"url " => {
                    if let Ok(e) = DataEntryBox::parse(false, entry_payload) {
                        entries.push(e);
                    }
                }
                b"urn " => {
                    if let Ok(e) = DataEntryBox::parse(true, entry_payload) {
                        entries.push(e);
                    }
                }
                _ => {}
            }
        }
        Ok(DrefBox { entries })
    }
}

/// `dinf`: Data Information Box, holding a single `dref`.
pub struct DinfBox<'buf> {
    pub dref: Option<DrefBox<'buf>>,
}
impl<'buf> DinfBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> DinfBox<'buf> {
        let mut dref = None;
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            if &header.box_type == b"dref" {
                dref = DrefBox::parse(body).ok();
            }
        }
        DinfBox { dref }
    }
}

/// `minf`: Media Information Box.
pub struct MinfBox<'buf> {
    pub smhd: Option<SmhdBox>,
    pub vmhd: Option<VmhdBox>,
    pub dinf: Option<DinfBox<'buf>>,
    pub stbl: Option<StblBox<'buf>>,
}
impl<'buf> MinfBox<'buf> {
    pub fn parse(payload: &'buf [u8], handler_type: &[u8; 4]) -> MinfBox<'buf> {
        let mut out = MinfBox {
            smhd: None,
            vmhd: None,
            dinf: None,
            stbl: None,
        };
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"smhd" => out.smhd = SmhdBox::parse(body).ok(),
                b"vmhd" => out.vmhd = VmhdBox::parse(body).ok(),
                b"dinf" => out.dinf = Some(DinfBox::parse(body)),
                b"stbl" => out.stbl = Some(StblBox::parse(body, handler_type)),
                _ => {}
            }
        }
        out
    }
}
