//! `sidx`: Segment Index Box, used by fragmented MP4/DASH to map presentation time onto byte
//! ranges of `moof`/`mdat` pairs without needing to parse every fragment up front.

use crate::mp4::header::{read_full_header, BoxError};
use std::convert::TryInto;

#[derive(Debug, Clone, Copy)]
pub struct SidxReference {
    pub reference_type: bool,
    pub referenced_size: u32,
    pub subsegment_duration: u32,
    pub starts_with_sap: bool,
    pub sap_type: u8,
    pub sap_delta_time: u32,
}

pub struct SidxBox {
    pub reference_id: u32,
    pub timescale: u32,
    pub earliest_presentation_time: u64,
    pub first_offset: u64,
    pub references: Vec<SidxReference>,
}

impl SidxBox {
    pub fn parse(payload: &[u8]) -> Result<SidxBox, BoxError> {
        let (version, _flags, body) = read_full_header(payload)?;
        if body.len() < 8 {
            return Err(BoxError::InsufficientSize);
        }
        let reference_id = u32::from_be_bytes(body[0..4].try_into().unwrap());
        let timescale = u32::from_be_bytes(body[4..8].try_into().unwrap());
        let mut offset = 8;
        let (earliest_presentation_time, first_offset) = if version == 0 {
            if body.len() < offset + 8 {
                return Err(BoxError::InsufficientSize);
            }
            let t = u64::from(u32::from_be_bytes(
                body[offset..offset + 4].try_into().unwrap(),
            ));
            let o = u64::from(u32::from_be_bytes(
                body[offset + 4..offset + 8].try_into().unwrap(),
            ));
            offset += 8;
            (t, o)
        } else {
            if body.len() < offset + 16 {
                return Err(BoxError::InsufficientSize);
            }
            let t = u64::from_be_bytes(body[offset..offset + 8].try_into().unwrap());
            let o = u64::from_be_bytes(body[offset + 8..offset + 16].try_into().unwrap());
            offset += 16;
            (t, o)
        };
        if body.len() < offset + 2 {
            return Err(BoxError::InsufficientSize);
        }
        // reserved(2)
        offset += 2;
        if body.len() < offset + 2 {
            return Err(BoxError::InsufficientSize);
        }
        let reference_count = u16::from_be_bytes([body[offset], body[offset + 1]]);
        offset += 2;

        let mut references = Vec::with_capacity(reference_count as usize);
        for _ in 0..reference_count {
            if body.len() < offset + 12 {
                return Err(BoxError::InsufficientSize);
            }
            let w0 = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
            let subsegment_duration =
                u32::from_be_bytes(body[offset + 4..offset + 8].try_into().unwrap());
            let w2 = u32::from_be_bytes(body[offset + 8..offset + 12].try_into().unwrap());
            references.push(SidxReference {
                reference_type: (w0 & 0x8000_0000) != 0,
                referenced_size: w0 & 0x7fff_ffff,
                subsegment_duration,
                starts_with_sap: (w2 & 0x8000_0000) != 0,
                sap_type: ((w2 >> 28) & 0x7) as u8,
                sap_delta_time: w2 & 0x0fff_ffff,
            });
            offset += 12;
        }

        Ok(SidxBox {
            reference_id,
            timescale,
            earliest_presentation_time,
            first_offset,
            references,
        })
    }
}
