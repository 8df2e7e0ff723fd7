//! `trak`: Track Box, and its children `tkhd` (track header) and `edts`/`elst` (edit list).

use crate::mp4::boxes::mdia::MdiaBox;
use crate::mp4::header::{read_full_header, BoxError, BoxIter};
use std::convert::TryInto;

/// `tkhd`: Track Header Box.
pub struct TkhdBox {
    pub track_id: u32,
    pub duration: u64,
    pub width: u32,
    pub height: u32,
}
impl TkhdBox {
    pub fn parse(payload: &[u8]) -> Result<TkhdBox, BoxError> {
        let (version, _flags, body) = read_full_header(payload)?;
        let time_size = if version == 1 { 8 } else { 4 };
        // creation_time, modification_time (time_size each), track_id(4), reserved(4),
        // duration(time_size), reserved(8), layer(2), alternate_group(2), volume(2), reserved(2),
        // matrix(36), width(4), height(4)
        let min_len = time_size * 3 + 4 + 4 + 8 + 2 + 2 + 2 + 2 + 36 + 4 + 4;
        if body.len() < min_len {
            return Err(BoxError::InsufficientSize);
        }
        let mut offset = time_size * 2;
        let track_id = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
        offset += 4 + 4; // track_id then reserved
        let duration = if time_size == 8 {
            u64::from_be_bytes(body[offset..offset + 8].try_into().unwrap())
        } else {
            u64::from(u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap()))
        };
        offset += time_size;
        offset += 8 + 2 + 2 + 2 + 2 + 36; // reserved, layer, alternate_group, volume, reserved, matrix
        let width = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let height = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
        Ok(TkhdBox {
            track_id,
            duration,
            width,
            height,
        })
    }

    /// `width`/`height` are 16.16 fixed point.
    pub fn width_f64(&self) -> f64 {
        self.width as i32 as f64 / 65536.0
    }
    pub fn height_f64(&self) -> f64 {
        self.height as i32 as f64 / 65536.0
    }
}

/// `elst`: Edit List Box -- a list of `(segment_duration, media_time, media_rate)` entries.
pub struct ElstBox {
    pub entries: Vec<(u64, i64, i32, i32)>,
}
impl ElstBox {
    pub fn parse(payload: &[u8]) -> Result<ElstBox, BoxError> {
        let (version, _flags, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        let count = u32::from_be_bytes(body[0..4].try_into().unwrap()) as usize;
        let entry_size = if version == 1 { 16 } else { 8 } + 4;
        let mut rest = &body[4..];
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            if rest.len() < entry_size {
                return Err(BoxError::InsufficientSize);
            }
            let (segment_duration, media_time, tail) = if version == 1 {
                (
                    u64::from_be_bytes(rest[0..8].try_into().unwrap()),
                    i64::from_be_bytes(rest[8..16].try_into().unwrap()),
                    &rest[16..],
                )
            } else {
                (
                    u64::from(u32::from_be_bytes(rest[0..4].try_into().unwrap())),
                    i64::from(i32::from_be_bytes(rest[4..8].try_into().unwrap())),
                    &rest[8..],
                )
            };
            let media_rate_integer = i32::from(i16::from_be_bytes([tail[0], tail[1]]));
            let media_rate_fraction = i32::from(i16::from_be_bytes([tail[2], tail[3]]));
            entries.push((segment_duration, media_time, media_rate_integer, media_rate_fraction));
            rest = &rest[entry_size..];
        }
        Ok(ElstBox { entries })
    }
}

/// `edts`: Edit Box, holding a single `elst`.
pub struct EdtsBox {
    pub elst: Option<ElstBox>,
}
impl EdtsBox {
    pub fn parse(payload: &[u8]) -> EdtsBox {
        let mut elst = None;
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            if &header.box_type == b"elst" {
                elst = ElstBox::parse(body).ok();
            }
        }
        EdtsBox { elst }
    }
}

/// `trak`: Track Box.
pub struct TrakBox<'buf> {
    pub tkhd: Option<TkhdBox>,
    pub edts: Option<EdtsBox>,
    pub mdia: Option<MdiaBox<'buf>>,
}
impl<'buf> TrakBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> TrakBox<'buf> {
        let mut tkhd = None;
        let mut edts = None;
        let mut mdia = None;
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"tkhd" => tkhd = TkhdBox::parse(body).ok(),
                b"edts" => edts = Some(EdtsBox::parse(body)),
                b"mdia" => mdia = Some(MdiaBox::parse(body)),
                _ => {}
            }
        }
        TrakBox { tkhd, edts, mdia }
    }

    pub fn is_video(&self) -> bool {
        self.mdia
            .as_ref()
            .and_then(|m| m.hdlr.as_ref())
            .map(|h| &h.handler_type == b"vide")
            .unwrap_or(false)
    }
}
