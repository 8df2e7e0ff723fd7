//! `moov`: Movie Box, and its direct children `mvhd`, `udta`, `mvex` (`mehd`/`trex`), `trak`.

use crate::mp4::boxes::meta::MetaBox;
use crate::mp4::boxes::trak::TrakBox;
use crate::mp4::header::{read_full_header, BoxError, BoxIter};
use std::convert::TryInto;

/// `mvhd`: Movie Header Box.
pub struct MvhdBox {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub rate: i32,
    pub volume: i16,
    pub matrix: [i32; 9],
    pub next_track_id: u32,
}
impl MvhdBox {
    pub fn parse(payload: &[u8]) -> Result<MvhdBox, BoxError> {
        let (version, _flags, body) = read_full_header(payload)?;
        let time_size = if version == 1 { 8 } else { 4 };
        let min_len = time_size * 3 + 4 + 4 + 2 + 10 + 36 + 24 + 4;
        if body.len() < min_len {
            return Err(BoxError::InsufficientSize);
        }
        let mut offset = 0;
        let read_time = |body: &[u8], offset: &mut usize| -> u64 {
            let v = if time_size == 8 {
                u64::from_be_bytes(body[*offset..*offset + 8].try_into().unwrap())
            } else {
                u64::from(u32::from_be_bytes(body[*offset..*offset + 4].try_into().unwrap()))
            };
            *offset += time_size;
            v
        };
        let creation_time = read_time(body, &mut offset);
        let modification_time = read_time(body, &mut offset);
        let timescale = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let duration = read_time(body, &mut offset);
        let rate = i32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let volume = i16::from_be_bytes([body[offset], body[offset + 1]]);
        offset += 2 + 10; // volume, then 10 reserved bytes
        let mut matrix = [0i32; 9];
        for m in matrix.iter_mut() {
            *m = i32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
            offset += 4;
        }
        offset += 24; // pre_defined[6]
        let next_track_id = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
        Ok(MvhdBox {
            creation_time,
            modification_time,
            timescale,
            duration,
            rate,
            volume,
            matrix,
            next_track_id,
        })
    }

    /// `rate` is 16.16 fixed point; `1.0` plays at normal speed.
    pub fn rate_f64(&self) -> f64 {
        self.rate as f64 / 65536.0
    }
}

/// `mehd`: Movie Extends Header Box -- the fragmented duration, when present.
pub struct MehdBox {
    pub fragment_duration: u64,
}
impl MehdBox {
    pub fn parse(payload: &[u8]) -> Result<MehdBox, BoxError> {
        let (version, _flags, body) = read_full_header(payload)?;
        let fragment_duration = if version == 1 {
            if body.len() < 8 {
                return Err(BoxError::InsufficientSize);
            }
            u64::from_be_bytes(body[0..8].try_into().unwrap())
        } else {
            if body.len() < 4 {
                return Err(BoxError::InsufficientSize);
            }
            u64::from(u32::from_be_bytes(body[0..4].try_into().unwrap()))
        };
        Ok(MehdBox { fragment_duration })
    }
}

/// `trex`: Track Extends Box -- per-track fragment defaults used when a `tfhd` omits a field.
pub struct TrexBox {
    pub track_id: u32,
    pub default_sample_description_index: u32,
    pub default_sample_duration: u32,
    pub default_sample_size: u32,
    pub default_sample_flags: u32,
}
impl TrexBox {
    pub fn parse(payload: &[u8]) -> Result<TrexBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() < 20 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(TrexBox {
            track_id: u32::from_be_bytes(body[0..4].try_into().unwrap()),
            default_sample_description_index: u32::from_be_bytes(body[4..8].try_into().unwrap()),
            default_sample_duration: u32::from_be_bytes(body[8..12].try_into().unwrap()),
            default_sample_size: u32::from_be_bytes(body[12..16].try_into().unwrap()),
            default_sample_flags: u32::from_be_bytes(body[16..20].try_into().unwrap()),
        })
    }
}

/// `mvex`: Movie Extends Box, signalling that movie fragments follow.
pub struct MvexBox {
    pub mehd: Option<MehdBox>,
    pub trex: Vec<TrexBox>,
}
impl MvexBox {
    pub fn parse(payload: &[u8]) -> MvexBox {
        let mut mehd = None;
        let mut trex = Vec::new();
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"mehd" => mehd = MehdBox::parse(body).ok(),
                b"trex" => {
                    if let Ok(t) = TrexBox::parse(body) {
                        trex.push(t);
                    }
                }
                _ => {}
            }
        }
        MvexBox { mehd, trex }
    }
}

/// `udta`: User Data Box. Raw; only `meta` (itself handled at the `moov`/`trak` level in real
/// files) and vendor-specific atoms live under here, none of which the extractor needs.
pub struct UdtaBox<'buf> {
    pub data: &'buf [u8],
}
impl<'buf> UdtaBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> UdtaBox<'buf> {
        UdtaBox { data: payload }
    }
}

/// `moov`: Movie Box, the root of the non-fragmented sample-table hierarchy.
pub struct MoovBox<'buf> {
    pub mvhd: Option<MvhdBox>,
    pub udta: Option<UdtaBox<'buf>>,
    pub mvex: Option<MvexBox>,
    pub meta: Option<MetaBox<'buf>>,
    pub trak: Vec<TrakBox<'buf>>,
}
impl<'buf> MoovBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> MoovBox<'buf> {
        let mut out = MoovBox {
            mvhd: None,
            udta: None,
            mvex: None,
            meta: None,
            trak: Vec::new(),
        };
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"mvhd" => out.mvhd = MvhdBox::parse(body).ok(),
                b"udta" => out.udta = Some(UdtaBox::parse(body)),
                b"mvex" => out.mvex = Some(MvexBox::parse(body)),
                b"meta" => out.meta = MetaBox::parse(body).ok(),
                b"trak" => out.trak.push(TrakBox::parse(body)),
                _ => {}
            }
        }
        out
    }

    /// Finds the track with the given id, or (when `track_id == 0`) the first video track.
    pub fn find_track(&self, track_id: u32) -> Option<&TrakBox<'buf>> {
        if track_id == 0 {
            self.trak.iter().find(|t| t.is_video())
        } else {
            self.trak
                .iter()
                .find(|t| t.tkhd.as_ref().map(|h| h.track_id) == Some(track_id))
        }
    }
}
