//! `moof`: Movie Fragment Box, and its children `mfhd`, `traf` (`tfhd`/`tfdt`/`trun`).

use crate::mp4::header::{read_full_header, BoxError, BoxIter};
use std::convert::TryInto;

/// `mfhd`: Movie Fragment Header Box.
pub struct MfhdBox {
    pub sequence_number: u32,
}
impl MfhdBox {
    pub fn parse(payload: &[u8]) -> Result<MfhdBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(MfhdBox {
            sequence_number: u32::from_be_bytes(body[0..4].try_into().unwrap()),
        })
    }
}

mod tfhd_flags {
    pub const BASE_DATA_OFFSET_PRESENT: u32 = 0x00_0001;
    pub const SAMPLE_DESCRIPTION_INDEX_PRESENT: u32 = 0x00_0002;
    pub const DEFAULT_SAMPLE_DURATION_PRESENT: u32 = 0x00_0008;
    pub const DEFAULT_SAMPLE_SIZE_PRESENT: u32 = 0x00_0010;
    pub const DEFAULT_SAMPLE_FLAGS_PRESENT: u32 = 0x00_0020;
}

/// `tfhd`: Track Fragment Header Box. Optional fields are present only when their corresponding
/// flag bit is set; absent ones fall back to the track's `trex` defaults.
pub struct TfhdBox {
    pub track_id: u32,
    pub base_data_offset: Option<u64>,
    pub sample_description_index: Option<u32>,
    pub default_sample_duration: Option<u32>,
    pub default_sample_size: Option<u32>,
    pub default_sample_flags: Option<u32>,
}
impl TfhdBox {
    pub fn parse(payload: &[u8]) -> Result<TfhdBox, BoxError> {
        let (_version, flags, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        let track_id = u32::from_be_bytes(body[0..4].try_into().unwrap());
        let mut rest = &body[4..];
        let mut take_u64 = |rest: &mut &[u8]| -> Result<u64, BoxError> {
            if rest.len() < 8 {
                return Err(BoxError::InsufficientSize);
            }
            let v = u64::from_be_bytes(rest[0..8].try_into().unwrap());
            *rest = &rest[8..];
            Ok(v)
        };
        let mut take_u32 = |rest: &mut &[u8]| -> Result<u32, BoxError> {
            if rest.len() < 4 {
                return Err(BoxError::InsufficientSize);
            }
            let v = u32::from_be_bytes(rest[0..4].try_into().unwrap());
            *rest = &rest[4..];
            Ok(v)
        };
        let base_data_offset = if flags & tfhd_flags::BASE_DATA_OFFSET_PRESENT != 0 {
            Some(take_u64(&mut rest)?)
        } else {
            None
        };
        let sample_description_index = if flags & tfhd_flags::SAMPLE_DESCRIPTION_INDEX_PRESENT != 0
        {
            Some(take_u32(&mut rest)?)
        } else {
            None
        };
        let default_sample_duration = if flags & tfhd_flags::DEFAULT_SAMPLE_DURATION_PRESENT != 0 {
            Some(take_u32(&mut rest)?)
        } else {
            None
        };
        let default_sample_size = if flags & tfhd_flags::DEFAULT_SAMPLE_SIZE_PRESENT != 0 {
            Some(take_u32(&mut rest)?)
        } else {
            None
        };
        let default_sample_flags = if flags & tfhd_flags::DEFAULT_SAMPLE_FLAGS_PRESENT != 0 {
            Some(take_u32(&mut rest)?)
        } else {
            None
        };
        Ok(TfhdBox {
            track_id,
            base_data_offset,
            sample_description_index,
            default_sample_duration,
            default_sample_size,
            default_sample_flags,
        })
    }
}

/// `tfdt`: Track Fragment Decode Time Box.
pub struct TfdtBox {
    pub base_media_decode_time: u64,
}
impl TfdtBox {
    pub fn parse(payload: &[u8]) -> Result<TfdtBox, BoxError> {
        let (version, _flags, body) = read_full_header(payload)?;
        let base_media_decode_time = if version == 1 {
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
        Ok(TfdtBox {
            base_media_decode_time,
        })
    }
}

mod trun_flags {
    pub const DATA_OFFSET_PRESENT: u32 = 0x00_0001;
    pub const FIRST_SAMPLE_FLAGS_PRESENT: u32 = 0x00_0004;
    pub const SAMPLE_DURATION_PRESENT: u32 = 0x00_0100;
    pub const SAMPLE_SIZE_PRESENT: u32 = 0x00_0200;
    pub const SAMPLE_FLAGS_PRESENT: u32 = 0x00_0400;
    pub const SAMPLE_COMPOSITION_TIME_OFFSETS_PRESENT: u32 = 0x00_0800;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TrunSample {
    pub duration: Option<u32>,
    pub size: Option<u32>,
    pub flags: Option<u32>,
    pub composition_time_offset: Option<i32>,
}

/// `trun`: Track Fragment Run Box -- one contiguous run of samples, each overriding whichever
/// per-sample fields its flags declare present.
pub struct TrunBox {
    pub data_offset: Option<i32>,
    pub first_sample_flags: Option<u32>,
    pub samples: Vec<TrunSample>,
}
impl TrunBox {
    pub fn parse(payload: &[u8]) -> Result<TrunBox, BoxError> {
        let (version, flags, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        let sample_count = u32::from_be_bytes(body[0..4].try_into().unwrap());
        let mut rest = &body[4..];

        let data_offset = if flags & trun_flags::DATA_OFFSET_PRESENT != 0 {
            if rest.len() < 4 {
                return Err(BoxError::InsufficientSize);
            }
            let v = i32::from_be_bytes(rest[0..4].try_into().unwrap());
            rest = &rest[4..];
            Some(v)
        } else {
            None
        };
        let first_sample_flags = if flags & trun_flags::FIRST_SAMPLE_FLAGS_PRESENT != 0 {
            if rest.len() < 4 {
                return Err(BoxError::InsufficientSize);
            }
            let v = u32::from_be_bytes(rest[0..4].try_into().unwrap());
            rest = &rest[4..];
            Some(v)
        } else {
            None
        };

        let mut samples = Vec::with_capacity(sample_count as usize);
        for _ in 0..sample_count {
            let mut sample = TrunSample::default();
            if flags & trun_flags::SAMPLE_DURATION_PRESENT != 0 {
                if rest.len() < 4 {
                    return Err(BoxError::InsufficientSize);
                }
                sample.duration = Some(u32::from_be_bytes(rest[0..4].try_into().unwrap()));
                rest = &rest[4..];
            }
            if flags & trun_flags::SAMPLE_SIZE_PRESENT != 0 {
                if rest.len() < 4 {
                    return Err(BoxError::InsufficientSize);
                }
                sample.size = Some(u32::from_be_bytes(rest[0..4].try_into().unwrap()));
                rest = &rest[4..];
            }
            if flags & trun_flags::SAMPLE_FLAGS_PRESENT != 0 {
                if rest.len() < 4 {
                    return Err(BoxError::InsufficientSize);
                }
                sample.flags = Some(u32::from_be_bytes(rest[0..4].try_into().unwrap()));
                rest = &rest[4..];
            }
            if flags & trun_flags::SAMPLE_COMPOSITION_TIME_OFFSETS_PRESENT != 0 {
                if rest.len() < 4 {
                    return Err(BoxError::InsufficientSize);
                }
                let raw = u32::from_be_bytes(rest[0..4].try_into().unwrap());
                // version 0 stores this as unsigned; version 1 as signed. We always surface i32.
                sample.composition_time_offset =
                    Some(if version == 1 { raw as i32 } else { raw as i32 });
                rest = &rest[4..];
            }
            samples.push(sample);
        }

        Ok(TrunBox {
            data_offset,
            first_sample_flags,
            samples,
        })
    }
}

/// `traf`: Track Fragment Box.
pub struct TrafBox {
    pub tfhd: Option<TfhdBox>,
    pub tfdt: Option<TfdtBox>,
    pub trun: Vec<TrunBox>,
}
impl TrafBox {
    pub fn parse(payload: &[u8]) -> TrafBox {
        let mut tfhd = None;
        let mut tfdt = None;
        let mut trun = Vec::new();
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"tfhd" => tfhd = TfhdBox::parse(body).ok(),
                b"tfdt" => tfdt = TfdtBox::parse(body).ok(),
                b"trun" => {
                    if let Ok(t) = TrunBox::parse(body) {
                        trun.push(t);
                    }
                }
                _ => {}
            }
        }
        TrafBox { tfhd, tfdt, trun }
    }
}

/// `moof`: Movie Fragment Box.
pub struct MoofBox {
    pub mfhd: Option<MfhdBox>,
    pub traf: Vec<TrafBox>,
}
impl MoofBox {
    pub fn parse(payload: &[u8]) -> MoofBox {
        let mut mfhd = None;
        let mut traf = Vec::new();
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"mfhd" => mfhd = MfhdBox::parse(body).ok(),
                b"traf" => traf.push(TrafBox::parse(body)),
                _ => {}
            }
        }
        MoofBox { mfhd, traf }
    }
}
