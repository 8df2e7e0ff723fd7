//! Parser for the fixed portion of `slice_header()` (spec 7.3.3), common to every slice type.
//!
//! Only the fields needed to identify a slice and locate its active parameter sets are decoded;
//! the slice data itself (macroblock layer, ref pic list modification, prediction weights,
//! memory management control, deblocking) is not parsed.

use crate::nal::pps::{self, ParamSetId};
use crate::nal::sps;
use crate::nal::NalHeader;
use crate::rbsp::{BitRead, BitReaderError};
use crate::Context;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SliceFamily {
    P,
    B,
    I,
    SP,
    SI,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SliceExclusive {
    /// All slices in the picture have the same type.
    Exclusive,
    /// Other slices in the picture may have a different type than the current slice.
    NonExclusive,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SliceType {
    pub family: SliceFamily,
    pub exclusive: SliceExclusive,
}
impl SliceType {
    fn from_id(id: u32) -> Result<SliceType, SliceHeaderError> {
        match id {
            0 => Ok(SliceType { family: SliceFamily::P, exclusive: SliceExclusive::NonExclusive }),
            1 => Ok(SliceType { family: SliceFamily::B, exclusive: SliceExclusive::NonExclusive }),
            2 => Ok(SliceType { family: SliceFamily::I, exclusive: SliceExclusive::NonExclusive }),
            3 => Ok(SliceType { family: SliceFamily::SP, exclusive: SliceExclusive::NonExclusive }),
            4 => Ok(SliceType { family: SliceFamily::SI, exclusive: SliceExclusive::NonExclusive }),
            5 => Ok(SliceType { family: SliceFamily::P, exclusive: SliceExclusive::Exclusive }),
            6 => Ok(SliceType { family: SliceFamily::B, exclusive: SliceExclusive::Exclusive }),
            7 => Ok(SliceType { family: SliceFamily::I, exclusive: SliceExclusive::Exclusive }),
            8 => Ok(SliceType { family: SliceFamily::SP, exclusive: SliceExclusive::Exclusive }),
            9 => Ok(SliceType { family: SliceFamily::SI, exclusive: SliceExclusive::Exclusive }),
            _ => Err(SliceHeaderError::InvalidSliceType(id)),
        }
    }
}

#[derive(Debug)]
pub enum SliceHeaderError {
    ReaderError(BitReaderError),
    InvalidSliceType(u32),
    InvalidSeqParamSetId(pps::ParamSetIdError),
    UndefinedPicParamSetId(pps::ParamSetId),
    UndefinedSeqParamSetId(pps::ParamSetId),
    ColourPlaneError(ColourPlaneError),
}
impl From<BitReaderError> for SliceHeaderError {
    fn from(e: BitReaderError) -> Self {
        SliceHeaderError::ReaderError(e)
    }
}
impl From<pps::ParamSetIdError> for SliceHeaderError {
    fn from(e: pps::ParamSetIdError) -> Self {
        SliceHeaderError::InvalidSeqParamSetId(e)
    }
}
impl From<ColourPlaneError> for SliceHeaderError {
    fn from(e: ColourPlaneError) -> Self {
        SliceHeaderError::ColourPlaneError(e)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ColourPlane {
    /// Indicates the _luma_ colour plane.
    Y,
    /// Indicates the _blue-difference_ colour plane.
    Cb,
    /// Indicates the _red-difference_ colour plane.
    Cr,
}
#[derive(Debug, PartialEq, Eq)]
pub enum ColourPlaneError {
    InvalidId(u8),
}
impl ColourPlane {
    fn from_id(id: u8) -> Result<ColourPlane, ColourPlaneError> {
        match id {
            0 => Ok(ColourPlane::Y),
            1 => Ok(ColourPlane::Cb),
            2 => Ok(ColourPlane::Cr),
            _ => Err(ColourPlaneError::InvalidId(id)),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Field {
    Top,
    Bottom,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FieldPic {
    Frame,
    Field(Field),
}

/// The fixed fields of `slice_header()` that are present regardless of slice type.
#[derive(Debug)]
pub struct SliceHeader {
    pub first_mb_in_slice: u32,
    pub slice_type: SliceType,
    pub pic_parameter_set_id: ParamSetId,
    pub colour_plane: Option<ColourPlane>,
    pub frame_num: u32,
    pub field_pic: FieldPic,
}
impl SliceHeader {
    pub fn read<R: BitRead>(ctx: &Context, mut r: R, _header: NalHeader) -> Result<SliceHeader, SliceHeaderError> {
        let first_mb_in_slice = r.read_ue("first_mb_in_slice")?;
        let slice_type = SliceType::from_id(r.read_ue("slice_type")?)?;
        let pic_parameter_set_id = ParamSetId::from_u32(r.read_ue("pic_parameter_set_id")?)?;
        let pps = ctx
            .pps_by_id(pic_parameter_set_id)
            .ok_or(SliceHeaderError::UndefinedPicParamSetId(pic_parameter_set_id))?;
        let sps = ctx
            .sps_by_id(pps.seq_parameter_set_id)
            .ok_or(SliceHeaderError::UndefinedSeqParamSetId(pps.seq_parameter_set_id))?;
        let colour_plane = if sps.chroma_info.separate_colour_plane_flag {
            Some(ColourPlane::from_id(r.read::<2, u8>("colour_plane_id")?)?)
        } else {
            None
        };
        let log2_max_frame_num = u32::from(sps.log2_max_frame_num_minus4) + 4;
        let frame_num = r.read_var(log2_max_frame_num, "frame_num")?;
        let field_pic = if let sps::FrameMbsFlags::Fields { .. } = sps.frame_mbs_flags {
            if r.read_bool("field_pic_flag")? {
                if r.read_bool("bottom_field_flag")? {
                    FieldPic::Field(Field::Bottom)
                } else {
                    FieldPic::Field(Field::Top)
                }
            } else {
                FieldPic::Frame
            }
        } else {
            FieldPic::Frame
        };
        Ok(SliceHeader {
            first_mb_in_slice,
            slice_type,
            pic_parameter_set_id,
            colour_plane,
            frame_num,
            field_pic,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slice_type_from_id() {
        assert_eq!(
            SliceType::from_id(7).unwrap(),
            SliceType { family: SliceFamily::I, exclusive: SliceExclusive::Exclusive }
        );
        assert_eq!(
            SliceType::from_id(0).unwrap(),
            SliceType { family: SliceFamily::P, exclusive: SliceExclusive::NonExclusive }
        );
        assert!(SliceType::from_id(10).is_err());
    }

    #[test]
    fn colour_plane_from_id() {
        assert_eq!(ColourPlane::from_id(0).unwrap(), ColourPlane::Y);
        assert_eq!(ColourPlane::from_id(2).unwrap(), ColourPlane::Cr);
        assert!(ColourPlane::from_id(3).is_err());
    }
}
