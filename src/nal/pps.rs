//! Parser for `pic_parameter_set_rbsp()` (NAL unit type 8, spec 7.3.2.2).

use crate::nal::sps;
use crate::rbsp::{BitRead, BitReaderError};
use crate::Context;

#[derive(Debug)]
pub enum PpsError {
    ReaderError(BitReaderError),
    InvalidSliceGroupMapType(u32),
    InvalidSliceGroupChangeType(u32),
    UnknownSeqParamSetId(ParamSetId),
    BadPicParamSetId(ParamSetIdError),
    BadSeqParamSetId(ParamSetIdError),
    ScalingMatrix(sps::ScalingMatrixError),
}

impl From<BitReaderError> for PpsError {
    fn from(e: BitReaderError) -> Self {
        PpsError::ReaderError(e)
    }
}
impl From<sps::ScalingMatrixError> for PpsError {
    fn from(e: sps::ScalingMatrixError) -> Self {
        PpsError::ScalingMatrix(e)
    }
}
impl std::fmt::Display for PpsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl std::error::Error for PpsError {}

#[derive(Debug, Clone)]
pub enum SliceGroupChangeType {
    BoxOut,
    RasterScan,
    WipeOut,
}
impl SliceGroupChangeType {
    fn from_id(id: u32) -> Result<SliceGroupChangeType, PpsError> {
        match id {
            3 => Ok(SliceGroupChangeType::BoxOut),
            4 => Ok(SliceGroupChangeType::RasterScan),
            5 => Ok(SliceGroupChangeType::WipeOut),
            _ => Err(PpsError::InvalidSliceGroupChangeType(id)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SliceRect {
    pub top_left: u32,
    pub bottom_right: u32,
}
impl SliceRect {
    fn read<R: BitRead>(r: &mut R) -> Result<SliceRect, PpsError> {
        Ok(SliceRect {
            top_left: r.read_ue("top_left")?,
            bottom_right: r.read_ue("bottom_right")?,
        })
    }
}

#[derive(Debug, Clone)]
pub enum SliceGroup {
    Interleaved {
        run_length_minus1: Vec<u32>,
    },
    Dispersed {
        num_slice_groups_minus1: u32,
    },
    ForegroundAndLeftover {
        rectangles: Vec<SliceRect>,
    },
    Changing {
        change_type: SliceGroupChangeType,
        num_slice_groups_minus1: u32,
        slice_group_change_direction_flag: bool,
        slice_group_change_rate_minus1: u32,
    },
    ExplicitAssignment {
        num_slice_groups_minus1: u32,
        slice_group_id: Vec<u32>,
    },
}
impl SliceGroup {
    fn read<R: BitRead>(r: &mut R, num_slice_groups_minus1: u32) -> Result<SliceGroup, PpsError> {
        let slice_group_map_type = r.read_ue("slice_group_map_type")?;
        match slice_group_map_type {
            0 => Ok(SliceGroup::Interleaved {
                run_length_minus1: Self::read_run_lengths(r, num_slice_groups_minus1)?,
            }),
            1 => Ok(SliceGroup::Dispersed {
                num_slice_groups_minus1,
            }),
            2 => Ok(SliceGroup::ForegroundAndLeftover {
                rectangles: Self::read_rectangles(r, num_slice_groups_minus1)?,
            }),
            3 | 4 | 5 => Ok(SliceGroup::Changing {
                change_type: SliceGroupChangeType::from_id(slice_group_map_type)?,
                num_slice_groups_minus1,
                slice_group_change_direction_flag: r.read_bool("slice_group_change_direction_flag")?,
                slice_group_change_rate_minus1: r.read_ue("slice_group_change_rate_minus1")?,
            }),
            6 => Ok(SliceGroup::ExplicitAssignment {
                num_slice_groups_minus1,
                slice_group_id: Self::read_group_ids(r, num_slice_groups_minus1)?,
            }),
            _ => Err(PpsError::InvalidSliceGroupMapType(slice_group_map_type)),
        }
    }

    fn read_run_lengths<R: BitRead>(r: &mut R, num_slice_groups_minus1: u32) -> Result<Vec<u32>, PpsError> {
        let mut run_length_minus1 = Vec::with_capacity(num_slice_groups_minus1 as usize + 1);
        for _ in 0..=num_slice_groups_minus1 {
            run_length_minus1.push(r.read_ue("run_length_minus1")?);
        }
        Ok(run_length_minus1)
    }

    fn read_rectangles<R: BitRead>(r: &mut R, num_slice_groups_minus1: u32) -> Result<Vec<SliceRect>, PpsError> {
        let mut rectangles = Vec::with_capacity(num_slice_groups_minus1 as usize + 1);
        for _ in 0..=num_slice_groups_minus1 {
            rectangles.push(SliceRect::read(r)?);
        }
        Ok(rectangles)
    }

    fn read_group_ids<R: BitRead>(r: &mut R, num_slice_groups_minus1: u32) -> Result<Vec<u32>, PpsError> {
        let pic_size_in_map_units_minus1 = r.read_ue("pic_size_in_map_units_minus1")?;
        // Ceil(Log2(pic_size_in_map_units_minus1 + 1)) bits per id, per spec 7.4.2.2.
        let size = (32 - (pic_size_in_map_units_minus1).leading_zeros()).max(1) as u32;
        let mut slice_group_id = Vec::with_capacity(num_slice_groups_minus1 as usize + 1);
        for _ in 0..=num_slice_groups_minus1 {
            slice_group_id.push(r.read_var::<u32>(size, "slice_group_id")?);
        }
        Ok(slice_group_id)
    }
}

/// `pic_scaling_matrix()` (spec 7.3.2.2, within the optional PPS tail).
#[derive(Debug, Clone, Default)]
pub struct PicScalingMatrix {
    pub scaling_list4x4: Vec<Option<sps::ScalingList>>,
    pub scaling_list8x8: Vec<Option<sps::ScalingList>>,
}
impl PicScalingMatrix {
    fn read<R: BitRead>(
        r: &mut R,
        sps: &sps::SeqParameterSet,
        transform_8x8_mode_flag: bool,
    ) -> Result<Option<PicScalingMatrix>, PpsError> {
        let pic_scaling_matrix_present_flag = r.read_bool("pic_scaling_matrix_present_flag")?;
        Ok(if pic_scaling_matrix_present_flag {
            let mut scaling_list4x4 = vec![];
            let mut scaling_list8x8 = vec![];

            let count = if transform_8x8_mode_flag {
                if sps.chroma_info.chroma_format == sps::ChromaFormat::YUV444 {
                    6
                } else {
                    2
                }
            } else {
                0
            };
            for i in 0..6 + count {
                let present = r.read_bool("seq_scaling_list_present_flag")?;
                if i < 6 {
                    scaling_list4x4.push(if present {
                        Some(sps::ScalingList::read(r, 16)?)
                    } else {
                        None
                    });
                } else {
                    scaling_list8x8.push(if present {
                        Some(sps::ScalingList::read(r, 64)?)
                    } else {
                        None
                    });
                }
            }
            Some(PicScalingMatrix {
                scaling_list4x4,
                scaling_list8x8,
            })
        } else {
            None
        })
    }
}

/// The optional tail of `pic_parameter_set_rbsp()`, present only when there is more RBSP data
/// after the fixed fields (spec 7.3.2.2, `more_rbsp_data()`).
#[derive(Debug, Clone)]
pub struct PicParameterSetExtra {
    pub transform_8x8_mode_flag: bool,
    pub pic_scaling_matrix: Option<PicScalingMatrix>,
    pub second_chroma_qp_index_offset: i32,
}
impl PicParameterSetExtra {
    fn read<R: BitRead>(r: &mut R, sps: &sps::SeqParameterSet) -> Result<Option<PicParameterSetExtra>, PpsError> {
        Ok(if r.has_more_rbsp_data("more_rbsp_data")? {
            let transform_8x8_mode_flag = r.read_bool("transform_8x8_mode_flag")?;
            Some(PicParameterSetExtra {
                transform_8x8_mode_flag,
                pic_scaling_matrix: PicScalingMatrix::read(r, sps, transform_8x8_mode_flag)?,
                second_chroma_qp_index_offset: r.read_se("second_chroma_qp_index_offset")?,
            })
        } else {
            None
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParamSetIdError {
    IdTooLarge(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamSetId(u8);
impl ParamSetId {
    pub fn from_u32(id: u32) -> Result<ParamSetId, ParamSetIdError> {
        if id > 31 {
            Err(ParamSetIdError::IdTooLarge(id))
        } else {
            Ok(ParamSetId(id as u8))
        }
    }
    pub fn id(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct PicParameterSet {
    pub pic_parameter_set_id: ParamSetId,
    pub seq_parameter_set_id: ParamSetId,
    pub entropy_coding_mode_flag: bool,
    pub bottom_field_pic_order_in_frame_present_flag: bool,
    pub slice_groups: Option<SliceGroup>,
    pub num_ref_idx_l0_default_active_minus1: u32,
    pub num_ref_idx_l1_default_active_minus1: u32,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_idc: u8,
    pub pic_init_qp_minus26: i32,
    pub pic_init_qs_minus26: i32,
    pub chroma_qp_index_offset: i32,
    pub deblocking_filter_control_present_flag: bool,
    pub constrained_intra_pred_flag: bool,
    pub redundant_pic_cnt_present_flag: bool,
    pub extension: Option<PicParameterSetExtra>,
}
impl PicParameterSet {
    pub fn from_bits<R: BitRead>(ctx: &Context, mut r: R) -> Result<PicParameterSet, PpsError> {
        let pic_parameter_set_id = ParamSetId::from_u32(r.read_ue("pic_parameter_set_id")?)
            .map_err(PpsError::BadPicParamSetId)?;
        let seq_parameter_set_id = ParamSetId::from_u32(r.read_ue("seq_parameter_set_id")?)
            .map_err(PpsError::BadSeqParamSetId)?;
        let seq_parameter_set = ctx
            .sps_by_id(seq_parameter_set_id)
            .ok_or(PpsError::UnknownSeqParamSetId(seq_parameter_set_id))?;
        let entropy_coding_mode_flag = r.read_bool("entropy_coding_mode_flag")?;
        let bottom_field_pic_order_in_frame_present_flag =
            r.read_bool("bottom_field_pic_order_in_frame_present_flag")?;
        let slice_groups = Self::read_slice_groups(&mut r)?;
        let num_ref_idx_l0_default_active_minus1 = r.read_ue("num_ref_idx_l0_default_active_minus1")?;
        let num_ref_idx_l1_default_active_minus1 = r.read_ue("num_ref_idx_l1_default_active_minus1")?;
        let weighted_pred_flag = r.read_bool("weighted_pred_flag")?;
        let weighted_bipred_idc = r.read::<2, u8>("weighted_bipred_idc")?;
        let pic_init_qp_minus26 = r.read_se("pic_init_qp_minus26")?;
        let pic_init_qs_minus26 = r.read_se("pic_init_qs_minus26")?;
        let chroma_qp_index_offset = r.read_se("chroma_qp_index_offset")?;
        let deblocking_filter_control_present_flag = r.read_bool("deblocking_filter_control_present_flag")?;
        let constrained_intra_pred_flag = r.read_bool("constrained_intra_pred_flag")?;
        let redundant_pic_cnt_present_flag = r.read_bool("redundant_pic_cnt_present_flag")?;
        let extension = PicParameterSetExtra::read(&mut r, seq_parameter_set)?;
        Ok(PicParameterSet {
            pic_parameter_set_id,
            seq_parameter_set_id,
            entropy_coding_mode_flag,
            bottom_field_pic_order_in_frame_present_flag,
            slice_groups,
            num_ref_idx_l0_default_active_minus1,
            num_ref_idx_l1_default_active_minus1,
            weighted_pred_flag,
            weighted_bipred_idc,
            pic_init_qp_minus26,
            pic_init_qs_minus26,
            chroma_qp_index_offset,
            deblocking_filter_control_present_flag,
            constrained_intra_pred_flag,
            redundant_pic_cnt_present_flag,
            extension,
        })
    }

    fn read_slice_groups<R: BitRead>(r: &mut R) -> Result<Option<SliceGroup>, PpsError> {
        let num_slice_groups_minus1 = r.read_ue("num_slice_groups_minus1")?;
        Ok(if num_slice_groups_minus1 > 0 {
            Some(SliceGroup::read(r, num_slice_groups_minus1)?)
        } else {
            None
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nal::sps::SeqParameterSet;
    use crate::rbsp::BitReader;
    use hex_literal::*;

    #[test]
    fn test_it() {
        let sps_data = hex!(
            "64 00 0A AC 72 84 44 26 84 00 00
             00 04 00 00 00 CA 3C 48 96 11 80"
        );
        let sps = SeqParameterSet::from_bits(BitReader::new(&sps_data[..])).expect("unexpected test data");
        let mut ctx = Context::default();
        ctx.put_seq_param_set(sps);
        let data = hex!("E8 43 8F 13 21 30");
        match PicParameterSet::from_bits(&ctx, BitReader::new(&data[..])) {
            Err(e) => panic!("failed: {:?}", e),
            Ok(pps) => {
                assert_eq!(pps.pic_parameter_set_id.id(), 0);
                assert_eq!(pps.seq_parameter_set_id.id(), 0);
                assert!(pps.extension.is_none());
            }
        }
    }
}
