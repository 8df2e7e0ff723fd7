use crate::nal::pps;
use crate::nal::sei::HeaderType;
use crate::nal::sei::SeiMessage;
use crate::rbsp::BitRead;
use crate::rbsp::BitReader;
use crate::rbsp::BitReaderError;
use crate::Context;

#[derive(Debug)]
pub enum BufferingPeriodError {
    RbspError(BitReaderError),
    UndefinedSeqParamSetId(pps::ParamSetId),
    InvalidSeqParamSetId(pps::ParamSetIdError),
}
impl From<BitReaderError> for BufferingPeriodError {
    fn from(e: BitReaderError) -> Self {
        BufferingPeriodError::RbspError(e)
    }
}
impl From<pps::ParamSetIdError> for BufferingPeriodError {
    fn from(e: pps::ParamSetIdError) -> Self {
        BufferingPeriodError::InvalidSeqParamSetId(e)
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct InitialCpbRemoval {
    pub initial_cpb_removal_delay: u32,
    pub initial_cpb_removal_delay_offset: u32,
}
impl InitialCpbRemoval {
    fn read<R: BitRead>(r: &mut R, length: u32) -> Result<InitialCpbRemoval, BitReaderError> {
        Ok(InitialCpbRemoval {
            initial_cpb_removal_delay: r.read_var(length, "initial_cpb_removal_delay")?,
            initial_cpb_removal_delay_offset: r
                .read_var(length, "initial_cpb_removal_delay_offset")?,
        })
    }
}

fn read_cpb_removal_delay_list<R: BitRead>(
    r: &mut R,
    count: usize,
    length: u32,
) -> Result<Vec<InitialCpbRemoval>, BitReaderError> {
    let mut res = Vec::with_capacity(count);
    for _ in 0..count {
        res.push(InitialCpbRemoval::read(r, length)?);
    }
    Ok(res)
}

#[derive(Debug, Eq, PartialEq)]
pub struct BufferingPeriod {
    pub seq_parameter_set_id: pps::ParamSetId,
    pub nal_hrd_bp: Option<Vec<InitialCpbRemoval>>,
    pub vcl_hrd_bp: Option<Vec<InitialCpbRemoval>>,
}
impl BufferingPeriod {
    /// Parses a `BufferingPeriod` from the given SEI message. The caller is expected to have
    /// already parsed the referenced SPS, since `seq_parameter_set_id` (the first field of the
    /// payload) selects which HRD parameters describe the rest of it.
    pub fn read(
        ctx: &Context,
        msg: &SeiMessage<'_>,
    ) -> Result<BufferingPeriod, BufferingPeriodError> {
        assert_eq!(msg.payload_type, HeaderType::BufferingPeriod);
        let mut r = BitReader::new(msg.payload);
        let seq_parameter_set_id = pps::ParamSetId::from_u32(r.read_ue("seq_parameter_set_id")?)?;
        let sps = ctx
            .sps_by_id(seq_parameter_set_id)
            .ok_or(BufferingPeriodError::UndefinedSeqParamSetId(seq_parameter_set_id))?;
        let vui = sps.vui_parameters.as_ref();
        let nal_hrd_bp = if let Some(hrd) = vui.and_then(|vui| vui.nal_hrd_parameters.as_ref()) {
            Some(read_cpb_removal_delay_list(
                &mut r,
                hrd.cpb_specs.len(),
                u32::from(hrd.initial_cpb_removal_delay_length_minus1) + 1,
            )?)
        } else {
            None
        };
        let vcl_hrd_bp = if let Some(hrd) = vui.and_then(|vui| vui.vcl_hrd_parameters.as_ref()) {
            Some(read_cpb_removal_delay_list(
                &mut r,
                hrd.cpb_specs.len(),
                u32::from(hrd.initial_cpb_removal_delay_length_minus1) + 1,
            )?)
        } else {
            None
        };
        r.finish_sei_payload()?;

        Ok(BufferingPeriod {
            seq_parameter_set_id,
            nal_hrd_bp,
            vcl_hrd_bp,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rbsp::BitReader;

    #[test]
    fn reads_cpb_removal_delay_list() {
        // 0101_0011 as two 4-bit fields: delay=5, offset=3.
        let mut r = BitReader::new(&[0x53][..]);
        let list = read_cpb_removal_delay_list(&mut r, 1, 4).unwrap();
        assert_eq!(
            list,
            vec![InitialCpbRemoval {
                initial_cpb_removal_delay: 5,
                initial_cpb_removal_delay_offset: 3,
            }]
        );
    }

    #[test]
    fn read_fails_for_unknown_sps_id() {
        let ctx = Context::new();
        // ue(v) encoding of seq_parameter_set_id=0 is a single `1` bit.
        let msg = SeiMessage {
            payload_type: HeaderType::BufferingPeriod,
            payload: &[0x80][..],
        };
        let err = BufferingPeriod::read(&ctx, &msg).unwrap_err();
        assert!(matches!(err, BufferingPeriodError::UndefinedSeqParamSetId(_)));
    }
}
