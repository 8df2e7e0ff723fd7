#[cfg(test)]
#[macro_use]
extern crate hex_literal;
#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;
#[cfg(test)]
extern crate hex_slice;

pub mod rbsp;
pub mod annexb;
pub mod nal;
pub mod push;
pub mod io;
pub mod error;
pub mod warning;
pub mod es;
pub mod hevc;
pub mod av1;
pub mod flv;
pub mod mp4;
pub mod extract;
pub mod avcc;

/// Parses an in-memory MP4/CMAF file into its top-level box tree, collecting non-fatal problems
/// into `warnings` rather than aborting the parse.
pub fn parse_mp4<'buf>(data: &'buf [u8], warnings: &mut warning::Warnings) -> mp4::Boxes<'buf> {
    mp4::Boxes::parse(data, warnings)
}

/// Parses an in-memory FLV file into its tag stream, collecting non-fatal problems into
/// `warnings` rather than aborting the parse.
pub fn parse_flv<'buf>(
    data: &'buf [u8],
    warnings: &mut warning::Warnings,
) -> Result<flv::Flv<'buf>, flv::FlvError> {
    flv::Flv::parse(data, warnings)
}

/// Contextual data that needs to be tracked between evaluations of different portions of H264
/// syntax: the active sequence and picture parameter sets, indexed by their ids.
pub struct Context {
    seq_param_sets: Vec<Option<nal::sps::SeqParameterSet>>,
    pic_param_sets: Vec<Option<nal::pps::PicParameterSet>>,
}
impl Default for Context {
    fn default() -> Self {
        let mut seq_param_sets = vec!();
        for _ in 0..32 { seq_param_sets.push(None); }
        let mut pic_param_sets = vec!();
        for _ in 0..32 { pic_param_sets.push(None); }
        Context {
            seq_param_sets,
            pic_param_sets,
        }
    }
}
impl Context {
    /// Creates an empty context with no active parameter sets.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sps_by_id(&self, id: nal::pps::ParamSetId) -> Option<&nal::sps::SeqParameterSet> {
        if id.id() > 31 {
            None
        } else {
            self.seq_param_sets[id.id() as usize].as_ref()
        }
    }
    pub fn put_seq_param_set(&mut self, sps: nal::sps::SeqParameterSet) {
        let i = sps.seq_parameter_set_id.id() as usize;
        self.seq_param_sets[i] = Some(sps);
    }
    pub fn pps_by_id(&self, id: nal::pps::ParamSetId) -> Option<&nal::pps::PicParameterSet> {
        if id.id() > 31 {
            None
        } else {
            self.pic_param_sets[id.id() as usize].as_ref()
        }
    }
    pub fn put_pic_param_set(&mut self, pps: nal::pps::PicParameterSet) {
        let i = pps.pic_parameter_set_id.id() as usize;
        self.pic_param_sets[i] = Some(pps);
    }
}