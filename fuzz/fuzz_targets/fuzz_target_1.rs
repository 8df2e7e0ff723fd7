#![no_main]
use h264_reader::annexb::{AnnexBReader, NalReader};
use h264_reader::nal::pps::ParamSetId;
use h264_reader::nal::{pps, sei, slice, sps, Nal, RefNal, UnitType};
use h264_reader::Context;
use libfuzzer_sys::fuzz_target;

#[derive(Default)]
struct Handler {
    buf: Vec<u8>,
    scratch: Vec<u8>,
    last_sps_id: Option<ParamSetId>,
}
impl NalReader for Handler {
    fn start(&mut self, _ctx: &mut Context) {
        self.buf.clear();
    }
    fn push(&mut self, _ctx: &mut Context, buf: &[u8]) {
        self.buf.extend_from_slice(buf);
    }
    fn end(&mut self, ctx: &mut Context) {
        if self.buf.is_empty() {
            return;
        }
        let nal = RefNal::new(&self.buf[..], &[], true);
        let hdr = match nal.header() {
            Ok(h) => h,
            Err(_) => return,
        };
        match hdr.nal_unit_type() {
            UnitType::SeqParameterSet => {
                if let Ok(sps) = sps::SeqParameterSet::from_bits(nal.rbsp_bits()) {
                    self.last_sps_id = Some(sps.seq_parameter_set_id);
                    ctx.put_seq_param_set(sps);
                }
            }
            UnitType::PicParameterSet => {
                if let Ok(pps) = pps::PicParameterSet::from_bits(ctx, nal.rbsp_bits()) {
                    ctx.put_pic_param_set(pps);
                }
            }
            UnitType::SEI => {
                let mut r = sei::SeiReader::from_rbsp_bytes(nal.rbsp_bytes(), &mut self.scratch);
                while let Ok(Some(msg)) = r.next() {
                    if msg.payload_type == sei::HeaderType::PicTiming {
                        if let Some(sps) = self.last_sps_id.and_then(|id| ctx.sps_by_id(id)) {
                            let _ = sei::pic_timing::PicTiming::read(sps, &msg);
                        }
                    }
                }
            }
            UnitType::SliceLayerWithoutPartitioningIdr
            | UnitType::SliceLayerWithoutPartitioningNonIdr => {
                let _ = slice::SliceHeader::read(ctx, nal.rbsp_bits(), hdr);
            }
            _ => {}
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let mut ctx = Context::default();
    let mut reader = AnnexBReader::new(Handler::default());
    reader.start(&mut ctx);
    reader.push(&mut ctx, data);
    reader.end_units(&mut ctx);
});
