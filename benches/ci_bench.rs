use h264_reader::annexb::{AnnexBReader, NalReader};
use h264_reader::nal::pps::{ParamSetId, PicParameterSet};
use h264_reader::nal::sei::buffering_period::BufferingPeriod;
use h264_reader::nal::sei::pic_timing::PicTiming;
use h264_reader::nal::sei::HeaderType;
use h264_reader::nal::slice::SliceHeader;
use h264_reader::nal::sps::SeqParameterSet;
use h264_reader::nal::Nal;
use h264_reader::nal::{sei, RefNal, UnitType};
use h264_reader::Context;
use iai_callgrind::{library_benchmark, library_benchmark_group, main};
use std::fs::File;
use std::hint::black_box;
use std::io::Read;

fn setup_video(filename: &str) -> Vec<u8> {
    let mut f = File::open(filename).expect("Test file missing.");
    let l = f.metadata().unwrap().len() as usize;
    let size = l.min(10 * 1024 * 1024);
    let mut buf = vec![0; size];
    f.read_exact(&mut buf[..]).unwrap();
    buf
}

#[derive(Default)]
struct Reader {
    buf: Vec<u8>,
    last_sps_id: Option<ParamSetId>,
}
impl NalReader for Reader {
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
        let nal_header = nal.header().unwrap();
        let nal_unit_type = nal_header.nal_unit_type();

        match nal_unit_type {
            UnitType::SeqParameterSet => {
                let data = SeqParameterSet::from_bits(nal.rbsp_bits()).unwrap();
                self.last_sps_id = Some(data.seq_parameter_set_id);
                ctx.put_seq_param_set(data);
            }
            UnitType::PicParameterSet => {
                let data = PicParameterSet::from_bits(ctx, nal.rbsp_bits()).unwrap();
                ctx.put_pic_param_set(data);
            }
            UnitType::SliceLayerWithoutPartitioningIdr
            | UnitType::SliceLayerWithoutPartitioningNonIdr => {
                let header = SliceHeader::read(ctx, nal.rbsp_bits(), nal_header).unwrap();
                let _ = black_box(header);
            }
            UnitType::SEI => {
                let mut scratch = vec![];
                let mut reader = sei::SeiReader::from_rbsp_bytes(nal.rbsp_bytes(), &mut scratch);
                loop {
                    match reader.next() {
                        Ok(Some(msg)) => match msg.payload_type {
                            HeaderType::BufferingPeriod => {
                                let bp = BufferingPeriod::read(ctx, &msg);
                                let _ = black_box(bp);
                            }
                            HeaderType::PicTiming => {
                                if let Some(sps) =
                                    self.last_sps_id.and_then(|id| ctx.sps_by_id(id))
                                {
                                    let pt = PicTiming::read(sps, &msg);
                                    let _ = black_box(pt);
                                }
                            }
                            _ => {}
                        },
                        Ok(None) => break,
                        Err(e) => {
                            println!("{:?}", e);
                            break;
                        }
                    }
                }
            }
            _ => {
                println!("Unhandled: {:?}", nal_unit_type);
            }
        }
    }
}

#[library_benchmark]
#[bench::read(setup_video("big_buck_bunny_1080p_24fps_h264.h264"))]
fn reader(buf: Vec<u8>) {
    let mut ctx = Context::new();
    let mut reader = AnnexBReader::new(Reader::default());
    reader.start(&mut ctx);
    reader.push(&mut ctx, &buf);
    reader.end_units(&mut ctx);
}

library_benchmark_group!(
    name = ci;
    benchmarks = reader
);

main!(library_benchmark_groups = ci);
