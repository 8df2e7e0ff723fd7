use h264_reader::annexb::{AnnexBReader, NalReader};
use h264_reader::nal::pps::{ParamSetId, PicParameterSet};
use h264_reader::nal::sei::buffering_period::BufferingPeriod;
use h264_reader::nal::sei::pic_timing::PicTiming;
use h264_reader::nal::sei::user_data_unregistered::UserDataUnregistered;
use h264_reader::nal::sei::HeaderType;
use h264_reader::nal::slice::SliceHeader;
use h264_reader::nal::sps::SeqParameterSet;
use h264_reader::nal::{sei, Nal, RefNal, UnitType};
use h264_reader::Context;
use hex_slice::AsHex;
use std::io::Read;

fn main() {
    let path = {
        let mut args = std::env::args_os();
        if args.len() != 2 {
            eprintln!("Usage: dump-param-sets path/to/data.h264");
            std::process::exit(1);
        }
        args.nth(1).unwrap()
    };

    let mut file = std::fs::File::open(path).expect("open");

    // Create a context to keep track of SPS and PPS NALs that we receive. It *needs* to be
    // persistent through all parsing
    let mut ctx = Context::new();

    // Then we prepare an AnnexBReader to handle the parsed data. Unlike the transport-stream
    // reader in `push`, this one accumulates each NAL itself and gets a callback once it's
    // complete.
    let mut reader = AnnexBReader::new(Dumper {
        buf: Vec::new(),
        last_sps_id: None,
    });
    reader.start(&mut ctx);

    // Push data. Doesn't have to be aligned in any way. You can push multiple times for a single
    // NAL, or send an entire file in at once.
    let mut buf = vec![0; 2 * 1024 * 1024];
    loop {
        match file.read(&mut buf[..]).expect("read") {
            0 => break,
            n => reader.push(&mut ctx, &buf[0..n]),
        }
    }

    // If we're sure that the entire current NAL has been pushed, then we can call this to signal
    // that the parser should immediately stop waiting for a new NAL marker.
    reader.end_units(&mut ctx);
}

struct Dumper {
    buf: Vec<u8>,
    /// The most recently parsed SPS id, so a following `pic_timing()` SEI message can be
    /// resolved against the right SPS without needing to buffer past the next slice header.
    last_sps_id: Option<ParamSetId>,
}
impl NalReader for Dumper {
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
                hex_dump(&nal);
                match SeqParameterSet::from_bits(nal.rbsp_bits()) {
                    Ok(sps) => {
                        println!("{:#?}", sps);
                        // Don't forget to tell the context that we have a new SPS.
                        self.last_sps_id = Some(sps.seq_parameter_set_id);
                        ctx.put_seq_param_set(sps);
                    }
                    Err(e) => eprintln!("error parsing SPS: {:?}", e),
                }
            }
            UnitType::PicParameterSet => {
                hex_dump(&nal);
                // Same as when parsing an SPS, except it borrows the stream context so it can
                // pick out the SPS that this PPS references
                match PicParameterSet::from_bits(ctx, nal.rbsp_bits()) {
                    Ok(pps) => {
                        println!("{:#?}", pps);
                        ctx.put_pic_param_set(pps);
                    }
                    Err(e) => eprintln!("error parsing PPS: {:?}", e),
                }
            }
            UnitType::SliceLayerWithoutPartitioningIdr
            | UnitType::SliceLayerWithoutPartitioningNonIdr => {
                match SliceHeader::read(ctx, nal.rbsp_bits(), nal_header) {
                    Ok(header) => println!("{:#?}", header),
                    Err(e) => eprintln!("error parsing slice header: {:?}", e),
                }
            }
            UnitType::SEI => {
                let mut scratch = vec![];
                let mut reader = sei::SeiReader::from_rbsp_bytes(nal.rbsp_bytes(), &mut scratch);
                loop {
                    match reader.next() {
                        Ok(Some(msg)) => match msg.payload_type {
                            HeaderType::BufferingPeriod => {
                                println!("{:#?}", BufferingPeriod::read(ctx, &msg));
                            }
                            HeaderType::PicTiming => {
                                match self.last_sps_id.and_then(|id| ctx.sps_by_id(id)) {
                                    Some(sps) => println!("{:#?}", PicTiming::read(sps, &msg)),
                                    None => eprintln!("pic_timing() seen before any SPS"),
                                }
                            }
                            HeaderType::UserDataUnregistered => {
                                println!("{:#?}", UserDataUnregistered::read(&msg));
                            }
                            _ => {
                                println!("{:#?}", msg);
                            }
                        },
                        Ok(None) => break,
                        Err(e) => {
                            eprintln!("{:?}", e);
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

fn hex_dump(nal: &RefNal) {
    let mut nal_rbsp_bytes = vec![];
    nal.rbsp_bytes()
        .read_to_end(&mut nal_rbsp_bytes)
        .expect("read NAL");
    println!(
        "{:?}: {:02x}",
        nal.header().unwrap().nal_unit_type(),
        &nal_rbsp_bytes[..].plain_hex(false)
    );
}
