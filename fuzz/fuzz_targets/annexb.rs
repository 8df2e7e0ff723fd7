//! Tests the Annex B parser doesn't crash and has consistent output between a
//! single push call and a pair of push split at each possible byte location.

#![no_main]
use h264_reader::annexb::{AnnexBReader, NalReader};
use h264_reader::Context;
use hex_slice::AsHex;
use libfuzzer_sys::fuzz_target;
use std::convert::TryFrom;

/// Encodes the stream as (4-byte length prefix, NAL)*, as commonly seen in AVC files.
#[derive(Default)]
struct AvcBuilder {
    cur: Vec<u8>,
    all: Vec<u8>,
}
impl NalReader for AvcBuilder {
    fn start(&mut self, _ctx: &mut Context) {
        self.cur.clear();
    }
    fn push(&mut self, _ctx: &mut Context, buf: &[u8]) {
        self.cur.extend_from_slice(buf);
    }
    fn end(&mut self, _ctx: &mut Context) {
        if self.cur.is_empty() {
            return;
        }
        let len = u32::try_from(self.cur.len()).unwrap();
        self.all.extend_from_slice(&len.to_be_bytes()[..]);
        self.all.extend_from_slice(&self.cur[..]);
        self.cur.clear();
    }
}

fuzz_target!(|data: &[u8]| {
    // Parse in a single push.
    let mut ctx = Context::new();
    let mut single_push = AnnexBReader::new(AvcBuilder::default());
    single_push.start(&mut ctx);
    single_push.push(&mut ctx, data);
    single_push.end_units(&mut ctx);
    let single_avc = single_push.into_reader();

    for i in 0..data.len() {
        // Parse in a split push.
        let mut ctx = Context::new();
        let mut split_push = AnnexBReader::new(AvcBuilder::default());
        split_push.start(&mut ctx);
        let (head, tail) = data.split_at(i);
        split_push.push(&mut ctx, head);
        split_push.push(&mut ctx, &[]); // also ensure empty pushes don't break.
        split_push.push(&mut ctx, tail);
        split_push.end_units(&mut ctx);
        let split_avc = split_push.into_reader();

        assert!(single_avc.all.as_slice() == split_avc.all.as_slice(),
                "inconsistent output.\n\
                split point: {}\n\
                input:       {:02x}\n\
                single push: {:02x}\n\
                split push:  {:02x}",
                i,
                data.as_hex(),
                single_avc.all.as_hex(),
                split_avc.all.as_hex());
    }
});
