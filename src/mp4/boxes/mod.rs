//! Individual box-family parsers, one module per related group of ISOBMFF boxes.

pub mod ftyp;
pub mod mdat;
pub mod mdia;
pub mod meta;
pub mod minf;
pub mod misc;
pub mod moof;
pub mod moov;
pub mod sampleentry;
pub mod sidx;
pub mod stbl;
pub mod trak;
