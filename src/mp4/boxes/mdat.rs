//! `mdat`: Media Data Box. Raw sample bytes, opaque to the box engine; only the extractor gives
//! these bytes meaning, by slicing them according to `stsc`/`stco`/`stsz` or `trun`.

pub struct MdatBox<'buf> {
    pub data: &'buf [u8],
}

impl<'buf> MdatBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> MdatBox<'buf> {
        MdatBox { data: payload }
    }
}
