//! `ftyp`: File Type Box.

use crate::mp4::header::BoxError;

pub struct FtypBox<'buf> {
    data: &'buf [u8],
}

impl<'buf> FtypBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<FtypBox<'buf>, BoxError> {
        if payload.len() < 8 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(FtypBox { data: payload })
    }

    pub fn major_brand(&self) -> &'buf [u8] {
        &self.data[0..4]
    }

    pub fn minor_version(&self) -> u32 {
        u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]])
    }

    pub fn compatible_brands(&self) -> impl Iterator<Item = &'buf [u8]> {
        self.data[8..].chunks_exact(4)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_brands() {
        let data = hex!(
            "69 73 6f 6d" // isom
            "00 00 02 00"
            "69 73 6f 6d" // isom
            "69 73 6f 32" // iso2
            "61 76 63 31" // avc1
            "6d 70 34 31" // mp41
        );
        let ftyp = FtypBox::parse(&data[..]).unwrap();
        assert_eq!(ftyp.major_brand(), b"isom");
        assert_eq!(ftyp.minor_version(), 0x200);
        let brands: Vec<&[u8]> = ftyp.compatible_brands().collect();
        assert_eq!(brands, vec![&b"isom"[..], b"iso2", b"avc1", b"mp41"]);
    }
}
