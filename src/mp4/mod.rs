//! ISO/IEC 14496-12 ("ISOBMFF") box parsing: a sequential, single-pass reader over the top-level
//! box list of an MP4/CMAF file, covering both plain (`moov`+`mdat`) and fragmented
//! (`moov`+`mvex`, then repeated `moof`+`mdat` pairs) layouts.
//!
//! The whole input is expected to already be in memory; every accessor below borrows from it
//! rather than copying, following the same `&'buf [u8]`-backed style as [`crate::avcc`].

pub mod boxes;
pub mod header;

pub use header::BoxError;

use boxes::ftyp::FtypBox;
use boxes::mdat::MdatBox;
use boxes::misc::{FreeBox, UuidBox, WideBox};
use boxes::moof::MoofBox;
use boxes::moov::MoovBox;
use boxes::sidx::SidxBox;
use header::BoxIter;

use crate::warning::{Warning, Warnings};

/// One `moof`/`mdat` pair making up a single movie fragment. Per the fragmented-MP4 layout, the
/// `mdat` carrying this fragment's sample bytes always follows its `moof` (though other boxes,
/// like `sidx`, may appear between them) -- `mdat` is `None` until that happens. `moof` is `None`
/// for a fragment synthesised to hold a second `mdat` that arrived after its pair was already
/// complete -- see [`Boxes::push_mdat`].
pub struct Fragment<'buf> {
    pub moof: Option<MoofBox>,
    pub mdat: Option<&'buf [u8]>,
}

/// The parsed top-level box list of an MP4 file.
pub struct Boxes<'buf> {
    /// The entire original input. `stco`/`co64` chunk offsets are absolute file offsets, so
    /// resolving a plain (non-fragmented) sample's bytes means slicing this rather than any
    /// single `mdat` entry above.
    pub data: &'buf [u8],
    pub ftyp: Option<FtypBox<'buf>>,
    pub moov: Option<MoovBox<'buf>>,
    pub sidx: Vec<SidxBox>,
    /// `moof`/`mdat` pairs, in file order, for fragmented input.
    pub fragments: Vec<Fragment<'buf>>,
    /// Standalone `mdat` boxes -- the sample data of a plain (non-fragmented) file.
    pub mdat: Vec<&'buf [u8]>,
    pub free: Vec<FreeBox<'buf>>,
    pub wide: Vec<WideBox<'buf>>,
    pub uuid: Vec<UuidBox<'buf>>,
}

impl<'buf> Boxes<'buf> {
    /// Parses every top-level box in `data` in one sequential pass. A box whose header or
    /// declared payload doesn't fit in what remains stops the walk; whatever was parsed up to
    /// that point is still returned to the caller rather than discarded. Non-fatal problems
    /// noticed along the way (like an `mdat` that can't be paired to the `moof` that preceded it)
    /// are recorded in `warnings` rather than aborting the parse.
    pub fn parse(data: &'buf [u8], warnings: &mut Warnings) -> Boxes<'buf> {
        let mut out = Boxes {
            data,
            ftyp: None,
            moov: None,
            sidx: Vec::new(),
            fragments: Vec::new(),
            mdat: Vec::new(),
            free: Vec::new(),
            wide: Vec::new(),
            uuid: Vec::new(),
        };
        for item in BoxIter::new(data) {
            let (header, payload) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"ftyp" => out.ftyp = FtypBox::parse(payload).ok(),
                b"moov" => out.moov = Some(MoovBox::parse(payload)),
                b"sidx" => {
                    if let Ok(s) = SidxBox::parse(payload) {
                        out.sidx.push(s);
                    }
                }
                b"moof" => out.fragments.push(Fragment {
                    moof: Some(MoofBox::parse(payload)),
                    mdat: None,
                }),
                b"mdat" => out.push_mdat(MdatBox::parse(payload).data, warnings),
                b"free" | b"skip" => out.free.push(FreeBox::parse(payload)),
                b"wide" => out.wide.push(WideBox::parse(payload)),
                header::TYPE_UUID => out.uuid.push(UuidBox::parse(header.user_type, payload)),
                _ => {}
            }
        }
        out
    }

    /// Routes a top-level `mdat` to the most recently opened fragment that hasn't claimed one
    /// yet. A fragment whose `mdat` slot is already filled (unusual but not precluded by the
    /// format) gets a fresh, `moof`-less pair appended instead of silently rerouting this `mdat`
    /// to the standalone list, and a warning is recorded so the caller notices the irregular
    /// fragment.
    fn push_mdat(&mut self, data: &'buf [u8], warnings: &mut Warnings) {
        if let Some(fragment) = self.fragments.last_mut() {
            if fragment.mdat.is_none() {
                fragment.mdat = Some(data);
                return;
            }
            warnings.push(Warning::UnpairedMdat);
            self.fragments.push(Fragment {
                moof: None,
                mdat: Some(data),
            });
            return;
        }
        self.mdat.push(data);
    }

    /// Whether this file uses movie fragments (`mvex` present, or at least one `moof` seen).
    pub fn is_fragmented(&self) -> bool {
        !self.fragments.is_empty()
            || self
                .moov
                .as_ref()
                .map(|m| m.mvex.is_some())
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_ftyp_then_standalone_mdat() {
        let mut data = hex!("00 00 00 10" "66 74 79 70") // ftyp, size 16
            .to_vec();
        data.extend_from_slice(&hex!("69 73 6f 6d" "00 00 00 00")); // major_brand, minor_version
        data.extend_from_slice(&hex!("00 00 00 09" "6d 64 61 74" "ab")); // mdat, 1 byte payload

        let mut warnings = Warnings::new();
        let boxes = Boxes::parse(&data, &mut warnings);
        assert!(boxes.ftyp.is_some());
        assert!(!boxes.is_fragmented());
        assert_eq!(boxes.mdat.len(), 1);
        assert_eq!(boxes.mdat[0], &[0xab]);
        assert!(boxes.fragments.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn pairs_moof_with_following_mdat() {
        let mut data = hex!("00 00 00 08" "6d 6f 6f 66").to_vec(); // moof, empty payload
        data.extend_from_slice(&hex!("00 00 00 09" "6d 64 61 74" "cd")); // mdat, 1 byte payload

        let mut warnings = Warnings::new();
        let boxes = Boxes::parse(&data, &mut warnings);
        assert!(boxes.is_fragmented());
        assert_eq!(boxes.fragments.len(), 1);
        assert_eq!(boxes.fragments[0].mdat, Some(&[0xcd][..]));
        assert!(boxes.mdat.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn second_mdat_after_paired_moof_appends_a_fresh_fragment_and_warns() {
        let mut data = hex!("00 00 00 08" "6d 6f 6f 66").to_vec(); // moof, empty payload
        data.extend_from_slice(&hex!("00 00 00 09" "6d 64 61 74" "cd")); // mdat, paired with the moof above
        data.extend_from_slice(&hex!("00 00 00 09" "6d 64 61 74" "ef")); // second mdat, already-paired moof

        let mut warnings = Warnings::new();
        let boxes = Boxes::parse(&data, &mut warnings);
        assert_eq!(boxes.fragments.len(), 2);
        assert!(boxes.fragments[0].moof.is_some());
        assert_eq!(boxes.fragments[0].mdat, Some(&[0xcd][..]));
        assert!(boxes.fragments[1].moof.is_none());
        assert_eq!(boxes.fragments[1].mdat, Some(&[0xef][..]));
        assert!(boxes.mdat.is_empty());
        assert_eq!(warnings.as_slice(), &[Warning::UnpairedMdat]);
    }
}
