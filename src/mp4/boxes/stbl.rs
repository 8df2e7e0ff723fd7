//! The sample-table box (`stbl`) and its children: `stsd`, `stts`, `stss`, `stsc`, `stsz`,
//! `stco`/`co64`, `ctts`, `sdtp`.

use crate::mp4::boxes::sampleentry::{AudioSampleEntry, VisualSampleEntry};
use crate::mp4::header::{read_full_header, BoxError, BoxIter};
use std::convert::TryInto;

/// `stsd`: Sample Description Box. Which sample-entry family is parsed from each child box
/// depends on the enclosing track's `hdlr.handler_type`, passed down from `mdia` -> `minf` ->
/// `stbl` -> `stsd` at call time rather than stored on the tree.
pub struct StsdBox<'buf> {
    pub entry_count: u32,
    pub avc1: Vec<VisualSampleEntry<'buf>>,
    pub hev1: Vec<VisualSampleEntry<'buf>>,
    pub hvc1: Vec<VisualSampleEntry<'buf>>,
    pub av01: Vec<VisualSampleEntry<'buf>>,
    pub mp4a: Vec<AudioSampleEntry<'buf>>,
}

pub const HANDLER_VIDE: [u8; 4] = *b"vide";
pub const HANDLER_SOUN: [u8; 4] = *b"soun";

impl<'buf> StsdBox<'buf> {
    pub fn parse(payload: &'buf [u8], handler_type: &[u8; 4]) -> Result<StsdBox<'buf>, BoxError> {
        let (_version, _flags, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        let entry_count = u32::from_be_bytes(body[0..4].try_into().unwrap());
        let mut out = StsdBox {
            entry_count,
            avc1: Vec::new(),
            hev1: Vec::new(),
            hvc1: Vec::new(),
            av01: Vec::new(),
            mp4a: Vec::new(),
        };
        for item in BoxIter::new(&body[4..]) {
            let (header, entry) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match (handler_type, &header.box_type) {
                (&HANDLER_VIDE, b"avc1") => {
                    if let Ok(e) = VisualSampleEntry::parse(entry) {
                        out.avc1.push(e);
                    }
                }
                (&HANDLER_VIDE, b"hev1") => {
                    if let Ok(e) = VisualSampleEntry::parse(entry) {
                        out.hev1.push(e);
                    }
                }
                (&HANDLER_VIDE, b"hvc1") => {
                    if let Ok(e) = VisualSampleEntry::parse(entry) {
                        out.hvc1.push(e);
                    }
                }
                (&HANDLER_VIDE, b"av01") => {
                    if let Ok(e) = VisualSampleEntry::parse(entry) {
                        out.av01.push(e);
                    }
                }
                (&HANDLER_SOUN, b"mp4a") => {
                    if let Ok(e) = AudioSampleEntry::parse(entry) {
                        out.mp4a.push(e);
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }
}

/// `stts`: Decoding Time to Sample Box -- a run-length `(sample_count, sample_delta)` table.
pub struct SttsBox {
    pub entries: Vec<(u32, u32)>,
}
impl SttsBox {
    pub fn parse(payload: &[u8]) -> Result<SttsBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        Ok(SttsBox {
            entries: read_u32_pairs(body)?,
        })
    }
}

/// `stss`: Sync Sample Box -- the (1-based) sample numbers that are random-access points.
pub struct StssBox {
    pub sample_numbers: Vec<u32>,
}
impl StssBox {
    pub fn parse(payload: &[u8]) -> Result<StssBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        Ok(StssBox {
            sample_numbers: read_u32_list(body)?,
        })
    }
}

/// `stsc`: Sample To Chunk Box -- a run-length table of `(first_chunk, samples_per_chunk,
/// sample_description_index)`, each run extending until the next entry's `first_chunk`.
#[derive(Debug, Clone, Copy)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}
pub struct StscBox {
    pub entries: Vec<StscEntry>,
}
impl StscBox {
    pub fn parse(payload: &[u8]) -> Result<StscBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        let count = u32::from_be_bytes(body[0..4].try_into().unwrap()) as usize;
        let mut entries = Vec::with_capacity(count);
        let mut rest = &body[4..];
        for _ in 0..count {
            if rest.len() < 12 {
                return Err(BoxError::InsufficientSize);
            }
            entries.push(StscEntry {
                first_chunk: u32::from_be_bytes(rest[0..4].try_into().unwrap()),
                samples_per_chunk: u32::from_be_bytes(rest[4..8].try_into().unwrap()),
                sample_description_index: u32::from_be_bytes(rest[8..12].try_into().unwrap()),
            });
            rest = &rest[12..];
        }
        Ok(StscBox { entries })
    }

    /// Returns the number of samples held by chunk `chunk_index` (1-based), per the run-length
    /// table: each run applies until the chunk number named by the next entry.
    pub fn samples_in_chunk(&self, chunk_index: u32) -> u32 {
        let mut samples_per_chunk = 0;
        for (i, entry) in self.entries.iter().enumerate() {
            let run_end = self
                .entries
                .get(i + 1)
                .map(|next| next.first_chunk)
                .unwrap_or(u32::MAX);
            if chunk_index >= entry.first_chunk && chunk_index < run_end {
                samples_per_chunk = entry.samples_per_chunk;
                break;
            }
        }
        samples_per_chunk
    }
}

/// `stsz`/`stz2`: Sample Size Box -- either a uniform `sample_size` for every sample, or (when
/// `sample_size == 0`) a per-sample size table of `sample_count` entries.
pub struct StszBox {
    pub sample_size: u32,
    pub sample_count: u32,
    pub entry_sizes: Vec<u32>,
}
impl StszBox {
    pub fn parse(payload: &[u8]) -> Result<StszBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() < 8 {
            return Err(BoxError::InsufficientSize);
        }
        let sample_size = u32::from_be_bytes(body[0..4].try_into().unwrap());
        let sample_count = u32::from_be_bytes(body[4..8].try_into().unwrap());
        let entry_sizes = if sample_size == 0 {
            read_u32_list(&body[8..])?
        } else {
            Vec::new()
        };
        Ok(StszBox {
            sample_size,
            sample_count,
            entry_sizes,
        })
    }

    /// Size in bytes of sample `index` (0-based).
    pub fn size_of(&self, index: usize) -> Option<u32> {
        if self.sample_size != 0 {
            if (index as u32) < self.sample_count {
                Some(self.sample_size)
            } else {
                None
            }
        } else {
            self.entry_sizes.get(index).copied()
        }
    }
}

/// `stco`: Chunk Offset Box -- 32-bit absolute file offsets to each chunk's first sample.
pub struct StcoBox {
    pub chunk_offsets: Vec<u64>,
}
impl StcoBox {
    pub fn parse(payload: &[u8]) -> Result<StcoBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        Ok(StcoBox {
            chunk_offsets: read_u32_list(body)?.into_iter().map(u64::from).collect(),
        })
    }
}

/// `co64`: 64-bit counterpart of `stco`, used when chunk offsets exceed 32 bits.
pub struct Co64Box {
    pub chunk_offsets: Vec<u64>,
}
impl Co64Box {
    pub fn parse(payload: &[u8]) -> Result<Co64Box, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() % 8 != 0 {
            return Err(BoxError::InsufficientSize);
        }
        Ok(Co64Box {
            chunk_offsets: body
                .chunks_exact(8)
                .map(|c| u64::from_be_bytes(c.try_into().unwrap()))
                .collect(),
        })
    }
}

/// `ctts`: Composition Time to Sample Box -- a run-length `(sample_count, sample_offset)` table,
/// `sample_offset` signed from version 1 onward.
pub struct CttsBox {
    pub entries: Vec<(u32, i32)>,
}
impl CttsBox {
    pub fn parse(payload: &[u8]) -> Result<CttsBox, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        let count = u32::from_be_bytes(body[0..4].try_into().unwrap()) as usize;
        let mut entries = Vec::with_capacity(count);
        let mut rest = &body[4..];
        for _ in 0..count {
            if rest.len() < 8 {
                return Err(BoxError::InsufficientSize);
            }
            let sample_count = u32::from_be_bytes(rest[0..4].try_into().unwrap());
            let sample_offset = i32::from_be_bytes(rest[4..8].try_into().unwrap());
            entries.push((sample_count, sample_offset));
            rest = &rest[8..];
        }
        Ok(CttsBox { entries })
    }
}

/// `sdtp`: Independent and Disposable Samples Box -- one status byte per sample.
pub struct SdtpBox<'buf> {
    pub data: &'buf [u8],
}
impl<'buf> SdtpBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<SdtpBox<'buf>, BoxError> {
        let (_v, _f, body) = read_full_header(payload)?;
        Ok(SdtpBox { data: body })
    }
}

/// `sgpd`: Sample Group Description Box -- describes the sample-group entries referenced by a
/// matching `sbgp` box, keyed by `grouping_type`. Per-entry layout is defined by the grouping
/// type itself (e.g. `roll`, `rap `, `sync`), which this crate has no need to interpret further,
/// so the entries are kept as one raw byte range rather than decoded per type.
pub struct SgpdBox<'buf> {
    pub grouping_type: [u8; 4],
    pub entry_count: u32,
    pub entries: &'buf [u8],
}
impl<'buf> SgpdBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> Result<SgpdBox<'buf>, BoxError> {
        let (version, _flags, body) = read_full_header(payload)?;
        if body.len() < 4 {
            return Err(BoxError::InsufficientSize);
        }
        let grouping_type = body[0..4].try_into().unwrap();
        let mut offset = 4;
        if version == 1 {
            offset += 4; // default_length
        } else if version >= 2 {
            offset += 4; // default_sample_description_index
        }
        if body.len() < offset + 4 {
            return Err(BoxError::InsufficientSize);
        }
        let entry_count = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
        offset += 4;
        Ok(SgpdBox {
            grouping_type,
            entry_count,
            entries: &body[offset..],
        })
    }
}

fn read_u32_list(body: &[u8]) -> Result<Vec<u32>, BoxError> {
    if body.len() < 4 {
        return Err(BoxError::InsufficientSize);
    }
    let count = u32::from_be_bytes(body[0..4].try_into().unwrap()) as usize;
    let rest = &body[4..];
    if rest.len() < count * 4 {
        return Err(BoxError::InsufficientSize);
    }
    Ok(rest[..count * 4]
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
        .collect())
}

fn read_u32_pairs(body: &[u8]) -> Result<Vec<(u32, u32)>, BoxError> {
    if body.len() < 4 {
        return Err(BoxError::InsufficientSize);
    }
    let count = u32::from_be_bytes(body[0..4].try_into().unwrap()) as usize;
    let mut rest = &body[4..];
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        if rest.len() < 8 {
            return Err(BoxError::InsufficientSize);
        }
        out.push((
            u32::from_be_bytes(rest[0..4].try_into().unwrap()),
            u32::from_be_bytes(rest[4..8].try_into().unwrap()),
        ));
        rest = &rest[8..];
    }
    Ok(out)
}

/// `stbl`: Sample Table Box, the parent of `stsd` and the indices used to locate samples.
pub struct StblBox<'buf> {
    pub stsd: Option<StsdBox<'buf>>,
    pub stts: Option<SttsBox>,
    pub stss: Option<StssBox>,
    pub stsc: Option<StscBox>,
    pub stsz: Option<StszBox>,
    pub stco: Option<StcoBox>,
    pub co64: Option<Co64Box>,
    pub ctts: Option<CttsBox>,
    pub sdtp: Option<SdtpBox<'buf>>,
    pub sgpd: Vec<SgpdBox<'buf>>,
}
impl<'buf> StblBox<'buf> {
    pub fn parse(payload: &'buf [u8], handler_type: &[u8; 4]) -> StblBox<'buf> {
        let mut out = StblBox {
            stsd: None,
            stts: None,
            stss: None,
            stsc: None,
            stsz: None,
            stco: None,
            co64: None,
            ctts: None,
            sdtp: None,
            sgpd: Vec::new(),
        };
        for item in BoxIter::new(payload) {
            let (header, body) = match item {
                Ok(v) => v,
                Err(_) => break,
            };
            match &header.box_type {
                b"stsd" => out.stsd = StsdBox::parse(body, handler_type).ok(),
                b"stts" => out.stts = SttsBox::parse(body).ok(),
                b"stss" => out.stss = StssBox::parse(body).ok(),
                b"stsc" => out.stsc = StscBox::parse(body).ok(),
                b"stsz" | b"stz2" => out.stsz = StszBox::parse(body).ok(),
                b"stco" => out.stco = StcoBox::parse(body).ok(),
                b"co64" => out.co64 = Co64Box::parse(body).ok(),
                b"ctts" => out.ctts = CttsBox::parse(body).ok(),
                b"sdtp" => out.sdtp = SdtpBox::parse(body).ok(),
                b"sgpd" => {
                    if let Ok(s) = SgpdBox::parse(body) {
                        out.sgpd.push(s);
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Chunk offsets regardless of whether the file used `stco` or `co64`.
    pub fn chunk_offsets(&self) -> Vec<u64> {
        if let Some(co64) = &self.co64 {
            co64.chunk_offsets.clone()
        } else if let Some(stco) = &self.stco {
            stco.chunk_offsets.clone()
        } else {
            Vec::new()
        }
    }

    /// Resolves every sample's absolute byte range within `mdat`, for a plain (non-fragmented)
    /// track, by walking `stsc`'s chunk run table against `stco`/`co64`'s chunk base offsets and
    /// `stsz`'s per-sample sizes. Samples are 0-indexed, in decode order.
    pub fn sample_locations(&self) -> Vec<(u64, u32)> {
        let (stsc, stsz) = match (&self.stsc, &self.stsz) {
            (Some(stsc), Some(stsz)) => (stsc, stsz),
            _ => return Vec::new(),
        };
        let chunk_offsets = self.chunk_offsets();
        let mut out = Vec::with_capacity(stsz.sample_count as usize);
        let mut sample_index = 0usize;
        for (i, &chunk_offset) in chunk_offsets.iter().enumerate() {
            let chunk_index = (i + 1) as u32;
            let samples_in_chunk = stsc.samples_in_chunk(chunk_index);
            let mut offset = chunk_offset;
            for _ in 0..samples_in_chunk {
                let size = match stsz.size_of(sample_index) {
                    Some(s) => s,
                    None => return out,
                };
                out.push((offset, size));
                offset += u64::from(size);
                sample_index += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stsc_run_length_lookup() {
        let stsc = StscBox {
            entries: vec![
                StscEntry {
                    first_chunk: 1,
                    samples_per_chunk: 2,
                    sample_description_index: 1,
                },
                StscEntry {
                    first_chunk: 3,
                    samples_per_chunk: 1,
                    sample_description_index: 1,
                },
            ],
        };
        assert_eq!(stsc.samples_in_chunk(1), 2);
        assert_eq!(stsc.samples_in_chunk(2), 2);
        assert_eq!(stsc.samples_in_chunk(3), 1);
        assert_eq!(stsc.samples_in_chunk(100), 1);
    }

    #[test]
    fn stsz_uniform_and_table() {
        let uniform = StszBox {
            sample_size: 10,
            sample_count: 3,
            entry_sizes: vec![],
        };
        assert_eq!(uniform.size_of(0), Some(10));
        assert_eq!(uniform.size_of(3), None);

        let table = StszBox {
            sample_size: 0,
            sample_count: 2,
            entry_sizes: vec![14, 80],
        };
        assert_eq!(table.size_of(0), Some(14));
        assert_eq!(table.size_of(1), Some(80));
    }
}
