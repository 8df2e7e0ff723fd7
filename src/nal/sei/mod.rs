//! Parser for Supplemental Enhancement Information messages (spec Annex D).
//!
//! An SEI NAL unit's RBSP carries a sequence of `sei_message()`s, each a `payloadType`/
//! `payloadSize` pair (both encoded as a run of `0xff` continuation bytes followed by a
//! final byte, `ff_byte* last_byte`) followed by `payloadSize` bytes of payload. [`SeiReader`]
//! walks that sequence and hands back each message as a [`SeiMessage`]; the individual
//! `payloadType` submodules know how to interpret the payload bytes further.

pub mod buffering_period;
pub mod pic_timing;
pub mod user_data_unregistered;

use std::io;
use std::io::BufRead;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeaderType {
    BufferingPeriod,
    PicTiming,
    PanScanRect,
    FillerPayload,
    UserDataRegisteredItuTT35,
    UserDataUnregistered,
    RecoveryPoint,
    DecRefPicMarkingRepetition,
    SparePic,
    SceneInfo,
    SubSeqInfo,
    SubSeqLayerCharacteristics,
    SubSeqCharacteristics,
    FullFrameFreeze,
    FullFrameFreezeRelease,
    FullFrameSnapshot,
    ProgressiveRefinementSegmentStart,
    ProgressiveRefinementSegmentEnd,
    MotionConstrainedSliceGroupSet,
    FilmGrainCharacteristics,
    DeblockingFilterDisplayPreference,
    StereoVideoInfo,
    PostFilterHint,
    ToneMappingInfo,
    ScalabilityInfo,
    SubPicScalableLayer,
    NonRequiredLayerRep,
    PriorityLayerInfo,
    LayersNotPresent,
    LayerDependencyChange,
    ScalableNesting,
    BaseLayerTemporalHrd,
    QualityLayerIntegrityCheck,
    RedundantPicProperty,
    Tl0DepRepIndex,
    TlSwitchingPoint,
    ParallelDecodingInfo,
    MvcScalableNesting,
    ViewScalabilityInfo,
    MultiviewSceneInfo,
    MultiviewAcquisitionInfo,
    NonRequiredViewComponent,
    ViewDependencyChange,
    OperationPointsNotPresent,
    BaseViewTemporalHrd,
    FramePackingArrangement,
    MultiviewViewPosition,
    DisplayOrientation,
    MvcdScalableNesting,
    MvcdViewScalabilityInfo,
    DepthRepresentationInfo,
    ThreeDimensionalReferenceDisplaysInfo,
    DepthTiming,
    DepthSamplingInfo,
    ConstrainedDepthParameterSetIdentifier,
    GreenMetadata,
    MasteringDisplayColourVolume,
    ColourRemappingInfo,
    AlternativeTransferCharacteristics,
    AlternativeDepthInfo,
    ReservedSeiMessage(u32),
}
impl HeaderType {
    fn from_id(id: u32) -> HeaderType {
        match id {
            0 => HeaderType::BufferingPeriod,
            1 => HeaderType::PicTiming,
            2 => HeaderType::PanScanRect,
            3 => HeaderType::FillerPayload,
            4 => HeaderType::UserDataRegisteredItuTT35,
            5 => HeaderType::UserDataUnregistered,
            6 => HeaderType::RecoveryPoint,
            7 => HeaderType::DecRefPicMarkingRepetition,
            8 => HeaderType::SparePic,
            9 => HeaderType::SceneInfo,
            10 => HeaderType::SubSeqInfo,
            11 => HeaderType::SubSeqLayerCharacteristics,
            12 => HeaderType::SubSeqCharacteristics,
            13 => HeaderType::FullFrameFreeze,
            14 => HeaderType::FullFrameFreezeRelease,
            15 => HeaderType::FullFrameSnapshot,
            16 => HeaderType::ProgressiveRefinementSegmentStart,
            17 => HeaderType::ProgressiveRefinementSegmentEnd,
            18 => HeaderType::MotionConstrainedSliceGroupSet,
            19 => HeaderType::FilmGrainCharacteristics,
            20 => HeaderType::DeblockingFilterDisplayPreference,
            21 => HeaderType::StereoVideoInfo,
            22 => HeaderType::PostFilterHint,
            23 => HeaderType::ToneMappingInfo,
            24 => HeaderType::ScalabilityInfo,
            25 => HeaderType::SubPicScalableLayer,
            26 => HeaderType::NonRequiredLayerRep,
            27 => HeaderType::PriorityLayerInfo,
            28 => HeaderType::LayersNotPresent,
            29 => HeaderType::LayerDependencyChange,
            30 => HeaderType::ScalableNesting,
            31 => HeaderType::BaseLayerTemporalHrd,
            32 => HeaderType::QualityLayerIntegrityCheck,
            33 => HeaderType::RedundantPicProperty,
            34 => HeaderType::Tl0DepRepIndex,
            35 => HeaderType::TlSwitchingPoint,
            36 => HeaderType::ParallelDecodingInfo,
            37 => HeaderType::MvcScalableNesting,
            38 => HeaderType::ViewScalabilityInfo,
            39 => HeaderType::MultiviewSceneInfo,
            40 => HeaderType::MultiviewAcquisitionInfo,
            41 => HeaderType::NonRequiredViewComponent,
            42 => HeaderType::ViewDependencyChange,
            43 => HeaderType::OperationPointsNotPresent,
            44 => HeaderType::BaseViewTemporalHrd,
            45 => HeaderType::FramePackingArrangement,
            46 => HeaderType::MultiviewViewPosition,
            47 => HeaderType::DisplayOrientation,
            48 => HeaderType::MvcdScalableNesting,
            49 => HeaderType::MvcdViewScalabilityInfo,
            50 => HeaderType::DepthRepresentationInfo,
            51 => HeaderType::ThreeDimensionalReferenceDisplaysInfo,
            52 => HeaderType::DepthTiming,
            53 => HeaderType::DepthSamplingInfo,
            54 => HeaderType::ConstrainedDepthParameterSetIdentifier,
            56 => HeaderType::GreenMetadata,
            137 => HeaderType::MasteringDisplayColourVolume,
            142 => HeaderType::ColourRemappingInfo,
            147 => HeaderType::AlternativeTransferCharacteristics,
            188 => HeaderType::AlternativeDepthInfo,
            _ => HeaderType::ReservedSeiMessage(id),
        }
    }
}

#[derive(Debug)]
pub enum SeiError {
    ReaderError(io::Error),
    /// `payloadSize` claimed more bytes than remained in the RBSP.
    NotEnoughData { payload_type: HeaderType, expected: usize, actual: usize },
}
impl From<io::Error> for SeiError {
    fn from(e: io::Error) -> Self {
        SeiError::ReaderError(e)
    }
}

/// One decoded `sei_message()`: a `payloadType` and the raw bytes of its payload.
///
/// `payload` borrows from the scratch buffer passed to [`SeiReader::from_rbsp_bytes`]; it's
/// only valid until the next call to [`SeiReader::next`].
#[derive(Debug)]
pub struct SeiMessage<'a> {
    pub payload_type: HeaderType,
    pub payload: &'a [u8],
}

/// Splits the RBSP bytes of an SEI NAL unit into individual [`SeiMessage`]s.
///
/// `rbsp_trailing_bits` (a lone `0x80` byte ending the last message) is recognised and
/// ends iteration rather than being read as a malformed message header.
pub struct SeiReader<'scratch, R: BufRead> {
    reader: R,
    scratch: &'scratch mut Vec<u8>,
}
impl<'scratch, R: BufRead> SeiReader<'scratch, R> {
    pub fn from_rbsp_bytes(reader: R, scratch: &'scratch mut Vec<u8>) -> SeiReader<'scratch, R> {
        SeiReader { reader, scratch }
    }

    /// Reads one `ff_byte* last_byte` varint, returning `None` at end of input.
    fn read_size_field(&mut self) -> Result<Option<u32>, SeiError> {
        let mut total: u32 = 0;
        loop {
            let mut b = [0u8; 1];
            if self.reader.read(&mut b)? == 0 {
                return Ok(None);
            }
            total += u32::from(b[0]);
            if b[0] != 0xff {
                return Ok(Some(total));
            }
        }
    }

    /// Returns the next message in the NAL unit, or `None` once only
    /// `rbsp_trailing_bits()` remains.
    pub fn next(&mut self) -> Result<Option<SeiMessage<'_>>, SeiError> {
        let payload_type = match self.read_size_field()? {
            None => return Ok(None),
            Some(id) => HeaderType::from_id(id),
        };
        let payload_size = match self.read_size_field()? {
            None => return Ok(None),
            Some(size) => size as usize,
        };
        self.scratch.clear();
        self.scratch.resize(payload_size, 0);
        self.reader.read_exact(&mut self.scratch[..]).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                SeiError::NotEnoughData {
                    payload_type,
                    expected: payload_size,
                    actual: 0,
                }
            } else {
                SeiError::ReaderError(e)
            }
        })?;
        Ok(Some(SeiMessage {
            payload_type,
            payload: &self.scratch[..],
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn two_messages() {
        let data = [
            0x01, 0x01, 0x01, // PicTiming, len 1, payload [0x01]
            0x02, 0x02, 0x02, 0x02, // PanScanRect, len 2, payload [0x02, 0x02]
        ];
        let mut scratch = Vec::new();
        let mut r = SeiReader::from_rbsp_bytes(&data[..], &mut scratch);

        let msg = r.next().unwrap().unwrap();
        assert_eq!(msg.payload_type, HeaderType::PicTiming);
        assert_eq!(msg.payload, &[0x01][..]);

        let msg = r.next().unwrap().unwrap();
        assert_eq!(msg.payload_type, HeaderType::PanScanRect);
        assert_eq!(msg.payload, &[0x02, 0x02][..]);

        assert!(r.next().unwrap().is_none());
    }

    #[test]
    fn long_form_size() {
        // payloadType 0xff 0x01 => BufferingPeriod (0xff continuation then 1 more => id 1... )
        // use a payloadSize needing one continuation byte: 0xff 0x05 => 255+5 = 260 bytes.
        let mut data = vec![0x00, 0xff, 0x05];
        data.extend(std::iter::repeat(0xAA).take(260));
        let mut scratch = Vec::new();
        let mut r = SeiReader::from_rbsp_bytes(&data[..], &mut scratch);
        let msg = r.next().unwrap().unwrap();
        assert_eq!(msg.payload_type, HeaderType::BufferingPeriod);
        assert_eq!(msg.payload.len(), 260);
        assert!(msg.payload.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn truncated_payload_errors() {
        let data = [0x05, 0x10, 0x01, 0x02]; // claims 16 bytes, only 2 present
        let mut scratch = Vec::new();
        let mut r = SeiReader::from_rbsp_bytes(&data[..], &mut scratch);
        match r.next() {
            Err(SeiError::NotEnoughData { payload_type, expected, .. }) => {
                assert_eq!(payload_type, HeaderType::UserDataUnregistered);
                assert_eq!(expected, 16);
            }
            other => panic!("expected NotEnoughData, got {:?}", other),
        }
    }
}
