//! Non-fatal conditions noticed while walking a container or elementary stream.
//!
//! Callers that want a best-effort parse (skip what's broken, keep what isn't) collect these
//! rather than aborting on the first `Err`; each one is also emitted via [`log`] at `warn` level
//! as it's produced.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A box or tag type wasn't recognised; its payload was skipped.
    UnknownBoxType([u8; 4]),
    UnknownTagType(u8),
    /// A box's declared size didn't agree with the bytes actually consumed from it.
    SizeMismatch { expected: u64, actual: u64 },
    /// A box claimed more bytes than remained in its parent.
    InsufficientSize,
    /// A top-level `mdat` arrived after its preceding `moof` had already claimed one; a fresh,
    /// `moof`-less fragment was appended to hold it rather than discarding or misattributing it.
    UnpairedMdat,
    /// A NAL unit failed to parse as its dispatched type (an SPS/PPS referenced by a
    /// configuration record, a slice header, an AUD, or an SEI message).
    MalformedParameterSet,
    /// A slice header referenced a `seq_parameter_set_id`/`pic_parameter_set_id` that hasn't
    /// been seen yet. The slice header fields aren't populated, but the NAL unit itself is
    /// still stored with its raw bytes.
    EmptyParameterSet,
    /// A FLV video tag needed a previously-cached AVC sequence header that was never seen.
    MissingAvcSequenceHeader,
    /// A recognised but unsupported feature was skipped, e.g. a non-AVC video codec or an
    /// encryption-filtered tag.
    UnsupportedFeature,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownBoxType(t) => {
                write!(f, "unknown box type {:?}", String::from_utf8_lossy(t))
            }
            Warning::UnknownTagType(t) => write!(f, "unknown flv tag type {}", t),
            Warning::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {} got {}", expected, actual)
            }
            Warning::InsufficientSize => write!(f, "insufficient bytes remaining for box"),
            Warning::UnpairedMdat => write!(f, "mdat followed an already-paired moof"),
            Warning::MalformedParameterSet => write!(f, "malformed parameter set"),
            Warning::EmptyParameterSet => write!(f, "slice referenced an unseen sps/pps"),
            Warning::MissingAvcSequenceHeader => write!(f, "no avc sequence header seen yet"),
            Warning::UnsupportedFeature => write!(f, "unsupported feature skipped"),
        }
    }
}

/// Accumulates [`Warning`]s produced during a parse, logging each as it arrives.
#[derive(Default, Debug)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Warnings(Vec::new())
    }

    pub fn push(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.0.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Warning] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}
