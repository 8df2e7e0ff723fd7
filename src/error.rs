//! A top-level error type aggregating failures from every container and codec module.

use std::fmt;
use std::io;

use crate::extract::ExtractError;
use crate::flv::FlvError;
use crate::mp4::BoxError;
use crate::nal::sps::SpsError;
use crate::nal::pps::PpsError;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Mp4(BoxError),
    Flv(FlvError),
    Sps(SpsError),
    Pps(PpsError),
    Extract(ExtractError),
    /// A length-prefixed or Annex B elementary stream was truncated or malformed.
    MalformedEs(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {}", e),
            Error::Mp4(e) => write!(f, "mp4 box error: {}", e),
            Error::Flv(e) => write!(f, "flv error: {}", e),
            Error::Sps(e) => write!(f, "sps error: {}", e),
            Error::Pps(e) => write!(f, "pps error: {}", e),
            Error::Extract(e) => write!(f, "extraction error: {}", e),
            Error::MalformedEs(msg) => write!(f, "malformed elementary stream: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
impl From<BoxError> for Error {
    fn from(e: BoxError) -> Self {
        Error::Mp4(e)
    }
}
impl From<FlvError> for Error {
    fn from(e: FlvError) -> Self {
        Error::Flv(e)
    }
}
impl From<SpsError> for Error {
    fn from(e: SpsError) -> Self {
        Error::Sps(e)
    }
}
impl From<PpsError> for Error {
    fn from(e: PpsError) -> Self {
        Error::Pps(e)
    }
}
impl From<ExtractError> for Error {
    fn from(e: ExtractError) -> Self {
        Error::Extract(e)
    }
}
