use core::fmt;
use std::io;

use crate::marker::Marker;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by [`open`][crate::open] and by [`SegmentDecoder`]s.
///
/// Every error is fatal to the parse it occurred in. Use [`Error::kind`] to find out what went
/// wrong.
///
/// [`SegmentDecoder`]: crate::SegmentDecoder
pub struct Error {
    repr: Repr,
}

pub(crate) enum Repr {
    NotThisFormat,
    Unsupported {
        what: &'static str,
        marker: Option<Marker>,
        offset: Option<u64>,
    },
    Structural {
        message: String,
        marker: Option<Marker>,
        offset: Option<u64>,
    },
    Truncated {
        segment: Option<Marker>,
        offset: u64,
    },
    Segment {
        marker: Marker,
        message: String,
    },
    Io(io::Error),
}

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The stream does not start with an `SOI` marker (strict mode only).
    ///
    /// The caller may want to try a different format.
    NotThisFormat,
    /// The stream uses a feature this parser does not support, like arithmetic coding
    /// conditioning tables.
    UnsupportedFeature,
    /// The segments are not in a valid order, for example a scan appears before any frame.
    StructuralViolation,
    /// The stream ended before the `EOI` marker.
    TruncatedStream,
    /// A segment decoder rejected the contents of a segment.
    Segment,
    /// The underlying reader returned an error.
    Io,
}

impl Error {
    pub(crate) fn from(e: impl Into<Repr>) -> Self {
        Self { repr: e.into() }
    }

    /// Creates an error describing an invalid segment.
    ///
    /// This is the error custom [`SegmentDecoder`][crate::SegmentDecoder] implementations are
    /// expected to return. The parser passes it through without modification.
    pub fn segment(marker: Marker, message: impl Into<String>) -> Self {
        Self::from(Repr::Segment {
            marker,
            message: message.into(),
        })
    }

    pub(crate) fn unsupported(what: &'static str, marker: Marker, offset: u64) -> Self {
        Self::from(Repr::Unsupported {
            what,
            marker: Some(marker),
            offset: Some(offset),
        })
    }

    pub(crate) fn structural(
        message: impl Into<String>,
        marker: Option<Marker>,
        offset: Option<u64>,
    ) -> Self {
        Self::from(Repr::Structural {
            message: message.into(),
            marker,
            offset,
        })
    }

    pub(crate) fn truncated(segment: Option<Marker>, offset: u64) -> Self {
        Self::from(Repr::Truncated { segment, offset })
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.repr {
            Repr::NotThisFormat => ErrorKind::NotThisFormat,
            Repr::Unsupported { .. } => ErrorKind::UnsupportedFeature,
            Repr::Structural { .. } => ErrorKind::StructuralViolation,
            Repr::Truncated { .. } => ErrorKind::TruncatedStream,
            Repr::Segment { .. } => ErrorKind::Segment,
            Repr::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns the marker of the segment that was being processed when the error occurred, if
    /// known.
    pub fn marker(&self) -> Option<Marker> {
        match &self.repr {
            Repr::Unsupported { marker, .. } | Repr::Structural { marker, .. } => *marker,
            Repr::Truncated { segment, .. } => *segment,
            Repr::Segment { marker, .. } => Some(*marker),
            _ => None,
        }
    }

    /// Returns the byte offset in the stream at which the error was detected, if known.
    pub fn offset(&self) -> Option<u64> {
        match &self.repr {
            Repr::Unsupported { offset, .. } | Repr::Structural { offset, .. } => *offset,
            Repr::Truncated { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl From<io::Error> for Repr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::NotThisFormat => f.write_str("JPEG image does not start with SOI marker"),
            Repr::Unsupported { what, .. } => write!(f, "unsupported feature: {what}"),
            Repr::Structural {
                message,
                offset: Some(offset),
                ..
            } => write!(f, "{message} (at offset {offset})"),
            Repr::Structural {
                message,
                offset: None,
                ..
            } => f.write_str(message),
            Repr::Truncated {
                segment: Some(marker),
                offset,
            } => write!(
                f,
                "reached end of data at offset {offset} while processing {marker} segment"
            ),
            Repr::Truncated {
                segment: None,
                offset,
            } => write!(f, "reached end of data at offset {offset}"),
            Repr::Segment { marker, message } => write!(f, "invalid {marker} segment: {message}"),
            Repr::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.repr {
            Repr::Io(e) => Some(e),
            _ => None,
        }
    }
}
