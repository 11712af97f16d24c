//! A parser for the marker segment structure of JPEG bitstreams.
//!
//! [`open`] reads a JPEG stream from start to the EOI marker and returns a [`Document`] holding
//! the comments, quantization and huffman tables, frames, and scans it contains. Entropy-coded
//! scan data is skipped; this crate does not decode pixels.
//!
//! ```no_run
//! use std::{fs::File, io::BufReader};
//!
//! let file = BufReader::new(File::open("image.jpg")?);
//! let doc = jpeg_segments::open(file, true)?;
//! for frame in doc.frames() {
//!     println!("{:?} {}x{}, {} scans", frame.sof(), frame.X(), frame.Y(), frame.scans().len());
//! }
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! # Strict and lenient mode
//!
//! In strict mode, the stream must start with an SOI marker, and segment decoders reject fields
//! that are out of range and segments with unused trailing bytes. In lenient mode, these problems
//! are logged (via the [`log`] crate) and parsing continues.
//!
//! Independent of the mode, these are always errors:
//!
//! - a scan (SOS) that appears before any frame (SOF),
//! - arithmetic coding conditioning tables (DAC), which are not supported,
//! - the stream ending before the EOI marker.

mod cursor;
mod dispatch;
mod document;
mod error;
mod marker;
mod segment;
mod tables;


use std::io::Read;

pub use crate::{
    cursor::Cursor,
    document::{Document, FrameId},
    error::{Error, ErrorKind, Result},
    marker::{Marker, SofMarker},
    segment::{
        Comment, Frame, FrameComponent, HuffmanCode, HuffmanTable, QuantizationTable, Scan,
        ScanComponent, SegmentDecoder, StandardDecoder,
    },
    tables::{HuffmanTables, QuantizationTables, TableRegistry},
};

/// Parses the JPEG stream read from `source`.
///
/// `source` is read up to and including the EOI marker; anything after it is left unread. Pass
/// `&mut reader` to keep using the reader afterwards. Unbuffered readers should be wrapped in a
/// [`BufReader`](std::io::BufReader).
///
/// If `strict` is `true`, a stream that does not start with the SOI marker fails with
/// [`ErrorKind::NotThisFormat`], and out-of-range segment fields are errors.
pub fn open<R: Read>(source: R, strict: bool) -> Result<Document> {
    OpenOptions::new().strict(strict).open(source)
}

/// Like [`open`], but decodes segment payloads with `decoder` instead of [`StandardDecoder`].
pub fn open_with<R: Read, D: SegmentDecoder>(
    source: R,
    strict: bool,
    decoder: &mut D,
) -> Result<Document> {
    OpenOptions::new().strict(strict).open_with(source, decoder)
}

/// Options controlling how a JPEG stream is parsed.
///
/// The default is lenient parsing.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenOptions {
    strict: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether malformed headers and segment fields are rejected instead of tolerated.
    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn open<R: Read>(&self, source: R) -> Result<Document> {
        self.open_with(source, &mut StandardDecoder)
    }

    pub fn open_with<R: Read, D: SegmentDecoder>(
        &self,
        source: R,
        decoder: &mut D,
    ) -> Result<Document> {
        let mut cursor = Cursor::new(source);
        let result = dispatch::parse(&mut cursor, self.strict, decoder);
        match &result {
            Ok(doc) => log::debug!(
                "parsed {} frames and {} comments ({} bytes)",
                doc.frame_count(),
                doc.comments().len(),
                cursor.position(),
            ),
            Err(e) => log::debug!("parsing failed after {} bytes: {}", cursor.position(), e),
        }
        result
    }
}
