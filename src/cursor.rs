use std::{
    io::{self, Read},
    mem,
};

use crate::{
    error::{Error, Result},
    marker::Marker,
};

/// A forward-only byte cursor over a JPEG stream.
///
/// The cursor reads from any [`Read`] implementation and keeps track of the number of bytes
/// consumed so far, which is reported in errors. Reads are issued in small pieces, so unbuffered
/// sources like [`File`](std::fs::File) should be wrapped in a [`BufReader`](std::io::BufReader).
///
/// Running out of data is reported as a [`TruncatedStream`](crate::ErrorKind::TruncatedStream)
/// error naming the segment that was being processed.
#[derive(Debug)]
pub struct Cursor<R> {
    inner: R,
    position: u64,
    segment: Option<Marker>,
}

impl<R: Read> Cursor<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            segment: None,
        }
    }

    /// Returns the number of bytes consumed from the underlying reader.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the marker of the segment currently being processed.
    #[inline]
    pub fn segment(&self) -> Option<Marker> {
        self.segment
    }

    pub(crate) fn set_segment(&mut self, segment: Marker) {
        self.segment = Some(segment);
    }

    pub fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.inner.read(buf) {
                Ok(0) => return Err(Error::truncated(self.segment, self.position)),
                Ok(n) => {
                    self.position += n as u64;
                    buf = &mut mem::take(&mut buf)[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::from(e)),
            }
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        let mut b = [0; 2];
        self.read_exact(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    pub fn read_vec(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Discards the next `count` bytes.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let skipped = io::copy(&mut self.inner.by_ref().take(count), &mut io::sink())
            .map_err(Error::from)?;
        self.position += skipped;
        if skipped < count {
            return Err(Error::truncated(self.segment, self.position));
        }
        Ok(())
    }

    /// Reads a segment length field and returns the number of payload bytes that follow it.
    pub fn read_length(&mut self) -> Result<u16> {
        // Length parameter is the length of the segment parameters, including the length parameter,
        // but excluding the FF xx marker.

        let len = self.read_u16()?;
        if len < 2 {
            let message = format!("invalid segment length {len}");
            return Err(match self.segment {
                Some(marker) => Error::segment(marker, message),
                None => Error::structural(message, None, Some(self.position - 2)),
            });
        }
        Ok(len - 2)
    }

    /// Reads the next marker, optionally skipping the length-prefixed payload of the current
    /// segment first.
    pub(crate) fn read_marker(&mut self, skip_payload: bool) -> Result<Marker> {
        if skip_payload {
            let length = self.read_length()?;
            self.skip(length.into())?;
        }
        self.scan_marker(false)
    }

    /// Scans forward to the next marker and returns it.
    ///
    /// `saw_ff` indicates that the byte preceding the current position was an `0xFF` that still
    /// needs its marker byte.
    ///
    /// Any data preceding the marker is discarded. This includes the entropy-coded data following
    /// a scan header, so `FF 00` byte stuffing and `RSTn` markers do not end the scan.
    pub(crate) fn scan_marker(&mut self, mut saw_ff: bool) -> Result<Marker> {
        let start = self.position;
        loop {
            let byte = self.read_u8()?;
            if !saw_ff {
                saw_ff = byte == 0xFF;
                continue;
            }

            match byte {
                // Fill bytes.
                0xFF => {}
                0x00 | 0xD0..=0xD7 => saw_ff = false,
                code => {
                    let skipped = self.position - start;
                    if skipped > 2 {
                        log::trace!("skipped {} bytes before ff {:02x} marker", skipped - 2, code);
                    }
                    return Ok(Marker::from_u8(code));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ErrorKind;

    use super::*;

    #[test]
    fn reads() {
        let mut cursor = Cursor::new(&[0x01, 0x02, 0x03, 0x04, 0x05][..]);
        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16().unwrap(), 0x0203);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.read_vec(2).unwrap(), [0x04, 0x05]);

        let err = cursor.read_u8().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedStream);
        assert_eq!(err.offset(), Some(5));
        assert_eq!(err.marker(), None);
    }

    #[test]
    fn truncation_names_segment() {
        let mut cursor = Cursor::new(&[0x00, 0x10, 0xAA][..]);
        cursor.set_segment(Marker::App(1));
        let len = cursor.read_length().unwrap();
        assert_eq!(len, 14);

        let err = cursor.skip(len.into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedStream);
        assert_eq!(err.marker(), Some(Marker::App(1)));
        assert_eq!(err.offset(), Some(3));
        assert_eq!(
            err.to_string(),
            "reached end of data at offset 3 while processing APP1 segment"
        );
    }

    #[test]
    fn invalid_length() {
        let mut cursor = Cursor::new(&[0x00, 0x01][..]);
        cursor.set_segment(Marker::Com);
        let err = cursor.read_length().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Segment);
        assert_eq!(err.to_string(), "invalid COM segment: invalid segment length 1");
    }

    #[test]
    fn marker_after_payload() {
        let mut cursor = Cursor::new(&[0x00, 0x04, 0xFF, 0xD9, 0xFF, 0xDB][..]);
        // The skipped payload contains `FF D9`, which must not be mistaken for a marker.
        assert_eq!(cursor.read_marker(true).unwrap(), Marker::Dqt);
        assert_eq!(cursor.position(), 6);
    }

    #[test]
    fn marker_scan_skips_scan_data() {
        let data = [
            0x12, 0xFF, 0x00, // stuffed byte
            0x34, 0xFF, 0xD0, // RST0
            0x56, 0xFF, 0xFF, 0xFF, // fill bytes
            0xD9, // EOI
        ];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(cursor.scan_marker(false).unwrap(), Marker::Eoi);
        assert_eq!(cursor.position(), data.len() as u64);

        let mut cursor = Cursor::new(&[0xDA][..]);
        assert_eq!(cursor.scan_marker(true).unwrap(), Marker::Sos);

        let mut cursor = Cursor::new(&[0x12, 0xFF][..]);
        let err = cursor.scan_marker(false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedStream);
    }

    #[test]
    fn io_errors() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "device unplugged"))
            }
        }

        let err = Cursor::new(Broken).read_u8().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
