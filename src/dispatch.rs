//! The marker-driven parsing loop.

use std::io::Read;

use crate::{
    cursor::Cursor,
    document::Document,
    error::{Error, ErrorKind, Repr, Result},
    marker::Marker,
    segment::SegmentDecoder,
};

/// Parses segments from `cursor` until the EOI marker and collects them into a [`Document`].
pub(crate) fn parse<R: Read, D: SegmentDecoder>(
    cursor: &mut Cursor<R>,
    strict: bool,
    decoder: &mut D,
) -> Result<Document> {
    let mut doc = Document::new();
    let mut marker = read_soi(cursor, strict)?;

    while marker != Marker::Eoi {
        let offset = cursor.position().saturating_sub(2);
        log::debug!("{:08x} [FF {:02X}] {}", offset, marker.code(), marker);
        cursor.set_segment(marker);

        // Segments with a decoder are consumed by it. Everything else is skipped using the
        // segment length.
        let mut skip_payload = true;
        match marker {
            Marker::Com => {
                skip_payload = false;
                let comment = decoder.comment(cursor)?;
                doc.add_comment(comment);
            }
            Marker::Dqt => {
                skip_payload = false;
                for table in decoder.quantization_tables(cursor, strict)? {
                    doc.tables_mut().set_quantization(table);
                }
            }
            Marker::Dht => {
                skip_payload = false;
                for table in decoder.huffman_tables(cursor, strict)? {
                    doc.tables_mut().set_huffman(table);
                }
            }
            Marker::Dac => {
                return Err(Error::unsupported(
                    "arithmetic coding conditioning tables (DAC)",
                    marker,
                    offset,
                ));
            }
            Marker::Dri => {
                skip_payload = false;
                let ri = read_dri(cursor)?;
                doc.set_restart_interval(ri);
            }
            Marker::Sos => {
                skip_payload = false;
                let scan = decoder.scan(cursor, strict)?;
                let Some(frame) = doc.last_frame() else {
                    return Err(Error::structural(
                        "scan encountered outside any frame",
                        Some(marker),
                        Some(offset),
                    ));
                };
                doc.append_scan(frame, scan)?;
            }
            Marker::Sof(sof) => {
                skip_payload = false;
                let frame = decoder.frame(cursor, strict, sof)?;
                log::trace!(
                    "{:?} frame: {}x{}, {} components",
                    sof,
                    frame.X(),
                    frame.Y(),
                    frame.components().len()
                );
                doc.add_frame(frame);
            }
            _ if !marker.has_length() => {
                skip_payload = false;
                log::warn!("ignoring stray {marker} marker at offset {offset}");
            }
            _ => {}
        }

        marker = cursor.read_marker(skip_payload)?;
    }

    Ok(doc)
}

/// Checks for the SOI marker and returns the first marker after it.
fn read_soi<R: Read>(cursor: &mut Cursor<R>, strict: bool) -> Result<Marker> {
    let mut header = [0; 2];
    match cursor.read_exact(&mut header) {
        Ok(()) if header == [0xFF, 0xD8] => return cursor.read_marker(false),
        Err(e) if e.kind() != ErrorKind::TruncatedStream => return Err(e),
        Ok(()) | Err(_) if strict => return Err(Error::from(Repr::NotThisFormat)),
        Err(e) => return Err(e),
        Ok(()) => {}
    }

    log::warn!(
        "JPEG image does not start with SOI marker (found {:02x} {:02x}), continuing anyway",
        header[0],
        header[1],
    );

    // The two bytes we just consumed may already be (part of) the first marker.
    match header {
        [0xFF, code] if !matches!(code, 0x00 | 0xFF | 0xD0..=0xD7) => Ok(Marker::from_u8(code)),
        [_, last] => cursor.scan_marker(last == 0xFF),
    }
}

/// Reads the restart interval `Ri` from a DRI segment.
fn read_dri<R: Read>(cursor: &mut Cursor<R>) -> Result<u16> {
    let length = cursor.read_length()?;
    if length < 2 {
        return Err(Error::segment(
            Marker::Dri,
            format!(
                "segment length of {} bytes is too short for its contents",
                length + 2
            ),
        ));
    }

    let ri = cursor.read_u16()?;
    if length > 2 {
        log::warn!(
            "DRI segment specified a length of {} bytes, but {} remain after decoding",
            length + 2,
            length - 2,
        );
        cursor.skip((length - 2).into())?;
    }
    Ok(ri)
}
