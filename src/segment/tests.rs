use expect_test::expect;

use crate::{cursor::Cursor, marker::SofMarker, ErrorKind};

use super::*;

/// Prepends the segment length field to `payload`.
fn segment(payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u16 + 2).to_be_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}

fn dqt(data: &[u8], strict: bool) -> Result<Vec<QuantizationTable>> {
    StandardDecoder.quantization_tables(&mut Cursor::new(data), strict)
}

fn dht(data: &[u8], strict: bool) -> Result<Vec<HuffmanTable>> {
    StandardDecoder.huffman_tables(&mut Cursor::new(data), strict)
}

fn sof(data: &[u8], strict: bool) -> Result<Frame> {
    StandardDecoder.frame(&mut Cursor::new(data), strict, SofMarker::SOF0)
}

fn sos(data: &[u8], strict: bool) -> Result<Scan> {
    StandardDecoder.scan(&mut Cursor::new(data), strict)
}

#[test]
fn com() {
    let data = segment(b"hello\xff");
    let mut cursor = Cursor::new(&data[..]);
    let com = StandardDecoder.comment(&mut cursor).unwrap();
    assert_eq!(cursor.position(), data.len() as u64);
    assert_eq!(com.bytes(), b"hello\xff");
    assert_eq!(com.text(), "hello\u{fffd}");
    expect![[r#"Com("hello\xff")"#]].assert_eq(&format!("{com:?}"));
}

#[test]
fn dqt_multiple_tables() {
    let mut payload = vec![0x00];
    payload.extend(1..=64u8);
    payload.push(0x13); // 16-bit, Tq=3
    for i in 0..64u16 {
        payload.extend_from_slice(&(i * 300).to_be_bytes());
    }

    let tables = dqt(&segment(&payload), true).unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].Pq(), 0);
    assert_eq!(tables[0].Tq(), 0);
    assert_eq!(tables[0].Qk()[0], 1);
    assert_eq!(tables[0].Qk()[63], 64);
    assert_eq!(tables[1].Pq(), 1);
    assert_eq!(tables[1].Tq(), 3);
    assert_eq!(tables[1].Qk()[63], 63 * 300);
}

#[test]
fn dqt_errors() {
    let mut payload = vec![0x04];
    payload.extend([1; 64]);
    let data = segment(&payload);
    let err = dqt(&data, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Segment);
    assert_eq!(err.marker(), Some(Marker::Dqt));
    assert_eq!(
        err.to_string(),
        "invalid DQT segment: invalid quantization table destination Tq=4 (0-3 are allowed)"
    );
    let tables = dqt(&data, false).unwrap();
    assert_eq!(tables[0].Tq(), 4);

    payload[0] = 0x20;
    let err = dqt(&segment(&payload), false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid DQT segment: invalid quantization table precision Pq=2"
    );

    let err = dqt(&segment(&[0x00; 11]), false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid DQT segment: segment length of 13 bytes is too short for its contents"
    );
}

#[test]
fn dht_default_luminance_dc() {
    let mut payload = vec![0x00];
    payload.extend([0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0]);
    payload.extend(0x00..=0x0b);

    let tables = dht(&segment(&payload), true).unwrap();
    assert_eq!(tables.len(), 1);
    let table = &tables[0];
    assert_eq!(table.Tc(), 0);
    assert_eq!(table.Th(), 0);
    assert_eq!(table.Vij().len(), 12);

    let codes: String = table.codes().iter().map(|c| format!("{c:?}\n")).collect();
    expect![[r#"
        2 00 -> 00
        3 010 -> 01
        3 011 -> 02
        3 100 -> 03
        3 101 -> 04
        3 110 -> 05
        4 1110 -> 06
        5 11110 -> 07
        6 111110 -> 08
        7 1111110 -> 09
        8 11111110 -> 0a
        9 111111110 -> 0b
    "#]]
    .assert_eq(&codes);
}

#[test]
fn dht_oversubscribed_lengths() {
    // Three 1-bit codes and one 2-bit code: only `0` and `1` fit.
    let mut payload = vec![0x10];
    payload.extend([3, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    payload.extend([0x01, 0x02, 0x03, 0x04]);

    let tables = dht(&segment(&payload), false).unwrap();
    let codes: String = tables[0].codes().iter().map(|c| format!("{c:?}\n")).collect();
    expect![[r#"
        1 0 -> 01
        1 1 -> 02
    "#]]
    .assert_eq(&codes);
}

#[test]
fn dht_validation() {
    let mut payload = vec![0x25]; // Tc=2, Th=5
    payload.extend([0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    payload.extend([0x07, 0x08]);
    let data = segment(&payload);

    let err = dht(&data, true).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid DHT segment: invalid table class Tc=2 (only 0 and 1 are valid)"
    );

    let tables = dht(&data, false).unwrap();
    assert_eq!(tables[0].Tc(), 2);
    assert_eq!(tables[0].Th(), 5);
    assert_eq!(tables[0].codes().len(), 2);

    // Announces 2 values, but only has 1.
    let err = dht(&segment(&payload[..payload.len() - 1]), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Segment);
}

#[test]
fn sof_baseline() {
    let data = segment(&[
        0x08, // P
        0x00, 0x10, // Y
        0x00, 0x20, // X
        0x03, // Nf
        0x01, 0x21, 0x00, // Y component
        0x02, 0x11, 0x01, // Cb
        0x03, 0x11, 0x01, // Cr
    ]);
    let frame = sof(&data, true).unwrap();
    assert_eq!(frame.sof(), SofMarker::SOF0);
    assert_eq!(frame.P(), 8);
    assert_eq!(frame.Y(), 16);
    assert_eq!(frame.X(), 32);
    assert!(frame.scans().is_empty());
    expect![[r#"
        [
            FrameComponent {
                Ci: 1,
                Hi: 2,
                Vi: 1,
                Tqi: 0,
            },
            FrameComponent {
                Ci: 2,
                Hi: 1,
                Vi: 1,
                Tqi: 1,
            },
            FrameComponent {
                Ci: 3,
                Hi: 1,
                Vi: 1,
                Tqi: 1,
            },
        ]
    "#]]
    .assert_debug_eq(&frame.components());
}

#[test]
fn sof_validation() {
    // Trailing byte after the component list.
    let data = segment(&[0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00, 0xAA]);
    let err = sof(&data, true).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid SOF0 segment: segment specified a length of 12 bytes, but 1 remain after decoding"
    );
    sof(&data, false).unwrap();

    // Zero sampling factors and a quantization table selector of 7.
    let data = segment(&[0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x00, 0x07]);
    let err = sof(&data, true).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid SOF0 segment: invalid sampling factors 0x0 for component 1"
    );
    let frame = sof(&data, false).unwrap();
    assert_eq!(frame.components()[0].Tqi(), 7);

    // Component list cut short.
    let data = segment(&[0x08, 0x00, 0x01, 0x00, 0x01, 0x02, 0x01, 0x11, 0x00]);
    assert_eq!(sof(&data, false).unwrap_err().kind(), ErrorKind::Segment);
}

#[test]
fn sos_header() {
    let data = segment(&[
        0x02, // Ns
        0x01, 0x00, // Csj, TdjTaj
        0x02, 0x11, //
        0x00, 0x3F, 0x00, // Ss, Se, AhAl
    ]);
    let mut cursor = Cursor::new(&data[..]);
    let scan = StandardDecoder.scan(&mut cursor, true).unwrap();
    assert_eq!(cursor.position(), data.len() as u64);
    assert_eq!(scan.components().len(), 2);
    assert_eq!(scan.components()[1].Csj(), 2);
    assert_eq!(scan.components()[1].Tdj(), 1);
    assert_eq!(scan.components()[1].Taj(), 1);
    assert_eq!((scan.Ss(), scan.Se(), scan.Ah(), scan.Al()), (0, 63, 0, 0));

    let data = segment(&[0x00, 0x00, 0x3F, 0x21]);
    let err = sos(&data, true).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid SOS segment: scan with 0 components (1-4 are allowed)"
    );
    let scan = sos(&data, false).unwrap();
    assert_eq!((scan.Ah(), scan.Al()), (2, 1));
}

#[test]
fn truncated_segment() {
    // Length announces 16 bytes, but the stream ends early.
    let err = dqt(&[0x00, 0x10, 0x00, 0x01], false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedStream);
    assert_eq!(err.marker(), Some(Marker::Dqt));
}
