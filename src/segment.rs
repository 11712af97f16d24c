//! Segment payload decoders.
//!
//! Every decoder reads the segment length, then exactly the number of payload bytes it
//! announces, and decodes the payload from memory. In strict mode, out-of-range fields and
//! unused trailing bytes are errors; in lenient mode they are logged and tolerated.

#![allow(non_snake_case)]

#[cfg(test)]
mod tests;

use std::{borrow::Cow, fmt, io::Read, mem};

use bytemuck::{AnyBitPattern, Pod, Zeroable};

use crate::{
    cursor::Cursor,
    error::{Error, Result},
    marker::{Marker, SofMarker},
};

/// Decodes the payloads of the segments the parser understands.
///
/// Each method is called with the cursor positioned right after the segment's marker, and must
/// consume exactly the segment (for SOS: the scan header). The parser does not look at the
/// decoded values beyond the table destinations, and propagates errors unchanged.
///
/// All methods default to the decoders in [`StandardDecoder`], so implementations only need to
/// override the segments they want to handle differently.
pub trait SegmentDecoder {
    fn comment<R: Read>(&mut self, cursor: &mut Cursor<R>) -> Result<Comment> {
        read_com(cursor)
    }

    fn quantization_tables<R: Read>(
        &mut self,
        cursor: &mut Cursor<R>,
        strict: bool,
    ) -> Result<Vec<QuantizationTable>> {
        read_dqt(cursor, strict)
    }

    fn huffman_tables<R: Read>(
        &mut self,
        cursor: &mut Cursor<R>,
        strict: bool,
    ) -> Result<Vec<HuffmanTable>> {
        read_dht(cursor, strict)
    }

    fn frame<R: Read>(
        &mut self,
        cursor: &mut Cursor<R>,
        strict: bool,
        sof: SofMarker,
    ) -> Result<Frame> {
        read_sof(cursor, strict, sof)
    }

    fn scan<R: Read>(&mut self, cursor: &mut Cursor<R>, strict: bool) -> Result<Scan> {
        read_sos(cursor, strict)
    }
}

/// The segment decoders used by [`open`][crate::open].
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDecoder;

impl SegmentDecoder for StandardDecoder {}

fn read_payload<R: Read>(cursor: &mut Cursor<R>, marker: Marker) -> Result<Vec<u8>> {
    cursor.set_segment(marker);
    let length = cursor.read_length()?;
    cursor.read_vec(length.into())
}

/// Reports an out-of-range field: an error in strict mode, a warning otherwise.
fn check(strict: bool, ok: bool, marker: Marker, message: impl FnOnce() -> String) -> Result<()> {
    if ok {
        return Ok(());
    }
    let message = message();
    if strict {
        Err(Error::segment(marker, message))
    } else {
        log::warn!("{marker} segment: {message}");
        Ok(())
    }
}

fn read_com<R: Read>(cursor: &mut Cursor<R>) -> Result<Comment> {
    let com = read_payload(cursor, Marker::Com)?;
    Ok(Comment { com })
}

fn read_dqt<R: Read>(cursor: &mut Cursor<R>, strict: bool) -> Result<Vec<QuantizationTable>> {
    let payload = read_payload(cursor, Marker::Dqt)?;
    let mut reader = Reader::new(Marker::Dqt, &payload);

    let mut tables = Vec::new();
    while !reader.remaining().is_empty() {
        let PqTq = reader.read_u8()?;
        let mut Qk = [0; 64];
        match PqTq >> 4 {
            0 => {
                for (dest, src) in Qk.iter_mut().zip(reader.read_slice(64)?) {
                    *dest = u16::from(*src);
                }
            }
            1 => {
                for dest in &mut Qk {
                    *dest = reader.read_u16()?;
                }
            }
            Pq => {
                return Err(Error::segment(
                    Marker::Dqt,
                    format!("invalid quantization table precision Pq={Pq}"),
                ))
            }
        }

        let table = QuantizationTable { PqTq, Qk };
        check(strict, table.Tq() <= 3, Marker::Dqt, || {
            format!(
                "invalid quantization table destination Tq={} (0-3 are allowed)",
                table.Tq()
            )
        })?;
        tables.push(table);
    }

    if tables.is_empty() {
        check(strict, false, Marker::Dqt, || "segment defines no tables".into())?;
    }

    Ok(tables)
}

fn read_dht<R: Read>(cursor: &mut Cursor<R>, strict: bool) -> Result<Vec<HuffmanTable>> {
    let payload = read_payload(cursor, Marker::Dht)?;
    let mut reader = Reader::new(Marker::Dht, &payload);

    let mut tables = Vec::new();
    while !reader.remaining().is_empty() {
        let header: DhtHeader = reader.read_obj()?;
        let num_values = header.num_values();
        check(strict, num_values <= 256, Marker::Dht, || {
            format!("table defines {num_values} codes (at most 256 are allowed)")
        })?;

        let table = HuffmanTable {
            TcTh: header.TcTh,
            Li: header.Li,
            Vij: reader.read_slice(num_values)?.to_vec(),
        };
        check(strict, table.Tc() <= 1, Marker::Dht, || {
            format!("invalid table class Tc={} (only 0 and 1 are valid)", table.Tc())
        })?;
        check(strict, table.Th() <= 3, Marker::Dht, || {
            format!(
                "invalid table destination Th={} (0-3 are allowed)",
                table.Th()
            )
        })?;
        tables.push(table);
    }

    if tables.is_empty() {
        check(strict, false, Marker::Dht, || "segment defines no tables".into())?;
    }

    Ok(tables)
}

fn read_sof<R: Read>(cursor: &mut Cursor<R>, strict: bool, sof: SofMarker) -> Result<Frame> {
    let marker = Marker::Sof(sof);
    let payload = read_payload(cursor, marker)?;
    let mut reader = Reader::new(marker, &payload);

    let P = reader.read_u8()?;
    let Y = reader.read_u16()?;
    let X = reader.read_u16()?;
    let num_components = reader.read_u8()?;
    let components = reader
        .read_objs::<FrameComponent>(num_components.into())?
        .to_vec();
    reader.finish(strict)?;

    check(strict, (2..=16).contains(&P), marker, || {
        format!("invalid sample precision P={P}")
    })?;
    check(strict, X != 0, marker, || "frame has a width of 0".into())?;
    check(strict, num_components != 0, marker, || {
        "frame has no components".into()
    })?;
    for c in &components {
        check(
            strict,
            (1..=4).contains(&c.Hi()) && (1..=4).contains(&c.Vi()),
            marker,
            || {
                format!(
                    "invalid sampling factors {}x{} for component {}",
                    c.Hi(),
                    c.Vi(),
                    c.Ci()
                )
            },
        )?;
        check(strict, c.Tqi() <= 3, marker, || {
            format!(
                "invalid quantization table selection Tqi={} for component {}",
                c.Tqi(),
                c.Ci()
            )
        })?;
    }

    Ok(Frame {
        sof,
        P,
        Y,
        X,
        components,
        scans: Vec::new(),
    })
}

fn read_sos<R: Read>(cursor: &mut Cursor<R>, strict: bool) -> Result<Scan> {
    let payload = read_payload(cursor, Marker::Sos)?;
    let mut reader = Reader::new(Marker::Sos, &payload);

    let num_components = reader.read_u8()?;
    let components = reader
        .read_objs::<ScanComponent>(num_components.into())?
        .to_vec();
    let Ss = reader.read_u8()?;
    let Se = reader.read_u8()?;
    let AhAl = reader.read_u8()?;
    reader.finish(strict)?;

    check(strict, (1..=4).contains(&num_components), Marker::Sos, || {
        format!("scan with {num_components} components (1-4 are allowed)")
    })?;

    Ok(Scan {
        components,
        Ss,
        Se,
        AhAl,
    })
}

/// Reads fields out of an in-memory segment payload.
#[derive(Debug)]
struct Reader<'a> {
    marker: Marker,
    buf: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(marker: Marker, buf: &'a [u8]) -> Self {
        Self {
            marker,
            buf,
            position: 0,
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.position..]
    }

    fn short(&self) -> Error {
        Error::segment(
            self.marker,
            format!(
                "segment length of {} bytes is too short for its contents",
                self.buf.len() + 2
            ),
        )
    }

    fn read_u8(&mut self) -> Result<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    fn read_slice(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining().len() < count {
            Err(self.short())
        } else {
            let slice = &self.remaining()[..count];
            self.position += count;
            Ok(slice)
        }
    }

    fn read_obj<T: AnyBitPattern>(&mut self) -> Result<T> {
        let bytes = self.read_slice(mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    fn read_objs<T: AnyBitPattern>(&mut self, count: usize) -> Result<&'a [T]> {
        assert_eq!(mem::align_of::<T>(), 1);

        let bytes = self.read_slice(count * mem::size_of::<T>())?;
        Ok(bytemuck::cast_slice(bytes))
    }

    /// Checks that the whole payload was consumed.
    fn finish(&self, strict: bool) -> Result<()> {
        let remaining = self.remaining().len();
        if remaining == 0 {
            return Ok(());
        }
        let message = format!(
            "segment specified a length of {} bytes, but {} remain after decoding",
            self.buf.len() + 2,
            remaining,
        );
        if strict {
            Err(Error::segment(self.marker, message))
        } else {
            log::warn!("{} {}", self.marker, message);
            Ok(())
        }
    }
}

/// **COM** Comment.
#[derive(Clone, PartialEq, Eq)]
pub struct Comment {
    com: Vec<u8>,
}

impl Comment {
    pub fn new(com: impl Into<Vec<u8>>) -> Self {
        Self { com: com.into() }
    }

    /// Returns the raw comment bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.com
    }

    /// Returns the comment as text, replacing invalid UTF-8 sequences.
    #[inline]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.com)
    }
}

impl fmt::Debug for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Com(\"{}\")", self.com.escape_ascii())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    PqTq: u8,
    Qk: [u16; 64],
}

impl QuantizationTable {
    /// Creates an 8-bit quantization table with destination identifier `Tq`.
    pub fn new(Tq: u8, Qk: [u8; 64]) -> Self {
        Self {
            PqTq: Tq & 0xf,
            Qk: Qk.map(u16::from),
        }
    }

    /// Returns the quantization table element precision.
    ///
    /// - 0: 8-bit `Qk` values
    /// - 1: 16-bit `Qk` values
    ///
    /// Must be 0 when the sample precision `P` is 8 bits.
    #[inline]
    pub fn Pq(&self) -> u8 {
        self.PqTq >> 4
    }

    /// Returns the destination identifier (0-3).
    #[inline]
    pub fn Tq(&self) -> u8 {
        self.PqTq & 0xf
    }

    /// Returns the quantization table elements, in zig-zag order.
    #[inline]
    pub fn Qk(&self) -> &[u16; 64] {
        &self.Qk
    }
}

impl fmt::Debug for QuantizationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantizationTable")
            .field("Pq", &self.Pq())
            .field("Tq", &self.Tq())
            .field("Qk", &self.Qk)
            .finish()
    }
}

#[derive(Clone, Copy, AnyBitPattern)]
#[repr(C)]
struct DhtHeader {
    TcTh: u8,
    Li: [u8; 16],
}

impl DhtHeader {
    fn num_values(&self) -> usize {
        self.Li.iter().map(|l| *l as usize).sum()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    TcTh: u8,
    Li: [u8; 16],
    Vij: Vec<u8>,
}

impl HuffmanTable {
    /// Creates a table of class `Tc` with destination identifier `Th`.
    ///
    /// `Li` contains the number of codes of each length, `Vij` the symbol assigned to each code.
    pub fn new(Tc: u8, Th: u8, Li: [u8; 16], Vij: impl Into<Vec<u8>>) -> Self {
        Self {
            TcTh: (Tc << 4) | (Th & 0xf),
            Li,
            Vij: Vij.into(),
        }
    }

    /// Returns the table class (0 = DC, 1 = AC).
    #[inline]
    pub fn Tc(&self) -> u8 {
        self.TcTh >> 4
    }

    /// Returns the table destination identifier (0-3).
    #[inline]
    pub fn Th(&self) -> u8 {
        self.TcTh & 0xf
    }

    /// Returns an array containing the number of codes of each length.
    #[inline]
    pub fn Li(&self) -> &[u8; 16] {
        &self.Li
    }

    /// Returns the values associated with each huffman code.
    #[inline]
    pub fn Vij(&self) -> &[u8] {
        &self.Vij
    }

    /// Generates the canonical huffman codes described by this table.
    ///
    /// Codes are returned in order of increasing length. If `Vij` holds fewer values than `Li`
    /// announces, only the codes that have a value are returned. If `Li` announces more codes
    /// of some length than fit in that many bits, the list ends before the first code that
    /// does not fit.
    pub fn codes(&self) -> Vec<HuffmanCode> {
        let mut out = Vec::new();

        // The following is similar in function to the flowcharts in Annex C
        // (`Generate_size_table` and `Generate_code_table`)
        let mut next_code = 0u32;
        let mut values = self.Vij.iter();
        for (length, &count) in self.Li.iter().enumerate() {
            let length = (length + 1) as u8; // 1-based

            next_code <<= 1;

            for _ in 0..count {
                if next_code >> length != 0 {
                    return out;
                }
                let Some(&value) = values.next() else {
                    return out;
                };
                out.push(HuffmanCode {
                    length,
                    code: next_code as u16,
                    value,
                });
                next_code += 1;
            }
        }

        out
    }
}

impl fmt::Debug for HuffmanTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuffmanTable")
            .field("Tc", &self.Tc())
            .field("Th", &self.Th())
            .field("Li", &self.Li())
            .field("Vij", &self.Vij)
            .finish()
    }
}

/// A single code of a [`HuffmanTable`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HuffmanCode {
    /// Length of the huffman code in bits.
    pub length: u8,
    /// The code, stored in the `length` least significant bits.
    pub code: u16,
    /// Decoded value. Meaning depends on table class (AC/DC).
    pub value: u8,
}

impl fmt::Debug for HuffmanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02$b} -> {3:02x}",
            self.length,
            self.code,
            usize::from(self.length),
            self.value,
        )
    }
}

/// **SOF** Start Of Frame, followed by the [`Scan`]s belonging to the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The SOF marker.
    sof: SofMarker,
    /// Sample precision in bits.
    P: u8,
    Y: u16,
    X: u16,
    components: Vec<FrameComponent>,
    scans: Vec<Scan>,
}

impl Frame {
    pub fn new(sof: SofMarker, P: u8, Y: u16, X: u16, components: Vec<FrameComponent>) -> Self {
        Self {
            sof,
            P,
            Y,
            X,
            components,
            scans: Vec::new(),
        }
    }

    /// Returns the marker that started this frame, which identifies the coding process.
    #[inline]
    pub fn sof(&self) -> SofMarker {
        self.sof
    }

    /// Returns the sample precision in bits.
    #[inline]
    pub fn P(&self) -> u8 {
        self.P
    }

    /// Returns the number of lines in the image (the height of the frame).
    ///
    /// This may be 0 if the height is defined by a later DNL segment.
    #[inline]
    pub fn Y(&self) -> u16 {
        self.Y
    }

    /// Returns the number of samples per line (the width of the frame).
    #[inline]
    pub fn X(&self) -> u16 {
        self.X
    }

    #[inline]
    pub fn components(&self) -> &[FrameComponent] {
        &self.components
    }

    /// Returns the scans of this frame, in the order they appear in the stream.
    #[inline]
    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    pub(crate) fn push_scan(&mut self, scan: Scan) {
        self.scans.push(scan);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct FrameComponent {
    Ci: u8,
    HiVi: u8,
    Tqi: u8,
}

impl FrameComponent {
    pub fn new(Ci: u8, Hi: u8, Vi: u8, Tqi: u8) -> Self {
        Self {
            Ci,
            HiVi: (Hi << 4) | (Vi & 0xf),
            Tqi,
        }
    }

    /// Returns this component's component identifier.
    ///
    /// The component identifier is an arbitrary 8-bit value that uniquely identifies each
    /// component. The scan header refers to components using their identifier.
    #[inline]
    pub fn Ci(&self) -> u8 {
        self.Ci
    }

    /// Returns the horizontal subsampling factor for this component.
    #[inline]
    pub fn Hi(&self) -> u8 {
        self.HiVi >> 4
    }

    /// Returns the vertical subsampling factor for this component.
    #[inline]
    pub fn Vi(&self) -> u8 {
        self.HiVi & 0xf
    }

    /// Returns the index of the quantization table to use for this component.
    #[inline]
    pub fn Tqi(&self) -> u8 {
        self.Tqi
    }
}

impl fmt::Debug for FrameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameComponent")
            .field("Ci", &self.Ci)
            .field("Hi", &self.Hi())
            .field("Vi", &self.Vi())
            .field("Tqi", &self.Tqi)
            .finish()
    }
}

/// **SOS** Start Of Scan – a scan header.
///
/// The entropy-coded data following the header is not retained.
#[derive(Clone, PartialEq, Eq)]
pub struct Scan {
    components: Vec<ScanComponent>,
    Ss: u8,
    Se: u8,
    AhAl: u8,
}

impl Scan {
    pub fn new(components: Vec<ScanComponent>, Ss: u8, Se: u8, Ah: u8, Al: u8) -> Self {
        Self {
            components,
            Ss,
            Se,
            AhAl: (Ah << 4) | (Al & 0xf),
        }
    }

    #[inline]
    pub fn components(&self) -> &[ScanComponent] {
        &self.components
    }

    /// Returns the start of spectral selection (the predictor selector in lossless mode).
    #[inline]
    pub fn Ss(&self) -> u8 {
        self.Ss
    }

    /// Returns the end of spectral selection.
    #[inline]
    pub fn Se(&self) -> u8 {
        self.Se
    }

    /// Returns the successive approximation bit position high.
    #[inline]
    pub fn Ah(&self) -> u8 {
        self.AhAl >> 4
    }

    /// Returns the successive approximation bit position low (the point transform in lossless
    /// mode).
    #[inline]
    pub fn Al(&self) -> u8 {
        self.AhAl & 0xf
    }
}

impl fmt::Debug for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sos")
            .field("components", &self.components)
            .field("Ss", &self.Ss)
            .field("Se", &self.Se)
            .field("Ah", &self.Ah())
            .field("Al", &self.Al())
            .finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct ScanComponent {
    Csj: u8,
    TdjTaj: u8,
}

impl ScanComponent {
    pub fn new(Csj: u8, Tdj: u8, Taj: u8) -> Self {
        Self {
            Csj,
            TdjTaj: (Tdj << 4) | (Taj & 0xf),
        }
    }

    /// Returns the scan component selector.
    #[inline]
    pub fn Csj(&self) -> u8 {
        self.Csj
    }

    /// Returns the DC entropy coding table destination selector.
    #[inline]
    pub fn Tdj(&self) -> u8 {
        self.TdjTaj >> 4
    }

    /// Returns the AC entropy coding table destination selector.
    #[inline]
    pub fn Taj(&self) -> u8 {
        self.TdjTaj & 0xf
    }
}

impl fmt::Debug for ScanComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanComponent")
            .field("Csj", &self.Csj)
            .field("Tdj", &self.Tdj())
            .field("Taj", &self.Taj())
            .finish()
    }
}
