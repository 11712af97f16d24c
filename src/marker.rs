//! JPEG marker codes (ITU T.81, Table B.1).

use std::fmt;

/// The kind of a segment, identified by the `0xXX` byte of its `0xFF 0xXX` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Start Of Frame. All 13 frame kinds share this variant.
    Sof(SofMarker),
    /// Define Huffman Tables.
    Dht,
    /// Reserved for JPEG extensions.
    Jpg,
    /// Define Arithmetic Coding conditioning.
    Dac,
    /// Restart marker with modulo-8 count `m`. Only the low 3 bits of `m` are encoded.
    Rst(u8),
    /// Start Of Image.
    Soi,
    /// End Of Image.
    Eoi,
    /// Start Of Scan.
    Sos,
    /// Define Quantization Tables.
    Dqt,
    /// Define Number of Lines.
    Dnl,
    /// Define Restart Interval.
    Dri,
    /// Define Hierarchical Progression.
    Dhp,
    /// Expand Reference components.
    Exp,
    /// Application segment `APPn`, `n` in `0..=15`. Only the low 4 bits of `n` are encoded.
    App(u8),
    /// Reserved for JPEG extensions, `JPGn` with `n` in `0..=13`. Only the low 4 bits of `n`
    /// are encoded, so values above 13 produce the code of a different marker.
    Jpgn(u8),
    /// Comment.
    Com,
    /// For temporary private use in arithmetic coding.
    Tem,
    /// Any code not assigned by the standard.
    Unrecognized(u8),
}

impl Marker {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => Self::Sof(SofMarker(code)),
            0xC4 => Self::Dht,
            0xC8 => Self::Jpg,
            0xCC => Self::Dac,
            0xD0..=0xD7 => Self::Rst(code - 0xD0),
            0xD8 => Self::Soi,
            0xD9 => Self::Eoi,
            0xDA => Self::Sos,
            0xDB => Self::Dqt,
            0xDC => Self::Dnl,
            0xDD => Self::Dri,
            0xDE => Self::Dhp,
            0xDF => Self::Exp,
            0xE0..=0xEF => Self::App(code - 0xE0),
            0xF0..=0xFD => Self::Jpgn(code - 0xF0),
            0xFE => Self::Com,
            0x01 => Self::Tem,
            _ => Self::Unrecognized(code),
        }
    }

    /// Returns the marker byte following the `0xFF` escape.
    pub fn code(self) -> u8 {
        match self {
            Self::Sof(sof) => sof.0,
            Self::Dht => 0xC4,
            Self::Jpg => 0xC8,
            Self::Dac => 0xCC,
            Self::Rst(m) => 0xD0 | (m & 0x07),
            Self::Soi => 0xD8,
            Self::Eoi => 0xD9,
            Self::Sos => 0xDA,
            Self::Dqt => 0xDB,
            Self::Dnl => 0xDC,
            Self::Dri => 0xDD,
            Self::Dhp => 0xDE,
            Self::Exp => 0xDF,
            Self::App(n) => 0xE0 | (n & 0x0F),
            Self::Jpgn(n) => 0xF0 | (n & 0x0F),
            Self::Com => 0xFE,
            Self::Tem => 0x01,
            Self::Unrecognized(code) => code,
        }
    }

    /// Returns whether the marker is followed by a length-prefixed segment.
    ///
    /// The standalone markers are SOI, EOI, TEM, and RSTn. Every other marker, even an
    /// unrecognized one, is followed by the segment length.
    pub fn has_length(self) -> bool {
        !matches!(self, Self::Soi | Self::Eoi | Self::Tem | Self::Rst(_))
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Sof(sof) => write!(f, "{sof:?}"),
            Self::Dht => f.write_str("DHT"),
            Self::Jpg => f.write_str("JPG"),
            Self::Dac => f.write_str("DAC"),
            Self::Rst(m) => write!(f, "RST{m}"),
            Self::Soi => f.write_str("SOI"),
            Self::Eoi => f.write_str("EOI"),
            Self::Sos => f.write_str("SOS"),
            Self::Dqt => f.write_str("DQT"),
            Self::Dnl => f.write_str("DNL"),
            Self::Dri => f.write_str("DRI"),
            Self::Dhp => f.write_str("DHP"),
            Self::Exp => f.write_str("EXP"),
            Self::App(n) => write!(f, "APP{n}"),
            Self::Jpgn(n) => write!(f, "JPG{n}"),
            Self::Com => f.write_str("COM"),
            Self::Tem => f.write_str("TEM"),
            Self::Unrecognized(code) => write!(f, "ff {code:02x}"),
        }
    }
}

/// One of the 13 **S**tart **O**f **F**rame markers, identifying the coding process of a frame.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SofMarker(u8);

impl fmt::Debug for SofMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SOF0 => f.write_str("SOF0"),
            Self::SOF1 => f.write_str("SOF1"),
            Self::SOF2 => f.write_str("SOF2"),
            Self::SOF3 => f.write_str("SOF3"),
            Self::SOF5 => f.write_str("SOF5"),
            Self::SOF6 => f.write_str("SOF6"),
            Self::SOF7 => f.write_str("SOF7"),
            Self::SOF9 => f.write_str("SOF9"),
            Self::SOF10 => f.write_str("SOF10"),
            Self::SOF11 => f.write_str("SOF11"),
            Self::SOF13 => f.write_str("SOF13"),
            Self::SOF14 => f.write_str("SOF14"),
            Self::SOF15 => f.write_str("SOF15"),
            _ => f
                .debug_tuple("SofMarker")
                .field(&format_args!("{:02x}", self.0))
                .finish(),
        }
    }
}

impl SofMarker {
    /// Baseline DCT.
    pub const SOF0: Self = Self(0xC0);
    /// Extended Sequential DCT.
    pub const SOF1: Self = Self(0xC1);
    /// Progressive DCT.
    pub const SOF2: Self = Self(0xC2);
    /// Lossless sequential.
    pub const SOF3: Self = Self(0xC3);
    /// Differential sequential DCT.
    pub const SOF5: Self = Self(0xC5);
    /// Differential progressive DCT.
    pub const SOF6: Self = Self(0xC6);
    /// Differential lossless (sequential).
    pub const SOF7: Self = Self(0xC7);
    /// Extended sequential DCT, arithmetic coding.
    pub const SOF9: Self = Self(0xC9);
    /// Progressive DCT, arithmetic coding.
    pub const SOF10: Self = Self(0xCA);
    /// Lossless (sequential), arithmetic coding.
    pub const SOF11: Self = Self(0xCB);
    /// Differential sequential DCT, arithmetic coding.
    pub const SOF13: Self = Self(0xCD);
    /// Differential progressive DCT, arithmetic coding.
    pub const SOF14: Self = Self(0xCE);
    /// Differential lossless (sequential), arithmetic coding.
    pub const SOF15: Self = Self(0xCF);

    /// Returns the marker byte.
    #[inline]
    pub fn code(self) -> u8 {
        self.0
    }

    /// Returns whether the frame uses arithmetic entropy coding (SOF9 and up).
    #[inline]
    pub fn is_arithmetic(self) -> bool {
        self.0 & 0x08 != 0
    }

    #[inline]
    pub fn is_differential(self) -> bool {
        self.0 & 0x04 != 0
    }

    #[inline]
    pub fn is_progressive(self) -> bool {
        self.0 & 0x03 == 2
    }

    #[inline]
    pub fn is_lossless(self) -> bool {
        self.0 & 0x03 == 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for code in 0..=u8::MAX {
            assert_eq!(Marker::from_u8(code).code(), code);
        }
    }

    #[test]
    fn out_of_range_fields() {
        assert_eq!(Marker::Rst(9).code(), 0xD1);
        assert_eq!(Marker::App(200).code(), 0xE8);
        assert_eq!(Marker::Jpgn(20).code(), 0xF4);
    }

    #[test]
    fn classification() {
        assert_eq!(Marker::from_u8(0xC4), Marker::Dht);
        assert_eq!(Marker::from_u8(0xCC), Marker::Dac);
        assert_eq!(Marker::from_u8(0xD3), Marker::Rst(3));
        assert_eq!(Marker::from_u8(0xE1), Marker::App(1));
        assert_eq!(Marker::from_u8(0x02), Marker::Unrecognized(0x02));
        assert_eq!(Marker::from_u8(0xFF), Marker::Unrecognized(0xFF));

        let sofs = (0xC0..=0xCF)
            .filter(|code| matches!(Marker::from_u8(*code), Marker::Sof(_)))
            .count();
        assert_eq!(sofs, 13);

        assert!(!Marker::Soi.has_length());
        assert!(!Marker::Rst(7).has_length());
        assert!(Marker::Unrecognized(0x02).has_length());
        assert!(Marker::App(0).has_length());
    }

    #[test]
    fn sof_kinds() {
        assert!(!SofMarker::SOF0.is_progressive());
        assert!(SofMarker::SOF2.is_progressive());
        assert!(SofMarker::SOF10.is_progressive());
        assert!(SofMarker::SOF10.is_arithmetic());
        assert!(!SofMarker::SOF2.is_arithmetic());
        assert!(SofMarker::SOF3.is_lossless());
        assert!(SofMarker::SOF15.is_lossless());
        assert!(SofMarker::SOF15.is_differential());
        assert!(!SofMarker::SOF1.is_differential());
    }

    #[test]
    fn display() {
        assert_eq!(Marker::Sof(SofMarker::SOF14).to_string(), "SOF14");
        assert_eq!(Marker::App(13).to_string(), "APP13");
        assert_eq!(Marker::Unrecognized(0x4a).to_string(), "ff 4a");
    }
}
