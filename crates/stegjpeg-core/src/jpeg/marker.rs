//! JPEG marker definitions (ITU T.81 Table B.1).

/// JPEG marker types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Marker {
    /// Start of Frame. Parameter is the SOF type (0 = baseline DCT).
    SOF(u8),
    /// Reserved for JPEG extensions.
    JPG,
    /// Define Huffman Table.
    DHT,
    /// Define Arithmetic Coding conditioning.
    DAC,
    /// Restart marker (0-7).
    RST(u8),
    /// Start of Image.
    SOI,
    /// End of Image.
    EOI,
    /// Start of Scan.
    SOS,
    /// Define Quantization Table.
    DQT,
    /// Define Number of Lines.
    DNL,
    /// Define Restart Interval.
    DRI,
    /// Define Hierarchical Progression.
    DHP,
    /// Expand Reference Component.
    EXP,
    /// Application segment (0-15).
    APP(u8),
    /// JPEG extension (0-13).
    JPGn(u8),
    /// Comment.
    COM,
    /// Temporary marker for arithmetic coding.
    TEM,
    /// Reserved (0x02-0xBF).
    RES(u8),
}

impl Marker {
    /// Returns true if this marker has a length field following it.
    pub fn has_length(self) -> bool {
        !matches!(
            self,
            Marker::RST(..) | Marker::SOI | Marker::EOI | Marker::TEM
        )
    }

    /// Convert a marker byte to a `Marker`, if valid.
    ///
    /// Returns `None` for 0x00 (stuffed byte) and 0xFF (fill byte).
    pub fn from_u8(n: u8) -> Option<Marker> {
        use Marker::*;
        match n {
            0x00 => None, // stuffed byte (escaped 0xFF)
            0x01 => Some(TEM),
            0x02..=0xBF => Some(RES(n)),
            0xC4 => Some(DHT),
            0xC8 => Some(JPG),
            0xCC => Some(DAC),
            0xC0..=0xCF => Some(SOF(n - 0xC0)),
            0xD0..=0xD7 => Some(RST(n - 0xD0)),
            0xD8 => Some(SOI),
            0xD9 => Some(EOI),
            0xDA => Some(SOS),
            0xDB => Some(DQT),
            0xDC => Some(DNL),
            0xDD => Some(DRI),
            0xDE => Some(DHP),
            0xDF => Some(EXP),
            0xE0..=0xEF => Some(APP(n - 0xE0)),
            0xF0..=0xFD => Some(JPGn(n - 0xF0)),
            0xFE => Some(COM),
            0xFF => None, // fill byte
        }
    }

    /// Convert a marker back to its byte representation.
    pub fn to_u8(self) -> u8 {
        use Marker::*;
        match self {
            TEM => 0x01,
            RES(n) => n,
            SOF(n) => 0xC0 + n,
            JPG => 0xC8,
            DHT => 0xC4,
            DAC => 0xCC,
            RST(n) => 0xD0 + n,
            SOI => 0xD8,
            EOI => 0xD9,
            SOS => 0xDA,
            DQT => 0xDB,
            DNL => 0xDC,
            DRI => 0xDD,
            DHP => 0xDE,
            EXP => 0xDF,
            APP(n) => 0xE0 + n,
            JPGn(n) => 0xF0 + n,
            COM => 0xFE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_from_u8() {
        assert_eq!(Marker::from_u8(0xD8), Some(Marker::SOI));
        assert_eq!(Marker::from_u8(0xD9), Some(Marker::EOI));
        assert_eq!(Marker::from_u8(0xC0), Some(Marker::SOF(0)));
        assert_eq!(Marker::from_u8(0xC2), Some(Marker::SOF(2)));
        assert_eq!(Marker::from_u8(0xC4), Some(Marker::DHT));
        assert_eq!(Marker::from_u8(0xCC), Some(Marker::DAC));
        assert_eq!(Marker::from_u8(0xDA), Some(Marker::SOS));
        assert_eq!(Marker::from_u8(0xDB), Some(Marker::DQT));
        assert_eq!(Marker::from_u8(0xE0), Some(Marker::APP(0)));
        assert_eq!(Marker::from_u8(0xFE), Some(Marker::COM));
        assert_eq!(Marker::from_u8(0x00), None); // stuffed byte
        assert_eq!(Marker::from_u8(0xFF), None); // fill byte
    }

    #[test]
    fn marker_roundtrip() {
        for n in 0x01..=0xFEu8 {
            if let Some(marker) = Marker::from_u8(n) {
                assert_eq!(marker.to_u8(), n, "marker byte 0x{n:02X}");
            }
        }
    }

    #[test]
    fn has_length() {
        assert!(Marker::SOF(0).has_length());
        assert!(Marker::DQT.has_length());
        assert!(Marker::DHT.has_length());
        assert!(Marker::SOS.has_length());
        assert!(Marker::COM.has_length());
        assert!(!Marker::SOI.has_length());
        assert!(!Marker::EOI.has_length());
        assert!(!Marker::RST(0).has_length());
        assert!(!Marker::TEM.has_length());
    }
}
