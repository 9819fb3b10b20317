use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const FTYP: FourCC = FourCC(*b"ftyp");
    pub const MOOV: FourCC = FourCC(*b"moov");
    pub const TRAK: FourCC = FourCC(*b"trak");
    pub const MDAT: FourCC = FourCC(*b"mdat");

    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else { None }
    }
    pub fn as_str_lossy(&self) -> String {
        self.0.iter().map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }
impl fmt::Display for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }

impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(b: &[u8; 4]) -> Self {
        FourCC(*b)
    }
}

#[derive(Debug, Clone)]
pub struct AtomHeader {
    pub size: u64,          // total size including header (a zero size field is reported as 0)
    pub typ: FourCC,
    pub header_size: u64,   // 8, or 16 for extended sizes
    pub start: u64,         // absolute offset of header start
}

impl AtomHeader {
    /// Absolute offset one past the last byte of this atom.
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn payload_len(&self) -> u64 {
        self.size.saturating_sub(self.header_size)
    }
}
