//! Bounded big-endian reader over an in-memory byte range.
//!
//! A [`Segment`] knows the absolute file offset of its first byte so that
//! truncation errors and atom headers can report real positions, and it can
//! hand out sub-segments that share the same backing bytes but carry their
//! own remaining-byte accounting.

use crate::boxes::FourCC;
use crate::parser::{ParseError, Result};
use crate::util::{fixed_16_16, mac_epoch_to_datetime, ufixed_16_16};
use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct Segment<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> Segment<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Wrap `data` whose first byte sits at absolute offset `base`.
    pub fn with_base(data: &'a [u8], base: u64) -> Self {
        Segment { data, pos: 0, base }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Position relative to the start of this segment.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute offset of the next byte to be read.
    pub fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    fn truncated(&self, needed: u64) -> ParseError {
        ParseError::Truncated {
            offset: self.offset(),
            needed,
            available: self.remaining() as u64,
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.truncated(n as u64));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        if n > self.remaining() as u64 {
            return Err(self.truncated(n));
        }
        self.pos += n as usize;
        Ok(())
    }

    /// Move to `pos`, relative to the start of this segment.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(ParseError::Truncated {
                offset: self.base + pos as u64,
                needed: 0,
                available: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Consume the next `n` bytes and return them as an independent segment.
    pub fn sub_segment(&mut self, n: u64) -> Result<Segment<'a>> {
        if n > self.remaining() as u64 {
            return Err(self.truncated(n));
        }
        let base = self.offset();
        let bytes = self.read_bytes(n as usize)?;
        Ok(Segment::with_base(bytes, base))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_fourcc(&mut self) -> Result<FourCC> {
        Ok(FourCC(self.read_array::<4>()?))
    }

    /// Version byte plus 24-bit flags of a "full" atom.
    pub fn read_version_flags(&mut self) -> Result<(u8, u32)> {
        let version = self.read_u8()?;
        let f = self.read_array::<3>()?;
        let flags = ((f[0] as u32) << 16) | ((f[1] as u32) << 8) | (f[2] as u32);
        Ok((version, flags))
    }

    pub fn read_fixed_16_16(&mut self) -> Result<f64> {
        Ok(fixed_16_16(self.read_u32()?))
    }

    pub fn read_ufixed_16_16(&mut self) -> Result<f64> {
        Ok(ufixed_16_16(self.read_u32()?))
    }

    pub fn read_mac_timestamp(&mut self) -> Result<Option<DateTime<Utc>>> {
        Ok(mac_epoch_to_datetime(self.read_u32()? as u64))
    }

    pub fn read_mac_timestamp64(&mut self) -> Result<Option<DateTime<Utc>>> {
        Ok(mac_epoch_to_datetime(self.read_u64()?))
    }

    /// Everything left in this segment.
    pub fn read_rest(&mut self) -> Result<&'a [u8]> {
        self.read_bytes(self.remaining())
    }
}
