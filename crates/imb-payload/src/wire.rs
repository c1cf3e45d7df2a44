//! Field readers for fixed-layout frames
//!
//! All multi-byte integers on the wire are big-endian. Many fields are
//! addressed from the end of the frame, so [`FrameReader`] offers both
//! absolute and end-relative accessors. Every read is bounds-checked and an
//! out-of-range offset surfaces as [`DecodeError::UnknownPayload`].

use crate::error::DecodeError;

/// Decode one packed BCD byte (two decimal digits)
///
/// Nibbles are not validated, matching the devices' own firmware: `0xFF`
/// decodes to 165.
pub fn unbcd(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Encode a value in 0..=99 as one packed BCD byte
pub fn bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Lowercase hex, two digits per byte
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Bounds-checked view over a raw frame
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameReader<'a> {
    bytes: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Fail unless the frame has at least `min` bytes
    pub(crate) fn require(&self, min: usize) -> Result<(), DecodeError> {
        if self.len() < min {
            tracing::trace!(len = self.len(), min, "frame too short");
            return Err(DecodeError::UnknownPayload);
        }
        Ok(())
    }

    pub(crate) fn u8(&self, index: usize) -> Result<u8, DecodeError> {
        self.bytes
            .get(index)
            .copied()
            .ok_or(DecodeError::UnknownPayload)
    }

    pub(crate) fn i8(&self, index: usize) -> Result<i8, DecodeError> {
        self.u8(index).map(|b| b as i8)
    }

    pub(crate) fn u16_be(&self, index: usize) -> Result<u16, DecodeError> {
        let hi = self.u8(index)?;
        let lo = self.u8(index + 1)?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    pub(crate) fn hex(&self, index: usize, len: usize) -> Result<String, DecodeError> {
        self.bytes
            .get(index..index + len)
            .map(to_hex)
            .ok_or(DecodeError::UnknownPayload)
    }

    /// Absolute index of the byte `k` positions before the end
    pub(crate) fn back(&self, k: usize) -> Result<usize, DecodeError> {
        self.len()
            .checked_sub(k)
            .ok_or(DecodeError::UnknownPayload)
    }

    pub(crate) fn u8_back(&self, k: usize) -> Result<u8, DecodeError> {
        self.u8(self.back(k)?)
    }

    pub(crate) fn u16_be_back(&self, k: usize) -> Result<u16, DecodeError> {
        self.u16_be(self.back(k)?)
    }
}
