use serde::Serialize;

use crate::bits;
use crate::error::{Error, Result};

/// Added to the first plaintext word to locate the start of the schema payload.
pub const DATA_START_BIAS: usize = 16;

/// Bit width of one packed integer. Signed widths are sign-extended on read to
/// the next whole byte, the way the game lays them out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Width {
    pub bits: u8,
    pub signed: bool,
}

impl Width {
    pub const fn u(bits: u8) -> Self {
        Self {
            bits,
            signed: false,
        }
    }

    pub const fn s(bits: u8) -> Self {
        Self { bits, signed: true }
    }

    pub const fn byte_len(self) -> usize {
        (self.bits as usize).div_ceil(8)
    }

    pub const fn mask(self) -> u64 {
        low_mask(self.bits as u32)
    }

    pub const fn byte_mask(self) -> u64 {
        low_mask(self.byte_len() as u32 * 8)
    }

    /// Converts a caller value to the raw in-memory form, rejecting anything
    /// that does not fit the declared width.
    pub fn encode(self, value: i64) -> Result<u64> {
        let bits = self.bits as u32;
        if self.signed {
            let min = -(1i128 << (bits - 1));
            let max = (1i128 << (bits - 1)) - 1;
            if (value as i128) < min || (value as i128) > max {
                return Err(Error::range(format!(
                    "{value} does not fit signed {bits}-bit field ({min}..={max})"
                )));
            }
            Ok(value as u64 & self.byte_mask())
        } else {
            let max = self.mask() as i128;
            if value < 0 || value as i128 > max {
                return Err(Error::range(format!(
                    "{value} does not fit unsigned {bits}-bit field (0..={max})"
                )));
            }
            Ok(value as u64)
        }
    }

    pub fn decode(self, raw: u64) -> i64 {
        if !self.signed {
            return raw as i64;
        }
        let width = self.byte_len() as u32 * 8;
        if width >= 64 {
            return raw as i64;
        }
        let shift = 64 - width;
        ((raw << shift) as i64) >> shift
    }
}

const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// One decoded value and the absolute plaintext bit position it was read from.
/// The position never changes after decode; it is the only coordinate used to
/// write the value back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int {
        bit_offset: u64,
        width: Width,
        raw: u64,
    },
    Str {
        bit_offset: u64,
        bytes: Vec<u8>,
    },
}

impl Field {
    pub fn bit_offset(&self) -> u64 {
        match self {
            Field::Int { bit_offset, .. } | Field::Str { bit_offset, .. } => *bit_offset,
        }
    }

    pub fn bit_length(&self) -> u64 {
        match self {
            Field::Int { width, .. } => width.bits as u64,
            Field::Str { bytes, .. } => bytes.len() as u64 * 8,
        }
    }

    /// Size of the value in the unpacked (byte-aligned) image.
    pub fn byte_length(&self) -> usize {
        match self {
            Field::Int { width, .. } => width.byte_len(),
            Field::Str { bytes, .. } => bytes.len(),
        }
    }

    pub fn width(&self) -> Option<Width> {
        match self {
            Field::Int { width, .. } => Some(*width),
            Field::Str { .. } => None,
        }
    }

    pub fn raw(&self) -> Option<u64> {
        match self {
            Field::Int { raw, .. } => Some(*raw),
            Field::Str { .. } => None,
        }
    }

    pub fn int(&self) -> Option<i64> {
        match self {
            Field::Int { width, raw, .. } => Some(width.decode(*raw)),
            Field::Str { .. } => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Field::Int { .. } => None,
            Field::Str { bytes, .. } => Some(bytes),
        }
    }

    pub fn set_int(&mut self, value: i64) -> Result<()> {
        match self {
            Field::Int { width, raw, .. } => {
                *raw = width.encode(value)?;
                Ok(())
            }
            Field::Str { bit_offset, .. } => Err(Error::range(format!(
                "field at bit {bit_offset:#x} holds a string, not an integer"
            ))),
        }
    }

    /// Replaces string contents, zero-padding to the fixed field length.
    pub fn set_bytes(&mut self, value: &[u8]) -> Result<()> {
        match self {
            Field::Str { bytes, .. } => {
                if value.len() > bytes.len() {
                    return Err(Error::range(format!(
                        "{} bytes do not fit {}-byte string field",
                        value.len(),
                        bytes.len()
                    )));
                }
                bytes.fill(0);
                bytes[..value.len()].copy_from_slice(value);
                Ok(())
            }
            Field::Int { bit_offset, .. } => Err(Error::range(format!(
                "field at bit {bit_offset:#x} holds an integer, not a string"
            ))),
        }
    }
}

/// The decrypted plaintext of one save. Every decoded [`Field`] points into this
/// single buffer by bit offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBuffer {
    bytes: Vec<u8>,
    data_start: usize,
}

impl DecodedBuffer {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        let Some(lead) = bytes.first_chunk::<4>() else {
            return Err(Error::Truncated {
                what: "plaintext header (bytes)",
                need: 4,
                have: bytes.len() as u64,
            });
        };
        let data_start = u32::from_le_bytes(*lead) as usize + DATA_START_BIAS;
        if data_start > bytes.len() {
            return Err(Error::format(format!(
                "payload start {data_start:#x} lies beyond plaintext length {:#x}",
                bytes.len()
            )));
        }
        Ok(Self { bytes, data_start })
    }

    pub fn data_start(&self) -> usize {
        self.data_start
    }

    /// Bit position of the payload inside the plaintext.
    pub fn origin_bit(&self) -> u64 {
        self.data_start as u64 * 8
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.data_start..]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes the field's current value back over exactly its own bit span.
    pub fn patch(&mut self, field: &Field) -> Result<()> {
        bits::patch(&mut self.bytes, field)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_width_round_trips_negative_values() {
        let w = Width::s(6);
        let raw = w.encode(-1).expect("encode -1");
        assert_eq!(raw, 0xFF);
        assert_eq!(w.decode(raw), -1);
        assert_eq!(w.decode(w.encode(31).expect("encode 31")), 31);
        assert!(w.encode(32).is_err());
        assert!(w.encode(-33).is_err());
    }

    #[test]
    fn unsigned_width_rejects_overflow_and_negatives() {
        let w = Width::u(4);
        assert_eq!(w.encode(15).expect("encode 15"), 15);
        assert!(matches!(w.encode(16), Err(Error::ValueOutOfRange(_))));
        assert!(matches!(w.encode(-1), Err(Error::ValueOutOfRange(_))));
    }

    #[test]
    fn set_bytes_zero_pads_and_rejects_overlong() {
        let mut field = Field::Str {
            bit_offset: 0,
            bytes: vec![b'x'; 4],
        };
        field.set_bytes(b"ab").expect("short value fits");
        assert_eq!(field.bytes(), Some(&b"ab\0\0"[..]));
        assert!(field.set_bytes(b"abcde").is_err());
        assert!(field.set_int(1).is_err());
    }

    #[test]
    fn decoded_buffer_locates_payload_from_first_word() {
        let mut bytes = vec![0u8; 64];
        bytes[0] = 8;
        let buffer = DecodedBuffer::new(bytes).expect("valid buffer");
        assert_eq!(buffer.data_start(), 24);
        assert_eq!(buffer.payload().len(), 40);
        assert_eq!(buffer.origin_bit(), 192);

        let mut bad = vec![0u8; 16];
        bad[0] = 1;
        assert!(matches!(
            DecodedBuffer::new(bad),
            Err(Error::FormatMismatch(_))
        ));
    }
}
