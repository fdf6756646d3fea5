use crate::error::{Error, Result};
use crate::field::{Field, Width};

/// MSB-first reader over a packed plaintext. Positions passed to `skip`/`seek`
/// are relative to `origin`; recorded field offsets are absolute.
///
/// Alongside the cursor it rebuilds the byte-aligned "unpacked" image the game
/// keeps in memory: each value little-endian at its byte width, groups padded
/// (or clipped) to their declared size.
pub struct BitReader<'a> {
    data: &'a [u8],
    origin: u64,
    bit_offset: u64,
    unpacked: Vec<u8>,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_origin(data, 0)
    }

    pub fn with_origin(data: &'a [u8], origin: u64) -> Self {
        Self {
            data,
            origin,
            bit_offset: origin,
            unpacked: Vec::new(),
        }
    }

    /// Cursor position relative to the origin.
    pub fn position(&self) -> u64 {
        self.bit_offset - self.origin
    }

    pub fn absolute_position(&self) -> u64 {
        self.bit_offset
    }

    pub fn unpacked_len(&self) -> usize {
        self.unpacked.len()
    }

    pub fn unpacked(&self) -> &[u8] {
        &self.unpacked
    }

    pub fn into_unpacked(self) -> Vec<u8> {
        self.unpacked
    }

    /// Reads one value. Returns the value (sign-extended to its byte width for
    /// signed reads) and that byte width.
    pub fn read(&mut self, width: Width) -> Result<(u64, usize)> {
        if width.bits == 0 || width.bits > 64 {
            return Err(Error::format(format!(
                "unsupported field width {} bits",
                width.bits
            )));
        }
        let end = self.bit_offset + width.bits as u64;
        let have = self.data.len() as u64 * 8;
        if end > have {
            return Err(Error::Truncated {
                what: "bit stream (bits)",
                need: end,
                have,
            });
        }

        let mut value = 0u64;
        let mut remaining = width.bits as u32;
        while remaining > 0 {
            let byte_index = (self.bit_offset / 8) as usize;
            let bit_index = (self.bit_offset % 8) as u32;
            let take = (8 - bit_index).min(remaining);
            let mask = ((1u16 << take) - 1) as u8;
            let chunk = (self.data[byte_index] >> (8 - bit_index - take)) & mask;
            value = (value << take) | chunk as u64;
            self.bit_offset += take as u64;
            remaining -= take;
        }

        if width.signed && value & (1u64 << (width.bits - 1)) != 0 {
            value |= !width.mask();
            value &= width.byte_mask();
        }
        Ok((value, width.byte_len()))
    }

    /// Reads a group of values. `total_bytes` is the group's declared size in
    /// the unpacked image; a shorter group is zero padded up to it.
    pub fn unpack(&mut self, widths: &[Width], total_bytes: usize) -> Result<Vec<Field>> {
        let mut fields = Vec::with_capacity(widths.len());
        let group_start = self.unpacked.len();
        for &width in widths {
            let bit_offset = self.bit_offset;
            let (raw, byte_len) = self.read(width)?;
            self.unpacked
                .extend_from_slice(&raw.to_le_bytes()[..byte_len.min(8)]);
            fields.push(Field::Int {
                bit_offset,
                width,
                raw,
            });
        }
        let group_end = group_start + total_bytes;
        if self.unpacked.len() < group_end {
            self.unpacked.resize(group_end, 0);
        }
        Ok(fields)
    }

    /// Reads `len` bytes as one string field.
    pub fn unpack_str(&mut self, len: usize) -> Result<Field> {
        let bit_offset = self.bit_offset;
        let mut bytes = Vec::with_capacity(len);
        for _ in 0..len {
            let (raw, _) = self.read(Width::u(8))?;
            bytes.push(raw as u8);
        }
        self.unpacked.extend_from_slice(&bytes);
        Ok(Field::Str { bit_offset, bytes })
    }

    /// Jumps the cursor and records `total_bytes` of opaque unpacked padding.
    pub fn skip(&mut self, bit_offset: u64, total_bytes: usize) {
        self.bit_offset = self.origin + bit_offset;
        self.unpacked.resize(self.unpacked.len() + total_bytes, 0);
    }

    /// Records unpacked padding without moving the cursor.
    pub fn align(&mut self, total_bytes: usize) {
        self.unpacked.resize(self.unpacked.len() + total_bytes, 0);
    }

    pub fn seek(&mut self, bit_offset: u64) {
        self.bit_offset = self.origin + bit_offset;
    }

    /// Closes a section with its tail canary. The canary is not stored in the
    /// packed stream: the unpacked image must be exactly `pattern.len()` bytes
    /// short of `section_end`, and the pattern then fills that tail.
    pub fn padding(&mut self, pattern: &[u8], section_end: usize) -> Result<()> {
        let remaining = section_end.checked_sub(self.unpacked.len());
        if remaining != Some(pattern.len()) {
            return Err(Error::format(format!(
                "tail canary {:02X?} misplaced: unpacked length {:#x}, section ends at {:#x}",
                pattern,
                self.unpacked.len(),
                section_end
            )));
        }
        self.unpacked.extend_from_slice(pattern);
        Ok(())
    }
}

/// Overwrites bits `[bit_offset, bit_offset + bits)` of `buf` with the low
/// `bits` bits of `value`, MSB-first. Neighbouring bits are preserved.
pub fn write_bits(buf: &mut [u8], bit_offset: u64, bits: u8, value: u64) -> Result<()> {
    let end = bit_offset + bits as u64;
    let have = buf.len() as u64 * 8;
    if end > have {
        return Err(Error::Truncated {
            what: "patch target (bits)",
            need: end,
            have,
        });
    }

    let value = value & Width::u(bits).mask();
    let mut remaining = bits as u32;
    let mut pos = bit_offset;
    while remaining > 0 {
        let byte_index = (pos / 8) as usize;
        let bit_index = (pos % 8) as u32;
        let take = (8 - bit_index).min(remaining);
        let shift = 8 - bit_index - take;
        let low = ((1u16 << take) - 1) as u8;
        let chunk = ((value >> (remaining - take)) as u8) & low;
        let byte_mask = low << shift;
        buf[byte_index] = (buf[byte_index] & !byte_mask) | (chunk << shift);
        pos += take as u64;
        remaining -= take;
    }
    Ok(())
}

pub fn patch(buf: &mut [u8], field: &Field) -> Result<()> {
    match field {
        Field::Int {
            bit_offset,
            width,
            raw,
        } => write_bits(buf, *bit_offset, width.bits, *raw),
        Field::Str { bit_offset, bytes } => {
            for (i, &b) in bytes.iter().enumerate() {
                write_bits(buf, bit_offset + i as u64 * 8, 8, b as u64)?;
            }
            Ok(())
        }
    }
}

/// Packs `values` back to back at the given widths. Signed values are given in
/// their raw in-memory form.
pub fn pack(widths: &[Width], values: &[u64]) -> Result<Vec<u8>> {
    if widths.len() != values.len() {
        return Err(Error::range(format!(
            "{} widths for {} values",
            widths.len(),
            values.len()
        )));
    }
    let total_bits: u64 = widths.iter().map(|w| w.bits as u64).sum();
    let mut out = vec![0u8; total_bits.div_ceil(8) as usize];
    let mut pos = 0u64;
    for (width, &value) in widths.iter().zip(values) {
        write_bits(&mut out, pos, width.bits, value)?;
        pos += width.bits as u64;
    }
    Ok(out)
}
