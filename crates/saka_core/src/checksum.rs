use crate::error::{Error, Result};

pub const MASK1: u32 = 0x9255_AE41;
pub const MASK2: u32 = 0xEFCF_BFEA;

/// Reflected CRC-16 table for polynomial 0x1021 (0x8408 reversed).
pub const DEFAULT_TABLE: [u16; 256] = build_table(0x8408);

const fn build_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ poly
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-16 over ciphertext, spread into a 64-bit stored value through two
/// fixed masks.
#[derive(Debug, Clone)]
pub struct ChecksumEngine {
    table: [u16; 256],
}

impl Default for ChecksumEngine {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE,
        }
    }
}

impl ChecksumEngine {
    pub fn new(table: [u16; 256]) -> Self {
        Self { table }
    }

    /// Loads a 512-byte table dump (256 little-endian halfwords).
    pub fn from_table_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 512 {
            return Err(Error::format(format!(
                "checksum table is {} bytes, expected 512",
                bytes.len()
            )));
        }
        let mut table = [0u16; 256];
        for (slot, c) in table.iter_mut().zip(bytes.chunks_exact(2)) {
            *slot = u16::from_le_bytes([c[0], c[1]]);
        }
        Ok(Self { table })
    }

    pub fn crc16(&self, data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &b in data {
            crc = (crc >> 8) ^ self.table[((crc & 0xFF) as u8 ^ b) as usize];
        }
        crc ^ 0xFFFF
    }

    /// Returns the `(left, right)` words of the stored checksum.
    pub fn split(crc: u16) -> (u32, u32) {
        let crc = crc as u32;
        let left = (crc & MASK1) | (MASK2 & !MASK1);
        let right = (crc & !MASK1) | (MASK2 & MASK1);
        (left, right)
    }

    pub fn compute(&self, data: &[u8]) -> u64 {
        let (left, right) = Self::split(self.crc16(data));
        ((right as u64) << 32) | left as u64
    }

    pub fn verify(&self, data: &[u8], stored: u64) -> bool {
        self.compute(data) == stored
    }

    pub fn check(&self, data: &[u8], stored: u64, what: &str) -> Result<()> {
        let computed = self.compute(data);
        if computed != stored {
            return Err(Error::format(format!(
                "{what} checksum mismatch: stored {stored:#018x}, computed {computed:#018x}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_x25() {
        assert_eq!(DEFAULT_TABLE[0], 0);
        assert_eq!(DEFAULT_TABLE[1], 0x1189);
        assert_eq!(DEFAULT_TABLE[255], 0x0F78);
        assert_eq!(ChecksumEngine::default().crc16(b"123456789"), 0x906E);
    }

    #[test]
    fn masks_place_crc_bits_in_both_words() {
        let (left, right) = ChecksumEngine::split(0);
        assert_eq!(left, MASK2 & !MASK1);
        assert_eq!(right, MASK2 & MASK1);
        let (left, right) = ChecksumEngine::split(0xFFFF);
        assert_eq!(left & 0xFFFF, (0xFFFF & MASK1) | (MASK2 & !MASK1 & 0xFFFF));
        assert_eq!(right & 0xFFFF, (0xFFFF & !MASK1) | (MASK2 & MASK1 & 0xFFFF));
    }

    #[test]
    fn verify_accepts_own_output_and_catches_single_bit_flips() {
        let engine = ChecksumEngine::default();
        let data: Vec<u8> = (0..300u32).map(|i| (i * 37 % 251) as u8).collect();
        let stored = engine.compute(&data);
        assert!(engine.verify(&data, stored));
        for byte in [0usize, 1, 150, 299] {
            for bit in 0..8 {
                let mut flipped = data.clone();
                flipped[byte] ^= 1 << bit;
                assert!(!engine.verify(&flipped, stored), "byte {byte} bit {bit}");
            }
        }
        assert!(engine.check(&data, stored ^ 1, "test").is_err());
    }

    #[test]
    fn table_dump_round_trips() {
        let bytes: Vec<u8> = DEFAULT_TABLE.iter().flat_map(|w| w.to_le_bytes()).collect();
        let engine = ChecksumEngine::from_table_bytes(&bytes).expect("load table");
        assert_eq!(engine.crc16(b"abc"), ChecksumEngine::default().crc16(b"abc"));
        assert!(ChecksumEngine::from_table_bytes(&bytes[..10]).is_err());
    }
}
